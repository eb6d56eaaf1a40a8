use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use syllabus_core::errors::GatewayError;
use syllabus_core::state::{ChatMessage, MessageRole};

use crate::gateway::ModelBackend;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions backend. Model identifiers may carry an `openai:`
/// namespace prefix, which is stripped before the wire call.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let model = model_id.strip_prefix("openai:").unwrap_or(model_id);

        let mut messages: Vec<WireMessage<'_>> = history
            .iter()
            .map(|message| WireMessage { role: wire_role(message.role), content: &message.content })
            .collect();
        messages.push(WireMessage { role: "user", content: prompt });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&ChatRequest { model, messages })
            .send()
            .await
            .map_err(|error| GatewayError::Upstream { message: error.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                message: format!("status {status}: {body}"),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| GatewayError::Upstream { message: error.to_string() })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Upstream { message: "empty choices".to_string() })
    }
}
