use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use tracing::{debug, warn};

use syllabus_core::errors::GatewayError;
use syllabus_core::state::ChatMessage;

/// Chunked text stream produced by [`ModelGateway::generate_stream`].
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// A single text-generation backend family. Implementations receive the full
/// model identifier and may strip their own namespace prefix.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError>;
}

/// Uniform entry point for model calls. Dispatches on the namespace prefix
/// of the model identifier, enforces a per-call timeout, and retries
/// recoverable failures up to the configured budget.
pub struct ModelGateway {
    backends: Vec<(String, Arc<dyn ModelBackend>)>,
    timeout: Duration,
    max_retries: u32,
}

impl ModelGateway {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self { backends: Vec::new(), timeout: Duration::from_secs(timeout_secs), max_retries }
    }

    pub fn register(mut self, prefix: impl Into<String>, backend: Arc<dyn ModelBackend>) -> Self {
        self.backends.push((prefix.into(), backend));
        self
    }

    fn resolve(&self, model_id: &str) -> Result<&Arc<dyn ModelBackend>, GatewayError> {
        self.backends
            .iter()
            .filter(|(prefix, _)| model_id.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, backend)| backend)
            .ok_or_else(|| GatewayError::UnsupportedModel { model: model_id.to_string() })
    }

    pub async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let backend = self.resolve(model_id)?;

        let mut last_error = GatewayError::Upstream { message: "no attempt made".to_string() };
        for attempt in 0..=self.max_retries {
            let call = backend.complete(model_id, prompt, history);
            let outcome = match tokio::time::timeout(self.timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GatewayError::Timeout { seconds: self.timeout.as_secs() }),
            };

            match outcome {
                Ok(text) => {
                    debug!(model = model_id, attempt, chars = text.len(), "model call completed");
                    return Ok(text);
                }
                Err(error) if error.is_recoverable() && attempt < self.max_retries => {
                    warn!(model = model_id, attempt, %error, "model call failed, retrying");
                    last_error = error;
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error)
    }

    /// Streaming variant. The completion is produced in full and then
    /// emitted as word-boundary chunks, so every backend gets a streaming
    /// surface without a separate wire protocol.
    pub async fn generate_stream(
        &self,
        model_id: &str,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<TextStream, GatewayError> {
        let text = self.generate(model_id, prompt, history).await?;
        let chunks: Vec<Result<String, GatewayError>> =
            chunk_text(&text, 48).into_iter().map(Ok).collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}

fn chunk_text(text: &str, target_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_inclusive(char::is_whitespace) {
        current.push_str(word);
        if current.len() >= target_chars {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::StreamExt;

    use super::{ModelBackend, ModelGateway};
    use syllabus_core::errors::GatewayError;
    use syllabus_core::state::ChatMessage;

    struct EchoBackend;

    #[async_trait]
    impl ModelBackend for EchoBackend {
        async fn complete(
            &self,
            _model_id: &str,
            prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String, GatewayError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    struct FlakyBackend {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl ModelBackend for FlakyBackend {
        async fn complete(
            &self,
            _model_id: &str,
            _prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String, GatewayError> {
            if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(GatewayError::Upstream { message: "503".to_string() })
            } else {
                Ok("recovered".to_string())
            }
        }
    }

    #[tokio::test]
    async fn dispatches_on_model_prefix() {
        let gateway = ModelGateway::new(5, 0).register("echo", Arc::new(EchoBackend));
        let text = gateway.generate("echo-small", "hi", &[]).await.expect("call should succeed");
        assert_eq!(text, "echo: hi");
    }

    #[tokio::test]
    async fn unknown_prefix_is_unsupported() {
        let gateway = ModelGateway::new(5, 0).register("echo", Arc::new(EchoBackend));
        let error = gateway.generate("llama3", "hi", &[]).await.expect_err("should fail");
        assert_eq!(error, GatewayError::UnsupportedModel { model: "llama3".to_string() });
    }

    #[tokio::test]
    async fn recoverable_failures_are_retried() {
        let backend =
            Arc::new(FlakyBackend { failures_remaining: AtomicU32::new(2) });
        let gateway = ModelGateway::new(5, 2).register("flaky", backend);
        let text = gateway.generate("flaky-1", "hi", &[]).await.expect("retries should recover");
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let backend =
            Arc::new(FlakyBackend { failures_remaining: AtomicU32::new(10) });
        let gateway = ModelGateway::new(5, 1).register("flaky", backend);
        let error = gateway.generate("flaky-1", "hi", &[]).await.expect_err("should exhaust");
        assert!(error.is_recoverable());
    }

    #[tokio::test]
    async fn stream_reassembles_to_the_full_completion() {
        let prompt = "a prompt long enough to cross the word-boundary chunk size more than \
                      once, so the stream carries several pieces that must concatenate back \
                      to the exact completion";
        let gateway = ModelGateway::new(5, 0).register("echo", Arc::new(EchoBackend));
        let stream = gateway
            .generate_stream("echo-small", prompt, &[])
            .await
            .expect("stream should start");

        let chunks: Vec<String> =
            stream.map(|chunk| chunk.expect("chunk should be ok")).collect().await;
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), format!("echo: {prompt}"));
    }
}
