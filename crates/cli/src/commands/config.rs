use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use syllabus_core::config::AppConfig;
use toml::Value;

use super::CommandResult;

pub fn run(config: &AppConfig) -> CommandResult {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: &str| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("llm.provider", &format!("{:?}", config.llm.provider), "SYLLABUS_LLM_PROVIDER");
    push("llm.model", &config.llm.model, "SYLLABUS_LLM_MODEL");
    push(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        "SYLLABUS_LLM_BASE_URL",
    );

    let api_key = match &config.llm.api_key {
        Some(key) => redact_token(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    push("llm.api_key", &api_key, "SYLLABUS_LLM_API_KEY");
    push("llm.timeout_secs", &config.llm.timeout_secs.to_string(), "SYLLABUS_LLM_TIMEOUT_SECS");
    push("llm.max_retries", &config.llm.max_retries.to_string(), "SYLLABUS_LLM_MAX_RETRIES");

    push(
        "agent.max_refinements",
        &config.agent.max_refinements.to_string(),
        "SYLLABUS_AGENT_MAX_REFINEMENTS",
    );
    push(
        "agent.max_messages",
        &config.agent.max_messages.to_string(),
        "SYLLABUS_AGENT_MAX_MESSAGES",
    );
    push(
        "agent.max_context_chars",
        &config.agent.max_context_chars.to_string(),
        "SYLLABUS_AGENT_MAX_CONTEXT_CHARS",
    );

    push("logging.level", &config.logging.level, "SYLLABUS_LOGGING_LEVEL");
    push("logging.format", &format!("{:?}", config.logging.format), "SYLLABUS_LOGGING_FORMAT");

    CommandResult::success(lines.join("\n"))
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("syllabus.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/syllabus.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_prefixed_tokens_down_to_their_prefix() {
        assert_eq!(redact_token("sk-abc123def"), "sk-***");
        assert_eq!(redact_token("opaquekey"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: Value = "[llm]\nmodel = \"offline\"".parse().unwrap();
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
    }
}
