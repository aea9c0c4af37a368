//! Environment-driven configuration.

use std::env;

/// Default chat-completions endpoint (DashScope's OpenAI-compatible
/// mode).
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "qwen-turbo";

/// Settings for the chat client, read from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key; `None` when neither key variable is set.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Read configuration from the environment.
    ///
    /// `DASHSCOPE_API_KEY` takes precedence over `OPENAI_API_KEY`;
    /// the model comes from `QWEN_MODEL` or `OPENAI_MODEL`, and the
    /// endpoint from `OPENAI_COMPAT_BASE_URL`.
    pub fn from_env() -> Self {
        let api_key = env::var("DASHSCOPE_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        let model = env::var("QWEN_MODEL")
            .or_else(|_| env::var("OPENAI_MODEL"))
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = env::var("OPENAI_COMPAT_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            api_key,
            model,
            base_url,
        }
    }

    /// Configuration with an explicit key, for tests and embedding.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Output directory for generated and converted documents
/// (`MDWORD_OUTPUT_DIR`, default `output`).
pub fn output_dir() -> String {
    env::var("MDWORD_OUTPUT_DIR").unwrap_or_else(|_| "output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_key_uses_defaults() {
        let config = LlmConfig::with_key("sk-test");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
