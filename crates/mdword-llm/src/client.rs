//! Blocking chat-completions client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use mdword_core::{MdwordError, Result};

use crate::config::LlmConfig;
use crate::templates;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    /// Build a client; fails when no API key is configured.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(MdwordError::Llm(
                "no API key configured (set DASHSCOPE_API_KEY or OPENAI_API_KEY)".to_string(),
            ));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MdwordError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One chat turn; returns the first choice's content.
    fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| MdwordError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MdwordError::Llm(format!(
                "API returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| MdwordError::Llm(format!("invalid API response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MdwordError::Llm("API response contained no choices".to_string()))
    }

    /// Turn raw input text into structured Markdown using a prompt
    /// template (the default template when `template` is `None`).
    pub fn generate_markdown(&self, input: &str, template: Option<&str>) -> Result<String> {
        let prompt = templates::render(template.unwrap_or(templates::DEFAULT_TEMPLATE), input)
            .ok_or_else(|| {
                MdwordError::Llm(format!(
                    "unknown template: {}",
                    template.unwrap_or(templates::DEFAULT_TEMPLATE)
                ))
            })?;
        let content = self.chat(templates::SYSTEM_PROMPT, &prompt)?;
        Ok(strip_markdown_fence(&content))
    }

    /// Revise existing Markdown according to an instruction, keeping
    /// the document structure intact.
    pub fn revise_markdown(&self, markdown: &str, instruction: &str) -> Result<String> {
        let prompt = format!(
            "Revise the following Markdown document according to this instruction. \
             Keep valid Markdown structure and do not add commentary.\n\n\
             Instruction: {instruction}\n\nDocument:\n\n{markdown}"
        );
        let content = self.chat(templates::SYSTEM_PROMPT, &prompt)?;
        Ok(strip_markdown_fence(&content))
    }

    /// Cheap connectivity probe: one minimal chat turn.
    pub fn test_connection(&self) -> bool {
        match self.chat("You are a helpful assistant.", "Reply with the word: ok") {
            Ok(_) => true,
            Err(e) => {
                log::warn!("connection test failed: {e}");
                false
            }
        }
    }
}

/// Models often wrap whole documents in a ```markdown fence; unwrap it.
fn strip_markdown_fence(content: &str) -> String {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string on the opening fence line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    #[test]
    fn test_missing_key_is_an_error() {
        let config = LlmConfig {
            api_key: None,
            model: "qwen-turbo".to_string(),
            base_url: "https://example.invalid/v1".to_string(),
        };
        let Err(err) = LlmClient::new(config) else {
            panic!("expected missing key to be rejected");
        };
        assert!(matches!(err, MdwordError::Llm(_)));
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_strip_markdown_fence() {
        assert_eq!(
            strip_markdown_fence("```markdown\n# Title\n\nbody\n```"),
            "# Title\n\nbody"
        );
        assert_eq!(strip_markdown_fence("```\n# T\n```"), "# T");
        assert_eq!(strip_markdown_fence("# plain"), "# plain");
        // An inline code span is not a document fence.
        assert_eq!(strip_markdown_fence("```not a fence```"), "```not a fence```");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "qwen-turbo",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 4000);
    }
}
