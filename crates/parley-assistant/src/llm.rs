//! OpenAI-compatible chat-completion client.

use crate::error::AssistantError;
use async_trait::async_trait;
use parley_dispatch::TextGenerator;
use parley_types::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// One turn of a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Author role, serialized lowercase.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
}

/// Roleplay chat turns.
pub const ROLEPLAY_SAMPLING: Sampling = Sampling {
    temperature: 0.85,
    top_p: Some(0.95),
    max_tokens: 512,
};

/// Intent classification of a voice command.
pub const INTENT_SAMPLING: Sampling = Sampling {
    temperature: 0.7,
    top_p: None,
    max_tokens: 1000,
};

const GENERATE_SAMPLING: Sampling = Sampling {
    temperature: 0.8,
    top_p: None,
    max_tokens: 2000,
};

const SUMMARIZE_SAMPLING: Sampling = Sampling {
    temperature: 0.3,
    top_p: None,
    max_tokens: 500,
};

const TRANSLATE_SAMPLING: Sampling = Sampling {
    temperature: 0.3,
    top_p: None,
    max_tokens: 1000,
};

fn default_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

/// Connection settings for the model service.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API, e.g.
    /// `http://localhost:11434/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Empty means no Authorization header (local
    /// endpoints).
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// The completion seam the flows depend on. Lets tests substitute a stub
/// for the HTTP client.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Requests one completion for the given turns.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        sampling: Sampling,
    ) -> Result<String, AssistantError>;
}

/// HTTP chat-completion client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl ChatClient {
    /// Builds a client with the configured request timeout.
    pub fn new(config: LlmConfig) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        sampling: Sampling,
    ) -> Result<String, AssistantError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "stream": false,
        });
        if let Some(top_p) = sampling.top_p {
            payload["top_p"] = Value::from(top_p);
        }

        let mut request = self.http.post(&url).json(&payload);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AssistantError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AssistantError::MalformedReply(
                    "missing choices[0].message.content".to_string(),
                )
            })?
            .trim();

        if content.is_empty() {
            return Err(AssistantError::MalformedReply(
                "empty completion".to_string(),
            ));
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let system = format!(
            "你是一个专业的文本生成助手。根据用户的要求生成高质量的文本内容。\n\n\
             要求：{prompt}\n\n\
             请生成相应的文本内容，确保内容准确、有逻辑、语言流畅。"
        );
        let messages = [
            ChatMessage::new(Role::System, system),
            ChatMessage::new(Role::User, prompt),
        ];
        Ok(self.chat(&messages, GENERATE_SAMPLING).await?)
    }

    async fn summarize(&self, text: &str) -> anyhow::Result<String> {
        let prompt = format!("请总结以下文本的主要内容：\n\n{text}");
        let messages = [ChatMessage::new(Role::User, prompt)];
        Ok(self.chat(&messages, SUMMARIZE_SAMPLING).await?)
    }

    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        let prompt = format!("请将以下文本翻译成{target_language}：\n\n{text}");
        let messages = [ChatMessage::new(Role::User, prompt)];
        Ok(self.chat(&messages, TRANSLATE_SAMPLING).await?)
    }
}
