pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported completion backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    Gemini,
    /// Any `/v1/chat/completions` endpoint (OpenAI, LM Studio, vLLM)
    OpenAICompatible,
}

impl LLMProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" => Some(LLMProvider::Gemini),
            "openai" | "openai-compatible" | "lmstudio" | "lm-studio" => Some(LLMProvider::OpenAICompatible),
            _ => None,
        }
    }
}

impl fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAICompatible => write!(f, "openai-compatible"),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    /// Chat endpoint; required for OpenAI-compatible servers
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            endpoint: None,
            api_key: None,
            model: "gemini-2.0-flash-lite".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            timeout_seconds: 30,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
        LLMProvider::OpenAICompatible => Ok(Box::new(providers::OpenAICompatibleProvider::new(config.clone())?)),
    }
}

/// Remove a surrounding markdown code fence from a model answer
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
