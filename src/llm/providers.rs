use super::{ChatMessage, LLMConfig, LLMProvider, LLMResponse, LLM};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

/// Gemini `generateContent` provider
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(anyhow!("Gemini API key required"));
        }
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .unwrap_or(GEMINI_BASE_URL)
            .trim_end_matches('/')
    }

    fn build_request(&self, messages: Vec<ChatMessage>) -> GeminiRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            if message.role == "system" {
                system.push(GeminiPart { text: message.content });
            } else {
                let role = if message.role == "assistant" { "model" } else { "user" };
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart { text: message.content }],
                });
            }
        }

        GeminiRequest {
            system_instruction: (!system.is_empty()).then(|| GeminiContent { role: None, parts: system }),
            contents,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let request = self.build_request(messages);
        let url = format!("{}/models/{}:generateContent", self.base_url(), self.config.model);

        debug!("Sending request to Gemini model {}", self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let content = gemini_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("Empty response from Gemini"))?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = &self.config.api_key else {
            return false;
        };
        let url = format!("{}/models/{}", self.base_url(), self.config.model);
        match self.client.get(&url).header("x-goog-api-key", api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}

/// Provider for OpenAI-style chat completion endpoints. The API key is
/// optional so local servers work without one.
pub struct OpenAICompatibleProvider {
    config: LLMConfig,
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

impl OpenAICompatibleProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| anyhow!("OpenAI-compatible provider needs an endpoint"))?;
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LLM for OpenAICompatibleProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat completion to {}", self.endpoint);

        let response = self
            .authorize(self.client.post(&self.endpoint))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat completion error {}: {}", status, text));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("No choices in chat completion response"))?;

        Ok(LLMResponse {
            content,
            tokens_used: completion.usage.map(|u| u.total_tokens),
        })
    }

    async fn is_available(&self) -> bool {
        let models = self.endpoint.replace("/chat/completions", "/models");
        match self.authorize(self.client.get(&models)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAICompatible
    }
}
