//! LLM-backed hotfix generation.
//!
//! Supports OpenAI and Anthropic APIs, selected via environment variables.
//! Every request is the same two-message exchange: a fixed debugging
//! system prompt and a user message carrying the error log and affected
//! code, answered with a JSON [`HotfixPlan`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HealError, HealResult};
use crate::hotfix::{HotfixGenerator, HotfixPlan, HotfixRequest};

/// Environment variable that overrides the provider's default model.
pub const MODEL_ENV: &str = "FORGE_LLM_MODEL";

const MAX_RETRIES: u32 = 3;
const MAX_COMPLETION_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = r#"You are an expert debugging engineer.
Analyze the error and generate a minimal fix.

Output a JSON object with this structure:
{
  "diagnosis": "Brief explanation of the issue",
  "fixes": [
    {
      "path": "path/to/file.ts",
      "patches": [
        { "oldText": "exact text with the error", "newText": "fixed text" }
      ]
    }
  ]
}

IMPORTANT:
- Make minimal changes
- Fix only the reported errors
- Preserve existing functionality
- Respond with valid JSON only. No markdown, no comments, just pure JSON."#;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

/// Hotfix generator that calls a hosted model.
pub struct LlmHotfixGenerator {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl LlmHotfixGenerator {
    /// Create a generator with explicit configuration.
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        let default_model = match provider {
            LlmProvider::OpenAI => "gpt-5-mini".to_string(),
            LlmProvider::Anthropic => "claude-sonnet-4.5".to_string(),
        };

        Self {
            provider,
            api_key,
            model: model.unwrap_or(default_model),
            client: reqwest::Client::new(),
        }
    }

    /// Create a generator from environment variables.
    ///
    /// Checks in order:
    /// 1. OPENAI_API_KEY
    /// 2. ANTHROPIC_API_KEY
    pub fn from_env() -> HealResult<Self> {
        let custom_model = std::env::var(MODEL_ENV).ok();

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::OpenAI, api_key, custom_model));
            }
        }

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::Anthropic, api_key, custom_model));
            }
        }

        Err(HealError::GeneratorNotConfigured)
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> HealResult<String> {
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
        }
    }

    // OpenAI chat completion
    async fn complete_openai(&self, system: &str, user: &str) -> HealResult<String> {
        let url = "https://api.openai.com/v1/chat/completions";

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_completion_tokens: Some(MAX_COMPLETION_TOKENS),
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_secs(1 << attempt);
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(HealError::Generator(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            // Retry on server errors (5xx) and rate limits (429)
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(HealError::Generator(format!(
                    "OpenAI API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(HealError::Generator(format!(
                    "OpenAI API error {}: {}",
                    status, body
                )));
            }

            let result: OpenAIResponse = response
                .json()
                .await
                .map_err(|e| HealError::Generator(format!("Failed to parse response: {}", e)))?;

            return result
                .choices
                .first()
                .map(|c| c.message.content.clone())
                .ok_or_else(|| HealError::Generator("No response from OpenAI".to_string()));
        }

        Err(last_error.unwrap_or_else(|| HealError::Generator("Max retries exceeded".to_string())))
    }

    // Anthropic chat completion
    async fn complete_anthropic(&self, system: &str, user: &str) -> HealResult<String> {
        let url = "https://api.anthropic.com/v1/messages";

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_COMPLETION_TOKENS,
            system: Some(system.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_secs(1 << attempt);
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(HealError::Generator(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            // Retry on server errors (5xx) and rate limits (429)
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(HealError::Generator(format!(
                    "Anthropic API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(HealError::Generator(format!(
                    "Anthropic API error {}: {}",
                    status, body
                )));
            }

            let result: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| HealError::Generator(format!("Failed to parse response: {}", e)))?;

            return result
                .content
                .first()
                .map(|c| c.text.clone())
                .ok_or_else(|| HealError::Generator("No response from Anthropic".to_string()));
        }

        Err(last_error.unwrap_or_else(|| HealError::Generator("Max retries exceeded".to_string())))
    }
}

/// Render the user message for a hotfix request.
fn user_prompt(request: &HotfixRequest) -> String {
    format!(
        "Error Log:\n{}\n\nAffected Code:\n{}\n\nGenerate a minimal fix plan for these errors.",
        request.error_context, request.affected_code
    )
}

#[async_trait]
impl HotfixGenerator for LlmHotfixGenerator {
    async fn generate(&self, request: &HotfixRequest) -> HealResult<HotfixPlan> {
        let response = self.complete(SYSTEM_PROMPT, &user_prompt(request)).await?;
        debug!("Hotfix response: {} characters", response.len());
        HotfixPlan::from_json(&response)
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}
