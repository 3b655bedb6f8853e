use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

pub const OPENAI_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Generative capability. Failures are recovered by the caller through the
/// extraction fallback, never surfaced to the user.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ProviderError>;
}

/// Hosted generator speaking the OpenAI chat completions API.
pub struct OpenAiGenerator {
    endpoint: Url,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiGenerator {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        })
    }

    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(OPENAI_CHAT_ENDPOINT, api_key, DEFAULT_CHAT_MODEL)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": user_prompt },
                ],
                "temperature": 0.7,
                "max_tokens": 500,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BadResponse {
                provider: "openai".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::BadResponse {
                provider: "openai".to_string(),
                details: "response carried no completion".to_string(),
            })
    }
}
