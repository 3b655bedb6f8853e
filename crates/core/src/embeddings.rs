use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const OPENAI_EMBEDDINGS_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Capability that maps text to a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Hosted embedder speaking the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    endpoint: Url,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiEmbedder {
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
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BadResponse {
                provider: "openai".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let vector: Vec<f32> = parsed
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_f64)
                    .map(|value| value as f32)
                    .collect()
            })
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(ProviderError::BadResponse {
                provider: "openai".to_string(),
                details: "response carried no embedding".to_string(),
            });
        }

        Ok(vector)
    }
}

/// Local fallback embedder: hashed character trigrams, L2-normalized.
/// Deterministic and dependency-free, so it is always available.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashEmbedder {
    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token: String = window.iter().collect();
            let bucket = (fnv1a(&token) % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(1469598103934665603u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(1099511628211)
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "local-hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.encode(text))
    }
}

/// Ranked chain of embedders tried in order. The first success wins; each
/// failure is logged as a recoverable event before moving to the next
/// implementation.
pub struct EmbeddingProvider {
    chain: Vec<Box<dyn Embedder>>,
}

impl EmbeddingProvider {
    pub fn new(chain: Vec<Box<dyn Embedder>>) -> Self {
        Self { chain }
    }

    /// Standard selection policy: hosted embedder when an API key is
    /// configured, local hash embedder as the fallback.
    pub fn from_api_key(api_key: Option<String>) -> Self {
        let mut chain: Vec<Box<dyn Embedder>> = Vec::new();

        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            match OpenAiEmbedder::new(OPENAI_EMBEDDINGS_ENDPOINT, key, DEFAULT_EMBEDDING_MODEL) {
                Ok(embedder) => chain.push(Box::new(embedder)),
                Err(error) => warn!(%error, "hosted embedder unavailable, skipping"),
            }
        }
        chain.push(Box::new(HashEmbedder::default()));

        Self { chain }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.chain.is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        let mut last_error: Option<ProviderError> = None;
        for embedder in &self.chain {
            match embedder.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(error) => {
                    warn!(
                        provider = embedder.name(),
                        %error,
                        "embedding provider failed, trying next"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(match last_error {
            Some(error) => ProviderError::Exhausted(error.to_string()),
            None => ProviderError::NotConfigured,
        })
    }
}
