//! Embedding client for remote providers

use crate::embed::{EmbedConfig, EmbedError, EmbedProvider, EmbedResult, Embedder};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client for provider APIs that generate embeddings
pub struct EmbeddingClient {
    client: Client,
    provider: EmbedProvider,
    model: String,
    api_key: Option<String>,
    api_base_url: String,
}

impl EmbeddingClient {
    /// Create a new embedding client based on configuration
    pub fn new(config: &EmbedConfig) -> EmbedResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::ConfigError(e.to_string()))?;

        let api_base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| Self::default_base_url(config.provider).to_string());

        if config.provider != EmbedProvider::Ollama && config.api_key.is_none() {
            return Err(EmbedError::ConfigError(format!(
                "{:?} requires an API key",
                config.provider
            )));
        }

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn default_base_url(provider: EmbedProvider) -> &'static str {
        match provider {
            EmbedProvider::OpenAI => "https://api.openai.com/v1",
            EmbedProvider::Ollama => "http://localhost:11434",
            EmbedProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    fn api_key(&self) -> EmbedResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| EmbedError::ConfigError(format!("{:?} requires an API key", self.provider)))
    }

    async fn openai_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a [String],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<OpenAIData>,
        }

        #[derive(Deserialize)]
        struct OpenAIData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&OpenAIRequest {
                input: texts,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("OpenAI returned error: {}", error_text)));
        }

        let result: OpenAIResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn ollama_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.api_base_url);
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let resp = self
                .client
                .post(&url)
                .json(&OllamaRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await
                .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

            if !resp.status().is_success() {
                let error_text = resp.text().await.unwrap_or_default();
                return Err(EmbedError::ApiError(format!("Ollama returned error: {}", error_text)));
            }

            let result: OllamaResponse = resp
                .json()
                .await
                .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
            results.push(result.embedding);
        }

        Ok(results)
    }

    async fn gemini_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct GeminiBatchRequest<'a> {
            requests: Vec<GeminiRequest<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiRequest<'a> {
            model: String,
            content: GeminiContent<'a>,
        }

        #[derive(Serialize)]
        struct GeminiContent<'a> {
            parts: Vec<GeminiPart<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiPart<'a> {
            text: &'a str,
        }

        #[derive(Deserialize)]
        struct GeminiBatchResponse {
            embeddings: Vec<GeminiEmbedding>,
        }

        #[derive(Deserialize)]
        struct GeminiEmbedding {
            values: Vec<f32>,
        }

        let url = format!("{}/models/{}:batchEmbedContents", self.api_base_url, self.model);
        let requests = texts
            .iter()
            .map(|t| GeminiRequest {
                model: format!("models/{}", self.model),
                content: GeminiContent {
                    parts: vec![GeminiPart { text: t }],
                },
            })
            .collect();

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .json(&GeminiBatchRequest { requests })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("Gemini returned error: {}", error_text)));
        }

        let result: GeminiBatchResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        debug!("Embedding {} texts via {:?}", texts.len(), self.provider);
        let embeddings = match self.provider {
            EmbedProvider::OpenAI => self.openai_embeddings(texts).await?,
            EmbedProvider::Ollama => self.ollama_embeddings(texts).await?,
            EmbedProvider::Gemini => self.gemini_embeddings(texts).await?,
        };

        if embeddings.len() != texts.len() {
            return Err(EmbedError::ApiError(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}
