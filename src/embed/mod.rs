//! Query and case embeddings
//!
//! [`Embedder`] is the seam between the retrieval core and whatever produces
//! vectors: a remote provider through [`client::EmbeddingClient`], or the
//! deterministic [`HashingEmbedder`] for offline runs and tests.

pub mod client;

use async_trait::async_trait;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Embed errors
#[derive(Error, Debug)]
pub enum EmbedError {
    /// API error from the provider
    #[error("Embedding API error: {0}")]
    ApiError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// Embedding provider options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProvider {
    OpenAI,
    Ollama,
    Gemini,
}

/// Remote embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedConfig {
    pub provider: EmbedProvider,
    /// Model name (e.g., "text-embedding-3-small", "nomic-embed-text")
    pub model: String,
    /// API key; may be supplied through `LEXGRAPH_EMBED_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbedError::ApiError("provider returned no embedding".to_string()))
    }
}

/// Deterministic, fast embedding for offline/local use.
///
/// Hashes character trigrams (Thai is written without spaces between words)
/// into a fixed number of buckets and L2-normalises the counts.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        let chars: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let grams: Vec<&[char]> = if chars.len() < 3 {
            vec![&chars[..]]
        } else {
            chars.windows(3).collect()
        };
        for gram in grams.into_iter().filter(|g| !g.is_empty()) {
            let mut hasher = FxHasher::default();
            gram.hash(&mut hasher);
            vec[(hasher.finish() as usize) % self.dim] += 1.0;
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity of two vectors, 0 when either is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("ลักทรัพย์ในเคหสถาน");
        let b = embedder.embed_text("ลักทรัพย์ในเคหสถาน");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_text_scores_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_text("ลักทรัพย์ในเวลากลางคืน");
        let near = embedder.embed_text("จำเลยลักทรัพย์ในเวลากลางคืน");
        let far = embedder.embed_text("สัญญาจำนองที่ดิน");

        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_short_and_empty_text() {
        let embedder = HashingEmbedder::new(4);
        assert_eq!(embedder.dimension(), 8);
        assert!(embedder.embed_text("").iter().all(|v| *v == 0.0));
        assert!(embedder.embed_text("ab").iter().any(|v| *v > 0.0));
    }

    #[tokio::test]
    async fn test_trait_embed_single() {
        let embedder = HashingEmbedder::new(16);
        let vector = embedder.embed("คดีอาญา").await.unwrap();
        assert_eq!(vector, embedder.embed_text("คดีอาญา"));
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
