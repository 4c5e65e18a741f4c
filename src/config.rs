//! Configuration
//!
//! Every field has a default. A YAML file may override any subset, and a few
//! `LEXGRAPH_*` environment variables override the file.

use crate::embed::EmbedConfig;
use crate::graph::EdgeKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Sum that `alpha + beta + gamma` must equal, so fused scores stay comparable
/// across configurations.
pub const FUSION_WEIGHT_SUM: f64 = 1.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Knowledge graph construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Precomputed similar-case pairs below this score get no edge
    pub similarity_threshold: f64,
    /// Tag cases with lexicon concepts found in the summary when a record lists none
    pub derive_concepts_from_summary: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            derive_concepts_from_summary: true,
        }
    }
}

/// Community detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    pub resolution: f64,
    pub min_size: usize,
    /// Local-moving passes per Louvain level
    pub max_passes: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            min_size: 3,
            max_passes: 100,
        }
    }
}

/// Graph retrieval and score fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub depth: usize,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub community_bonus: f64,
    /// Node expansions allowed per seed traversal before the result is flagged partial
    pub max_visited: usize,
    pub time_budget_ms: Option<u64>,
    pub edge_kinds: Vec<EdgeKind>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            alpha: 0.6,
            beta: 0.3,
            gamma: 0.1,
            community_bonus: 0.3,
            max_visited: 10_000,
            time_budget_ms: None,
            edge_kinds: EdgeKind::ALL.to_vec(),
        }
    }
}

/// Search orchestration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
    /// Seeds requested from the vector index
    pub vector_top_k: usize,
    /// Query embeddings kept in the LRU cache
    pub embedding_cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            vector_top_k: 10,
            embedding_cache_size: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshots are persisted only when set
    pub data_dir: Option<PathBuf>,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexGraphConfig {
    pub graph: GraphConfig,
    pub community: CommunityConfig,
    pub retrieval: RetrievalConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub embed: Option<EmbedConfig>,
}

impl LexGraphConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load the file when given, apply environment overrides, then validate.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `LEXGRAPH_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_from(&lookup, "LEXGRAPH_SIMILARITY_THRESHOLD", &mut self.graph.similarity_threshold);
        override_from(&lookup, "LEXGRAPH_COMMUNITY_RESOLUTION", &mut self.community.resolution);
        override_from(&lookup, "LEXGRAPH_MIN_COMMUNITY_SIZE", &mut self.community.min_size);
        override_from(&lookup, "LEXGRAPH_MAX_GRAPH_DEPTH", &mut self.retrieval.depth);

        if let Some(dir) = lookup("LEXGRAPH_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            self.storage.data_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(key) = lookup("LEXGRAPH_EMBED_API_KEY") {
            match self.embed.as_mut() {
                Some(embed) => embed.api_key = Some(key),
                None => warn!("LEXGRAPH_EMBED_API_KEY set but no embedding provider is configured"),
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let threshold = self.graph.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        if !self.community.resolution.is_finite() || self.community.resolution <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "community resolution must be > 0, got {}",
                self.community.resolution
            )));
        }

        let r = &self.retrieval;
        if r.depth == 0 {
            return Err(ConfigError::Invalid("retrieval depth must be at least 1".to_string()));
        }
        for (name, weight) in [("alpha", r.alpha), ("beta", r.beta), ("gamma", r.gamma), ("community_bonus", r.community_bonus)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be a non-negative number, got {}", name, weight)));
            }
        }
        let sum = r.alpha + r.beta + r.gamma;
        if (sum - FUSION_WEIGHT_SUM).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "alpha + beta + gamma must equal {}, got {}",
                FUSION_WEIGHT_SUM, sum
            )));
        }

        if self.search.default_k == 0 {
            return Err(ConfigError::Invalid("default_k must be at least 1".to_string()));
        }

        Ok(())
    }
}

fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T) {
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!("Ignoring invalid value for {}: {:?}", name, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::EmbedProvider;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = LexGraphConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.depth, 3);
        assert_eq!(config.retrieval.edge_kinds.len(), 5);
        assert_eq!(config.community.min_size, 3);
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
graph:
  similarity_threshold: 0.5
retrieval:
  depth: 2
  edge_kinds: [contains, similar_to]
embed:
  provider: ollama
  model: nomic-embed-text
"#;
        let config = LexGraphConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.graph.similarity_threshold, 0.5);
        assert!(config.graph.derive_concepts_from_summary);
        assert_eq!(config.retrieval.depth, 2);
        assert_eq!(config.retrieval.alpha, 0.6);
        assert_eq!(config.retrieval.edge_kinds, vec![EdgeKind::Contains, EdgeKind::SimilarTo]);
        assert_eq!(config.embed.unwrap().provider, EmbedProvider::Ollama);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEXGRAPH_SIMILARITY_THRESHOLD", "0.45"),
            ("LEXGRAPH_MAX_GRAPH_DEPTH", "2"),
            ("LEXGRAPH_MIN_COMMUNITY_SIZE", "not-a-number"),
            ("LEXGRAPH_DATA_DIR", "/tmp/lexgraph"),
        ]
        .into_iter()
        .collect();

        let mut config = LexGraphConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.graph.similarity_threshold, 0.45);
        assert_eq!(config.retrieval.depth, 2);
        assert_eq!(config.community.min_size, 3);
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/lexgraph")));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = LexGraphConfig::default();
        config.retrieval.beta = 0.5;
        assert!(config.validate().is_err());

        let mut config = LexGraphConfig::default();
        config.retrieval.depth = 0;
        assert!(config.validate().is_err());

        let mut config = LexGraphConfig::default();
        config.community.resolution = 0.0;
        assert!(config.validate().is_err());

        let mut config = LexGraphConfig::default();
        config.graph.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = LexGraphConfig::default();
        config.retrieval.alpha = 0.7;
        config.retrieval.beta = 0.3;
        config.retrieval.gamma = 0.0;
        assert!(config.validate().is_ok());
    }
}
