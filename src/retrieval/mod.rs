//! Graph-enhanced retrieval
//!
//! Starting from vector-search seeds, a bounded breadth-first traversal
//! scores nearby cases, community co-membership adds a fixed bonus, and the
//! three signals are fused into one ranking:
//!
//! `final = alpha * vector_score + beta * graph_score + gamma * community_bonus`
//!
//! Query-time trouble never becomes an error: an exhausted budget sets
//! `partial`, a missing vector index sets `degraded`.

pub mod explain;
pub mod recommend;
pub mod retriever;
pub mod traversal;

pub use explain::{explain_case, CommunitySummary, ExplainedEdge, ExplainedPath, Explanation};
pub use recommend::recommend;
pub use retriever::{retrieve, retrieve_from_entities};
pub use traversal::{traverse_from, Traversal, TraversalLimits};

use crate::config::{RetrievalConfig, FUSION_WEIGHT_SUM};
use crate::graph::EdgeKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weights of the three ranking signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta: 0.3,
            gamma: 0.1,
        }
    }
}

impl FusionWeights {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Whether the weights add up to [`FUSION_WEIGHT_SUM`]
    pub fn is_normalized(&self) -> bool {
        ((self.alpha + self.beta + self.gamma) - FUSION_WEIGHT_SUM).abs() <= 1e-6
    }

    pub fn fuse(&self, breakdown: &ScoreBreakdown) -> f64 {
        self.alpha * breakdown.vector_score
            + self.beta * breakdown.graph_score
            + self.gamma * breakdown.community_bonus
    }
}

/// Parameters of one retrieval call
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    pub k: usize,
    pub depth: usize,
    pub weights: FusionWeights,
    /// Bonus for sharing a community with a seed
    pub community_bonus: f64,
    /// Node expansions allowed per seed traversal
    pub max_visited: usize,
    pub time_budget: Option<Duration>,
    pub edge_kinds: Vec<EdgeKind>,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default(), 5)
    }
}

impl RetrievalParams {
    pub fn from_config(config: &RetrievalConfig, k: usize) -> Self {
        Self {
            k,
            depth: config.depth,
            weights: FusionWeights::new(config.alpha, config.beta, config.gamma),
            community_bonus: config.community_bonus,
            max_visited: config.max_visited,
            time_budget: config.time_budget_ms.map(Duration::from_millis),
            edge_kinds: config.edge_kinds.clone(),
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// A vector-search hit used as a traversal seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedHit {
    pub case_id: String,
    pub score: f64,
}

impl SeedHit {
    pub fn new(case_id: impl Into<String>, score: f64) -> Self {
        Self {
            case_id: case_id.into(),
            score,
        }
    }
}

impl From<(String, f64)> for SeedHit {
    fn from((case_id, score): (String, f64)) -> Self {
        Self { case_id, score }
    }
}

/// How a candidate's final score was put together
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub vector_score: f64,
    pub graph_score: f64,
    pub community_bonus: f64,
}

/// One ranked case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCase {
    pub case_id: String,
    pub final_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Result of a retrieval call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub hits: Vec<RankedCase>,
    /// A traversal ran out of time or node budget; scores may be incomplete
    pub partial: bool,
    /// No vector scores were available; ranking is graph-only
    pub degraded: bool,
    /// Nodes expanded across all seed traversals
    pub visited: usize,
}

impl RetrievalOutcome {
    pub fn case_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.case_id.as_str()).collect()
    }

    pub fn get(&self, case_id: &str) -> Option<&RankedCase> {
        self.hits.iter().find(|h| h.case_id == case_id)
    }
}

/// Order by score descending, then case id ascending
pub(crate) fn rank(hits: &mut [RankedCase]) {
    hits.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| a.case_id.cmp(&b.case_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion() {
        let weights = FusionWeights::default();
        assert!(weights.is_normalized());

        let breakdown = ScoreBreakdown {
            vector_score: 1.0,
            graph_score: 0.5,
            community_bonus: 0.3,
        };
        assert!((weights.fuse(&breakdown) - (0.6 + 0.15 + 0.03)).abs() < 1e-12);
        assert!(!FusionWeights::new(0.6, 0.6, 0.1).is_normalized());
    }

    #[test]
    fn test_params_from_config() {
        let mut config = RetrievalConfig::default();
        config.time_budget_ms = Some(250);
        let params = RetrievalParams::from_config(&config, 7);

        assert_eq!(params.k, 7);
        assert_eq!(params.depth, 3);
        assert_eq!(params.time_budget, Some(Duration::from_millis(250)));
        assert_eq!(params.weights, FusionWeights::default());
        assert_eq!(params.community_bonus, 0.3);
    }

    #[test]
    fn test_rank_breaks_ties_by_case_id() {
        let hit = |id: &str, score: f64| RankedCase {
            case_id: id.to_string(),
            final_score: score,
            breakdown: ScoreBreakdown::default(),
        };
        let mut hits = vec![hit("b", 0.5), hit("c", 0.9), hit("a", 0.5)];
        rank(&mut hits);
        let ids: Vec<_> = hits.iter().map(|h| h.case_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
