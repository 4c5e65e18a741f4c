//! LexGraph
//!
//! Graph-enhanced retrieval core for legal case research. Case records are
//! turned into a knowledge graph of cases, judges, legal concepts, case types
//! and articles; Louvain communities partition that graph; and retrieval fuses
//! vector similarity with graph proximity and community co-membership into a
//! single ranking.
//!
//! # Pipeline
//!
//! - [`graph::KnowledgeGraphBuilder`] builds a [`graph::KnowledgeGraph`] from
//!   [`record::CaseRecord`]s.
//! - [`algo::detect_communities`] computes a [`algo::CommunityMap`].
//! - Both are bundled into an immutable [`snapshot::GraphSnapshot`], which
//!   [`service::GraphService`] swaps in atomically on rebuild.
//! - [`retrieval::retrieve`] scores cases around vector-search seeds, and
//!   [`search::SearchOrchestrator`] dispatches queries across exact-match,
//!   similarity and graph strategies.
//!
//! ## Example Usage
//!
//! ```rust
//! use lexgraph::{CaseRecord, GraphSnapshot, LexGraphConfig, RetrievalParams, SeedHit};
//!
//! let cases = vec![
//!     CaseRecord::new("1/2565", "ลักทรัพย์").with_judge("นายสมชาย").with_case_type("อาญา"),
//!     CaseRecord::new("2/2565", "ฉ้อโกง").with_judge("สมชาย").with_case_type("อาญา"),
//! ];
//! let snapshot = GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap();
//!
//! let outcome = lexgraph::retrieve(&snapshot, &[SeedHit::new("1/2565", 0.9)], &RetrievalParams::default());
//! assert_eq!(outcome.hits[0].case_id, "1/2565");
//! assert!(outcome.get("2/2565").unwrap().breakdown.graph_score > 0.0);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod embed;
pub mod graph;
pub mod legal;
pub mod persistence;
pub mod record;
pub mod retrieval;
pub mod search;
pub mod service;
pub mod snapshot;
pub mod vector;

// Re-export main types for convenience
pub use graph::{
    BuildReport, Edge, EdgeId, EdgeKind, GraphError, GraphResult, KnowledgeGraph, KnowledgeGraphBuilder, Node,
    NodeId, NodeKey, NodeKind,
};

pub use algo::{detect_communities, Community, CommunityError, CommunityMap};

pub use config::{ConfigError, LexGraphConfig, FUSION_WEIGHT_SUM};

pub use record::{load_cases_from_path, CaseRecord, IngestionError, SimilarCase};

pub use snapshot::{content_hash, GraphSnapshot, GraphStats, SnapshotError};

pub use retrieval::{
    explain_case, recommend, retrieve, retrieve_from_entities, Explanation, FusionWeights, RankedCase,
    RetrievalOutcome, RetrievalParams, ScoreBreakdown, SeedHit,
};

pub use search::{
    HitSource, QueryIntent, SearchHit, SearchMode, SearchOrchestrator, SearchRequest, SearchResponse,
};

pub use persistence::{PersistenceError, PersistenceResult, SnapshotStore};

pub use service::{GraphService, RebuildOutcome, ServiceError, ServiceResult};

pub use embed::{EmbedConfig, EmbedError, Embedder, HashingEmbedder};

pub use vector::{CaseVectorIndex, NoVectorIndex, VectorError, VectorSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
