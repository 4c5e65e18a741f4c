//! Immutable graph snapshots
//!
//! A snapshot is a fully built knowledge graph plus the community map
//! computed for it, keyed by a content hash of the inputs. Snapshots are
//! never mutated; a rebuild produces a new one.

use crate::algo::{detect_communities, CommunityError, CommunityMap};
use crate::config::LexGraphConfig;
use crate::graph::{BuildReport, EdgeKind, GraphError, KnowledgeGraph, KnowledgeGraphBuilder, NodeId, NodeKey, NodeKind};
use crate::record::CaseRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that abort building a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Graph consistency error: {0}")]
    Graph(#[from] GraphError),

    #[error("Community detection error: {0}")]
    Community(#[from] CommunityError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Graph statistics exposed to collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    pub avg_community_size: f64,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    pub average_degree: f64,
    /// Edges over possible undirected pairs
    pub density: f64,
    pub modularity: f64,
    pub content_hash: String,
}

/// A built graph and its communities, ready to serve reads
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    graph: KnowledgeGraph,
    communities: CommunityMap,
    content_hash: String,
    built_at: i64,
    report: BuildReport,
}

impl GraphSnapshot {
    /// Build the graph and detect communities for `cases`.
    pub fn build(cases: &[CaseRecord], config: &LexGraphConfig) -> SnapshotResult<Self> {
        let hash = content_hash(cases, config);
        let (graph, report) = KnowledgeGraphBuilder::new(config.graph.clone()).build(cases)?;
        let communities = detect_communities(
            &graph,
            config.community.resolution,
            config.community.min_size,
            config.community.max_passes,
        )?;

        Self::from_parts(graph, communities, hash, chrono::Utc::now().timestamp_millis(), report)
    }

    /// Assemble a snapshot, checking the community map covers the graph.
    pub fn from_parts(
        graph: KnowledgeGraph,
        communities: CommunityMap,
        content_hash: String,
        built_at: i64,
        report: BuildReport,
    ) -> SnapshotResult<Self> {
        communities.check_against(&graph)?;
        Ok(Self {
            graph,
            communities,
            content_hash,
            built_at,
            report,
        })
    }

    /// Snapshot of an empty case set
    pub fn empty(config: &LexGraphConfig) -> Self {
        Self {
            graph: KnowledgeGraph::new(),
            communities: CommunityMap::empty(config.community.resolution, config.community.min_size),
            content_hash: content_hash(&[], config),
            built_at: chrono::Utc::now().timestamp_millis(),
            report: BuildReport::default(),
        }
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn communities(&self) -> &CommunityMap {
        &self.communities
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Build time, Unix milliseconds
    pub fn built_at(&self) -> i64 {
        self.built_at
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Node id of a case
    pub fn case_node(&self, case_id: &str) -> Option<NodeId> {
        self.graph.node_id(&NodeKey::case(case_id))
    }

    pub fn stats(&self) -> GraphStats {
        let node_count = self.graph.node_count();
        let edge_count = self.graph.edge_count();

        let mut nodes_by_kind = BTreeMap::new();
        for node in self.graph.nodes() {
            *nodes_by_kind.entry(node.kind()).or_insert(0) += 1;
        }
        let mut edges_by_kind = BTreeMap::new();
        for edge in self.graph.edges() {
            *edges_by_kind.entry(edge.kind).or_insert(0) += 1;
        }

        let average_degree = if node_count == 0 {
            0.0
        } else {
            2.0 * edge_count as f64 / node_count as f64
        };
        let density = if node_count < 2 {
            0.0
        } else {
            2.0 * edge_count as f64 / (node_count as f64 * (node_count - 1) as f64)
        };

        GraphStats {
            node_count,
            edge_count,
            community_count: self.communities.len(),
            avg_community_size: self.communities.average_size(),
            nodes_by_kind,
            edges_by_kind,
            average_degree,
            density,
            modularity: self.communities.modularity,
            content_hash: self.content_hash.clone(),
        }
    }
}

/// SHA-256 over the case set and every parameter that shapes the build.
///
/// Records are hashed in sorted order, so the hash ignores input order.
pub fn content_hash(cases: &[CaseRecord], config: &LexGraphConfig) -> String {
    let mut records: Vec<String> = cases
        .iter()
        .map(|c| serde_json::to_string(c).unwrap_or_default())
        .collect();
    records.sort_unstable();

    let mut hasher = Sha256::new();
    for record in &records {
        hasher.update((record.len() as u64).to_le_bytes());
        hasher.update(record.as_bytes());
    }
    hasher.update(config.graph.similarity_threshold.to_le_bytes());
    hasher.update([config.graph.derive_concepts_from_summary as u8]);
    hasher.update(config.community.resolution.to_le_bytes());
    hasher.update((config.community.min_size as u64).to_le_bytes());
    hasher.update((config.community.max_passes as u64).to_le_bytes());
    hex::encode(hasher.finalize())
}
