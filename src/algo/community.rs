//! Community detection over the knowledge graph
//!
//! Runs Louvain from `lexgraph-algorithms` on the full weighted graph, folds
//! undersized communities into their strongest neighbour, and labels the
//! result with node keys.

use super::build_view;
use crate::graph::{KnowledgeGraph, NodeId, NodeKey};
use lexgraph_algorithms::{louvain, merge_small_communities, modularity, LouvainConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommunityError {
    #[error("Invalid resolution {0}: must be finite and greater than zero")]
    InvalidResolution(f64),

    #[error("Community map covers {assigned} nodes but the graph has {nodes}")]
    SizeMismatch { assigned: usize, nodes: usize },
}

pub type CommunityResult<T> = Result<T, CommunityError>;

/// One cluster of related entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: usize,
    /// Member keys in ascending order
    pub members: Vec<NodeKey>,
}

impl Community {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn case_members(&self) -> impl Iterator<Item = &NodeKey> + '_ {
        self.members.iter().filter(|k| k.is_case())
    }
}

/// Partition of a graph into communities, computed under one resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMap {
    pub resolution: f64,
    pub min_size: usize,
    pub modularity: f64,
    /// Aggregation levels Louvain went through
    pub levels: usize,
    communities: Vec<Community>,
    /// Community id by node id
    by_node: Vec<usize>,
}

impl CommunityMap {
    /// Map of a graph with no nodes
    pub fn empty(resolution: f64, min_size: usize) -> Self {
        Self {
            resolution,
            min_size,
            modularity: 0.0,
            levels: 0,
            communities: Vec::new(),
            by_node: Vec::new(),
        }
    }

    /// Community id of a node
    pub fn community_of(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(node.as_u64() as usize).copied()
    }

    pub fn community(&self, id: usize) -> Option<&Community> {
        self.communities.get(id)
    }

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Size of the community containing `node`, 0 when unknown
    pub fn size_of(&self, node: NodeId) -> usize {
        self.community_of(node)
            .and_then(|c| self.community(c))
            .map_or(0, Community::size)
    }

    pub fn average_size(&self) -> f64 {
        if self.communities.is_empty() {
            0.0
        } else {
            self.by_node.len() as f64 / self.communities.len() as f64
        }
    }

    /// Node key -> community id for every node
    pub fn assignments(&self) -> BTreeMap<&NodeKey, usize> {
        self.communities
            .iter()
            .flat_map(|c| c.members.iter().map(move |k| (k, c.id)))
            .collect()
    }

    /// Check the map was computed for `graph`
    pub fn check_against(&self, graph: &KnowledgeGraph) -> CommunityResult<()> {
        if self.by_node.len() != graph.node_count() {
            return Err(CommunityError::SizeMismatch {
                assigned: self.by_node.len(),
                nodes: graph.node_count(),
            });
        }
        Ok(())
    }
}

/// Partition `graph` into communities.
///
/// Communities are numbered by their smallest member key. Those with fewer
/// than `min_size` members are merged into the neighbouring community they
/// share the most edge weight with; isolated ones stay singletons.
pub fn detect_communities(
    graph: &KnowledgeGraph,
    resolution: f64,
    min_size: usize,
    max_passes: usize,
) -> CommunityResult<CommunityMap> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(CommunityError::InvalidResolution(resolution));
    }

    let view = build_view(graph, None);
    let config = LouvainConfig {
        resolution,
        max_passes,
    };
    let result = louvain(&view, &config);
    let assignment = merge_small_communities(&view, &result.assignment, min_size);
    let modularity = modularity(&view, &assignment, resolution);

    let count = assignment.iter().max().map_or(0, |&max| max + 1);
    let mut communities: Vec<Community> = (0..count)
        .map(|id| Community {
            id,
            members: Vec::new(),
        })
        .collect();
    // View indices follow node ids, which follow key order, so members stay sorted.
    for (idx, &community) in assignment.iter().enumerate() {
        if let Some(key) = graph.key_of(NodeId::new(view.index_to_node[idx])) {
            communities[community].members.push(key.clone());
        }
    }

    info!(
        "Detected {} communities over {} nodes ({} levels, modularity {:.4})",
        communities.len(),
        graph.node_count(),
        result.levels,
        modularity
    );

    Ok(CommunityMap {
        resolution,
        min_size,
        modularity,
        levels: result.levels,
        communities,
        by_node: assignment,
    })
}
