//! Edge implementation for the legal knowledge graph
//!
//! Edges are typed and weighted. The graph is a multigraph: several kinds may
//! connect the same pair of nodes.

use super::types::{EdgeId, EdgeKind, NodeId};
use serde::{Deserialize, Serialize};

/// A typed, weighted edge
///
/// Direction is kept for semantics (a judge *handles* a case type); traversal
/// for retrieval reads edges in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    pub kind: EdgeKind,

    /// `similar_to` edges carry the similarity that created them
    pub weight: f64,
}

impl Edge {
    /// Create an edge with the fixed weight of its kind
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        Self::with_weight(id, source, target, kind, kind.default_weight())
    }

    pub fn with_weight(id: EdgeId, source: NodeId, target: NodeId, kind: EdgeKind, weight: f64) -> Self {
        Edge {
            id,
            source,
            target,
            kind,
            weight,
        }
    }

    /// Check if this edge connects two specific nodes (in either direction)
    pub fn connects(&self, node1: NodeId, node2: NodeId) -> bool {
        (self.source == node1 && self.target == node2)
            || (self.source == node2 && self.target == node1)
    }

    /// The endpoint opposite `node`, if `node` is an endpoint
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// Check if this is a self-loop
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
