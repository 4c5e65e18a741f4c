//! In-memory knowledge graph storage
//!
//! Nodes and edges live in dense arenas indexed by their ids, with per-node
//! adjacency lists in both directions and a key index for lookups by
//! namespaced identity. A graph is only ever mutated while it is being built;
//! once wrapped in a snapshot it is read-only.

use super::edge::Edge;
use super::node::{CaseAttributes, Node};
use super::types::{EdgeId, EdgeKind, NodeId, NodeKey, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("No node with key {0}")]
    UnknownNodeKey(NodeKey),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Duplicate node key {0}")]
    DuplicateNodeKey(NodeKey),

    #[error("Node table out of order: position {position} holds {id}")]
    NodeIdMismatch { position: usize, id: NodeId },

    #[error("Edge table out of order: position {position} holds {id}")]
    EdgeIdMismatch { position: usize, id: EdgeId },
}

impl GraphError {
    /// Whether the error means an edge references a missing node
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            GraphError::InvalidEdgeSource(_) | GraphError::InvalidEdgeTarget(_)
        )
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Plain node and edge tables, the serialisable form of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphParts {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Typed multigraph of cases and the legal entities they mention
///
/// - nodes: NodeId -> Node (dense arena)
/// - edges: EdgeId -> Edge (dense arena)
/// - outgoing / incoming: NodeId -> Vec<EdgeId>
/// - key_index: NodeKey -> NodeId
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    key_index: HashMap<NodeKey, NodeId>,
}

impl KnowledgeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from its tables, checking every invariant.
    ///
    /// Fails on duplicate keys, non-dense ids, or an edge whose endpoint is
    /// missing.
    pub fn from_parts(parts: GraphParts) -> GraphResult<Self> {
        let mut graph = KnowledgeGraph::new();

        for (position, node) in parts.nodes.into_iter().enumerate() {
            if node.id.index() != position {
                return Err(GraphError::NodeIdMismatch { position, id: node.id });
            }
            if graph.key_index.contains_key(&node.key) {
                return Err(GraphError::DuplicateNodeKey(node.key));
            }
            graph.push_node(node);
        }

        for (position, edge) in parts.edges.into_iter().enumerate() {
            if edge.id.index() != position {
                return Err(GraphError::EdgeIdMismatch { position, id: edge.id });
            }
            graph.push_edge(edge)?;
        }

        Ok(graph)
    }

    /// Copy out the node and edge tables
    pub fn to_parts(&self) -> GraphParts {
        GraphParts {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Find or create the node for `key`.
    ///
    /// Case attributes are only set when the node is created.
    pub fn ensure_node(&mut self, key: NodeKey, case: Option<CaseAttributes>) -> NodeId {
        if let Some(&id) = self.key_index.get(&key) {
            return id;
        }
        let id = NodeId::new(self.nodes.len() as u64);
        let node = match case {
            Some(attrs) => Node::new_case(id, key, attrs),
            None => Node::new(id, key),
        };
        self.push_node(node);
        id
    }

    /// Create an edge between two existing nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
        weight: f64,
    ) -> GraphResult<EdgeId> {
        let id = EdgeId::new(self.edges.len() as u64);
        self.push_edge(Edge::with_weight(id, source, target, kind, weight))?;
        Ok(id)
    }

    /// Create an edge between two nodes identified by key
    pub fn create_edge_by_key(
        &mut self,
        source: &NodeKey,
        target: &NodeKey,
        kind: EdgeKind,
        weight: f64,
    ) -> GraphResult<EdgeId> {
        let source = self.require_key(source)?;
        let target = self.require_key(target)?;
        self.create_edge(source, target, kind, weight)
    }

    fn push_node(&mut self, node: Node) {
        self.key_index.insert(node.key.clone(), node.id);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
    }

    fn push_edge(&mut self, edge: Edge) -> GraphResult<()> {
        // Validate nodes exist
        if !self.has_node(edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source));
        }
        if !self.has_node(edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target));
        }

        self.outgoing[edge.source.index()].push(edge.id);
        self.incoming[edge.target.index()].push(edge.id);
        self.edges.push(edge);
        Ok(())
    }

    fn require_key(&self, key: &NodeKey) -> GraphResult<NodeId> {
        self.node_id(key)
            .ok_or_else(|| GraphError::UnknownNodeKey(key.clone()))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node_id(&self, key: &NodeKey) -> Option<NodeId> {
        self.key_index.get(key).copied()
    }

    pub fn get_node_by_key(&self, key: &NodeKey) -> Option<&Node> {
        self.node_id(key).and_then(|id| self.get_node(id))
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.index())
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.index())
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Every edge touching `node_id` paired with the node at its other end,
    /// outgoing edges first, each group in edge-id order.
    pub fn neighbors(&self, node_id: NodeId) -> impl Iterator<Item = (&Edge, NodeId)> + '_ {
        let out = self.outgoing.get(node_id.index()).into_iter().flatten();
        let inc = self.incoming.get(node_id.index()).into_iter().flatten();
        out.chain(inc).filter_map(move |&eid| {
            let edge = self.get_edge(eid)?;
            Some((edge, edge.other_end(node_id)?))
        })
    }

    /// Number of edges touching a node (a self-loop counts twice)
    pub fn degree(&self, node_id: NodeId) -> usize {
        self.outgoing.get(node_id.index()).map_or(0, Vec::len)
            + self.incoming.get(node_id.index()).map_or(0, Vec::len)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn get_edges_by_kind(&self, kind: EdgeKind) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.kind == kind).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Key of a node id, if present
    pub fn key_of(&self, id: NodeId) -> Option<&NodeKey> {
        self.get_node(id).map(|n| &n.key)
    }

    /// Sorted `(source key, target key, kind, weight)` tuples; two graphs
    /// built from the same input have equal signatures.
    pub fn edge_signature(&self) -> Vec<(NodeKey, NodeKey, EdgeKind, u64)> {
        let mut signature: Vec<_> = self
            .edges
            .iter()
            .filter_map(|e| {
                Some((
                    self.key_of(e.source)?.clone(),
                    self.key_of(e.target)?.clone(),
                    e.kind,
                    e.weight.to_bits(),
                ))
            })
            .collect();
        signature.sort();
        signature
    }
}
