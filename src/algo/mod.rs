//! Graph algorithms module
//!
//! Algorithms are implemented in the `lexgraph-algorithms` crate.
//! This module provides the integration/adapter layer.

pub mod community;

use crate::graph::{EdgeKind, KnowledgeGraph, NodeId};
use lexgraph_algorithms::{GraphView, NodeId as AlgoNodeId};
use std::collections::HashMap;

pub use community::{detect_communities, Community, CommunityError, CommunityMap, CommunityResult};
pub use lexgraph_algorithms::{bfs_undirected, PathResult};

/// Build a GraphView from the knowledge graph for algorithm execution.
///
/// Dense indices equal node ids, so index order is node-key order. Edge
/// weights are carried over; `edge_kinds` restricts which edges are projected.
pub fn build_view(graph: &KnowledgeGraph, edge_kinds: Option<&[EdgeKind]>) -> GraphView {
    let node_count = graph.node_count();

    // 1. Index mappings
    let index_to_node: Vec<AlgoNodeId> = graph.nodes().map(|n| n.id.as_u64()).collect();
    let node_to_index: HashMap<AlgoNodeId, usize> = index_to_node
        .iter()
        .enumerate()
        .map(|(idx, &id)| (id, idx))
        .collect();

    // 2. Adjacency lists
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut weights: Vec<Vec<f64>> = vec![Vec::new(); node_count];

    for edge in graph.edges() {
        if let Some(kinds) = edge_kinds {
            if !kinds.contains(&edge.kind) {
                continue;
            }
        }

        let (Some(&u), Some(&v)) = (
            node_to_index.get(&edge.source.as_u64()),
            node_to_index.get(&edge.target.as_u64()),
        ) else {
            continue;
        };
        outgoing[u].push(v);
        incoming[v].push(u);
        weights[u].push(edge.weight);
    }

    // 3. Convert to CSR
    GraphView::from_adjacency_list(
        node_count,
        index_to_node,
        node_to_index,
        outgoing,
        incoming,
        Some(weights),
    )
}

/// Map a view index back to the graph's node id
pub fn view_node(view: &GraphView, idx: usize) -> NodeId {
    NodeId::new(view.index_to_node[idx])
}
