//! Bounded breadth-first traversal
//!
//! Edges are followed in both directions. Each node is expanded at most once,
//! and the walk stops at `depth` hops, after `max_visited` expansions, or at
//! the deadline, whichever comes first.

use crate::graph::{EdgeKind, KnowledgeGraph, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;

/// Stopping rules for one traversal
#[derive(Debug, Clone, Copy)]
pub struct TraversalLimits<'a> {
    pub depth: usize,
    pub max_visited: usize,
    pub deadline: Option<Instant>,
    pub edge_kinds: &'a [EdgeKind],
}

/// Scores gathered by one traversal
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Accumulated `weight / hop` per reached case node
    pub case_scores: FxHashMap<NodeId, f64>,
    /// Nodes expanded
    pub visited: usize,
    /// Stopped by the node budget or the deadline rather than by depth
    pub truncated: bool,
}

/// Walk outward from `start`, scoring every case reached.
///
/// A case reached at hop `h` over an edge of weight `w` gains `w / h`. Every
/// edge that reaches a node for the first time at a given hop contributes, so
/// a case reached over several paths of the same length scores more. Nodes
/// discovered at an earlier hop, including `start`, gain nothing.
pub fn traverse_from(graph: &KnowledgeGraph, start: NodeId, limits: &TraversalLimits<'_>) -> Traversal {
    let mut result = Traversal::default();
    if !graph.has_node(start) {
        return result;
    }

    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    visited.insert(start);
    let mut frontier = vec![start];

    'hops: for hop in 1..=limits.depth {
        if frontier.is_empty() {
            break;
        }

        let mut discovered: FxHashSet<NodeId> = FxHashSet::default();
        let mut next = Vec::new();

        for &node in &frontier {
            if result.visited >= limits.max_visited
                || limits.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            {
                result.truncated = true;
                break 'hops;
            }
            result.visited += 1;

            for (edge, other) in graph.neighbors(node) {
                if !limits.edge_kinds.contains(&edge.kind) {
                    continue;
                }
                if visited.contains(&other) && !discovered.contains(&other) {
                    continue;
                }

                if graph.get_node(other).is_some_and(|n| n.is_case()) {
                    *result.case_scores.entry(other).or_insert(0.0) += edge.weight / hop as f64;
                }
                if visited.insert(other) {
                    discovered.insert(other);
                    next.push(other);
                }
            }
        }

        frontier = next;
    }

    result
}
