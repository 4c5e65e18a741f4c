//! Pathfinding algorithms
//!
//! Unweighted shortest paths that ignore edge direction, used to explain how
//! two entities are connected.

use super::common::{GraphView, NodeId};
use std::collections::{HashMap, VecDeque};

/// Result of a pathfinding algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Vec<NodeId>,
    pub cost: f64,
}

impl PathResult {
    /// Number of edges on the path
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Breadth-First Search over both edge directions.
///
/// Neighbours are expanded in ascending index order so equal-length paths
/// resolve the same way on every run. `max_hops` bounds the search depth.
pub fn bfs_undirected(
    view: &GraphView,
    source: NodeId,
    target: NodeId,
    max_hops: Option<usize>,
) -> Option<PathResult> {
    let source_idx = *view.node_to_index.get(&source)?;
    let target_idx = *view.node_to_index.get(&target)?;

    let mut queue = VecDeque::new();
    let mut visited: HashMap<usize, (Option<usize>, usize)> = HashMap::new(); // index -> (parent, depth)

    queue.push_back(source_idx);
    visited.insert(source_idx, (None, 0));

    while let Some(current_idx) = queue.pop_front() {
        let depth = visited.get(&current_idx).map_or(0, |&(_, d)| d);

        if current_idx == target_idx {
            let mut path = Vec::new();
            let mut curr = Some(target_idx);
            while let Some(idx) = curr {
                path.push(view.index_to_node[idx]);
                curr = visited.get(&idx).and_then(|&(parent, _)| parent);
            }
            path.reverse();
            return Some(PathResult {
                source,
                target,
                cost: (path.len() - 1) as f64,
                path,
            });
        }

        if max_hops.is_some_and(|limit| depth >= limit) {
            continue;
        }

        let mut neighbours: Vec<usize> = view
            .successors(current_idx)
            .iter()
            .chain(view.predecessors(current_idx))
            .copied()
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();

        for next_idx in neighbours {
            if !visited.contains_key(&next_idx) {
                visited.insert(next_idx, (Some(current_idx), depth + 1));
                queue.push_back(next_idx);
            }
        }
    }

    None
}
