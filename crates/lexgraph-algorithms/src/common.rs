//! Shared utilities for graph algorithms
//!
//! Provides a read-only, dense view of the graph topology for algorithm execution.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
///
/// Index order is significant: algorithms that must break ties deterministically
/// (Louvain) prefer the lower index, so callers should assign indices in a
/// stable, meaningful order.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Outgoing edges CSR structure
    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Incoming edges CSR structure (Compressed Sparse Column effectively)
    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,

    /// Edge weights: aligned with `out_targets`
    pub weights: Option<Vec<f64>>,
}

impl GraphView {
    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successors(&self, idx: usize) -> &[usize] {
        let start = self.out_offsets[idx];
        let end = self.out_offsets[idx + 1];
        &self.out_targets[start..end]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        let start = self.in_offsets[idx];
        let end = self.in_offsets[idx + 1];
        &self.in_sources[start..end]
    }

    /// Get weights for outgoing edges of a node
    pub fn weights(&self, idx: usize) -> Option<&[f64]> {
        self.weights.as_ref().map(|w| {
            let start = self.out_offsets[idx];
            let end = self.out_offsets[idx + 1];
            &w[start..end]
        })
    }

    /// Outgoing edges of a node paired with their weight (1.0 when unweighted)
    pub fn weighted_successors(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let weights = self.weights(idx);
        self.successors(idx)
            .iter()
            .enumerate()
            .map(move |(i, &target)| (target, weights.map_or(1.0, |w| w[i])))
    }

    /// Sum of all edge weights (each directed edge counted once)
    pub fn total_weight(&self) -> f64 {
        match &self.weights {
            Some(w) => w.iter().sum(),
            None => self.out_targets.len() as f64,
        }
    }

    /// Helper to create GraphView from adjacency lists
    pub fn from_adjacency_list(
        node_count: usize,
        index_to_node: Vec<NodeId>,
        node_to_index: HashMap<NodeId, usize>,
        outgoing: Vec<Vec<usize>>,
        incoming: Vec<Vec<usize>>,
        weights: Option<Vec<Vec<f64>>>,
    ) -> Self {
        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();
        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::new();
        let mut flat_weights = if weights.is_some() { Some(Vec::new()) } else { None };

        out_offsets.push(0);
        for (i, neighbors) in outgoing.into_iter().enumerate() {
            out_targets.extend(neighbors);
            out_offsets.push(out_targets.len());

            if let Some(ref mut w_flat) = flat_weights {
                if let Some(w_row) = weights.as_ref().map(|w| &w[i]) {
                    w_flat.extend(w_row.iter());
                }
            }
        }

        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
            weights: flat_weights,
        }
    }

    /// Build a view from a weighted edge list over nodes `0..node_count`.
    ///
    /// Node ids equal their index. Mostly useful in tests and benchmarks.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Self {
        let index_to_node: Vec<NodeId> = (0..node_count as NodeId).collect();
        let node_to_index = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut outgoing = vec![Vec::new(); node_count];
        let mut incoming = vec![Vec::new(); node_count];
        let mut weights = vec![Vec::new(); node_count];
        for &(u, v, w) in edges {
            outgoing[u].push(v);
            incoming[v].push(u);
            weights[u].push(w);
        }

        Self::from_adjacency_list(
            node_count,
            index_to_node,
            node_to_index,
            outgoing,
            incoming,
            Some(weights),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_projection() {
        // 0 -> 1 (0.5), 0 -> 2 (1.0), 2 -> 1 (2.0)
        let view = GraphView::from_edges(3, &[(0, 1, 0.5), (0, 2, 1.0), (2, 1, 2.0)]);

        assert_eq!(view.node_count, 3);
        assert_eq!(view.successors(0), &[1, 2]);
        assert_eq!(view.predecessors(1), &[0, 2]);
        assert_eq!(view.out_degree(0), 2);
        assert_eq!(view.in_degree(1), 2);
        assert_eq!(view.weights(2), Some(&[2.0][..]));
        assert!((view.total_weight() - 3.5).abs() < 1e-12);

        let pairs: Vec<(usize, f64)> = view.weighted_successors(0).collect();
        assert_eq!(pairs, vec![(1, 0.5), (2, 1.0)]);
    }

    #[test]
    fn test_unweighted_defaults_to_one() {
        let view = GraphView::from_adjacency_list(
            2,
            vec![10, 20],
            [(10, 0), (20, 1)].into_iter().collect(),
            vec![vec![1], vec![]],
            vec![vec![], vec![0]],
            None,
        );
        let pairs: Vec<(usize, f64)> = view.weighted_successors(0).collect();
        assert_eq!(pairs, vec![(1, 1.0)]);
        assert_eq!(view.total_weight(), 1.0);
    }
}
