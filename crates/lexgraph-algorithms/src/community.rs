//! Community detection algorithms
//!
//! Greedy modularity optimisation (Louvain) over an undirected, weighted
//! projection of a [`GraphView`], plus a post-processing step that folds
//! undersized communities into their most strongly connected neighbour.
//!
//! Every step is deterministic: nodes are visited in ascending index order and
//! equal-gain moves resolve to the smallest community id. Community ids at each
//! level are the index of the community's first member, so with indices assigned
//! in sorted-key order the smallest id is also the lexicographically smallest
//! representative.

use super::common::{GraphView, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Gains closer than this are considered equal.
const GAIN_EPSILON: f64 = 1e-12;

/// Louvain parameters
#[derive(Debug, Clone, Copy)]
pub struct LouvainConfig {
    /// Resolution parameter; values above 1.0 favour smaller communities
    pub resolution: f64,
    /// Upper bound on local-moving passes per level
    pub max_passes: usize,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 100,
        }
    }
}

/// Result of the Louvain algorithm
#[derive(Debug, Clone)]
pub struct LouvainResult {
    /// Community label of every node, by dense index. Labels are `0..community_count`
    /// numbered by first appearance in index order.
    pub assignment: Vec<usize>,
    /// Number of distinct communities
    pub community_count: usize,
    /// Number of aggregation levels that produced at least one move
    pub levels: usize,
    /// Modularity of the final partition at the configured resolution
    pub modularity: f64,
}

impl LouvainResult {
    /// Map of NodeId -> community label
    pub fn node_community(&self, view: &GraphView) -> HashMap<NodeId, usize> {
        view.index_to_node
            .iter()
            .zip(self.assignment.iter())
            .map(|(&node, &community)| (node, community))
            .collect()
    }
}

/// Undirected weighted adjacency used while optimising.
///
/// Parallel and reverse edges are summed. Self loops carry the weight internal
/// to an aggregated super-node.
struct Level {
    adj: Vec<BTreeMap<usize, f64>>,
    self_loops: Vec<f64>,
}

impl Level {
    fn from_view(view: &GraphView) -> Self {
        let n = view.node_count;
        let mut adj = vec![BTreeMap::new(); n];
        let mut self_loops = vec![0.0; n];

        for u in 0..n {
            for (v, w) in view.weighted_successors(u) {
                if u == v {
                    self_loops[u] += w;
                } else {
                    *adj[u].entry(v).or_insert(0.0) += w;
                    *adj[v].entry(u).or_insert(0.0) += w;
                }
            }
        }

        Self { adj, self_loops }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn degree(&self, i: usize) -> f64 {
        self.adj[i].values().sum::<f64>() + 2.0 * self.self_loops[i]
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, membership: &[usize], count: usize) -> Level {
        let mut adj = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let ci = membership[i];
            self_loops[ci] += self.self_loops[i];
            for (&j, &w) in self.adj[i].range(i + 1..) {
                let cj = membership[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *adj[ci].entry(cj).or_insert(0.0) += w;
                    *adj[cj].entry(ci).or_insert(0.0) += w;
                }
            }
        }

        Level { adj, self_loops }
    }
}

/// Local-moving phase. Returns the membership and whether any node moved.
fn one_level(level: &Level, resolution: f64, max_passes: usize) -> (Vec<usize>, bool) {
    let n = level.len();
    let mut community: Vec<usize> = (0..n).collect();
    let degrees: Vec<f64> = (0..n).map(|i| level.degree(i)).collect();
    let mut totals = degrees.clone();
    let m2: f64 = degrees.iter().sum();

    if m2 <= 0.0 {
        return (community, false);
    }

    let mut moved_any = false;
    for _ in 0..max_passes {
        let mut moved = false;

        for i in 0..n {
            let own = community[i];
            let k_i = degrees[i];

            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for (&j, &w) in &level.adj[i] {
                *links.entry(community[j]).or_insert(0.0) += w;
            }

            totals[own] -= k_i;
            let gain = |c: usize, w_ic: f64| w_ic - resolution * totals[c] * k_i / m2;
            let stay_gain = gain(own, links.get(&own).copied().unwrap_or(0.0));

            // Ascending iteration plus strict improvement keeps the smallest id on ties.
            let mut best: Option<(usize, f64)> = None;
            for (&c, &w_ic) in &links {
                if c == own {
                    continue;
                }
                let g = gain(c, w_ic);
                match best {
                    Some((_, best_gain)) if g <= best_gain + GAIN_EPSILON => {}
                    _ => best = Some((c, g)),
                }
            }

            let target = match best {
                Some((c, g)) if g > stay_gain + GAIN_EPSILON => c,
                _ => own,
            };

            totals[target] += k_i;
            if target != own {
                community[i] = target;
                moved = true;
            }
        }

        if !moved {
            break;
        }
        moved_any = true;
    }

    (community, moved_any)
}

/// Relabel communities `0..count` in order of first appearance.
fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut labels: HashMap<usize, usize> = HashMap::new();
    let relabeled = assignment
        .iter()
        .map(|c| {
            let next = labels.len();
            *labels.entry(*c).or_insert(next)
        })
        .collect();
    (relabeled, labels.len())
}

/// Louvain community detection
///
/// Alternates local moving and aggregation until a level produces no move.
/// Edge direction is ignored.
pub fn louvain(view: &GraphView, config: &LouvainConfig) -> LouvainResult {
    let mut level = Level::from_view(view);
    let mut assignment: Vec<usize> = (0..view.node_count).collect();
    let mut levels = 0;

    loop {
        let (membership, moved) = one_level(&level, config.resolution, config.max_passes);
        if !moved {
            break;
        }

        let (membership, count) = renumber(&membership);
        for community in assignment.iter_mut() {
            *community = membership[*community];
        }
        level = level.aggregate(&membership, count);
        levels += 1;
    }

    let (assignment, community_count) = renumber(&assignment);
    let modularity = modularity(view, &assignment, config.resolution);

    LouvainResult {
        assignment,
        community_count,
        levels,
        modularity,
    }
}

/// Resolution-weighted modularity of a partition (edge direction ignored).
pub fn modularity(view: &GraphView, assignment: &[usize], resolution: f64) -> f64 {
    let level = Level::from_view(view);
    let m2: f64 = (0..level.len()).map(|i| level.degree(i)).sum();
    if m2 <= 0.0 {
        return 0.0;
    }

    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut totals: HashMap<usize, f64> = HashMap::new();

    for i in 0..level.len() {
        let ci = assignment[i];
        *totals.entry(ci).or_insert(0.0) += level.degree(i);
        *internal.entry(ci).or_insert(0.0) += level.self_loops[i];
        for (&j, &w) in level.adj[i].range(i + 1..) {
            if assignment[j] == ci {
                *internal.entry(ci).or_insert(0.0) += w;
            }
        }
    }

    let m = m2 / 2.0;
    totals
        .iter()
        .map(|(c, tot)| {
            let inside = internal.get(c).copied().unwrap_or(0.0);
            inside / m - resolution * (tot / m2).powi(2)
        })
        .sum()
}

/// Fold communities smaller than `min_size` into the neighbouring community they
/// share the most edge weight with (ties go to the smaller label). Communities with
/// no neighbour are left alone. Returns labels renumbered by first appearance.
pub fn merge_small_communities(view: &GraphView, assignment: &[usize], min_size: usize) -> Vec<usize> {
    let level = Level::from_view(view);
    let mut assignment = assignment.to_vec();

    loop {
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &community) in assignment.iter().enumerate() {
            members.entry(community).or_default().push(idx);
        }

        let mut merge: Option<(usize, usize)> = None;
        for (&label, nodes) in members.iter().filter(|(_, nodes)| nodes.len() < min_size) {
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &i in nodes {
                for (&j, &w) in &level.adj[i] {
                    if assignment[j] != label {
                        *links.entry(assignment[j]).or_insert(0.0) += w;
                    }
                }
            }

            let mut strongest: Option<(usize, f64)> = None;
            for (&target, &w) in &links {
                match strongest {
                    Some((_, best)) if w <= best => {}
                    _ => strongest = Some((target, w)),
                }
            }

            if let Some((target, _)) = strongest {
                merge = Some((label, target));
                break;
            }
        }

        match merge {
            Some((from, into)) => {
                for community in assignment.iter_mut() {
                    if *community == from {
                        *community = into;
                    }
                }
            }
            None => break,
        }
    }

    renumber(&assignment).0
}
