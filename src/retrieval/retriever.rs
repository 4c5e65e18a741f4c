//! Score fusion over traversal results

use super::traversal::{traverse_from, Traversal, TraversalLimits};
use super::{rank, RankedCase, RetrievalOutcome, RetrievalParams, ScoreBreakdown, SeedHit};
use crate::graph::{NodeId, NodeKey, NodeKind};
use crate::snapshot::GraphSnapshot;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, warn};

/// Rank cases for a query from its vector-search seeds.
///
/// Each seed present in the graph starts a bounded traversal. Seeds missing
/// from the graph still rank on their vector score alone. Seeds repeated in
/// `seed_hits` keep their highest score.
pub fn retrieve(snapshot: &GraphSnapshot, seed_hits: &[SeedHit], params: &RetrievalParams) -> RetrievalOutcome {
    let mut vector_scores: BTreeMap<String, f64> = BTreeMap::new();
    for hit in seed_hits {
        let score = if hit.score.is_finite() {
            hit.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let slot = vector_scores.entry(hit.case_id.clone()).or_insert(score);
        if score > *slot {
            *slot = score;
        }
    }

    let seed_nodes: Vec<NodeId> = vector_scores
        .keys()
        .filter_map(|id| snapshot.case_node(id))
        .collect();

    score_candidates(snapshot, &seed_nodes, vector_scores, params)
}

/// Graph-only ranking seeded from entities named in the query, used when the
/// vector index is unavailable. Every vector score is 0 and the outcome is
/// flagged `degraded`.
pub fn retrieve_from_entities(
    snapshot: &GraphSnapshot,
    entities: &[NodeKey],
    params: &RetrievalParams,
) -> RetrievalOutcome {
    let graph = snapshot.graph();
    let mut seed_nodes: Vec<NodeId> = entities.iter().filter_map(|key| graph.node_id(key)).collect();
    seed_nodes.sort_unstable();
    seed_nodes.dedup();

    let vector_scores: BTreeMap<String, f64> = entities
        .iter()
        .filter(|key| key.kind == NodeKind::Case && graph.node_id(key).is_some())
        .map(|key| (key.id.clone(), 0.0))
        .collect();

    let mut outcome = score_candidates(snapshot, &seed_nodes, vector_scores, params);
    outcome.degraded = true;
    warn!(
        "Vector index unavailable, graph-only ranking from {} query entities",
        seed_nodes.len()
    );
    outcome
}

fn score_candidates(
    snapshot: &GraphSnapshot,
    seed_nodes: &[NodeId],
    vector_scores: BTreeMap<String, f64>,
    params: &RetrievalParams,
) -> RetrievalOutcome {
    let graph = snapshot.graph();
    let communities = snapshot.communities();

    let limits = TraversalLimits {
        depth: params.depth,
        max_visited: params.max_visited,
        deadline: params.time_budget.map(|budget| Instant::now() + budget),
        edge_kinds: &params.edge_kinds,
    };
    let traversals: Vec<Traversal> = seed_nodes
        .par_iter()
        .map(|&seed| traverse_from(graph, seed, &limits))
        .collect();

    // Summed in seed order so repeated runs add in the same sequence.
    let mut graph_scores: BTreeMap<NodeId, f64> = BTreeMap::new();
    for traversal in &traversals {
        for (&node, &score) in &traversal.case_scores {
            *graph_scores.entry(node).or_insert(0.0) += score;
        }
    }

    let bonus_communities: BTreeSet<usize> = seed_nodes
        .iter()
        .filter_map(|&node| communities.community_of(node))
        .filter(|&id| communities.community(id).is_some_and(|c| c.size() >= 2))
        .collect();

    let mut candidates: BTreeMap<String, ScoreBreakdown> = BTreeMap::new();
    for (case_id, score) in vector_scores {
        candidates.entry(case_id).or_default().vector_score = score;
    }
    for (node, score) in graph_scores {
        if let Some(key) = graph.key_of(node) {
            candidates.entry(key.id.clone()).or_default().graph_score = score;
        }
    }
    for &id in &bonus_communities {
        if let Some(community) = communities.community(id) {
            for member in community.case_members() {
                candidates.entry(member.id.clone()).or_default();
            }
        }
    }

    let mut hits: Vec<RankedCase> = candidates
        .into_iter()
        .map(|(case_id, mut breakdown)| {
            let shares_community = snapshot
                .case_node(&case_id)
                .and_then(|node| communities.community_of(node))
                .is_some_and(|c| bonus_communities.contains(&c));
            if shares_community {
                breakdown.community_bonus = params.community_bonus;
            }
            RankedCase {
                final_score: params.weights.fuse(&breakdown),
                case_id,
                breakdown,
            }
        })
        .collect();
    rank(&mut hits);
    hits.truncate(params.k);

    let partial = traversals.iter().any(|t| t.truncated);
    let visited = traversals.iter().map(|t| t.visited).sum();
    if partial {
        warn!(
            "Retrieval budget exhausted after {} expansions, returning partial ranking",
            visited
        );
    }
    debug!(
        "Retrieved {} hits from {} seeds ({} nodes expanded)",
        hits.len(),
        seed_nodes.len(),
        visited
    );

    RetrievalOutcome {
        hits,
        partial,
        degraded: false,
        visited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexGraphConfig;
    use crate::record::CaseRecord;

    fn snapshot(cases: &[CaseRecord]) -> GraphSnapshot {
        GraphSnapshot::build(cases, &LexGraphConfig::default()).unwrap()
    }

    #[test]
    fn test_shared_judge_pulls_in_related_case() {
        let snap = snapshot(&[
            CaseRecord::new("1/2565", "A").with_judge("นายสมชาย").with_case_type("อาญา"),
            CaseRecord::new("2/2565", "B").with_judge("สมชาย").with_case_type("อาญา"),
            CaseRecord::new("3/2565", "C").with_judge("สมศรี").with_case_type("แพ่ง"),
        ]);
        let outcome = retrieve(&snap, &[SeedHit::new("1/2565", 0.9)], &RetrievalParams::default());

        let b = outcome.get("2/2565").unwrap();
        assert!(b.breakdown.graph_score > 0.0);
        assert_eq!(b.breakdown.vector_score, 0.0);
        assert!(outcome.get("3/2565").map_or(true, |c| c.breakdown.graph_score == 0.0));
        assert!(!outcome.partial);
        assert!(!outcome.degraded);
    }

    #[test]
    fn test_seed_missing_from_graph_keeps_vector_score() {
        let snap = snapshot(&[CaseRecord::new("1/2565", "A")]);
        let params = RetrievalParams::default();
        let outcome = retrieve(&snap, &[SeedHit::new("9/2565", 0.8), SeedHit::new("9/2565", 0.4)], &params);

        assert_eq!(outcome.hits.len(), 1);
        let hit = &outcome.hits[0];
        assert_eq!(hit.case_id, "9/2565");
        assert_eq!(hit.breakdown.vector_score, 0.8);
        assert!((hit.final_score - 0.6 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_zero_k_and_no_seeds() {
        let snap = snapshot(&[CaseRecord::new("1/2565", "A")]);
        let outcome = retrieve(&snap, &[SeedHit::new("1/2565", 0.5)], &RetrievalParams::default().with_k(0));
        assert!(outcome.hits.is_empty());

        let outcome = retrieve(&snap, &[], &RetrievalParams::default());
        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.visited, 0);
    }

    #[test]
    fn test_entity_seeds_are_degraded() {
        let snap = snapshot(&[
            CaseRecord::new("1/2565", "A").with_judge("สมชาย"),
            CaseRecord::new("2/2565", "B").with_judge("สมชาย"),
        ]);
        let outcome = retrieve_from_entities(
            &snap,
            &[NodeKey::judge("สมชาย"), NodeKey::concept("ไม่มี")],
            &RetrievalParams::default(),
        );

        assert!(outcome.degraded);
        assert_eq!(outcome.case_ids(), vec!["1/2565", "2/2565"]);
        assert!(outcome.hits.iter().all(|h| h.breakdown.vector_score == 0.0));
    }

    #[test]
    fn test_budget_exhaustion_is_partial() {
        let snap = snapshot(&[
            CaseRecord::new("1/2565", "A").with_judge("สมชาย"),
            CaseRecord::new("2/2565", "B").with_judge("สมชาย"),
        ]);
        let params = RetrievalParams {
            max_visited: 1,
            ..RetrievalParams::default()
        };
        let outcome = retrieve(&snap, &[SeedHit::new("1/2565", 0.9)], &params);

        assert!(outcome.partial);
        assert_eq!(outcome.hits[0].case_id, "1/2565");
    }
}
