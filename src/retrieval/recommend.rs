//! Entity-centred recommendations

use super::traversal::{traverse_from, TraversalLimits};
use super::{rank, RankedCase, ScoreBreakdown};
use crate::graph::{EdgeKind, GraphError, GraphResult, NodeKey};
use crate::snapshot::GraphSnapshot;

/// Hops walked from the entity
pub const RECOMMEND_DEPTH: usize = 2;

/// Cases most strongly connected to `entity` within two hops.
///
/// Scores are pure graph scores. A case entity never recommends itself.
pub fn recommend(snapshot: &GraphSnapshot, entity: &NodeKey, limit: usize) -> GraphResult<Vec<RankedCase>> {
    let graph = snapshot.graph();
    let start = graph
        .node_id(entity)
        .ok_or_else(|| GraphError::UnknownNodeKey(entity.clone()))?;

    let traversal = traverse_from(
        graph,
        start,
        &TraversalLimits {
            depth: RECOMMEND_DEPTH,
            max_visited: usize::MAX,
            deadline: None,
            edge_kinds: &EdgeKind::ALL,
        },
    );

    let mut hits: Vec<RankedCase> = traversal
        .case_scores
        .into_iter()
        .filter(|&(node, _)| node != start)
        .filter_map(|(node, score)| {
            let key = graph.key_of(node)?;
            Some(RankedCase {
                case_id: key.id.clone(),
                final_score: score,
                breakdown: ScoreBreakdown {
                    graph_score: score,
                    ..ScoreBreakdown::default()
                },
            })
        })
        .collect();
    rank(&mut hits);
    hits.truncate(limit);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexGraphConfig;
    use crate::record::CaseRecord;

    fn snapshot() -> GraphSnapshot {
        let cases = vec![
            CaseRecord::new("1/2565", "A").with_judge("สมชาย").with_case_type("อาญา"),
            CaseRecord::new("2/2565", "B").with_judge("สมชาย").with_case_type("แพ่ง"),
            CaseRecord::new("3/2565", "C").with_judge("สมศรี").with_case_type("อาญา"),
            CaseRecord::new("4/2565", "D").with_judge("สมหญิง").with_case_type("ภาษี"),
        ];
        GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap()
    }

    #[test]
    fn test_judge_recommendations() {
        let snap = snapshot();
        let hits = recommend(&snap, &NodeKey::judge("สมชาย"), 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.case_id.as_str()).collect();

        // Own cases at one hop, a same-type case at two
        assert_eq!(ids, vec!["1/2565", "2/2565", "3/2565"]);
        assert_eq!(hits[0].final_score, 1.0);
        assert_eq!(hits[2].final_score, 0.5);
        assert!(hits.iter().all(|h| h.breakdown.vector_score == 0.0));
    }

    #[test]
    fn test_case_excludes_itself_and_limit_applies() {
        let snap = snapshot();
        let hits = recommend(&snap, &NodeKey::case("1/2565"), 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_ne!(hits[0].case_id, "1/2565");
    }

    #[test]
    fn test_unknown_entity() {
        let snap = snapshot();
        assert!(matches!(
            recommend(&snap, &NodeKey::judge("ไม่มี"), 5),
            Err(GraphError::UnknownNodeKey(_))
        ));
    }
}
