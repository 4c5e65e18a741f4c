//! Search strategies
//!
//! Every engine the orchestrator can dispatch to is a [`SearchStrategy`]
//! variant sharing one `attempt` contract.

use super::intent::{resolve_judge_keys, QueryIntent};
use super::{HitSource, SearchError, SearchHit, SearchResult};
use crate::graph::{NodeKey, NodeKind};
use crate::retrieval::{retrieve, retrieve_from_entities, RetrievalParams, SeedHit};
use crate::snapshot::GraphSnapshot;
use crate::vector::VectorSource;
use std::collections::BTreeSet;
use tracing::warn;

/// Score given to every exact-match hit
pub const EXACT_MATCH_SCORE: f64 = 1.0;

/// Everything a strategy may read while it runs
pub struct StrategyContext<'a> {
    pub snapshot: &'a GraphSnapshot,
    /// Query embedding, when one could be produced
    pub embedding: Option<&'a [f32]>,
    pub vectors: &'a dyn VectorSource,
    /// Graph entities named in the query
    pub entities: &'a [NodeKey],
    pub params: &'a RetrievalParams,
    /// Seeds requested from the vector index
    pub vector_top_k: usize,
}

/// Hits produced by one strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyHits {
    pub hits: Vec<SearchHit>,
    pub partial: bool,
    pub degraded: bool,
}

impl StrategyHits {
    fn exact(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Exact lookup of a normalised case number
    CaseNumber(String),
    /// Cases adjudicated by a normalised judge name
    Judge(String),
    /// Cases of one case-type label
    CaseType(String),
    /// Vector nearest neighbours only
    Similarity,
    /// Graph-enhanced retrieval from vector seeds
    Graph,
}

impl SearchStrategy {
    /// Exact-match strategy for an intent, if it has one
    pub fn for_intent(intent: &QueryIntent) -> Option<Self> {
        match intent {
            QueryIntent::CaseNumber(id) => Some(Self::CaseNumber(id.clone())),
            QueryIntent::Judge(name) => Some(Self::Judge(name.clone())),
            QueryIntent::CaseType(case_type) => Some(Self::CaseType(case_type.label().to_string())),
            QueryIntent::Open => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CaseNumber(_) => "case_number",
            Self::Judge(_) => "judge",
            Self::CaseType(_) => "case_type",
            Self::Similarity => "similarity",
            Self::Graph => "graph",
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::CaseNumber(_) | Self::Judge(_) | Self::CaseType(_))
    }

    pub fn needs_embedding(&self) -> bool {
        matches!(self, Self::Similarity | Self::Graph)
    }

    /// Run the strategy. An unknown entity is zero hits, not an error.
    pub fn attempt(&self, ctx: &StrategyContext<'_>) -> SearchResult<StrategyHits> {
        match self {
            Self::CaseNumber(id) => {
                let hits = ctx
                    .snapshot
                    .case_node(id)
                    .map(|_| vec![SearchHit::exact(id.clone(), HitSource::CaseNumber)])
                    .unwrap_or_default();
                Ok(StrategyHits::exact(hits))
            }
            Self::Judge(name) => {
                let judges = resolve_judge_keys(ctx.snapshot.graph(), name);
                Ok(StrategyHits::exact(cases_linked_to(ctx.snapshot, &judges, HitSource::Judge)))
            }
            Self::CaseType(label) => Ok(StrategyHits::exact(cases_linked_to(
                ctx.snapshot,
                &[NodeKey::case_type(label.as_str())],
                HitSource::CaseType,
            ))),
            Self::Similarity => {
                let embedding = ctx.embedding.ok_or(SearchError::EmbeddingUnavailable)?;
                if !ctx.vectors.is_ready() {
                    return Err(SearchError::IndexUnavailable);
                }
                let hits = ctx
                    .vectors
                    .search(embedding, ctx.params.k)?
                    .into_iter()
                    .map(|(case_id, similarity)| SearchHit {
                        case_id,
                        score: similarity,
                        source: HitSource::Vector,
                        breakdown: None,
                    })
                    .collect();
                Ok(StrategyHits {
                    hits,
                    ..StrategyHits::default()
                })
            }
            Self::Graph => Ok(graph_hits(ctx)),
        }
    }
}

/// Cases with a direct edge to any of `entities`, ordered by case id
fn cases_linked_to(snapshot: &GraphSnapshot, entities: &[NodeKey], source: HitSource) -> Vec<SearchHit> {
    let graph = snapshot.graph();
    let cases: BTreeSet<&str> = entities
        .iter()
        .filter_map(|entity| graph.node_id(entity))
        .flat_map(|node| graph.neighbors(node))
        .filter_map(|(_, other)| graph.key_of(other))
        .filter(|key| key.kind == NodeKind::Case)
        .map(|key| key.id.as_str())
        .collect();
    cases
        .into_iter()
        .map(|id| SearchHit::exact(id, source))
        .collect()
}

/// Vector seeds fed to the graph retriever, or query entities when no
/// usable seeds exist.
fn graph_hits(ctx: &StrategyContext<'_>) -> StrategyHits {
    let seeds = match ctx.embedding {
        Some(embedding) if ctx.vectors.is_ready() => match ctx.vectors.search(embedding, ctx.vector_top_k) {
            Ok(pairs) => Some(pairs.into_iter().map(SeedHit::from).collect::<Vec<_>>()),
            Err(e) => {
                warn!("Vector search failed, falling back to query entities: {}", e);
                None
            }
        },
        _ => None,
    };

    let outcome = match seeds {
        Some(seeds) => retrieve(ctx.snapshot, &seeds, ctx.params),
        None => retrieve_from_entities(ctx.snapshot, ctx.entities, ctx.params),
    };

    StrategyHits {
        hits: outcome
            .hits
            .into_iter()
            .map(|ranked| SearchHit {
                case_id: ranked.case_id,
                score: ranked.final_score,
                source: HitSource::Graph,
                breakdown: Some(ranked.breakdown),
            })
            .collect(),
        partial: outcome.partial,
        degraded: outcome.degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexGraphConfig;
    use crate::embed::HashingEmbedder;
    use crate::record::CaseRecord;
    use crate::vector::{CaseVectorIndex, NoVectorIndex};

    fn snapshot() -> GraphSnapshot {
        let cases = vec![
            CaseRecord::new("1/2565", "ลักทรัพย์").with_judge("สมชาย").with_case_type("อาญา"),
            CaseRecord::new("2/2565", "ฉ้อโกง").with_judge("สมชาย").with_case_type("อาญา"),
            CaseRecord::new("3/2565", "ผิดสัญญา").with_judge("สมศรี").with_case_type("แพ่ง"),
        ];
        GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap()
    }

    fn context<'a>(
        snapshot: &'a GraphSnapshot,
        embedding: Option<&'a [f32]>,
        vectors: &'a dyn VectorSource,
        entities: &'a [NodeKey],
        params: &'a RetrievalParams,
    ) -> StrategyContext<'a> {
        StrategyContext {
            snapshot,
            embedding,
            vectors,
            entities,
            params,
            vector_top_k: 10,
        }
    }

    #[test]
    fn test_exact_strategies() {
        let snap = snapshot();
        let params = RetrievalParams::default();
        let ctx = context(&snap, None, &NoVectorIndex, &[], &params);

        let found = SearchStrategy::CaseNumber("2/2565".to_string()).attempt(&ctx).unwrap();
        assert_eq!(found.hits.len(), 1);
        assert_eq!(found.hits[0].score, EXACT_MATCH_SCORE);

        let missing = SearchStrategy::CaseNumber("9/2565".to_string()).attempt(&ctx).unwrap();
        assert!(missing.hits.is_empty());

        let judge = SearchStrategy::Judge("สมชาย".to_string()).attempt(&ctx).unwrap();
        let ids: Vec<_> = judge.hits.iter().map(|h| h.case_id.as_str()).collect();
        assert_eq!(ids, vec!["1/2565", "2/2565"]);
        assert!(judge.hits.iter().all(|h| h.source == HitSource::Judge));

        let civil = SearchStrategy::CaseType("แพ่ง".to_string()).attempt(&ctx).unwrap();
        assert_eq!(civil.hits[0].case_id, "3/2565");
    }

    #[test]
    fn test_judge_strategy_matches_full_names() {
        let cases = vec![
            CaseRecord::new("1/2565", "ลักทรัพย์").with_judge("นายสมชาย ใจดี"),
            CaseRecord::new("2/2566", "ผิดสัญญา").with_judge("นางสมศรี มีสุข"),
            CaseRecord::new("3/2566", "ฉ้อโกง").with_judge("สมชาย"),
        ];
        let snap = GraphSnapshot::build(&cases, &LexGraphConfig::default()).unwrap();
        let params = RetrievalParams::default();
        let ctx = context(&snap, None, &NoVectorIndex, &[], &params);

        let found = SearchStrategy::Judge("สมชาย".to_string()).attempt(&ctx).unwrap();
        let ids: Vec<_> = found.hits.iter().map(|h| h.case_id.as_str()).collect();
        assert_eq!(ids, vec!["1/2565", "3/2566"]);

        let full = SearchStrategy::Judge("สมศรี มีสุข".to_string()).attempt(&ctx).unwrap();
        assert_eq!(full.hits.len(), 1);
        assert_eq!(full.hits[0].case_id, "2/2566");
    }

    #[test]
    fn test_similarity_requires_ready_index() {
        let snap = snapshot();
        let params = RetrievalParams::default();
        let query = vec![1.0_f32; 8];

        let ctx = context(&snap, Some(&query), &NoVectorIndex, &[], &params);
        assert!(matches!(
            SearchStrategy::Similarity.attempt(&ctx),
            Err(SearchError::IndexUnavailable)
        ));

        let ctx = context(&snap, None, &NoVectorIndex, &[], &params);
        assert!(matches!(
            SearchStrategy::Similarity.attempt(&ctx),
            Err(SearchError::EmbeddingUnavailable)
        ));
    }

    #[test]
    fn test_graph_strategy_with_and_without_vectors() {
        let snap = snapshot();
        let params = RetrievalParams::default();
        let embedder = HashingEmbedder::new(64);

        let mut index = CaseVectorIndex::new(64, 16);
        for (id, text) in [("1/2565", "ลักทรัพย์"), ("2/2565", "ฉ้อโกง"), ("3/2565", "ผิดสัญญา")] {
            index.add(id, &embedder.embed_text(text)).unwrap();
        }
        let query = embedder.embed_text("ลักทรัพย์");

        let ctx = context(&snap, Some(&query), &index, &[], &params);
        let ready = SearchStrategy::Graph.attempt(&ctx).unwrap();
        assert!(!ready.degraded);
        assert_eq!(ready.hits[0].case_id, "1/2565");
        assert!(ready.hits.iter().all(|h| h.breakdown.is_some()));

        let entities = [NodeKey::judge("สมศรี")];
        let ctx = context(&snap, Some(&query), &NoVectorIndex, &entities, &params);
        let fallback = SearchStrategy::Graph.attempt(&ctx).unwrap();
        assert!(fallback.degraded);
        assert_eq!(fallback.hits[0].case_id, "3/2565");
    }
}
