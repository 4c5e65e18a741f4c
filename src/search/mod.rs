//! Search orchestration
//!
//! A query is classified, dispatched to exact-match strategies and then to
//! vector or graph retrieval, and the hits are merged by case id into one
//! ranking. Exact hits always rank first.

pub mod intent;
pub mod orchestrator;
pub mod strategy;

pub use intent::{classify, extract_query_entities, QueryIntent};
pub use orchestrator::SearchOrchestrator;
pub use strategy::{SearchStrategy, StrategyContext, StrategyHits, EXACT_MATCH_SCORE};

use crate::legal::{self, CaseType};
use crate::retrieval::ScoreBreakdown;
use crate::vector::VectorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a single strategy
///
/// The orchestrator never returns these; a failing strategy is recorded on
/// the response and the remaining strategies still run.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector index is not ready")]
    IndexUnavailable,

    #[error("No query embedding available")]
    EmbeddingUnavailable,

    #[error("Vector search error: {0}")]
    Vector(#[from] VectorError),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// How a query is answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Vector nearest neighbours only
    Similarity,
    /// Graph-enhanced retrieval
    GraphRag,
    /// Exact matches, then graph retrieval, then plain similarity to fill up to `k`
    #[default]
    Combined,
    /// The query is a case number; exact lookup only
    CaseNumber,
    /// The query is a judge name; exact lookup only
    Judge,
    /// The query is a case-type label; exact lookup only
    CaseType,
}

impl SearchMode {
    /// Whether the caller forced one exact lookup
    pub fn is_exact(&self) -> bool {
        matches!(self, SearchMode::CaseNumber | SearchMode::Judge | SearchMode::CaseType)
    }

    /// Non-exact strategies run for this mode, in order
    pub fn strategies(&self) -> Vec<SearchStrategy> {
        match self {
            SearchMode::Similarity => vec![SearchStrategy::Similarity],
            SearchMode::GraphRag => vec![SearchStrategy::Graph],
            SearchMode::Combined => vec![SearchStrategy::Graph, SearchStrategy::Similarity],
            SearchMode::CaseNumber | SearchMode::Judge | SearchMode::CaseType => Vec::new(),
        }
    }
}

/// Engine a hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    CaseNumber,
    Judge,
    CaseType,
    Graph,
    Vector,
}

impl HitSource {
    pub fn is_exact(&self) -> bool {
        matches!(self, HitSource::CaseNumber | HitSource::Judge | HitSource::CaseType)
    }

    /// Higher wins when one case comes from several engines
    pub fn confidence(&self) -> u8 {
        match self {
            HitSource::CaseNumber => 4,
            HitSource::Judge | HitSource::CaseType => 3,
            HitSource::Graph => 2,
            HitSource::Vector => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub case_id: String,
    pub score: f64,
    pub source: HitSource,
    /// Present for graph hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl SearchHit {
    pub fn exact(case_id: impl Into<String>, source: HitSource) -> Self {
        Self {
            case_id: case_id.into(),
            score: EXACT_MATCH_SCORE,
            source,
            breakdown: None,
        }
    }

    /// Whether `self` should replace `other` for the same case id
    fn outranks(&self, other: &SearchHit) -> bool {
        (self.source.confidence(), self.score) > (other.source.confidence(), other.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub mode: SearchMode,
    /// Falls back to the configured default
    #[serde(default)]
    pub k: Option<usize>,
    /// Cases of this type are added as exact hits
    #[serde(default)]
    pub case_type: Option<String>,
    /// Cases of this judge are added as exact hits
    #[serde(default)]
    pub judge: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::default(),
            k: None,
            case_type: None,
            judge: None,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_case_type(mut self, case_type: impl Into<String>) -> Self {
        self.case_type = Some(case_type.into());
        self
    }

    pub fn with_judge(mut self, judge: impl Into<String>) -> Self {
        self.judge = Some(judge.into());
        self
    }

    /// Strategies to run, in order.
    ///
    /// An exact mode runs only its own lookup on the query text. Otherwise the
    /// lookup for the classified intent comes first, then the judge and
    /// case-type filters, then the mode's strategies.
    pub fn plan(&self, intent: &QueryIntent) -> Vec<SearchStrategy> {
        let query = self.query.trim();
        let forced = match self.mode {
            SearchMode::CaseNumber => Some(SearchStrategy::CaseNumber(
                legal::extract_case_numbers(query)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| legal::normalize_case_number(query)),
            )),
            SearchMode::Judge => Some(SearchStrategy::Judge(legal::normalize_judge_name(query))),
            SearchMode::CaseType => Some(case_type_lookup(query)),
            _ => None,
        };
        if let Some(strategy) = forced {
            return vec![strategy];
        }

        let mut plan: Vec<SearchStrategy> = SearchStrategy::for_intent(intent).into_iter().collect();
        let filters = [
            self.judge
                .as_deref()
                .map(|name| SearchStrategy::Judge(legal::normalize_judge_name(name))),
            self.case_type.as_deref().map(case_type_lookup),
        ];
        for filter in filters.into_iter().flatten() {
            if !plan.contains(&filter) {
                plan.push(filter);
            }
        }
        plan.extend(self.mode.strategies());
        plan
    }
}

/// Case-type lookup for a label, mapped onto the taxonomy when it names one
fn case_type_lookup(label: &str) -> SearchStrategy {
    let label = CaseType::find_in(label)
        .map(|t| t.label().to_string())
        .unwrap_or_else(|| legal::normalize_label(label));
    SearchStrategy::CaseType(label)
}

/// A strategy that raised an error during a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub intent: QueryIntent,
    pub partial: bool,
    pub degraded: bool,
    pub failed_strategies: Vec<StrategyFailure>,
}

impl SearchResponse {
    pub fn case_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.case_id.as_str()).collect()
    }
}

/// Exact hits first, then by score descending, then by case id
pub(crate) fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.source
            .is_exact()
            .cmp(&a.source.is_exact())
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.case_id.cmp(&b.case_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f64, source: HitSource) -> SearchHit {
        SearchHit {
            case_id: id.to_string(),
            score,
            source,
            breakdown: None,
        }
    }

    #[test]
    fn test_exact_tier_ranks_first() {
        let mut hits = vec![
            hit("b", 0.99, HitSource::Graph),
            hit("c", 1.0, HitSource::Judge),
            hit("a", 0.99, HitSource::Vector),
            hit("d", 1.0, HitSource::CaseNumber),
        ];
        rank_hits(&mut hits);
        let ids: Vec<_> = hits.iter().map(|h| h.case_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_confidence_decides_merges() {
        assert!(hit("a", 1.0, HitSource::CaseNumber).outranks(&hit("a", 1.0, HitSource::Judge)));
        assert!(hit("a", 0.2, HitSource::Graph).outranks(&hit("a", 0.9, HitSource::Vector)));
        assert!(hit("a", 0.5, HitSource::Graph).outranks(&hit("a", 0.4, HitSource::Graph)));
        assert!(!hit("a", 0.9, HitSource::Graph).outranks(&hit("a", 1.0, HitSource::Judge)));
    }

    #[test]
    fn test_request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "ลักทรัพย์"}"#).unwrap();
        assert_eq!(request.mode, SearchMode::Combined);
        assert_eq!(request.k, None);
        assert_eq!(SearchRequest::new("x").with_k(3).k, Some(3));
        assert_eq!(request.judge, None);
        assert_eq!(request.case_type, None);
    }

    #[test]
    fn test_exact_modes_run_only_their_lookup() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "ฎีกาที่ 123 / 2565", "mode": "case_number"}"#).unwrap();
        assert_eq!(
            request.plan(&QueryIntent::Open),
            vec![SearchStrategy::CaseNumber("123/2565".to_string())]
        );

        let judge = SearchRequest::new("นายสมชาย ใจดี").with_mode(SearchMode::Judge);
        assert_eq!(
            judge.plan(&QueryIntent::Open),
            vec![SearchStrategy::Judge("สมชาย ใจดี".to_string())]
        );

        let case_type = SearchRequest::new("คดีแพ่ง").with_mode(SearchMode::CaseType);
        assert_eq!(
            case_type.plan(&QueryIntent::Open),
            vec![SearchStrategy::CaseType("แพ่ง".to_string())]
        );
        assert!(SearchMode::Judge.strategies().is_empty());
    }

    #[test]
    fn test_filters_join_the_plan_before_retrieval() {
        let request = SearchRequest::new("ลักทรัพย์")
            .with_mode(SearchMode::GraphRag)
            .with_judge("ผู้พิพากษาสมศรี")
            .with_case_type("คดีอาญา");
        assert_eq!(
            request.plan(&QueryIntent::Open),
            vec![
                SearchStrategy::Judge("สมศรี".to_string()),
                SearchStrategy::CaseType("อาญา".to_string()),
                SearchStrategy::Graph,
            ]
        );

        // A filter repeating the classified intent is not run twice
        let repeated = SearchRequest::new("คดีอาญา").with_case_type("อาญา");
        assert_eq!(
            repeated.plan(&QueryIntent::CaseType(CaseType::Criminal)),
            vec![
                SearchStrategy::CaseType("อาญา".to_string()),
                SearchStrategy::Graph,
                SearchStrategy::Similarity,
            ]
        );
    }
}
