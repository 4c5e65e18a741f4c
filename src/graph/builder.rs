//! Knowledge graph construction from case records
//!
//! Records are validated, merged by normalised case id, and staged into
//! ordered tables before anything is inserted, so the resulting node and edge
//! sets do not depend on input order.

use super::node::CaseAttributes;
use super::store::{GraphResult, KnowledgeGraph};
use super::types::{EdgeKind, NodeKey};
use crate::config::GraphConfig;
use crate::legal::{self, CaseType};
use crate::record::{CaseRecord, IngestionError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// What happened to the input during a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub records_seen: usize,
    /// Distinct cases in the graph
    pub cases: usize,
    /// Records merged into an earlier record with the same case id
    pub duplicate_records: usize,
    pub skipped: Vec<IngestionError>,
    /// Relations dropped because the case type or concept was empty
    pub empty_relations: usize,
    /// Similar-case pairs below the threshold or with an invalid score
    pub dropped_similarity_pairs: usize,
    /// Similar-case pairs naming a case that is not in the record set
    pub unknown_similar_cases: usize,
}

/// Entities gathered for one case id across all its records
struct StagedCase {
    attributes: CaseAttributes,
    judges: BTreeSet<String>,
    concepts: BTreeSet<String>,
    articles: BTreeSet<String>,
    similar: Vec<(String, f64)>,
}

/// Builds a [`KnowledgeGraph`] from case records
#[derive(Debug, Clone)]
pub struct KnowledgeGraphBuilder {
    config: GraphConfig,
}

impl KnowledgeGraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, cases: &[CaseRecord]) -> GraphResult<(KnowledgeGraph, BuildReport)> {
        let mut report = BuildReport {
            records_seen: cases.len(),
            ..Default::default()
        };

        let staged = self.stage_cases(cases, &mut report);
        report.cases = staged.len();

        let mut nodes: BTreeMap<NodeKey, Option<CaseAttributes>> = BTreeMap::new();
        let mut edges: BTreeMap<(NodeKey, NodeKey, EdgeKind), f64> = BTreeMap::new();

        for (id, case) in &staged {
            let case_key = NodeKey::case(id.as_str());
            nodes.insert(case_key.clone(), Some(case.attributes.clone()));

            let case_type = case.attributes.case_type.as_ref().map(NodeKey::case_type);
            let concepts: Vec<NodeKey> = case.concepts.iter().map(NodeKey::concept).collect();

            if let Some(type_key) = &case_type {
                nodes.entry(type_key.clone()).or_insert(None);
                link(&mut edges, &case_key, type_key, EdgeKind::Contains, 1.0);
            }
            for concept in &concepts {
                nodes.entry(concept.clone()).or_insert(None);
                link(&mut edges, &case_key, concept, EdgeKind::Contains, 1.0);
            }
            for article in &case.articles {
                let article = NodeKey::article(article.as_str());
                nodes.entry(article.clone()).or_insert(None);
                link(&mut edges, &case_key, &article, EdgeKind::Contains, 1.0);
            }

            for judge in &case.judges {
                let judge = NodeKey::judge(judge.as_str());
                nodes.entry(judge.clone()).or_insert(None);
                link(&mut edges, &case_key, &judge, EdgeKind::Contains, 1.0);
                if let Some(type_key) = &case_type {
                    link(&mut edges, &judge, type_key, EdgeKind::Handles, 1.0);
                }
                for concept in &concepts {
                    link(&mut edges, &judge, concept, EdgeKind::DealsWith, 1.0);
                }
            }

            for (other, similarity) in &case.similar {
                if other == id || !similarity.is_finite() || *similarity <= 0.0 || *similarity > 1.0 {
                    debug!(case = %id, other = %other, similarity, "Dropping invalid similarity pair");
                    report.dropped_similarity_pairs += 1;
                } else if *similarity < self.config.similarity_threshold {
                    report.dropped_similarity_pairs += 1;
                } else if !staged.contains_key(other) {
                    debug!(case = %id, other = %other, "Similar case not in record set");
                    report.unknown_similar_cases += 1;
                } else {
                    link(&mut edges, &case_key, &NodeKey::case(other.as_str()), EdgeKind::SimilarTo, *similarity);
                }
            }
        }

        let mut graph = KnowledgeGraph::new();
        for (key, attributes) in nodes {
            graph.ensure_node(key, attributes);
        }
        for ((source, target, kind), weight) in edges {
            graph.create_edge_by_key(&source, &target, kind, weight)?;
        }

        info!(
            "Built knowledge graph: {} nodes, {} edges, {} cases ({} records skipped, {} similarity pairs dropped)",
            graph.node_count(),
            graph.edge_count(),
            report.cases,
            report.skipped.len(),
            report.dropped_similarity_pairs
        );

        Ok((graph, report))
    }

    /// Validate and merge records by case id.
    ///
    /// Records sharing an id are merged: list fields are unioned, scalar fields
    /// come from the first record in (id, title, case type, summary) order.
    fn stage_cases(&self, cases: &[CaseRecord], report: &mut BuildReport) -> BTreeMap<String, StagedCase> {
        let mut valid: Vec<(String, &CaseRecord)> = Vec::with_capacity(cases.len());
        for (index, record) in cases.iter().enumerate() {
            match record.validate(index) {
                Ok(id) => valid.push((id, record)),
                Err(e) => {
                    warn!(index, "Skipping malformed case record: {}", e);
                    report.skipped.push(e);
                }
            }
        }
        valid.sort_by(|(a_id, a), (b_id, b)| {
            a_id.cmp(b_id)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.case_type.cmp(&b.case_type))
                .then_with(|| a.summary.cmp(&b.summary))
        });

        let mut staged: BTreeMap<String, StagedCase> = BTreeMap::new();
        for (id, record) in valid {
            if staged.contains_key(&id) {
                report.duplicate_records += 1;
            }
            let case = staged.entry(id.clone()).or_insert_with(|| StagedCase {
                attributes: CaseAttributes {
                    title: legal::collapse_whitespace(&record.title),
                    case_type: None,
                    year: record.effective_year(),
                },
                judges: BTreeSet::new(),
                concepts: BTreeSet::new(),
                articles: BTreeSet::new(),
                similar: Vec::new(),
            });

            if case.attributes.case_type.is_none() {
                match record.effective_case_type() {
                    Some(label) => {
                        let label = CaseType::parse(&label).map_or(label, |t| t.label().to_string());
                        case.attributes.case_type = Some(label);
                    }
                    None => {
                        debug!(case = %id, "Empty case type, skipping case-type relations");
                        report.empty_relations += 1;
                    }
                }
            }

            case.judges.extend(
                record
                    .judges
                    .iter()
                    .map(|j| legal::normalize_judge_name(j))
                    .filter(|j| !j.is_empty()),
            );

            let mut record_concepts = BTreeSet::new();
            for concept in &record.concepts {
                let concept = legal::normalize_label(concept);
                if concept.is_empty() {
                    debug!(case = %id, "Empty concept, skipping relation");
                    report.empty_relations += 1;
                } else {
                    record_concepts.insert(concept);
                }
            }
            if record_concepts.is_empty() && self.config.derive_concepts_from_summary {
                let text = format!("{} {}", record.title, record.summary);
                record_concepts.extend(legal::extract_legal_concepts(&text));
            }
            case.concepts.extend(record_concepts);

            case.articles.extend(
                record
                    .article_labels()
                    .iter()
                    .map(|a| legal::normalize_label(a))
                    .filter(|a| !a.is_empty()),
            );

            case.similar.extend(
                record
                    .precomputed_similar_cases
                    .iter()
                    .map(|s| (legal::normalize_case_number(&s.case_id), s.similarity)),
            );
        }

        staged
    }
}

/// Stage one edge. `similar_to` is symmetric: stored once with the smaller key
/// as source, keeping the highest similarity reported for the pair.
fn link(
    edges: &mut BTreeMap<(NodeKey, NodeKey, EdgeKind), f64>,
    source: &NodeKey,
    target: &NodeKey,
    kind: EdgeKind,
    weight: f64,
) {
    let (source, target) = if kind == EdgeKind::SimilarTo && target < source {
        (target, source)
    } else {
        (source, target)
    };
    let slot = edges
        .entry((source.clone(), target.clone(), kind))
        .or_insert(weight);
    if weight > *slot {
        *slot = weight;
    }
}
