//! Query intent classification and entity extraction
//!
//! Classification is pattern-based only. Rules are checked in order: a case
//! number, then a case-type token, then a judge name.

use crate::graph::{KnowledgeGraph, NodeKey, NodeKind};
use crate::legal::{self, CaseType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Judge names shorter than this are not matched inside free text
const MIN_JUDGE_MATCH_CHARS: usize = 2;

/// What a query asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryIntent {
    /// A case number such as `123/2565`, normalised
    CaseNumber(String),
    CaseType(CaseType),
    /// A normalised judge name
    Judge(String),
    /// Nothing recognised; handled by the caller's search mode
    Open,
}

impl QueryIntent {
    pub fn is_exact(&self) -> bool {
        !matches!(self, QueryIntent::Open)
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryIntent::CaseNumber(id) => write!(f, "case_number({})", id),
            QueryIntent::CaseType(t) => write!(f, "case_type({})", t),
            QueryIntent::Judge(name) => write!(f, "judge({})", name),
            QueryIntent::Open => f.write_str("open"),
        }
    }
}

/// Classify `query` against the active graph.
pub fn classify(graph: &KnowledgeGraph, query: &str) -> QueryIntent {
    if let Some(id) = legal::extract_case_numbers(query).into_iter().next() {
        return QueryIntent::CaseNumber(id);
    }
    if let Some(case_type) = CaseType::find_in(query) {
        return QueryIntent::CaseType(case_type);
    }
    if let Some(name) = judge_names(graph, query).into_iter().next() {
        return QueryIntent::Judge(name);
    }
    QueryIntent::Open
}

/// Judge names in `query`: the word after a judicial title, then any known
/// judge whose full name or given name occurs in the text.
fn judge_names(graph: &KnowledgeGraph, query: &str) -> Vec<String> {
    let mut names = Vec::new();
    for capture in legal::JUDGE_MENTION.captures_iter(query) {
        if let Some(m) = capture.get(1) {
            let name = legal::normalize_judge_name(m.as_str());
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let text = legal::normalize_label(query);
    for node in graph.nodes_of_kind(NodeKind::Judge) {
        let name = &node.key.id;
        let given = name.split_whitespace().next().unwrap_or_default();
        let mentioned = [name.as_str(), given]
            .iter()
            .any(|part| part.chars().count() >= MIN_JUDGE_MATCH_CHARS && text.contains(part));
        if mentioned && !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

/// Judge nodes a normalised name refers to: every judge whose name contains
/// it or is contained in it, so a given name finds the full name on record.
/// Names shorter than two characters only match exactly.
pub fn resolve_judge_keys(graph: &KnowledgeGraph, name: &str) -> Vec<NodeKey> {
    if name.is_empty() {
        return Vec::new();
    }
    let partial = name.chars().count() >= MIN_JUDGE_MATCH_CHARS;
    let keys: BTreeSet<NodeKey> = graph
        .nodes_of_kind(NodeKind::Judge)
        .filter(|node| {
            let judge = node.key.id.as_str();
            judge == name
                || (partial && judge.chars().count() >= MIN_JUDGE_MATCH_CHARS
                    && (judge.contains(name) || name.contains(judge)))
        })
        .map(|node| node.key.clone())
        .collect();
    keys.into_iter().collect()
}

/// Graph entities named in `query`, restricted to keys present in the graph.
///
/// Covers case numbers, judges, legal concepts and case types. The result is
/// sorted and free of duplicates.
pub fn extract_query_entities(graph: &KnowledgeGraph, query: &str) -> Vec<NodeKey> {
    let mut keys = BTreeSet::new();

    keys.extend(legal::extract_case_numbers(query).into_iter().map(NodeKey::case));
    for name in judge_names(graph, query) {
        keys.extend(resolve_judge_keys(graph, &name));
    }
    keys.extend(legal::extract_legal_concepts(query).into_iter().map(NodeKey::concept));
    if let Some(case_type) = CaseType::find_in(query) {
        keys.insert(NodeKey::case_type(case_type.label()));
    }

    keys.into_iter().filter(|key| graph.node_id(key).is_some()).collect()
}
