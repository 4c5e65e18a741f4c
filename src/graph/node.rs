//! Node implementation for the legal knowledge graph

use super::types::{NodeId, NodeKey, NodeKind};
use serde::{Deserialize, Serialize};

/// Descriptive fields carried only by case nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseAttributes {
    pub title: String,
    pub case_type: Option<String>,
    pub year: Option<i32>,
}

/// A node in the knowledge graph
///
/// Nodes have:
/// - A dense ID, equal to its position in the graph's node table
/// - A namespaced key, unique across the graph
/// - Case attributes when the node is a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub key: NodeKey,
    pub case: Option<CaseAttributes>,
}

impl Node {
    /// Create a new entity node
    pub fn new(id: NodeId, key: NodeKey) -> Self {
        Node { id, key, case: None }
    }

    /// Create a new case node
    pub fn new_case(id: NodeId, key: NodeKey, attributes: CaseAttributes) -> Self {
        Node {
            id,
            key,
            case: Some(attributes),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind
    }

    pub fn is_case(&self) -> bool {
        self.key.is_case()
    }

    /// Human-readable name: the title for cases, otherwise the key identifier.
    pub fn display_name(&self) -> &str {
        match &self.case {
            Some(attrs) if !attrs.title.is_empty() => &attrs.title,
            _ => &self.key.id,
        }
    }
}
