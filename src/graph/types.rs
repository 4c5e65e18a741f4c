//! Core type definitions for the legal knowledge graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense identifier for a node within one graph snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Dense identifier for an edge within one graph snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        EdgeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// Entity type of a node. Declaration order is the key namespace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Case,
    Judge,
    Concept,
    CaseType,
    Article,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Case,
        NodeKind::Judge,
        NodeKind::Concept,
        NodeKind::CaseType,
        NodeKind::Article,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Case => "case",
            NodeKind::Judge => "judge",
            NodeKind::Concept => "concept",
            NodeKind::CaseType => "case_type",
            NodeKind::Article => "article",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}

/// Namespaced unique key of a node: entity type plus normalised identifier.
///
/// Keys order by kind first, then identifier; node ids are assigned in this
/// order so every structure derived from the graph is reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        NodeKey { kind, id: id.into() }
    }

    pub fn case(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Case, id)
    }

    pub fn judge(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Judge, name)
    }

    pub fn concept(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Concept, label)
    }

    pub fn case_type(label: impl Into<String>) -> Self {
        Self::new(NodeKind::CaseType, label)
    }

    pub fn article(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Article, label)
    }

    pub fn is_case(&self) -> bool {
        self.kind == NodeKind::Case
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for NodeKey {
    type Err = String;

    /// Parse `kind:identifier`, e.g. `judge:สมชาย`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected kind:identifier, got '{}'", s))?;
        if id.trim().is_empty() {
            return Err(format!("empty identifier in '{}'", s));
        }
        Ok(NodeKey::new(kind.parse()?, id.trim()))
    }
}

/// Relationship type of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// case -> concept / article / judge / case type
    Contains,
    /// judge -> case type
    Handles,
    /// judge -> concept
    DealsWith,
    /// case <-> case, weighted by embedding similarity
    SimilarTo,
    /// generic fallback
    Related,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Contains,
        EdgeKind::Handles,
        EdgeKind::DealsWith,
        EdgeKind::SimilarTo,
        EdgeKind::Related,
    ];

    /// Fixed weight of the kind. `SimilarTo` edges carry their similarity instead.
    pub fn default_weight(&self) -> f64 {
        match self {
            EdgeKind::Related => 0.5,
            _ => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Handles => "handles",
            EdgeKind::DealsWith => "deals_with",
            EdgeKind::SimilarTo => "similar_to",
            EdgeKind::Related => "related",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
