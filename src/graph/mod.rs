//! Legal knowledge graph
//!
//! This module implements the typed entity graph:
//! - Case, judge, concept, case-type and article nodes with namespaced keys
//! - Typed, weighted edges; several kinds may join the same pair
//! - Dense in-memory storage with adjacency lists in both directions
//! - Deterministic construction from case records

pub mod builder;
pub mod edge;
pub mod node;
pub mod store;
pub mod types;

// Re-export main types
pub use builder::{BuildReport, KnowledgeGraphBuilder};
pub use edge::Edge;
pub use node::{CaseAttributes, Node};
pub use store::{GraphError, GraphParts, GraphResult, KnowledgeGraph};
pub use types::{EdgeId, EdgeKind, NodeId, NodeKey, NodeKind};
