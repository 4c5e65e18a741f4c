//! Why a case was retrieved
//!
//! An explanation lists the case's direct relationships, the shortest paths
//! linking it to entities named in the query, and the community it sits in.

use crate::algo::{bfs_undirected, build_view};
use crate::graph::{EdgeKind, GraphError, GraphResult, NodeId, NodeKey};
use crate::snapshot::GraphSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest path reported between a query entity and the case
pub const MAX_PATH_HOPS: usize = 3;
const MAX_CO_MEMBERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedEdge {
    pub kind: EdgeKind,
    /// The case is the edge's source
    pub outgoing: bool,
    pub neighbor: NodeKey,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedPath {
    /// Query entity the path starts from
    pub from: NodeKey,
    /// Nodes from `from` to the case, both ends included
    pub nodes: Vec<NodeKey>,
}

impl ExplainedPath {
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: usize,
    pub size: usize,
    /// A few other cases in the same community
    pub co_members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub case_id: String,
    pub title: String,
    pub direct: Vec<ExplainedEdge>,
    pub paths: Vec<ExplainedPath>,
    pub community: Option<CommunitySummary>,
}

/// Explain `case_id` relative to the entities extracted from a query.
///
/// Entities absent from the graph, or with no path of at most
/// [`MAX_PATH_HOPS`] to the case, are skipped.
pub fn explain_case(snapshot: &GraphSnapshot, case_id: &str, entities: &[NodeKey]) -> GraphResult<Explanation> {
    let graph = snapshot.graph();
    let case_key = NodeKey::case(case_id);
    let case_node = graph
        .node_id(&case_key)
        .ok_or_else(|| GraphError::UnknownNodeKey(case_key.clone()))?;
    let node = graph.get_node(case_node).ok_or(GraphError::NodeNotFound(case_node))?;

    let mut direct: Vec<ExplainedEdge> = graph
        .neighbors(case_node)
        .filter_map(|(edge, other)| {
            Some(ExplainedEdge {
                kind: edge.kind,
                outgoing: edge.source == case_node,
                neighbor: graph.key_of(other)?.clone(),
                weight: edge.weight,
            })
        })
        .collect();
    direct.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.neighbor.cmp(&b.neighbor)));

    let mut paths = Vec::new();
    let wanted: BTreeSet<&NodeKey> = entities.iter().filter(|key| **key != case_key).collect();
    if !wanted.is_empty() {
        let view = build_view(graph, None);
        for entity in wanted {
            let Some(start) = graph.node_id(entity) else {
                continue;
            };
            let Some(found) = bfs_undirected(&view, start.as_u64(), case_node.as_u64(), Some(MAX_PATH_HOPS)) else {
                continue;
            };
            let nodes: Option<Vec<NodeKey>> = found
                .path
                .iter()
                .map(|&id| graph.key_of(NodeId::new(id)).cloned())
                .collect();
            if let Some(nodes) = nodes {
                paths.push(ExplainedPath {
                    from: entity.clone(),
                    nodes,
                });
            }
        }
    }

    let communities = snapshot.communities();
    let community = communities
        .community_of(case_node)
        .and_then(|id| communities.community(id))
        .map(|c| CommunitySummary {
            id: c.id,
            size: c.size(),
            co_members: c
                .case_members()
                .filter(|key| **key != case_key)
                .take(MAX_CO_MEMBERS)
                .map(|key| key.id.clone())
                .collect(),
        });

    Ok(Explanation {
        case_id: case_id.to_string(),
        title: node.display_name().to_string(),
        direct,
        paths,
        community,
    })
}
