pub mod common;
pub mod community;
pub mod pathfinding;

pub use common::{GraphView, NodeId};
pub use community::{louvain, merge_small_communities, modularity, LouvainConfig, LouvainResult};
pub use pathfinding::{bfs_undirected, PathResult};
