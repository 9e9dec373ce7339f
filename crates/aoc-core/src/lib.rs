pub mod commit_graph;
pub mod git_contracts;

pub use commit_graph::{layout, GraphLayout, GraphNode, Lane, LaneColor, ParentEdge, LANE_PALETTE};
pub use git_contracts::{Commit, HistoryQuery};
