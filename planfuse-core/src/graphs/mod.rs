pub mod builder;
pub mod graph;

pub use builder::GraphBuilder;
pub use graph::{ElementGraph, ElementNode, GraphEdge, GraphNode, ImageNode, RunInfo, CONTAINS};
