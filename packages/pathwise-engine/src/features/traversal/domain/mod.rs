//! Traversal domain model

pub mod graph;

pub use graph::CallGraph;
