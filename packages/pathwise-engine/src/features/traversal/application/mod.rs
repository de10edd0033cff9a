//! Traversal use cases

pub mod walk;

pub use walk::{CallGraphTraversal, TraversalPlugin};
