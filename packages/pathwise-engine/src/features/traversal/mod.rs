//! Call-graph construction and any-path search
//!
//! Builds the app's call graph and walks it once, handing registered
//! plugins a call path for every instruction they match.

pub mod application;
pub mod domain;

pub use application::{CallGraphTraversal, TraversalPlugin};
pub use domain::CallGraph;
