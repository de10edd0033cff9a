//! Dependency use cases

pub mod resolution;

pub use resolution::DependencyAnalysis;
