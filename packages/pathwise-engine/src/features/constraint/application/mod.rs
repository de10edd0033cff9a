//! Path-level orchestration of the intraprocedural engine

pub mod path_analysis;

pub use path_analysis::{PathAnalysis, PathConstraint, ProducerConstraint};
