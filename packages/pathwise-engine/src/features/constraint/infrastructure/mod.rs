//! Symbolic interpretation machinery
//!
//! - `intraprocedural` walks one method body to a bounded fixpoint
//! - `library_models` recognizes the platform calls the walk interprets
//!   instead of treating them as opaque

pub mod intraprocedural;
pub mod library_models;

pub use intraprocedural::{IntraproceduralAnalysis, WalkLimits};
pub use library_models::{classify, KnownCall};
