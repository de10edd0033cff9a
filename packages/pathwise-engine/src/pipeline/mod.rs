//! End-to-end orchestration
//!
//! Wires target selection, traversal, the analysis pool, and report
//! persistence into one run.

pub mod driver;
pub mod targets;

pub use driver::{AnalysisDriver, PathOutcome, RunStats};
pub use targets::{TargetMatcher, TargetSitePlugin};
