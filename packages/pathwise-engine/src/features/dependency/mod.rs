//! Dependence classification and resolution
//!
//! What stands between a feasible path and a replayable chain: heap reads
//! are discharged by events that write the location, string-table reads by
//! the packaged resource literal.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::DependencyAnalysis;
pub use domain::{classify, DependenceKind};
pub use infrastructure::{HeapWriteCache, HeapWritePlugin};
