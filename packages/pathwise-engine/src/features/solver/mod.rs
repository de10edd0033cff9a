//! Constraint export and satisfiability
//!
//! Turns minimized predicates into scripts an external solver can run,
//! and defines the oracle interface dependency resolution queries.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ScriptEncoder;
pub use domain::{Sat, SatOracle, SolverScript};
pub use infrastructure::StructuralOracle;
