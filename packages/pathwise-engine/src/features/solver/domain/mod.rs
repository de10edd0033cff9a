//! Solver-facing domain types: the oracle port and encoded scripts

pub mod oracle;
pub mod script;

pub use oracle::{Sat, SatOracle};
pub use script::SolverScript;
