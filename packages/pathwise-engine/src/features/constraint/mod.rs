//! Path condition derivation
//!
//! Turns one control-flow path into a solver-checkable feasibility
//! predicate over symbolic inputs, heap locations, and store reads.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::path_analysis::{PathAnalysis, PathConstraint, ProducerConstraint};
pub use domain::{DataMap, Expr, Expression, ExpressionSet, Operator, Pred, Predicate, Variable};
pub use infrastructure::{IntraproceduralAnalysis, WalkLimits};
