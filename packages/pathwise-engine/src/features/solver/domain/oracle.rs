//! Satisfiability oracle port
//!
//! Dependency resolution needs one yes/no question answered: can a
//! producer's constraint hold together with the constraint of the path
//! that wants its value. The engine asks through this trait and never
//! assumes anything about how the answer is computed; a real deployment
//! wires in an external solver process, tests and the default pipeline
//! use the structural fallback in `infrastructure`.

use crate::features::constraint::domain::Pred;

/// Outcome of a satisfiability query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sat {
    Satisfiable,
    Unsatisfiable,
    /// The oracle could not decide; callers treat this as unsatisfiable
    Unknown,
}

impl Sat {
    /// True only for a definite yes
    pub fn is_sat(self) -> bool {
        matches!(self, Sat::Satisfiable)
    }
}

/// Decision procedure over feasibility predicates
pub trait SatOracle: Send + Sync {
    /// Whether the predicate has a model. Absent means unconstrained and
    /// is trivially satisfiable.
    fn check(&self, constraint: Option<&Pred>) -> Sat;
}
