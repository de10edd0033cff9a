//! Structural satisfiability fallback
//!
//! Decides by running the minimizer and looking for a literal `false`.
//! Anything it cannot refute that way counts as satisfiable, so it never
//! rejects a producer a real solver would accept; the price is admitting
//! some combinations an external solver would rule out.

use crate::features::constraint::domain::{minimize, Pred};
use crate::features::solver::domain::{Sat, SatOracle};

/// Solver-free oracle backed by the minimizer
#[derive(Debug, Default)]
pub struct StructuralOracle;

impl SatOracle for StructuralOracle {
    fn check(&self, constraint: Option<&Pred>) -> Sat {
        match minimize(constraint.cloned()) {
            Some(min) if min.is_false() => Sat::Unsatisfiable,
            _ => Sat::Satisfiable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::constraint::domain::{Expression, Operator, Predicate, Variable};
    use crate::shared::models::ValueType;

    fn eq(var: &Variable, value: i64) -> Option<Pred> {
        Some(Predicate::expr(
            Expression::combine(
                Operator::Eq,
                Some(Expression::leaf(var.clone())),
                Some(Expression::leaf(Variable::int(value))),
            )
            .unwrap(),
        ))
    }

    #[test]
    fn contradictions_are_refuted() {
        let x = Variable::input(1, 1, ValueType::Int);
        let both = Predicate::and(eq(&x, 3), Predicate::not(eq(&x, 3)));
        assert_eq!(StructuralOracle.check(both.as_ref()), Sat::Unsatisfiable);
    }

    #[test]
    fn compatible_constraints_pass() {
        let x = Variable::input(1, 1, ValueType::Int);
        let y = Variable::input(2, 1, ValueType::Int);
        let both = Predicate::and(eq(&x, 3), eq(&y, 4));
        assert_eq!(StructuralOracle.check(both.as_ref()), Sat::Satisfiable);
    }

    #[test]
    fn absence_of_constraints_is_trivially_satisfiable() {
        assert!(StructuralOracle.check(None).is_sat());
    }
}
