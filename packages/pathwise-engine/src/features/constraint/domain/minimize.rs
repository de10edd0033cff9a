//! Algebraic simplification of feasibility predicates
//!
//! Each round runs a redundancy sweep that propagates simple AND-conjuncts
//! into their sibling subtrees, then a bottom-up rewrite that folds what the
//! sweep exposed. Folding can surface fresh conjuncts at outer levels, so
//! rounds repeat until a fixpoint; every productive round replaces at least
//! one atom with a constant, which bounds the loop by the atom count. Truth
//! semantics are preserved throughout; a path whose predicate reaches
//! `False` here is infeasible and gets discarded by the caller.

use std::sync::Arc;

use super::expression::{Expr, Expression, Operator};
use super::predicate::{Connective, Pred, Predicate};
use crate::shared::models::ConstValue;

/// Simplifies a predicate to a fixpoint; absent stays absent
pub fn minimize(constraint: Option<Pred>) -> Option<Pred> {
    let mut pred = minimize_predicate(&constraint?);
    loop {
        let swept = minimize_predicate(&remove_redundancies(&pred));
        if swept == pred {
            return Some(pred);
        }
        pred = swept;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Bottom-up rewriting
// ═══════════════════════════════════════════════════════════════════════

fn minimize_predicate(pred: &Pred) -> Pred {
    match pred.as_ref() {
        Predicate::Expr(expr) => {
            let folded = minimize_expression(expr);
            if folded == *expr {
                pred.clone()
            } else {
                Predicate::expr(folded)
            }
        }

        Predicate::Not(child) => {
            let child_min = minimize_predicate(child);
            match child_min.as_ref() {
                Predicate::Expr(expr) => {
                    if expr.as_ref() == Expression::bool_true().as_ref() {
                        return Predicate::falsity();
                    }
                    if expr.as_ref() == Expression::bool_false().as_ref() {
                        return Predicate::truth();
                    }
                    if let Expression::Arithmetic { op, left, right } = expr.as_ref() {
                        if let Some(opposite) = op.opposite() {
                            let rewritten = Arc::new(Expression::Arithmetic {
                                op: opposite,
                                left: left.clone(),
                                right: right.clone(),
                            });
                            return Predicate::expr(minimize_expression(&rewritten));
                        }
                    }
                }
                Predicate::Not(inner) => return inner.clone(),
                Predicate::Binary { op, left, right } => {
                    // De Morgan; the fresh negations are minimized in turn
                    // so reapplication cannot reduce any further
                    let flipped = match op {
                        Connective::And => Connective::Or,
                        Connective::Or => Connective::And,
                    };
                    return fold_binary(
                        flipped,
                        minimize_predicate(&Arc::new(Predicate::Not(left.clone()))),
                        minimize_predicate(&Arc::new(Predicate::Not(right.clone()))),
                    );
                }
            }
            if child_min == *child {
                pred.clone()
            } else {
                Arc::new(Predicate::Not(child_min))
            }
        }

        Predicate::Binary { op, left, right } => {
            fold_binary(*op, minimize_predicate(left), minimize_predicate(right))
        }
    }
}

/// Identity and absorption with `True`/`False`, plus collapse of equal sides
fn fold_binary(op: Connective, left: Pred, right: Pred) -> Pred {
    if left == right {
        return left;
    }
    match op {
        Connective::And => {
            if left.is_false() || right.is_false() {
                return Predicate::falsity();
            }
            if left.is_true() {
                return right;
            }
            if right.is_true() {
                return left;
            }
        }
        Connective::Or => {
            if left.is_true() || right.is_true() {
                return Predicate::truth();
            }
            if left.is_false() {
                return right;
            }
            if right.is_false() {
                return left;
            }
        }
    }
    Arc::new(Predicate::Binary { op, left, right })
}

/// Top-level constant folding; subterms are left alone
fn minimize_expression(expr: &Expr) -> Expr {
    match expr.as_ref() {
        Expression::Arithmetic { op, left, right } => {
            if left == right {
                if *op == Operator::Eq {
                    return Expression::bool_true();
                }
                if op.requires_inequality() {
                    return Expression::bool_false();
                }
            } else if let (Some(l), Some(r)) = (constant_of(left), constant_of(right)) {
                if l == r {
                    if op.admits_equality() {
                        return Expression::bool_true();
                    }
                    if op.requires_inequality() {
                        return Expression::bool_false();
                    }
                } else if *op == Operator::Eq {
                    return Expression::bool_false();
                }
            }
        }
        Expression::Str { op, left, right } => {
            if let (Some(ConstValue::Str(l)), Some(ConstValue::Str(r))) =
                (constant_of(left), constant_of(right))
            {
                match op {
                    Operator::StrEq => {
                        return if l == r {
                            Expression::bool_true()
                        } else {
                            Expression::bool_false()
                        };
                    }
                    Operator::StrNe => {
                        return if l == r {
                            Expression::bool_false()
                        } else {
                            Expression::bool_true()
                        };
                    }
                    Operator::Contains => {
                        return if l.contains(r.as_str()) {
                            Expression::bool_true()
                        } else {
                            Expression::bool_false()
                        };
                    }
                    _ => {}
                }
            }
        }
        Expression::Leaf { .. } => {}
    }
    expr.clone()
}

fn constant_of(expr: &Expr) -> Option<&ConstValue> {
    expr.variable().and_then(|var| var.as_constant())
}

// ═══════════════════════════════════════════════════════════════════════
// Redundancy propagation
// ═══════════════════════════════════════════════════════════════════════

/// Pushes simple AND-conjuncts into their sibling subtrees so opposite
/// occurrences collapse to `False` and implied ones to `True`. The folding
/// of those constants is left to the rewrite pass that follows.
fn remove_redundancies(pred: &Pred) -> Pred {
    match pred.as_ref() {
        Predicate::Expr(_) => pred.clone(),

        Predicate::Not(child) => {
            let swept = remove_redundancies(child);
            if swept == *child {
                pred.clone()
            } else {
                Arc::new(Predicate::Not(swept))
            }
        }

        Predicate::Binary { op, left, right } => {
            let mut left_swept = remove_redundancies(left);
            let mut right_swept = remove_redundancies(right);

            if *op == Connective::And {
                if let Some(conjunct) = simple_expression(&right_swept) {
                    left_swept = propagate_and_constraint(&left_swept, &conjunct);
                } else if let Some(conjunct) = simple_expression(&left_swept) {
                    right_swept = propagate_and_constraint(&right_swept, &conjunct);
                }
            }

            if left_swept == *left && right_swept == *right {
                pred.clone()
            } else {
                Arc::new(Predicate::Binary {
                    op: *op,
                    left: left_swept,
                    right: right_swept,
                })
            }
        }
    }
}

fn simple_expression(pred: &Pred) -> Option<Expr> {
    match pred.as_ref() {
        Predicate::Expr(expr) if expr.is_simple() => Some(expr.clone()),
        _ => None,
    }
}

fn propagate_and_constraint(pred: &Pred, conjunct: &Expr) -> Pred {
    match pred.as_ref() {
        Predicate::Expr(expr) => {
            if expr.is_opposite_of(conjunct) {
                return Predicate::falsity();
            }
            if conjunct.implies(expr) {
                return Predicate::truth();
            }
            pred.clone()
        }

        Predicate::Not(child) => {
            let propagated = propagate_and_constraint(child, conjunct);
            if let Predicate::Expr(expr) = propagated.as_ref() {
                if conjunct.implies(expr) {
                    return Predicate::falsity();
                }
                if expr.is_opposite_of(conjunct) {
                    return Predicate::truth();
                }
            }
            if propagated == *child {
                pred.clone()
            } else {
                Arc::new(Predicate::Not(propagated))
            }
        }

        Predicate::Binary { op, left, right } => fold_binary(
            *op,
            propagate_and_constraint(left, conjunct),
            propagate_and_constraint(right, conjunct),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::constraint::domain::Variable;
    use crate::shared::models::ValueType;
    use pretty_assertions::assert_eq;

    fn input(number: usize) -> Expr {
        Expression::leaf(Variable::input(number, 0, ValueType::Int))
    }

    fn int(n: i64) -> Expr {
        Expression::leaf(Variable::int(n))
    }

    fn cmp(op: Operator, left: Expr, right: Expr) -> Pred {
        Predicate::expr(Expression::combine(op, Some(left), Some(right)).unwrap())
    }

    fn and(left: Pred, right: Pred) -> Pred {
        Arc::new(Predicate::Binary {
            op: Connective::And,
            left,
            right,
        })
    }

    fn or(left: Pred, right: Pred) -> Pred {
        Arc::new(Predicate::Binary {
            op: Connective::Or,
            left,
            right,
        })
    }

    #[test]
    fn duplicate_conjuncts_collapse() {
        let five = cmp(Operator::Eq, input(0), int(5));
        let both = and(five.clone(), five.clone());
        assert_eq!(minimize(Some(both)), Some(five));
    }

    #[test]
    fn contradictory_conjuncts_minimize_to_false() {
        let eq = cmp(Operator::Eq, input(1), int(3));
        let ne = cmp(Operator::Ne, input(1), int(3));
        let minimized = minimize(Some(and(eq, ne))).unwrap();
        assert!(minimized.is_false());
    }

    #[test]
    fn negating_a_relation_rewrites_to_its_opposite() {
        let below = cmp(Operator::Lt, input(0), int(5));
        let negated = Arc::new(Predicate::Not(below));
        let expected = cmp(Operator::Ge, input(0), int(5));
        assert_eq!(minimize(Some(negated)), Some(expected));
    }

    #[test]
    fn negated_constant_comparison_folds_in_one_pass() {
        let ne = cmp(Operator::Ne, int(3), int(4));
        let minimized = minimize(Some(Arc::new(Predicate::Not(ne)))).unwrap();
        assert!(minimized.is_false());
    }

    #[test]
    fn double_negation_cancels() {
        let eq = cmp(Operator::Eq, input(0), int(1));
        let twice = Arc::new(Predicate::Not(Arc::new(Predicate::Not(eq.clone()))));
        assert_eq!(minimize(Some(twice)), Some(eq));
    }

    #[test]
    fn negated_conjunction_distributes_into_opposites() {
        let a = cmp(Operator::Eq, input(0), int(1));
        let b = cmp(Operator::Eq, input(1), int(2));
        let negated = Arc::new(Predicate::Not(and(a, b)));

        let expected = or(
            cmp(Operator::Ne, input(0), int(1)),
            cmp(Operator::Ne, input(1), int(2)),
        );
        assert_eq!(minimize(Some(negated)), Some(expected));
    }

    #[test]
    fn constant_string_comparisons_fold() {
        let same = Expression::combine(
            Operator::StrEq,
            Some(Expression::leaf(Variable::string("go"))),
            Some(Expression::leaf(Variable::string("go"))),
        )
        .unwrap();
        let keeps = cmp(Operator::Eq, input(0), int(1));
        let minimized = minimize(Some(and(Predicate::expr(same), keeps.clone())));
        assert_eq!(minimized, Some(keeps));

        let absent = Expression::combine(
            Operator::Contains,
            Some(Expression::leaf(Variable::string("alpha"))),
            Some(Expression::leaf(Variable::string("zzz"))),
        )
        .unwrap();
        let minimized = minimize(Some(Predicate::expr(absent)));
        assert!(minimized.unwrap().is_false());
    }

    #[test]
    fn conjunct_collapses_its_opposite_in_a_sibling_branch() {
        let holds = cmp(Operator::Eq, input(0), int(5));
        let opposite = cmp(Operator::Ne, input(0), int(5));
        let other = cmp(Operator::Eq, input(1), int(1));

        let pred = and(holds.clone(), or(opposite, other.clone()));
        assert_eq!(minimize(Some(pred)), Some(and(holds, other)));
    }

    #[test]
    fn conjunct_satisfies_an_implied_sibling_disjunct() {
        let le = cmp(Operator::Le, input(0), int(5));
        let other = cmp(Operator::Eq, input(1), int(1));
        let eq = cmp(Operator::Eq, input(0), int(5));

        let pred = and(or(le, other), eq.clone());
        assert_eq!(minimize(Some(pred)), Some(eq));
    }

    #[test]
    fn second_application_changes_nothing() {
        let eq = cmp(Operator::Eq, input(0), int(3));
        let ne = cmp(Operator::Ne, input(1), int(4));
        let nested = Arc::new(Predicate::Not(and(
            eq.clone(),
            or(ne, cmp(Operator::Lt, input(2), int(9))),
        )));

        let once = minimize(Some(nested));
        let twice = minimize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_constraint_stays_absent() {
        assert_eq!(minimize(None), None);
    }
}
