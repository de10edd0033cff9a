//! Boolean structure over expressions
//!
//! A predicate is the path condition as collected so far: expression atoms
//! joined by `and`/`or`/`not`. Like expressions, predicates are immutable
//! and shared through `Arc`; the "no constraint yet" state is an
//! `Option<Pred>` at the call sites, and the combinators absorb it so
//! constraint accumulation never special-cases the first conjunct.
//!
//! [`Predicate::is_opposite_of`] powers both redundancy elimination and
//! merge recovery. It recognizes contradiction only in shapes that arise
//! from branch duplication (two arms of the same conditional, negated
//! copies, conjunctions sharing a contradictory member), which keeps it
//! cheap and conservative.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::expression::{Expr, Expression};
use super::variable::Variable;

/// Shared handle to an immutable predicate node
pub type Pred = Arc<Predicate>;

/// Connective of a binary predicate node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "and"),
            Connective::Or => write!(f, "or"),
        }
    }
}

/// Immutable boolean combination of [`Expression`] atoms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    Expr(Expr),
    Not(Pred),
    Binary {
        op: Connective,
        left: Pred,
        right: Pred,
    },
}

static TRUE: Lazy<Pred> = Lazy::new(|| Arc::new(Predicate::Expr(Expression::bool_true())));
static FALSE: Lazy<Pred> = Lazy::new(|| Arc::new(Predicate::Expr(Expression::bool_false())));

impl Predicate {
    pub fn expr(expression: Expr) -> Pred {
        Arc::new(Predicate::Expr(expression))
    }

    pub fn truth() -> Pred {
        TRUE.clone()
    }

    pub fn falsity() -> Pred {
        FALSE.clone()
    }

    /// Negation; absent stays absent
    pub fn not(pred: Option<Pred>) -> Option<Pred> {
        pred.map(|p| Arc::new(Predicate::Not(p)))
    }

    pub fn and(left: Option<Pred>, right: Option<Pred>) -> Option<Pred> {
        Predicate::join(Connective::And, left, right)
    }

    pub fn or(left: Option<Pred>, right: Option<Pred>) -> Option<Pred> {
        Predicate::join(Connective::Or, left, right)
    }

    /// Joins two optional predicates, absorbing missing sides and collapsing
    /// equal ones
    pub fn join(op: Connective, left: Option<Pred>, right: Option<Pred>) -> Option<Pred> {
        let (left, right) = match (left, right) {
            (None, None) => return None,
            (None, Some(r)) => return Some(r),
            (Some(l), None) => return Some(l),
            (Some(l), Some(r)) => (l, r),
        };
        if left == right {
            return Some(left);
        }
        Some(Arc::new(Predicate::Binary { op, left, right }))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Shape queries
    // ═══════════════════════════════════════════════════════════════════

    pub fn is_expr(&self) -> bool {
        matches!(self, Predicate::Expr(_))
    }

    pub fn expression(&self) -> Option<&Expr> {
        match self {
            Predicate::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn connective(&self) -> Option<Connective> {
        match self {
            Predicate::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.expression()
            .and_then(|e| e.variable())
            .is_some_and(|v| *v == Variable::boolean(true))
    }

    pub fn is_false(&self) -> bool {
        self.expression()
            .and_then(|e| e.variable())
            .is_some_and(|v| *v == Variable::boolean(false))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Structure search
    // ═══════════════════════════════════════════════════════════════════

    /// True when satisfying `self` is at least as demanding as `other`:
    /// equality at atoms, either branch of a conjunction, both branches of a
    /// disjunction
    pub fn contains(&self, other: &Predicate) -> bool {
        if self == other {
            return true;
        }
        match self {
            Predicate::Binary {
                op: Connective::And,
                left,
                right,
            } => left.contains(other) || right.contains(other),
            Predicate::Binary {
                op: Connective::Or,
                left,
                right,
            } => left.contains(other) && right.contains(other),
            _ => false,
        }
    }

    /// True when `expression` occurs anywhere in the predicate
    pub fn contains_expression(&self, expression: &Expression) -> bool {
        match self {
            Predicate::Expr(e) => e.contains(expression),
            Predicate::Not(child) => child.contains_expression(expression),
            Predicate::Binary { left, right, .. } => {
                left.contains_expression(expression) || right.contains_expression(expression)
            }
        }
    }

    pub fn depends_on_input(&self) -> bool {
        match self {
            Predicate::Expr(e) => e.depends_on_input(),
            Predicate::Not(child) => child.depends_on_input(),
            Predicate::Binary { left, right, .. } => {
                left.depends_on_input() || right.depends_on_input()
            }
        }
    }

    /// Appends symbolic variables in first-encounter order, without
    /// duplicates
    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Predicate::Expr(e) => e.collect_variables(out),
            Predicate::Not(child) => child.collect_variables(out),
            Predicate::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    // ═══════════════════════════════════════════════════════════════════
    // Contradiction
    // ═══════════════════════════════════════════════════════════════════

    /// True when the two predicates cannot hold together, in the shapes
    /// branch duplication produces
    pub fn is_opposite_of(&self, other: &Predicate) -> bool {
        if let (Predicate::Expr(a), Predicate::Expr(b)) = (self, other) {
            return a.is_opposite_of(b);
        }
        if let Predicate::Not(child) = other {
            return *self == **child;
        }
        if let Predicate::Not(child) = self {
            return **child == *other;
        }
        if let (
            Predicate::Binary {
                op: this_op,
                left: this_left,
                right: this_right,
            },
            Predicate::Binary {
                op: other_op,
                left: other_left,
                right: other_right,
            },
        ) = (self, other)
        {
            match (this_op, other_op) {
                (Connective::Or, Connective::Or) => {
                    if this_left.is_opposite_of(other_left)
                        && this_right.is_opposite_of(other_right)
                    {
                        return true;
                    }
                    if this_left.is_opposite_of(other_right)
                        && this_right.is_opposite_of(other_left)
                    {
                        return true;
                    }
                }
                (Connective::And, Connective::And) => {
                    return this_left.is_opposite_of(other_left)
                        || this_right.is_opposite_of(other_right);
                }
                _ => {}
            }
            return false;
        }
        if self.is_expr() {
            if let Predicate::Binary {
                op: Connective::And,
                left,
                right,
            } = other
            {
                return self.is_opposite_of(left) || self.is_opposite_of(right);
            }
        }
        if other.is_expr() {
            if let Predicate::Binary {
                op: Connective::And,
                left,
                right,
            } = self
            {
                return other.is_opposite_of(left) || other.is_opposite_of(right);
            }
        }
        false
    }

    /// Multi-line rendering with one atom per line, children indented under
    /// their connective
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, indent: usize) {
        match self {
            Predicate::Expr(_) | Predicate::Not(_) => {
                for _ in 0..indent {
                    out.push_str("  ");
                }
                out.push_str(&self.to_string());
                out.push('\n');
            }
            Predicate::Binary { op, left, right } => {
                if left.connective() == Some(*op) {
                    left.write_tree(out, indent);
                } else {
                    left.write_tree(out, indent + 1);
                }
                for _ in 0..indent {
                    out.push_str("  ");
                }
                out.push_str(&op.to_string());
                out.push('\n');
                if right.connective() == Some(*op) {
                    right.write_tree(out, indent);
                } else {
                    right.write_tree(out, indent + 1);
                }
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Expr(e) => write!(f, "({})", e),
            Predicate::Not(child) => {
                if child.is_expr() {
                    write!(f, "not{}", child)
                } else {
                    write!(f, "not({})", child)
                }
            }
            Predicate::Binary { op, left, right } => {
                let side = |p: &Predicate, f: &mut fmt::Formatter<'_>| -> fmt::Result {
                    if p.is_expr() || p.connective() == Some(*op) {
                        write!(f, "{}", p)
                    } else {
                        write!(f, "({})", p)
                    }
                };
                side(left, f)?;
                write!(f, "{}", op)?;
                side(right, f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::constraint::domain::expression::Operator;
    use crate::shared::models::ValueType;

    fn atom(op: Operator, n: usize, value: i64) -> Pred {
        let left = Expression::leaf(Variable::input(n, 1, ValueType::Int));
        let right = Expression::leaf(Variable::int(value));
        Predicate::expr(Expression::combine(op, Some(left), Some(right)).unwrap())
    }

    #[test]
    fn join_absorbs_and_collapses() {
        assert!(Predicate::and(None, None).is_none());
        let a = atom(Operator::Eq, 0, 1);
        assert_eq!(Predicate::and(Some(a.clone()), None), Some(a.clone()));
        assert_eq!(Predicate::or(Some(a.clone()), Some(a.clone())), Some(a));
    }

    #[test]
    fn display_flattens_same_connective() {
        let a = atom(Operator::Eq, 0, 1);
        let b = atom(Operator::Eq, 1, 2);
        let c = atom(Operator::Eq, 2, 3);
        let ab = Predicate::and(Some(a), Some(b)).unwrap();
        let abc = Predicate::and(Some(ab), Some(c)).unwrap();
        assert_eq!(
            abc.to_string(),
            "(<Input0>1 == 1)and(<Input1>1 == 2)and(<Input2>1 == 3)"
        );
    }

    #[test]
    fn display_parenthesizes_mixed_connectives() {
        let a = atom(Operator::Eq, 0, 1);
        let b = atom(Operator::Eq, 1, 2);
        let c = atom(Operator::Eq, 2, 3);
        let or = Predicate::or(Some(a), Some(b)).unwrap();
        let both = Predicate::and(Some(or), Some(c)).unwrap();
        assert_eq!(
            both.to_string(),
            "((<Input0>1 == 1)or(<Input1>1 == 2))and(<Input2>1 == 3)"
        );
    }

    #[test]
    fn negated_copy_is_opposite() {
        let a = atom(Operator::Gt, 0, 9);
        let not_a = Predicate::not(Some(a.clone())).unwrap();
        assert!(a.is_opposite_of(&not_a));
        assert!(not_a.is_opposite_of(&a));
        assert!(!a.is_opposite_of(&a));
    }

    #[test]
    fn branch_arms_are_opposite() {
        let eq = atom(Operator::Eq, 0, 1);
        let ne = atom(Operator::Ne, 0, 1);
        assert!(eq.is_opposite_of(&ne));
    }

    #[test]
    fn conjunctions_with_contradictory_members_are_opposite() {
        let shared = atom(Operator::Eq, 1, 7);
        let eq = atom(Operator::Eq, 0, 1);
        let ne = atom(Operator::Ne, 0, 1);
        let a = Predicate::and(Some(shared.clone()), Some(eq.clone())).unwrap();
        let b = Predicate::and(Some(shared), Some(ne.clone())).unwrap();
        assert!(a.is_opposite_of(&b));
        assert!(eq.is_opposite_of(&b));
        assert!(a.is_opposite_of(&ne));
    }

    #[test]
    fn disjunctions_are_opposite_pairwise() {
        let eq0 = atom(Operator::Eq, 0, 1);
        let ne0 = atom(Operator::Ne, 0, 1);
        let eq1 = atom(Operator::Eq, 1, 5);
        let ne1 = atom(Operator::Ne, 1, 5);
        let a = Predicate::or(Some(eq0.clone()), Some(eq1.clone())).unwrap();
        let straight = Predicate::or(Some(ne0.clone()), Some(ne1.clone())).unwrap();
        let crossed = Predicate::or(Some(ne1), Some(ne0)).unwrap();
        assert!(a.is_opposite_of(&straight));
        assert!(a.is_opposite_of(&crossed));
        let same = Predicate::or(Some(eq0), Some(eq1)).unwrap();
        assert!(!a.is_opposite_of(&same));
    }

    #[test]
    fn containment_through_connectives() {
        let a = atom(Operator::Eq, 0, 1);
        let b = atom(Operator::Eq, 1, 2);
        let and = Predicate::and(Some(a.clone()), Some(b.clone())).unwrap();
        let or = Predicate::or(Some(a.clone()), Some(b.clone())).unwrap();
        assert!(and.contains(&a));
        assert!(!or.contains(&a));
        assert!(or.contains(&or));
    }
}
