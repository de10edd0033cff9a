//! Value sets for locals with several possible definitions
//!
//! Control-flow joins leave a local holding one of several symbolic values.
//! An [`ExpressionSet`] tracks those alternatives in first-insertion order,
//! deduplicated, and lowers to a predicate as the disjunction of its
//! members. Operations distribute pointwise: combining two sets under an
//! operator combines every pairing.

use std::fmt;

use super::expression::{Expr, Expression, Operator};
use super::predicate::{Pred, Predicate};
use super::variable::Variable;

/// Ordered, deduplicated alternatives for one value
#[derive(Debug, Clone, Default)]
pub struct ExpressionSet {
    exprs: Vec<Expr>,
}

impl ExpressionSet {
    pub fn new() -> Self {
        ExpressionSet { exprs: Vec::new() }
    }

    pub fn from_expr(expr: Expr) -> Self {
        ExpressionSet { exprs: vec![expr] }
    }

    pub fn add(&mut self, expr: Expr) {
        if !self.exprs.contains(&expr) {
            self.exprs.push(expr);
        }
    }

    pub fn extend_with(&mut self, other: &ExpressionSet) {
        for expr in &other.exprs {
            self.add(expr.clone());
        }
    }

    pub fn contains(&self, expr: &Expression) -> bool {
        self.exprs.iter().any(|e| **e == *expr)
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.exprs.iter()
    }

    pub fn first(&self) -> Option<&Expr> {
        self.exprs.first()
    }

    /// The sole member, when the set has exactly one
    pub fn single(&self) -> Option<&Expr> {
        match self.exprs.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn collect_variables(&self, out: &mut Vec<Variable>) {
        for expr in &self.exprs {
            expr.collect_variables(out);
        }
    }

    /// Disjunction of the alternatives: the value is one of these
    pub fn to_predicate(&self) -> Option<Pred> {
        let mut pred = None;
        for expr in &self.exprs {
            pred = Predicate::or(pred, Some(Predicate::expr(expr.clone())));
        }
        pred
    }

    /// Disjunction of the negated alternatives, used to rule a branch out
    pub fn to_not_predicate(&self) -> Option<Pred> {
        let mut pred = None;
        for expr in &self.exprs {
            pred = Predicate::or(pred, Predicate::not(Some(Predicate::expr(expr.clone()))));
        }
        pred
    }

    /// Pointwise rewrite preserving order and deduplication
    pub fn map(&self, f: impl Fn(&Expr) -> Expr) -> ExpressionSet {
        let mut result = ExpressionSet::new();
        for expr in &self.exprs {
            result.add(f(expr));
        }
        result
    }

    /// Union of several sets in iteration order
    pub fn merge<'a>(sets: impl IntoIterator<Item = &'a ExpressionSet>) -> ExpressionSet {
        let mut result = ExpressionSet::new();
        for set in sets {
            result.extend_with(set);
        }
        result
    }

    /// Cartesian combination under `op`, absorbing missing sides
    pub fn combine(
        op: Operator,
        left: Option<&ExpressionSet>,
        right: Option<&ExpressionSet>,
    ) -> Option<ExpressionSet> {
        let (left, right) = match (left, right) {
            (None, None) => return None,
            (None, Some(r)) => return Some(r.clone()),
            (Some(l), None) => return Some(l.clone()),
            (Some(l), Some(r)) => (l, r),
        };
        let mut result = ExpressionSet::new();
        for l in &left.exprs {
            for r in &right.exprs {
                if let Some(combined) =
                    Expression::combine(op, Some(l.clone()), Some(r.clone()))
                {
                    result.add(combined);
                }
            }
        }
        Some(result)
    }
}

impl From<Expr> for ExpressionSet {
    fn from(expr: Expr) -> Self {
        ExpressionSet::from_expr(expr)
    }
}

impl PartialEq for ExpressionSet {
    /// Set equality: order does not matter
    fn eq(&self, other: &Self) -> bool {
        self.exprs.len() == other.exprs.len()
            && self.exprs.iter().all(|e| other.exprs.contains(e))
    }
}

impl Eq for ExpressionSet {}

impl fmt::Display for ExpressionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, expr) in self.exprs.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            write!(f, "{}", expr)?;
        }
        Ok(())
    }
}
