//! Per-location analysis state
//!
//! What the symbolic walk knows at one program point: the alternatives each
//! local may hold, the same for heap reads already materialized, and the
//! control-flow constraint accumulated along the way. States are merged at
//! join points; the value maps union pointwise and the constraints combine
//! with join-specific recovery so reconverging branches do not poison the
//! condition with `A or not A` noise.

use rustc_hash::FxHashMap;

use super::expression_set::ExpressionSet;
use super::predicate::{Pred, Predicate};
use super::variable::Variable;
use crate::shared::models::Local;

/// Symbolic state at one instruction
#[derive(Debug, Clone, Default)]
pub struct DataMap {
    /// Alternatives each live local may hold
    pub locals: FxHashMap<Local, ExpressionSet>,
    /// Alternatives for heap locations already read or written on this path
    pub heap: FxHashMap<Variable, ExpressionSet>,
    /// Condition for execution to have reached this point
    pub constraint: Option<Pred>,
}

impl DataMap {
    pub fn new() -> Self {
        DataMap::default()
    }

    pub fn local(&self, local: &Local) -> Option<&ExpressionSet> {
        self.locals.get(local)
    }

    pub fn set_local(&mut self, local: Local, values: ExpressionSet) {
        self.locals.insert(local, values);
    }

    /// Conjoins `pred` onto the accumulated constraint
    pub fn assume(&mut self, pred: Option<Pred>) {
        self.constraint = Predicate::and(self.constraint.take(), pred);
    }

    /// Join-point combination of two states
    ///
    /// Value maps union their alternatives. For the constraints, opposite
    /// conditions collapse to their shared conjunction prefix (the two arms
    /// of a branch rejoining), a condition subsumed by the other side stands
    /// alone, and anything else disjoins.
    pub fn merged(in1: &DataMap, in2: &DataMap) -> DataMap {
        let mut out = DataMap::new();

        for (local, values) in &in1.locals {
            out.locals.insert(local.clone(), values.clone());
        }
        for (local, values) in &in2.locals {
            match out.locals.get_mut(local) {
                Some(merged) => merged.extend_with(values),
                None => {
                    out.locals.insert(local.clone(), values.clone());
                }
            }
        }

        for (variable, values) in &in1.heap {
            out.heap.insert(variable.clone(), values.clone());
        }
        for (variable, values) in &in2.heap {
            match out.heap.get_mut(variable) {
                Some(merged) => merged.extend_with(values),
                None => {
                    out.heap.insert(variable.clone(), values.clone());
                }
            }
        }

        out.constraint = match (&in1.constraint, &in2.constraint) {
            (Some(c1), Some(c2)) if c1.is_opposite_of(c2) => shared_prefix(c1, c2),
            (Some(c1), Some(c2)) if c2.contains(c1) => Some(c1.clone()),
            (Some(c1), Some(c2)) if c1.contains(c2) => Some(c2.clone()),
            (c1, c2) => Predicate::or(c1.clone(), c2.clone()),
        };
        out
    }
}

/// Longest common left-spine conjunct of two constraints built by the same
/// accumulation order; `None` when they share nothing
fn shared_prefix(in1: &Pred, in2: &Pred) -> Option<Pred> {
    if in1 == in2 {
        return Some(in1.clone());
    }
    if let (
        Predicate::Binary {
            op: op1, left: l1, ..
        },
        Predicate::Binary {
            op: op2, left: l2, ..
        },
    ) = (&**in1, &**in2)
    {
        if op1 == op2 {
            return shared_prefix(l1, l2);
        }
    }
    None
}

impl PartialEq for DataMap {
    /// Convergence check: value maps only, the constraint is not part of
    /// the fixpoint state
    fn eq(&self, other: &Self) -> bool {
        self.locals == other.locals && self.heap == other.heap
    }
}

impl Eq for DataMap {}
