//! Dependence classification
//!
//! A feasibility predicate over symbolic state is only half an answer: a
//! heap read needs some earlier event to have written the location, and a
//! string-table read with a known id can be resolved against the packaged
//! resources outright. This module decides which treatment a recorded
//! dependence variable gets.

use crate::features::constraint::domain::{StoreKind, Variable};
use crate::shared::models::ConstValue;

/// How a dependence variable can be discharged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependenceKind {
    /// Needs a supporting event that writes the heap location
    Heap,
    /// Resolvable from the packaged string table by constant id
    Resource { id: i64 },
}

/// Classifies a variable the path constraint depends on
///
/// Returns `None` for variables no resolution strategy exists for; callers
/// log those and move on.
pub fn classify(variable: &Variable) -> Option<DependenceKind> {
    match variable {
        Variable::Heap { .. } => Some(DependenceKind::Heap),
        Variable::KeyValue {
            store: StoreKind::StringTable,
            key: Some(key),
            ..
        } => match key.as_constant() {
            Some(ConstValue::Int(id)) => Some(DependenceKind::Resource { id: *id }),
            _ => None,
        },
        _ => None,
    }
}
