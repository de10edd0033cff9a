//! Program representation ports

use std::sync::Arc;

use crate::shared::models::{AliasSig, FieldAccess, MethodBody, MethodRef};

/// Access to the analyzed program's methods
///
/// Implementations must be cheap to query; the engine looks bodies up once
/// per analyzed edge and caches nothing here.
pub trait ProgramModel: Send + Sync {
    /// Body of a method, `None` for library or phantom methods
    fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>>;

    /// True when the method belongs to the application under analysis
    /// (auxiliary-call recursion only descends into application methods)
    fn is_app_method(&self, method: &MethodRef) -> bool;

    /// Class-hierarchy test, true when `class` equals or extends `base`.
    /// Drives entry-point classification; the default knows no hierarchy.
    fn is_subclass_of(&self, _class: &str, _base: &str) -> bool {
        false
    }
}

/// Approximate alias information for heap locations
pub trait AliasProvider: Send + Sync {
    /// Signature of the location a field access may touch; empty when the
    /// provider has no points-to information for it
    fn alias_sig(&self, access: &FieldAccess, in_method: &MethodRef) -> AliasSig;
}
