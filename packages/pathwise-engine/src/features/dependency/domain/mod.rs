//! Dependency domain model

pub mod dependence;

pub use dependence::{classify, DependenceKind};
