//! Feature modules
//!
//! Vertical slices over the shared program model. Layering inside each
//! slice: `domain` for the pure types and algebra, `application` for
//! orchestration, `infrastructure` for engine machinery and adapters.

pub mod constraint;
pub mod dependency;
pub mod events;
pub mod solver;
pub mod traversal;
