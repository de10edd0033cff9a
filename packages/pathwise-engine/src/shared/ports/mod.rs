//! Shared ports
//!
//! Interfaces to the collaborators that supply the analyzed program. The
//! engine depends on these traits only; concrete providers live outside the
//! crate (tests use the fixture builder).

mod program;
mod resources;

pub use program::{AliasProvider, ProgramModel};
pub use resources::{EmptyResources, ResourceTable};
