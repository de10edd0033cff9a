//! Event chains
//!
//! Paths promoted to reportable events, ordered by the dependencies
//! between them.

pub mod application;
pub mod domain;

pub use application::{ChainAssembler, ChainRenderer};
pub use domain::{CallEdge, CallPath, ChainEvent, EntryKind, Event, EventChain, SupportingEvent};
