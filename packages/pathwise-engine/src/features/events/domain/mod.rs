//! Event-chain domain model

pub mod call_path;
pub mod chain;
pub mod event;

pub use call_path::{CallEdge, CallPath};
pub use chain::{ChainEvent, EventChain};
pub use event::{EntryKind, Event, SupportingEvent};
