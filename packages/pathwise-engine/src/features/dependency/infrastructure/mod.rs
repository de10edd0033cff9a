//! Dependency infrastructure

pub mod heap_cache;

pub use heap_cache::{HeapWriteCache, HeapWritePlugin};
