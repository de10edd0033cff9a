//! Shared building blocks used by every feature

pub mod cancel;
pub mod models;
pub mod ports;
