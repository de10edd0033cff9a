//! Persistence adapters

pub mod writer;

pub use writer::{ReportWriter, ScriptFile, REPORT_FILE};
