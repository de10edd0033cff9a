/*
 * Pathwise Report - Durable Analysis Output
 *
 * Serialized event-chain records, the solver scripts that accompany
 * them, and a checkpointing writer that keeps the on-disk document
 * consistent while worker threads keep adding chains.
 */

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, ReportError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use domain::{ChainRecord, EventRecord, ReportDocument, StatsRecord};
pub use infrastructure::{ReportWriter, ScriptFile, REPORT_FILE};
