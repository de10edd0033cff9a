//! Report document model

pub mod records;

pub use records::{ChainRecord, EventRecord, ReportDocument, StatsRecord};
