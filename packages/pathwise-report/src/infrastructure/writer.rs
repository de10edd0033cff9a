//! Durable report persistence
//!
//! Chains accumulate in memory behind a lock and are snapshotted to disk
//! as one JSON document. Snapshots go through a temp file and an atomic
//! rename, so the document on disk is always a complete earlier state and
//! an interrupted run loses at most the interval since the last
//! checkpoint. Solver scripts are immutable once a chain is recorded and
//! are written directly into the chain's own directory.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use parking_lot::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::records::{ChainRecord, ReportDocument, StatsRecord};
use crate::error::Result;

/// Name of the report document inside the output directory
pub const REPORT_FILE: &str = "report.json";

const SCRIPT_DIR: &str = "constraints";

/// A solver script to place beside the report
#[derive(Debug, Clone)]
pub struct ScriptFile {
    pub name: String,
    pub text: String,
}

/// Thread-shared sink for finished chains
pub struct ReportWriter {
    root: PathBuf,
    state: Mutex<ReportDocument>,
}

impl ReportWriter {
    /// Opens (and creates) the output directory with an empty document
    pub fn create(
        root: impl Into<PathBuf>,
        version: impl Into<String>,
        app: Option<String>,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(ReportWriter {
            root,
            state: Mutex::new(ReportDocument::new(version, app)),
        })
    }

    /// Records one chain and persists its solver scripts
    pub fn add_chain(&self, id: u32, chain: ChainRecord, scripts: &[ScriptFile]) -> Result<()> {
        if !scripts.is_empty() {
            let dir = self.script_dir(id);
            fs::create_dir_all(&dir)?;
            for script in scripts {
                fs::write(dir.join(&script.name), &script.text)?;
            }
        }

        let mut doc = self.lock();
        doc.event_chains.insert(id, chain);
        Ok(())
    }

    pub fn chain_count(&self) -> usize {
        self.lock().event_chains.len()
    }

    /// Attaches the run's aggregate counters to the document
    pub fn set_stats(&self, stats: StatsRecord) {
        self.lock().stats = Some(stats);
    }

    /// Snapshots the document to disk
    ///
    /// The swap is atomic; if the rename fails the snapshot degrades to a
    /// direct write rather than being dropped.
    pub fn checkpoint(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.lock())?;
        let path = self.report_path();

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(json.as_bytes())?;
        if let Err(err) = tmp.persist(&path) {
            warn!(error = %err.error, "atomic report swap failed, writing directly");
            fs::write(&path, &json)?;
        }
        debug!(path = %path.display(), "report checkpoint written");
        Ok(())
    }

    /// Where the report document lives
    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Directory holding one chain's solver scripts
    pub fn script_dir(&self, id: u32) -> PathBuf {
        self.root.join(SCRIPT_DIR).join(id.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, ReportDocument> {
        self.state.lock()
    }
}
