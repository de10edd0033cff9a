//! Report records
//!
//! The serialized shape of an analysis run. Field names are part of the
//! output contract: the downstream dynamic harness reads them verbatim,
//! so they stay in PascalCase regardless of Rust naming.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event inside a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    /// Injection vector tag ("activity", "service", "sms", "ui", or empty)
    #[serde(rename = "Type")]
    pub kind: String,
    /// Class owning the entry-point method
    pub component: String,
    /// Method signatures along the path, ending with the target
    /// instruction's text
    pub path: Vec<String>,
    /// Solver script file next to the report, when the event carries
    /// constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_file: Option<String>,
    /// Surfaced symbolic variable names to their solver identifiers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

/// One event chain: the target event plus the supporting events that
/// must run before it, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainRecord {
    /// Entry method of the first event to execute
    pub start: String,
    /// Signature of the invoked target method
    pub target: String,
    pub events: Vec<EventRecord>,
}

/// Aggregate counters for one run, attached to the final snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsRecord {
    /// Call paths handed to the analysis pool
    pub paths_analyzed: usize,
    /// Paths discarded with an unsatisfiable predicate
    pub paths_infeasible: usize,
    /// Paths cut off by the per-path deadline
    pub paths_timed_out: usize,
    /// Paths aborted by an analysis error
    pub paths_failed: usize,
    /// Event chains in the document
    pub chains_emitted: usize,
    /// Supporting events resolved into chains
    pub supporting_events: usize,
    /// Memoized producer analyses reused
    pub cache_hits: usize,
    /// Whole-run wall time in seconds
    pub elapsed_seconds: u64,
}

/// The whole report document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportDocument {
    pub version: String,
    pub generated: DateTime<Utc>,
    /// Identifier of the analyzed app, when the caller knows one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    pub event_chains: BTreeMap<u32, ChainRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsRecord>,
}

impl ReportDocument {
    pub fn new(version: impl Into<String>, app: Option<String>) -> Self {
        ReportDocument {
            version: version.into(),
            generated: Utc::now(),
            app,
            event_chains: BTreeMap::new(),
            stats: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn event_records_serialize_with_contract_field_names() {
        let record = EventRecord {
            kind: "ui".to_string(),
            component: "com.app.MainActivity".to_string(),
            path: vec![
                "<com.app.MainActivity: void onClick(android.view.View)>".to_string(),
                "invoke sendTextMessage".to_string(),
            ],
            constraint_file: Some("constraints0.py".to_string()),
            variables: BTreeMap::from([("<Input1>a".to_string(), "pv0".to_string())]),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "Type": "ui",
                "Component": "com.app.MainActivity",
                "Path": [
                    "<com.app.MainActivity: void onClick(android.view.View)>",
                    "invoke sendTextMessage",
                ],
                "ConstraintFile": "constraints0.py",
                "Variables": {"<Input1>a": "pv0"},
            })
        );
    }

    #[test]
    fn absent_constraints_leave_no_empty_fields() {
        let record = EventRecord {
            kind: String::new(),
            component: "com.app.Worker".to_string(),
            path: vec!["<com.app.Worker: void run()>".to_string()],
            constraint_file: None,
            variables: BTreeMap::new(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("ConstraintFile").is_none());
        assert!(value.get("Variables").is_none());
    }

    #[test]
    fn chains_key_the_document_by_id() {
        let mut doc = ReportDocument::new("0.2.0", Some("com.app".to_string()));
        doc.event_chains.insert(
            4,
            ChainRecord {
                start: "<com.app.A: void go()>".to_string(),
                target: "<android.telephony.SmsManager: void sendTextMessage(...)>".to_string(),
                events: Vec::new(),
            },
        );

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Version"], "0.2.0");
        assert_eq!(value["App"], "com.app");
        assert!(value["EventChains"]["4"]["Start"]
            .as_str()
            .unwrap()
            .contains("com.app.A"));
    }

    #[test]
    fn stats_appear_only_when_recorded() {
        let mut doc = ReportDocument::new("0.2.0", None);
        assert!(serde_json::to_value(&doc).unwrap().get("Stats").is_none());

        doc.stats = Some(StatsRecord {
            paths_analyzed: 12,
            chains_emitted: 3,
            ..StatsRecord::default()
        });
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Stats"]["PathsAnalyzed"], 12);
        assert_eq!(value["Stats"]["ChainsEmitted"], 3);
    }
}
