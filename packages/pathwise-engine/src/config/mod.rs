//! Run configuration
//!
//! Settings for a whole analysis run: which API calls to anchor on, time
//! budgets, worker counts, and walk depth limits. Loadable from YAML with
//! validation at load time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Target Selection
// ═══════════════════════════════════════════════════════════════════════════

/// How a target method is selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// Exact method signature, `<class: ret name(args)>`
    Signature(String),
    /// Regular expression matched against full method signatures
    Pattern(String),
}

impl TargetSpec {
    /// Shorthand for an exact-signature target
    pub fn signature(sig: impl Into<String>) -> Self {
        TargetSpec::Signature(sig.into())
    }

    /// Shorthand for a pattern target
    pub fn pattern(regex: impl Into<String>) -> Self {
        TargetSpec::Pattern(regex.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Analysis Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Engine-wide settings for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Tool version stamped into reports
    pub version: String,

    /// Methods whose call sites anchor the analysis
    pub target_methods: Vec<TargetSpec>,

    /// Deadline for analyzing a single call path (seconds)
    #[serde(with = "duration_secs")]
    pub per_path_timeout: Duration,

    /// Wall-clock budget for the whole run; `None` runs to completion
    #[serde(with = "opt_duration_secs", skip_serializing_if = "Option::is_none")]
    pub global_timeout: Option<Duration>,

    /// Worker threads for path analysis
    pub threads: usize,

    /// Times a single instruction may be revisited within one walk
    pub max_instruction_visits: u32,

    /// Call depth for inlining auxiliary method summaries
    pub aux_depth: u32,

    /// Recursion depth when resolving supporting events below the target
    pub dependency_depth: u32,

    /// How often partial reports are flushed to disk (seconds)
    #[serde(with = "duration_secs")]
    pub checkpoint_interval: Duration,

    /// Directory receiving the report and constraint scripts
    pub output_dir: PathBuf,

    /// Echo each derived path predicate to the log
    pub print_constraints: bool,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_per_path_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_checkpoint_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("pathwise-out")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            target_methods: Vec::new(),
            per_path_timeout: default_per_path_timeout(),
            global_timeout: None,
            threads: num_cpus::get(),
            max_instruction_visits: 3,
            aux_depth: 1,
            dependency_depth: 1,
            checkpoint_interval: default_checkpoint_interval(),
            output_dir: default_output_dir(),
            print_constraints: false,
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with default limits and no targets
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact-signature target
    pub fn target_signature(mut self, sig: impl Into<String>) -> Self {
        self.target_methods.push(TargetSpec::signature(sig));
        self
    }

    /// Add a pattern target
    pub fn target_pattern(mut self, regex: impl Into<String>) -> Self {
        self.target_methods.push(TargetSpec::pattern(regex));
        self
    }

    /// Set the per-path deadline
    pub fn per_path_timeout(mut self, timeout: Duration) -> Self {
        self.per_path_timeout = timeout;
        self
    }

    /// Set the wall-clock budget for the whole run
    pub fn global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = Some(timeout);
        self
    }

    /// Set the worker thread count
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the per-instruction revisit allowance
    pub fn max_instruction_visits(mut self, visits: u32) -> Self {
        self.max_instruction_visits = visits;
        self
    }

    /// Set the auxiliary summary depth
    pub fn aux_depth(mut self, depth: u32) -> Self {
        self.aux_depth = depth;
        self
    }

    /// Set the supporting-event recursion depth
    pub fn dependency_depth(mut self, depth: u32) -> Self {
        self.dependency_depth = depth;
        self
    }

    /// Set the checkpoint flush interval
    pub fn checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Enable or disable predicate echoing
    pub fn print_constraints(mut self, enabled: bool) -> Self {
        self.print_constraints = enabled;
        self
    }

    /// Validate settings, rejecting values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target_methods.is_empty() {
            return Err(EngineError::config(
                "no target methods configured; add at least one signature or pattern",
            ));
        }
        if self.threads == 0 {
            return Err(EngineError::config("threads must be at least 1"));
        }
        if self.per_path_timeout.is_zero() {
            return Err(EngineError::config("per_path_timeout must be non-zero"));
        }
        if self.checkpoint_interval.is_zero() {
            return Err(EngineError::config("checkpoint_interval must be non-zero"));
        }
        if self.max_instruction_visits == 0 {
            return Err(EngineError::config(
                "max_instruction_visits must be at least 1",
            ));
        }
        for target in &self.target_methods {
            if let TargetSpec::Pattern(regex) = target {
                regex::Regex::new(regex).map_err(|e| {
                    EngineError::config(format!("invalid target pattern '{regex}': {e}"))
                })?;
            }
        }
        Ok(())
    }

    /// Load and validate a configuration from a YAML file
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            EngineError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Export to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| EngineError::config(format!("failed to serialize configuration: {e}")))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Serde Helpers - Durations as Plain Seconds
// ═══════════════════════════════════════════════════════════════════════════

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<Duration>, D::Error> {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_populate_every_limit() {
        let config = AnalysisConfig::default();

        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert!(config.target_methods.is_empty());
        assert_eq!(config.per_path_timeout, Duration::from_secs(300));
        assert_eq!(config.global_timeout, None);
        assert_eq!(config.threads, num_cpus::get());
        assert_eq!(config.max_instruction_visits, 3);
        assert_eq!(config.aux_depth, 1);
        assert_eq!(config.dependency_depth, 1);
        assert_eq!(config.checkpoint_interval, Duration::from_secs(30));
        assert!(!config.print_constraints);
    }

    #[test]
    fn builder_setters_compose() {
        let config = AnalysisConfig::new()
            .target_signature("<android.telephony.SmsManager: void sendTextMessage(java.lang.String,java.lang.String,java.lang.String,android.app.PendingIntent,android.app.PendingIntent)>")
            .target_pattern(r"sendTextMessage|sendMultipartTextMessage")
            .per_path_timeout(Duration::from_secs(60))
            .global_timeout(Duration::from_secs(3600))
            .threads(4)
            .dependency_depth(2)
            .output_dir("/tmp/out")
            .print_constraints(true);

        assert_eq!(config.target_methods.len(), 2);
        assert_eq!(config.per_path_timeout, Duration::from_secs(60));
        assert_eq!(config.global_timeout, Some(Duration::from_secs(3600)));
        assert_eq!(config.threads, 4);
        assert_eq!(config.dependency_depth, 2);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.print_constraints);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn durations_serialize_as_plain_seconds() {
        let config = AnalysisConfig::new()
            .target_pattern("sendTextMessage")
            .global_timeout(Duration::from_secs(7200));

        let yaml = config.to_yaml().unwrap();

        assert!(yaml.contains("per_path_timeout: 300"), "{yaml}");
        assert!(yaml.contains("checkpoint_interval: 30"), "{yaml}");
        assert!(yaml.contains("global_timeout: 7200"), "{yaml}");
    }

    #[test]
    fn yaml_round_trips_through_a_file() {
        let config = AnalysisConfig::new()
            .target_signature("<com.app.Api: void leak(java.lang.String)>")
            .target_pattern("exec.*")
            .per_path_timeout(Duration::from_secs(45))
            .threads(2)
            .max_instruction_visits(5);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.yaml");
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

        let loaded = AnalysisConfig::from_yaml(&path).unwrap();

        assert_eq!(loaded.target_methods, config.target_methods);
        assert_eq!(loaded.per_path_timeout, Duration::from_secs(45));
        assert_eq!(loaded.global_timeout, None);
        assert_eq!(loaded.threads, 2);
        assert_eq!(loaded.max_instruction_visits, 5);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let yaml = r#"
target_methods:
  - pattern: "sendTextMessage"
threads: 8
"#;
        let config: AnalysisConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.threads, 8);
        assert_eq!(config.per_path_timeout, Duration::from_secs(300));
        assert_eq!(config.dependency_depth, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_empty_target_lists() {
        let err = AnalysisConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("target methods"));
    }

    #[test]
    fn validation_rejects_zero_workers() {
        let err = AnalysisConfig::new()
            .target_pattern("x")
            .threads(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn validation_rejects_malformed_patterns() {
        let err = AnalysisConfig::new()
            .target_pattern("(unclosed")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("invalid target pattern"));
    }
}
