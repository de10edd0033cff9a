//! Target method selection
//!
//! Compiles the configured target list into one matcher over callee
//! signatures, and exposes the traversal plugin that turns every reached
//! call to a matched method into a [`CallPath`] for the analysis pool.

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::TargetSpec;
use crate::errors::{EngineError, Result};
use crate::features::events::domain::CallPath;
use crate::features::traversal::TraversalPlugin;
use crate::shared::models::{Instruction, MethodRef};

/// Compiled form of the configured target list
#[derive(Debug)]
pub struct TargetMatcher {
    signatures: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl TargetMatcher {
    /// Compiles the specs, failing on a malformed pattern
    pub fn compile(targets: &[TargetSpec]) -> Result<Self> {
        let mut signatures = FxHashSet::default();
        let mut patterns = Vec::new();
        for target in targets {
            match target {
                TargetSpec::Signature(sig) => {
                    signatures.insert(sig.clone());
                }
                TargetSpec::Pattern(pattern) => {
                    let regex = Regex::new(pattern).map_err(|e| {
                        EngineError::config(format!("invalid target pattern '{pattern}': {e}"))
                    })?;
                    patterns.push(regex);
                }
            }
        }
        Ok(TargetMatcher {
            signatures,
            patterns,
        })
    }

    /// Whether a callee signature is one of the analysis targets
    pub fn matches(&self, signature: &str) -> bool {
        self.signatures.contains(signature)
            || self.patterns.iter().any(|regex| regex.is_match(signature))
    }
}

/// Collects one path per reached call site of a target method
pub struct TargetSitePlugin {
    matcher: TargetMatcher,
    paths: Vec<CallPath>,
}

impl TargetSitePlugin {
    pub fn new(matcher: TargetMatcher) -> Self {
        TargetSitePlugin {
            matcher,
            paths: Vec::new(),
        }
    }

    /// Collected paths in discovery order
    pub fn into_paths(self) -> Vec<CallPath> {
        self.paths
    }
}

impl TraversalPlugin for TargetSitePlugin {
    fn wants(&self, _method: &MethodRef, instr: &Instruction) -> bool {
        instr
            .call()
            .is_some_and(|call| self.matcher.matches(&call.callee.signature()))
    }

    fn on_target_path(&mut self, path: CallPath) {
        debug!(path = %path, "target call site reached");
        self.paths.push(path);
    }
}
