//! Run orchestration
//!
//! One driver call covers a whole analysis: a single-threaded traversal
//! collects target paths and seeds the heap-write cache, then a worker
//! pool analyzes each path end to end and streams finished chains into
//! the checkpointing report writer. Two clocks bound the work: a per-path
//! deadline observed cooperatively inside the walk, and an optional global
//! budget that stops the pool from taking further paths.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{error, info, warn};
use uuid::Uuid;

use pathwise_report::{ReportWriter, StatsRecord};

use crate::config::AnalysisConfig;
use crate::errors::{EngineError, Result};
use crate::features::constraint::infrastructure::WalkLimits;
use crate::features::dependency::{DependencyAnalysis, HeapWriteCache, HeapWritePlugin};
use crate::features::events::{CallPath, ChainAssembler, ChainRenderer};
use crate::features::solver::SatOracle;
use crate::features::traversal::{CallGraph, CallGraphTraversal};
use crate::pipeline::targets::{TargetMatcher, TargetSitePlugin};
use crate::shared::cancel::CancelToken;
use crate::shared::ports::{AliasProvider, ProgramModel, ResourceTable};

/// Terminal state of one path's analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// A chain was persisted, carrying this many supporting events
    Emitted { supports: usize },
    /// The path predicate is unsatisfiable; a normal discard
    Infeasible,
    /// The per-path deadline fired; the path is not retried
    TimedOut,
    /// An analysis or persistence error ended the path
    Failed,
}

/// Aggregate counters for one run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Call paths reaching a target site
    pub paths_found: usize,
    /// Paths the pool analyzed before the budget ran out
    pub paths_analyzed: usize,
    /// Paths discarded with an unsatisfiable predicate
    pub paths_infeasible: usize,
    /// Paths cut off by the per-path deadline
    pub paths_timed_out: usize,
    /// Paths dropped by an analysis or persistence error
    pub paths_failed: usize,
    /// Event chains written to the report
    pub chains_emitted: usize,
    /// Supporting events resolved into those chains
    pub supporting_events: usize,
    /// Memoized producer analyses reused by the heap cache
    pub cache_hits: usize,
    /// Wall-clock duration of the whole run
    pub elapsed: Duration,
}

impl RunStats {
    fn record(&self) -> StatsRecord {
        StatsRecord {
            paths_analyzed: self.paths_analyzed,
            paths_infeasible: self.paths_infeasible,
            paths_timed_out: self.paths_timed_out,
            paths_failed: self.paths_failed,
            chains_emitted: self.chains_emitted,
            supporting_events: self.supporting_events,
            cache_hits: self.cache_hits,
            elapsed_seconds: self.elapsed.as_secs(),
        }
    }
}

/// Whole-run orchestrator
pub struct AnalysisDriver<'p> {
    program: &'p dyn ProgramModel,
    aliases: &'p dyn AliasProvider,
    resources: &'p dyn ResourceTable,
    oracle: &'p dyn SatOracle,
    config: AnalysisConfig,
}

impl<'p> AnalysisDriver<'p> {
    pub fn new(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        resources: &'p dyn ResourceTable,
        oracle: &'p dyn SatOracle,
        config: AnalysisConfig,
    ) -> Self {
        AnalysisDriver {
            program,
            aliases,
            resources,
            oracle,
            config,
        }
    }

    /// Runs the full analysis over `graph` and persists the report
    pub fn run(&self, graph: &CallGraph, app: Option<String>) -> Result<RunStats> {
        self.config.validate()?;
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            run = %run_id,
            targets = self.config.target_methods.len(),
            threads = self.config.threads,
            "analysis starting"
        );

        let limits = WalkLimits {
            max_instruction_visits: self.config.max_instruction_visits,
            max_aux_depth: self.config.aux_depth as usize,
        };

        // Phase 1: single pass over the call graph fills the target list
        // and the heap-write index together
        let matcher = TargetMatcher::compile(&self.config.target_methods)?;
        let mut targets = TargetSitePlugin::new(matcher);
        let cache = HeapWriteCache::new(self.program, self.aliases, self.oracle, limits);
        let mut writes = HeapWritePlugin::new(&cache);
        CallGraphTraversal::new(graph, self.program).run(&mut [&mut targets, &mut writes])?;

        let paths = targets.into_paths();
        info!(
            paths = paths.len(),
            writes = cache.write_count(),
            "traversal finished"
        );

        let writer = ReportWriter::create(
            self.config.output_dir.clone(),
            self.config.version.clone(),
            app,
        )?;

        let global = match self.config.global_timeout {
            Some(budget) => CancelToken::with_timeout(budget),
            None => CancelToken::unbounded(),
        };

        // Phase 2: each worker owns one path end to end
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| EngineError::internal(format!("worker pool construction failed: {e}")))?;

        let stats = Mutex::new(RunStats {
            paths_found: paths.len(),
            ..RunStats::default()
        });
        let last_checkpoint = Mutex::new(Instant::now());

        pool.install(|| {
            paths.par_iter().for_each(|path| {
                if global.is_cancelled() {
                    return;
                }
                let outcome = self.analyze_path(path, limits, &cache, &writer, &global);
                {
                    let mut tally = stats.lock();
                    tally.paths_analyzed += 1;
                    match outcome {
                        PathOutcome::Emitted { supports } => {
                            tally.chains_emitted += 1;
                            tally.supporting_events += supports;
                        }
                        PathOutcome::Infeasible => tally.paths_infeasible += 1,
                        PathOutcome::TimedOut => tally.paths_timed_out += 1,
                        PathOutcome::Failed => tally.paths_failed += 1,
                    }
                }
                self.checkpoint_if_due(&writer, &last_checkpoint);
            });
        });

        if global.is_cancelled() {
            warn!("global time budget exhausted, finalizing with partial results");
        }

        let mut stats = stats.into_inner();
        stats.cache_hits = cache.hit_count();
        stats.elapsed = started.elapsed();

        writer.set_stats(stats.record());
        writer.checkpoint()?;
        info!(
            run = %run_id,
            analyzed = stats.paths_analyzed,
            chains = stats.chains_emitted,
            infeasible = stats.paths_infeasible,
            timed_out = stats.paths_timed_out,
            failed = stats.paths_failed,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "analysis finished"
        );
        Ok(stats)
    }

    /// One worker's whole job: derive, resolve, render, persist
    fn analyze_path(
        &self,
        path: &CallPath,
        limits: WalkLimits,
        cache: &HeapWriteCache<'p>,
        writer: &ReportWriter,
        global: &CancelToken,
    ) -> PathOutcome {
        let token = global.child_with_timeout(self.config.per_path_timeout);
        let dependencies = DependencyAnalysis::new(
            cache,
            self.resources,
            self.config.dependency_depth as usize,
        );
        let assembler = ChainAssembler::new(self.program, self.aliases, dependencies, limits);

        let chain = match assembler.assemble(path, &token) {
            Ok(Some(chain)) => chain,
            Ok(None) => return PathOutcome::Infeasible,
            Err(err) if err.is_timeout() => {
                warn!(path = %path, "path analysis hit its deadline");
                return PathOutcome::TimedOut;
            }
            Err(err) => {
                error!(path = %path, error = %err, "path analysis failed");
                return PathOutcome::Failed;
            }
        };

        if self.config.print_constraints {
            match chain.target().constraint() {
                Some(constraint) => {
                    info!(path = %path, constraint = %constraint, "path predicate");
                }
                None => info!(path = %path, "path predicate: unconstrained"),
            }
        }

        let (record, scripts) = match ChainRenderer::new(self.program).render(&chain, &token) {
            Ok(parts) => parts,
            Err(err) if err.is_timeout() => {
                warn!(chain = chain.id(), "solver encoding hit the path deadline");
                return PathOutcome::TimedOut;
            }
            Err(err) => {
                error!(chain = chain.id(), error = %err, "chain rendering failed");
                return PathOutcome::Failed;
            }
        };

        let supports = chain.len() - 1;
        if let Err(err) = writer.add_chain(chain.id(), record, &scripts) {
            error!(chain = chain.id(), error = %err, "chain persistence failed");
            return PathOutcome::Failed;
        }
        PathOutcome::Emitted { supports }
    }

    fn checkpoint_if_due(&self, writer: &ReportWriter, last: &Mutex<Instant>) {
        let due = {
            let mut last = last.lock();
            if last.elapsed() >= self.config.checkpoint_interval {
                *last = Instant::now();
                true
            } else {
                false
            }
        };
        if due {
            if let Err(err) = writer.checkpoint() {
                warn!(error = %err, "periodic checkpoint failed");
            }
        }
    }
}
