/*
 * Pathwise Engine - Path-Sensitive Symbolic Constraint Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model, provider ports, cancellation
 * - features/    : Vertical slices (constraint → events → dependency → solver → traversal)
 * - pipeline/    : Parallel per-path orchestration and checkpointing
 * - config/      : Run configuration (YAML)
 *
 * Derives solver-checkable feasibility conditions for control-flow paths
 * reaching targeted API calls, and reconstructs the chains of prior paths
 * (heap writes, store reads) a feasible run depends on.
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared program model and provider ports
pub mod shared;

/// Feature modules
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::AnalysisConfig;
pub use errors::{EngineError, Result};
pub use features::constraint::{PathAnalysis, PathConstraint};
pub use features::events::{CallPath, Event, EventChain};
pub use pipeline::driver::{AnalysisDriver, RunStats};
