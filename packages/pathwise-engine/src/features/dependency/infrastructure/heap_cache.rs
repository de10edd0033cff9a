//! Heap write cache
//!
//! During traversal a plugin records every path that ends in a field store.
//! When a target event later needs a value for one of those locations, the
//! cache analyzes a matching write path on demand: the first request pays
//! for the producer analysis, the result is memoized behind a per-entry
//! lock, and every later request reuses it. A write whose store predicate
//! cannot be derived stays unresolved and is attempted again on the next
//! request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::errors::Result;
use crate::features::constraint::domain::{Predicate, Variable};
use crate::features::constraint::infrastructure::WalkLimits;
use crate::features::constraint::PathAnalysis;
use crate::features::events::domain::{CallPath, EntryKind, Event, SupportingEvent};
use crate::features::solver::SatOracle;
use crate::features::traversal::TraversalPlugin;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{InstrKind, Instruction, LValue, MethodRef};
use crate::shared::ports::{AliasProvider, ProgramModel};

/// One recorded write path with its lazily resolved producer analysis
struct CachedWrite {
    path: CallPath,
    slot: Mutex<Option<SupportingEvent>>,
}

/// Shared index of every heap-writing path in the app
pub struct HeapWriteCache<'p> {
    program: &'p dyn ProgramModel,
    aliases: &'p dyn AliasProvider,
    oracle: &'p dyn SatOracle,
    limits: WalkLimits,
    writes: DashMap<Variable, Vec<Arc<CachedWrite>>>,
    hits: AtomicUsize,
}

impl<'p> HeapWriteCache<'p> {
    pub fn new(
        program: &'p dyn ProgramModel,
        aliases: &'p dyn AliasProvider,
        oracle: &'p dyn SatOracle,
        limits: WalkLimits,
    ) -> Self {
        HeapWriteCache {
            program,
            aliases,
            oracle,
            limits,
            writes: DashMap::new(),
            hits: AtomicUsize::new(0),
        }
    }

    /// Number of write paths recorded across all locations
    pub fn write_count(&self) -> usize {
        self.writes.iter().map(|entry| entry.value().len()).sum()
    }

    /// Times a memoized producer analysis was reused
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Indexes a path ending in a field store under its heap location
    pub fn record_write(&self, path: CallPath) {
        let target = path.target_method();
        let Some(body) = self.program.body(target) else {
            return;
        };
        let Some(Instruction {
            kind:
                InstrKind::Assign {
                    lhs: LValue::Field(access),
                    ..
                },
            ..
        }) = body.instruction(path.target_site())
        else {
            return;
        };

        let location = Variable::heap(
            access.field.clone(),
            self.aliases.alias_sig(access, target),
        );
        debug!(location = %location, path = %path, "heap write recorded");
        self.writes
            .entry(location)
            .or_default()
            .push(Arc::new(CachedWrite {
                path,
                slot: Mutex::new(None),
            }));
    }

    /// Finds a write event able to supply `dependence` for the requester
    ///
    /// Candidates are accepted when their store predicate is jointly
    /// satisfiable with the requester's; the first acceptable write wins
    /// and its store predicate is conjoined into the requester's own.
    pub fn resolve(
        &self,
        requester: &mut Event,
        dependence: &Variable,
        token: &CancelToken,
    ) -> Result<Option<SupportingEvent>> {
        for entry in self.writes.iter() {
            if !entry.key().aliases(dependence) {
                continue;
            }
            for write in entry.value().iter() {
                token.check("heap dependence resolution")?;
                let candidate = match self.supporting_event(write, dependence, token) {
                    Ok(Some(candidate)) => candidate,
                    Ok(None) => continue,
                    Err(err) if err.is_timeout() => return Err(err),
                    Err(err) => {
                        warn!(path = %write.path, error = %err, "store path analysis failed");
                        continue;
                    }
                };

                let joint = Predicate::and(
                    candidate.dependence_constraint().cloned(),
                    requester.constraint().cloned(),
                );
                if !self.oracle.check(joint.as_ref()).is_sat() {
                    debug!(
                        location = %dependence,
                        path = %write.path,
                        "write rejected, store predicate conflicts with requester"
                    );
                    continue;
                }

                requester.update_constraint(Predicate::and(
                    requester.constraint().cloned(),
                    candidate.dependence_constraint().cloned(),
                ));
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Resolves one cached write against a dependence, memoizing success
    fn supporting_event(
        &self,
        write: &CachedWrite,
        dependence: &Variable,
        token: &CancelToken,
    ) -> Result<Option<SupportingEvent>> {
        let mut slot = write.slot.lock();
        if let Some(resolved) = slot.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(resolved.clone()));
        }

        let producer = PathAnalysis::new(
            self.program,
            self.aliases,
            &write.path,
            self.limits,
            token.clone(),
        )
        .run_for_store(dependence)?;

        if producer.feasibility.is_infeasible() {
            warn!(path = %write.path, "write path is infeasible, skipping");
            return Ok(None);
        }
        let Some(store_constraint) = producer.dependence_constraint else {
            error!(
                location = %dependence,
                path = %write.path,
                "no store predicate derivable for write path"
            );
            return Ok(None);
        };

        let kind = EntryKind::classify(write.path.entry_method(), self.program);
        let mut event = Event::new(write.path.clone(), kind, producer.feasibility.constraint);
        event.add_dependencies(producer.feasibility.dependencies);

        let resolved = SupportingEvent::new(event, Some(store_constraint));
        *slot = Some(resolved.clone());
        Ok(Some(resolved))
    }
}

/// Traversal plugin feeding the cache with every field-store path
pub struct HeapWritePlugin<'c, 'p> {
    cache: &'c HeapWriteCache<'p>,
}

impl<'c, 'p> HeapWritePlugin<'c, 'p> {
    pub fn new(cache: &'c HeapWriteCache<'p>) -> Self {
        HeapWritePlugin { cache }
    }
}

impl TraversalPlugin for HeapWritePlugin<'_, '_> {
    fn wants(&self, _method: &MethodRef, instr: &Instruction) -> bool {
        matches!(
            &instr.kind,
            InstrKind::Assign {
                lhs: LValue::Field(_),
                ..
            }
        )
    }

    fn on_target_path(&mut self, path: CallPath) {
        self.cache.record_write(path);
    }
}
