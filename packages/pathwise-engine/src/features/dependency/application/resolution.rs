//! Dependence resolution
//!
//! Discharges the dependencies a target event's predicate still carries.
//! Heap reads are matched against the write cache and yield SupportingEvents
//! whose own dependencies resolve recursively, one level deep by default.
//! String-table reads resolve in place: the packaged literal is conjoined
//! into the requester's predicate and no extra event is produced. Anything
//! else is logged and left standing, the chain ships without it.
//!
//! Returned supports keep discovery order; [`EventChain`] iteration reverses
//! them into dependency-first execution order.
//!
//! [`EventChain`]: crate::features::events::domain::EventChain

use tracing::{debug, warn};

use crate::errors::Result;
use crate::features::constraint::domain::{Expression, Operator, Predicate, Variable};
use crate::features::dependency::domain::{classify, DependenceKind};
use crate::features::dependency::infrastructure::HeapWriteCache;
use crate::features::events::domain::{Event, SupportingEvent};
use crate::shared::cancel::CancelToken;
use crate::shared::ports::ResourceTable;

/// Resolves event dependencies against the write cache and resource table
pub struct DependencyAnalysis<'a, 'p> {
    heap: &'a HeapWriteCache<'p>,
    resources: &'a dyn ResourceTable,
    /// Levels of recursion below the target; 0 resolves only the target's
    /// own dependencies
    max_depth: usize,
}

impl<'a, 'p> DependencyAnalysis<'a, 'p> {
    pub fn new(
        heap: &'a HeapWriteCache<'p>,
        resources: &'a dyn ResourceTable,
        max_depth: usize,
    ) -> Self {
        DependencyAnalysis {
            heap,
            resources,
            max_depth,
        }
    }

    /// Resolves everything the event depends on, mutating its predicate as
    /// resolutions fold in; returns the supporting events in discovery order
    pub fn resolve_event_dependencies(
        &self,
        event: &mut Event,
        token: &CancelToken,
    ) -> Result<Vec<SupportingEvent>> {
        self.resolve_at_depth(event, 0, token)
    }

    fn resolve_at_depth(
        &self,
        event: &mut Event,
        depth: usize,
        token: &CancelToken,
    ) -> Result<Vec<SupportingEvent>> {
        if depth > self.max_depth {
            debug!(depth, "dependency recursion limit reached");
            return Ok(Vec::new());
        }

        self.scan_resource_dependencies(event);

        let pending: Vec<Variable> = event.dependencies().to_vec();
        let mut supports = Vec::new();
        for dependence in pending {
            token.check("dependence resolution")?;
            match classify(&dependence) {
                Some(DependenceKind::Heap) => {
                    supports.extend(self.resolve_heap(event, &dependence, depth, token)?);
                }
                Some(DependenceKind::Resource { id }) => {
                    self.fold_resource(event, &dependence, id);
                }
                None => {
                    warn!(variable = %dependence, "unsupported dependence left unresolved");
                }
            }
        }
        Ok(supports)
    }

    /// Heap dependencies the constraint walk records directly on the event;
    /// resource reads hide inside the predicate and are collected here
    fn scan_resource_dependencies(&self, event: &mut Event) {
        let found: Vec<Variable> = match event.constraint() {
            Some(constraint) => constraint
                .variables()
                .into_iter()
                .filter(|var| matches!(classify(var), Some(DependenceKind::Resource { .. })))
                .collect(),
            None => return,
        };
        event.add_dependencies(found);
    }

    fn resolve_heap(
        &self,
        event: &mut Event,
        dependence: &Variable,
        depth: usize,
        token: &CancelToken,
    ) -> Result<Vec<SupportingEvent>> {
        let Some(mut support) = self.heap.resolve(event, dependence, token)? else {
            warn!(location = %dependence, "could not resolve dependence");
            return Ok(Vec::new());
        };
        debug!(
            location = %dependence,
            path = %support.event().path(),
            "dependence resolved by write event"
        );

        let nested = self.resolve_at_depth(support.event_mut(), depth + 1, token)?;
        let mut group = vec![support];
        group.extend(nested);
        Ok(group)
    }

    /// Binds a string-table read to its packaged literal in place
    fn fold_resource(&self, event: &mut Event, dependence: &Variable, id: i64) {
        let Some(value) = self.resources.string_resource(id) else {
            warn!(resource = id, "string resource not in the app's table");
            return;
        };
        let equality = Expression::combine(
            Operator::StrEq,
            Some(Expression::leaf(dependence.clone())),
            Some(Expression::leaf(Variable::string(value))),
        );
        let Some(equality) = equality else {
            return;
        };
        event.update_constraint(Predicate::and(
            event.constraint().cloned(),
            Some(Predicate::expr(equality)),
        ));
        debug!(resource = id, "resource read bound to its packaged string");
    }
}
