//! Any-path call-graph traversal
//!
//! One depth-first pass that serves every interested component at once.
//! A plugin names the instructions it cares about; the walk hands it one
//! [`CallPath`] per matched instruction, rooted at whichever entry point
//! reached the enclosing method first. Each method is expanded a single
//! time no matter how many entry points or callers lead to it, which
//! makes this an any-path search: it finds some route to every reachable
//! target, not every route.

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::errors::Result;
use crate::features::events::domain::CallPath;
use crate::features::traversal::domain::CallGraph;
use crate::shared::models::{InstrId, Instruction, MethodRef};
use crate::shared::ports::ProgramModel;

/// One traversal concern: an instruction filter plus a path consumer
pub trait TraversalPlugin {
    /// Whether paths to this instruction are worth collecting
    fn wants(&self, method: &MethodRef, instr: &Instruction) -> bool;

    /// Called once per discovered path to a wanted instruction
    fn on_target_path(&mut self, path: CallPath);
}

struct Frame {
    node: NodeIndex,
    /// Call site in the parent frame; the root frame has none
    entered_by: Option<InstrId>,
    children: std::vec::IntoIter<(InstrId, NodeIndex)>,
}

/// Single-pass plugin-driven walk over a [`CallGraph`]
pub struct CallGraphTraversal<'g> {
    graph: &'g CallGraph,
    program: &'g dyn ProgramModel,
}

impl<'g> CallGraphTraversal<'g> {
    pub fn new(graph: &'g CallGraph, program: &'g dyn ProgramModel) -> Self {
        CallGraphTraversal { graph, program }
    }

    pub fn run(&self, plugins: &mut [&mut dyn TraversalPlugin]) -> Result<()> {
        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut stack: Vec<Frame> = Vec::new();

        for &entry in self.graph.entry_points() {
            if visited.contains(&entry) {
                continue;
            }
            self.enter(entry, None, &mut stack, &mut visited, plugins)?;

            while let Some(frame) = stack.last_mut() {
                match frame.children.next() {
                    Some((site, child)) => {
                        if !visited.contains(&child) {
                            self.enter(child, Some(site), &mut stack, &mut visited, plugins)?;
                        }
                    }
                    None => {
                        stack.pop();
                    }
                }
            }
        }

        debug!(methods = visited.len(), "call graph traversal finished");
        Ok(())
    }

    fn enter(
        &self,
        node: NodeIndex,
        entered_by: Option<InstrId>,
        stack: &mut Vec<Frame>,
        visited: &mut FxHashSet<NodeIndex>,
        plugins: &mut [&mut dyn TraversalPlugin],
    ) -> Result<()> {
        visited.insert(node);

        // Library internals are scanned but never expanded; paths stay
        // within application code
        let children = if self.program.is_app_method(self.graph.method(node)) {
            self.graph.calls_out_of(node)
        } else {
            Vec::new()
        };
        stack.push(Frame {
            node,
            entered_by,
            children: children.into_iter(),
        });

        self.scan(stack, plugins)
    }

    /// Runs every plugin over the newly entered method's body
    fn scan(&self, stack: &[Frame], plugins: &mut [&mut dyn TraversalPlugin]) -> Result<()> {
        let Some(frame) = stack.last() else {
            return Ok(());
        };
        let method = self.graph.method(frame.node);
        let Some(body) = self.program.body(method) else {
            return Ok(());
        };

        for plugin in plugins.iter_mut() {
            let wanted: Vec<InstrId> = body
                .instructions()
                .iter()
                .filter(|instr| plugin.wants(method, instr))
                .map(|instr| instr.id)
                .collect();
            for site in wanted {
                plugin.on_target_path(self.assemble(stack, site)?);
            }
        }
        Ok(())
    }

    fn assemble(&self, stack: &[Frame], target_site: InstrId) -> Result<CallPath> {
        let nodes: Vec<MethodRef> = stack
            .iter()
            .map(|frame| self.graph.method(frame.node).clone())
            .collect();
        let sites: Vec<InstrId> = stack
            .iter()
            .skip(1)
            .filter_map(|frame| frame.entered_by)
            .collect();
        CallPath::new(nodes, sites, target_site)
    }
}
