//! Call graph
//!
//! Methods as nodes, call sites as edges. Two methods may be connected by
//! several edges when the caller invokes the callee from distinct sites;
//! the site id on the edge is what turns a graph walk into a [`CallPath`]
//! with concrete argument bindings.
//!
//! The graph is built once by the host from whatever call-graph analysis
//! it runs, then read-only for the rest of the run.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

use crate::shared::models::{InstrId, MethodRef};

/// Directed method-call graph with per-site edges
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<MethodRef, InstrId>,
    index: FxHashMap<MethodRef, NodeIndex>,
    entry_points: Vec<NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph::default()
    }

    /// Registers a method, returning its existing node when already known
    pub fn add_method(&mut self, method: MethodRef) -> NodeIndex {
        if let Some(&node) = self.index.get(&method) {
            return node;
        }
        let node = self.graph.add_node(method.clone());
        self.index.insert(method, node);
        node
    }

    /// Records one call site; missing endpoints are registered on the fly
    pub fn add_call(&mut self, caller: MethodRef, site: InstrId, callee: MethodRef) {
        let from = self.add_method(caller);
        let to = self.add_method(callee);
        self.graph.add_edge(from, to, site);
    }

    /// Marks a method as a traversal root
    pub fn add_entry_point(&mut self, method: MethodRef) {
        let node = self.add_method(method);
        if !self.entry_points.contains(&node) {
            self.entry_points.push(node);
        }
    }

    pub fn method(&self, node: NodeIndex) -> &MethodRef {
        &self.graph[node]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn entry_points(&self) -> &[NodeIndex] {
        &self.entry_points
    }

    /// Outgoing call sites of a method, in the order they were recorded
    pub fn calls_out_of(&self, node: NodeIndex) -> Vec<(InstrId, NodeIndex)> {
        let mut calls: Vec<(InstrId, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        // Edge iteration is newest-first; recorded order reads better in
        // paths and keeps traversal deterministic
        calls.reverse();
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ValueType;

    fn method(name: &str) -> MethodRef {
        MethodRef::new_static("com.app.Flow", name, Vec::new(), ValueType::Void)
    }

    #[test]
    fn methods_register_once() {
        let mut graph = CallGraph::new();
        let a = graph.add_method(method("start"));
        let b = graph.add_method(method("start"));
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn parallel_call_sites_keep_distinct_edges() {
        let mut graph = CallGraph::new();
        graph.add_call(method("caller"), 2, method("callee"));
        graph.add_call(method("caller"), 7, method("callee"));

        let caller = graph.add_method(method("caller"));
        let sites: Vec<InstrId> = graph
            .calls_out_of(caller)
            .into_iter()
            .map(|(site, _)| site)
            .collect();
        assert_eq!(sites, vec![2, 7]);
    }

    #[test]
    fn entry_points_deduplicate() {
        let mut graph = CallGraph::new();
        graph.add_entry_point(method("onClick"));
        graph.add_entry_point(method("onClick"));
        assert_eq!(graph.entry_points().len(), 1);
    }
}
