//! Interprocedural routes from entry points to target instructions

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::errors::{EngineError, Result};
use crate::shared::models::{InstrId, MethodRef};

/// One call edge along a path
#[derive(Debug, Clone, Copy)]
pub struct CallEdge<'p> {
    pub caller: &'p MethodRef,
    /// Call instruction inside `caller` that enters `callee`
    pub site: InstrId,
    pub callee: &'p MethodRef,
}

/// One concrete route from an entry point down to a target instruction.
///
/// Identity is the destination alone: two routes reaching the same
/// instruction of the same method compare equal, so caches keyed by path
/// never hold one destination twice regardless of prefix.
#[derive(Debug, Clone)]
pub struct CallPath {
    nodes: Vec<MethodRef>,
    sites: Vec<InstrId>,
    target_site: InstrId,
}

impl CallPath {
    /// Builds a route where `sites[i]` is the call instruction in `nodes[i]`
    /// invoking `nodes[i + 1]`, and `target_site` lies in the last node
    pub fn new(nodes: Vec<MethodRef>, sites: Vec<InstrId>, target_site: InstrId) -> Result<Self> {
        if nodes.is_empty() {
            return Err(EngineError::internal("call path without any methods"));
        }
        if sites.len() + 1 != nodes.len() {
            return Err(EngineError::internal(format!(
                "call path over {} methods carries {} call sites",
                nodes.len(),
                sites.len()
            )));
        }
        Ok(CallPath {
            nodes,
            sites,
            target_site,
        })
    }

    /// Single-method route, entry and target method coincide
    pub fn single(method: MethodRef, target_site: InstrId) -> Self {
        CallPath {
            nodes: vec![method],
            sites: Vec::new(),
            target_site,
        }
    }

    pub fn entry_method(&self) -> &MethodRef {
        &self.nodes[0]
    }

    pub fn target_method(&self) -> &MethodRef {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn target_site(&self) -> InstrId {
        self.target_site
    }

    /// Every method on the route, entry first
    pub fn methods(&self) -> impl Iterator<Item = &MethodRef> {
        self.nodes.iter()
    }

    /// Call edges in traversal order; empty for a single-method route
    pub fn edges(&self) -> impl Iterator<Item = CallEdge<'_>> {
        self.sites.iter().enumerate().map(|(i, &site)| CallEdge {
            caller: &self.nodes[i],
            site,
            callee: &self.nodes[i + 1],
        })
    }

    pub fn edge_count(&self) -> usize {
        self.sites.len()
    }

    /// Stable fingerprint over the whole route, distinguishing the prefixes
    /// that identity comparison ignores. Input Variables carry it so symbols
    /// minted on different routes never collide.
    pub fn discriminator(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for method in &self.nodes {
            method.hash(&mut hasher);
        }
        self.sites.hash(&mut hasher);
        self.target_site.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for CallPath {
    fn eq(&self, other: &Self) -> bool {
        self.target_site == other.target_site && self.target_method() == other.target_method()
    }
}

impl Eq for CallPath {}

impl Hash for CallPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target_method().hash(state);
        self.target_site.hash(state);
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, method) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", method.signature())?;
        }
        write!(f, " @ {}", self.target_site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ValueType;

    fn method(class: &str, name: &str) -> MethodRef {
        MethodRef::new(class, name, Vec::new(), ValueType::Void)
    }

    fn hash_of(path: &CallPath) -> u64 {
        let mut hasher = FxHasher::default();
        path.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn identity_ignores_the_route_prefix() {
        let via_a = CallPath::new(
            vec![method("com.app.A", "run"), method("com.app.Sink", "leak")],
            vec![4],
            7,
        )
        .unwrap();
        let via_b = CallPath::new(
            vec![method("com.app.B", "other"), method("com.app.Sink", "leak")],
            vec![1],
            7,
        )
        .unwrap();

        assert_eq!(via_a, via_b);
        assert_eq!(hash_of(&via_a), hash_of(&via_b));
        assert_ne!(via_a.discriminator(), via_b.discriminator());
    }

    #[test]
    fn different_target_sites_are_different_paths() {
        let sink = method("com.app.Sink", "leak");
        let first = CallPath::single(sink.clone(), 3);
        let second = CallPath::single(sink, 9);
        assert_ne!(first, second);
    }

    #[test]
    fn edges_pair_each_caller_with_its_callee() {
        let path = CallPath::new(
            vec![
                method("com.app.Entry", "onClick"),
                method("com.app.Mid", "step"),
                method("com.app.Sink", "leak"),
            ],
            vec![2, 5],
            0,
        )
        .unwrap();

        let edges: Vec<_> = path.edges().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].caller.name, "onClick");
        assert_eq!(edges[0].site, 2);
        assert_eq!(edges[0].callee.name, "step");
        assert_eq!(edges[1].caller.name, "step");
        assert_eq!(edges[1].callee.name, "leak");
    }

    #[test]
    fn mismatched_site_count_is_rejected() {
        let result = CallPath::new(
            vec![method("com.app.A", "run")],
            vec![3],
            0,
        );
        assert!(result.is_err());
    }
}
