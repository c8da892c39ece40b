//! Session-scoped registry of exported nodes
//!
//! The registry is an explicit context object threaded through every
//! refresh/resolve/emit call; it owns all nodes and guarantees at most one
//! instance per identity. Nodes are shared by reference and their content
//! reused across passes - the registry is not content-addressed.

use super::node::{Node, NodeKind};
use log::warn;
use std::collections::HashMap;

/// Owner of all exported nodes for one session
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Node>,
}

impl NodeRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node for `identity`, constructing and inserting it on
    /// first reference
    pub fn get_or_create(
        &mut self,
        identity: &str,
        constructor: impl FnOnce() -> Node,
    ) -> &mut Node {
        self.nodes
            .entry(identity.to_string())
            .or_insert_with(constructor)
    }

    /// Returns the node for `identity`, evicting a cached node first when
    /// the scene now backs the identity with an incompatible kind.
    ///
    /// The replacement starts over as `NotWritten`, so the renderer receives
    /// a full block rather than a patch against the wrong entity.
    pub fn ensure_kind(&mut self, identity: &str, kind: NodeKind) -> &mut Node {
        let stale = self
            .nodes
            .get(identity)
            .map(|node| node.kind != kind)
            .unwrap_or(false);
        if stale {
            warn!("registry: \"{identity}\" changed kind, discarding cached node");
            self.nodes.remove(identity);
        }
        self.nodes
            .entry(identity.to_string())
            .or_insert_with(|| Node::new(identity, kind))
    }

    /// Looks up a node without creating it
    pub fn get(&self, identity: &str) -> Option<&Node> {
        self.nodes.get(identity)
    }

    /// Mutable lookup without creation
    pub fn get_mut(&mut self, identity: &str) -> Option<&mut Node> {
        self.nodes.get_mut(identity)
    }

    /// Whether a node exists for `identity`
    pub fn contains(&self, identity: &str) -> bool {
        self.nodes.contains_key(identity)
    }

    /// Evicts a node, returning it if present
    pub fn remove(&mut self, identity: &str) -> Option<Node> {
        self.nodes.remove(identity)
    }

    /// Force-invalidates every node: snapshots are dropped and written
    /// nodes become incremental. Used on scene reload and after a sink
    /// failure left the renderer's state unknown.
    pub fn invalidate_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.force_invalidate();
        }
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all registered identities
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}
