//! Dependency-ordered node emission
//!
//! Depth-first, memoized walk guaranteeing that every transitive producer
//! of a node is written to the sink before the node itself. A per-pass
//! visited set (distinct from the nodes' write-states) makes shared
//! subgraphs emit once per pass no matter how many consumers reference
//! them; an active recursion stack catches reference cycles, which are
//! broken at the revisited edge and reported as diagnostics.

pub use super::progressive::SampleLevels;

use super::node::{NodeKind, WriteState};
use super::registry::NodeRegistry;
use super::resolver::{ConnectionMap, ConnectionResolver, OverrideTable};
use crate::errors::{Diagnostic, ExportError, Result};
use crate::protocol::ProtocolSink;
use crate::source::AttributeSource;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// Per-pass settings threaded through the emission walk
#[derive(Debug, Clone, Copy, Default)]
pub struct PassContext {
    /// Whether the clock did not move since the previous pass
    pub same_frame: bool,
    /// Sample counts to fold into options blocks, when set
    pub samples: Option<SampleLevels>,
}

/// Depth-first emitter; create one per pass
#[derive(Debug, Default)]
pub struct DependencyEmitter {
    ctx: PassContext,
    /// Nodes already refreshed and emitted this pass
    visited: HashSet<String>,
    /// Recursion stack for cycle detection
    active: Vec<String>,
}

impl DependencyEmitter {
    /// Creates an emitter for one pass
    pub fn new(ctx: PassContext) -> Self {
        Self {
            ctx,
            visited: HashSet::new(),
            active: Vec::new(),
        }
    }

    /// Refreshes and emits `identity` with all of its transitive producers
    /// strictly before it. Nodes already emitted this pass (shared
    /// subgraphs) are referenced, not re-emitted.
    pub fn emit_with_dependencies<W: Write>(
        &mut self,
        identity: &str,
        registry: &mut NodeRegistry,
        source: &dyn AttributeSource,
        overrides: &OverrideTable,
        sink: &mut ProtocolSink<W>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        if source.node_kind(identity).is_none() && !registry.contains(identity) {
            return Err(ExportError::UnknownNode(identity.to_string()));
        }
        self.emit_inner(identity, registry, source, overrides, sink, diagnostics)
    }

    fn emit_inner<W: Write>(
        &mut self,
        identity: &str,
        registry: &mut NodeRegistry,
        source: &dyn AttributeSource,
        overrides: &OverrideTable,
        sink: &mut ProtocolSink<W>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        if self.visited.contains(identity) {
            return Ok(());
        }
        self.active.push(identity.to_string());

        // Refresh from the scene; synthesized adapters have no scene-side
        // attributes and keep their registry state
        let mut map = match source.node_kind(identity) {
            Some(kind) => {
                let node = registry.ensure_kind(identity, kind);
                if node.declaration.is_none() {
                    node.declaration = source.declaration(identity);
                }
                let merged = self.pass_overrides(kind, overrides, identity);
                node.refresh(source, self.ctx.same_frame, merged.as_ref());
                ConnectionResolver::resolve(identity, registry, source, diagnostics)
            }
            None => {
                let node = registry
                    .get(identity)
                    .expect("registry-only node checked by caller");
                ConnectionResolver::resolve_bridge(node)
            }
        };

        // Producers first, in deterministic slot order
        let mut slots: Vec<String> = map.keys().cloned().collect();
        slots.sort();
        for slot in slots {
            let producer = map[&slot].producer.clone();
            if self.active.contains(&producer) {
                // Revisiting a node on the recursion stack: structural
                // error in the scene; break the edge and keep exporting
                diagnostics.push(Diagnostic::cycle(identity, &slot));
                map.remove(&slot);
                continue;
            }
            self.emit_inner(&producer, registry, source, overrides, sink, diagnostics)?;
        }

        self.write_node(identity, registry, &map, sink)?;

        self.active.pop();
        self.visited.insert(identity.to_string());
        Ok(())
    }

    /// Writes the node's block if its write-state demands one. The freshly
    /// resolved bindings are compared against the previous pass first, so a
    /// rewired connection re-emits the consumer even when every literal
    /// value is unchanged.
    fn write_node<W: Write>(
        &self,
        identity: &str,
        registry: &mut NodeRegistry,
        map: &ConnectionMap,
        sink: &mut ProtocolSink<W>,
    ) -> Result<()> {
        let node = registry.get_mut(identity).expect("node exists after refresh");
        node.set_bindings(
            map.iter()
                .map(|(slot, binding)| (slot.clone(), binding.reference()))
                .collect(),
        );
        if !node.needs_emit() {
            return Ok(());
        }

        // Emitting ahead of a dependency would hand the renderer a dangling
        // reference; the recursion above makes this unreachable
        debug_assert!(
            map.values().all(|b| self.visited.contains(&b.producer)),
            "emit order violation: \"{identity}\" written before a producer"
        );

        let incremental = node.state() == WriteState::Incremental;
        debug!(
            "emit: {} \"{identity}\"{}",
            node.kind.keyword(),
            if incremental { " (incremental)" } else { "" }
        );

        sink.begin_block(incremental, node.kind.keyword(), identity, node.declaration.as_deref())?;

        // Stable parameter order: union of snapshot values and bindings
        let mut names: Vec<&str> = node
            .snapshot
            .keys()
            .map(String::as_str)
            .chain(map.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();

        for name in names {
            match map.get(name) {
                Some(binding) => {
                    sink.param_reference(name, &binding.producer, binding.component)?
                }
                None => {
                    if let Some(value) = node.snapshot.get(name) {
                        sink.param_value(name, value)?;
                    }
                }
            }
        }
        sink.end_block()?;
        node.mark_written();
        Ok(())
    }

    /// Caller overrides for `identity`, with the pass's sample counts
    /// folded in for options nodes. Injecting the counts as refresh
    /// overrides routes them through the normal dirty-compare path, so a
    /// progressive step re-emits the options block and an unchanged ramp
    /// does not.
    fn pass_overrides(
        &self,
        kind: NodeKind,
        overrides: &OverrideTable,
        identity: &str,
    ) -> Option<HashMap<String, super::Value>> {
        let mut merged = overrides.get(identity).cloned();
        if kind == NodeKind::Options {
            if let Some(levels) = self.ctx.samples {
                let merged = merged.get_or_insert_with(HashMap::new);
                merged.insert("samples min".to_string(), super::Value::Int(levels.min));
                merged.insert("samples max".to_string(), super::Value::Int(levels.max));
                merged.insert("samples collect".to_string(), super::Value::Int(levels.collect));
            }
        }
        merged
    }
}
