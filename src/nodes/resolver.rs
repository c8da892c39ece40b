//! Connection resolution and adapter synthesis
//!
//! For every parameter slot of a node, the resolver decides whether the
//! slot keeps its literal value or references a producer - and when the
//! producer's channel layout does not line up with the consumer slot, it
//! synthesizes an adapter node on the edge. Adapter identities are keyed
//! deterministically by producer and conversion, so repeats dedupe.

use super::node::{Node, NodeKind};
use super::registry::NodeRegistry;
use super::value::{Conversion, Value};
use crate::errors::Diagnostic;
use crate::source::AttributeSource;
use log::debug;
use std::collections::HashMap;

/// Resolved producer reference for one parameter slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotBinding {
    /// Identity of the referenced entity (producer or synthesized adapter)
    pub producer: String,
    /// Component selector when only one channel of the producer output is
    /// consumed
    pub component: Option<char>,
}

impl SlotBinding {
    /// Protocol reference text, with the component selector when present
    pub fn reference(&self) -> String {
        match self.component {
            Some(component) => format!("{}.{}", self.producer, component),
            None => self.producer.clone(),
        }
    }
}

/// Parameter-slot name to producer-reference map for one node
pub type ConnectionMap = HashMap<String, SlotBinding>;

/// Explicit per-node parameter overrides with "override wins" precedence.
///
/// Replaces implicit name-matched inheritance (a light's shader picking up
/// values from its owning light) with a table built up front by the caller.
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: HashMap<String, HashMap<String, Value>>,
}

impl OverrideTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an override for one parameter of one node
    pub fn set(&mut self, identity: &str, param: &str, value: Value) {
        self.entries
            .entry(identity.to_string())
            .or_default()
            .insert(param.to_string(), value);
    }

    /// Overrides applying to `identity`, if any
    pub fn get(&self, identity: &str) -> Option<&HashMap<String, Value>> {
        self.entries.get(identity)
    }

    /// Drops all overrides for `identity`
    pub fn clear(&mut self, identity: &str) {
        self.entries.remove(identity);
    }
}

/// Builds connection maps, synthesizing adapter nodes where needed
pub struct ConnectionResolver;

impl ConnectionResolver {
    /// Resolves every connected parameter slot of `identity`.
    ///
    /// Unresolvable slots (unknown producer, no valid channel conversion)
    /// fall back to their literal defaults and record a diagnostic; the
    /// export continues. Repeated calls without intervening scene mutation
    /// yield the same map and never duplicate adapter nodes.
    pub fn resolve(
        identity: &str,
        registry: &mut NodeRegistry,
        source: &dyn AttributeSource,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ConnectionMap {
        let mut map = ConnectionMap::new();

        for param in source.parameters(identity) {
            let Some(conn) = source.get_connection(identity, &param) else {
                continue;
            };

            if source.node_kind(&conn.producer).is_none() && !registry.contains(&conn.producer) {
                diagnostics.push(Diagnostic::unresolved(identity, &param));
                continue;
            }

            let consumer = source.slot_channel(identity, &param);
            let producer = conn.channel;

            let binding = if let Some(component) = conn.component {
                // The editor tapped a single channel of the producer output
                SlotBinding {
                    producer: conn.producer,
                    component: Some(component),
                }
            } else if producer.matches(&consumer) {
                SlotBinding {
                    producer: conn.producer,
                    component: None,
                }
            } else if producer.layout.is_compound() && !consumer.layout.is_compound() {
                // Compound producer into a scalar slot: the protocol's
                // component selector covers this without an adapter
                SlotBinding {
                    producer: conn.producer,
                    component: Some(producer.interpretation.first_component()),
                }
            } else if let Some(conversion) = Conversion::between(&producer, &consumer) {
                let bridge = Self::bridge(registry, &conn.producer, conversion);
                SlotBinding {
                    producer: bridge,
                    component: None,
                }
            } else {
                diagnostics.push(Diagnostic::unresolved(identity, &param));
                continue;
            };

            map.insert(param, binding);
        }

        map
    }

    /// Returns the identity of the adapter converting `producer`'s output,
    /// creating the adapter node on first use.
    fn bridge(registry: &mut NodeRegistry, producer: &str, conversion: Conversion) -> String {
        let identity = format!("{}>{}", producer, conversion.suffix());
        let node = registry.ensure_kind(&identity, NodeKind::Bridge(conversion));
        if node.declaration.is_none() {
            node.declaration = Some(conversion.declaration().to_string());
            debug!("synthesized adapter \"{identity}\"");
        }
        node.set_attr("input", Value::Reference(producer.to_string()));
        identity
    }

    /// Connection map of a synthesized adapter: every reference value in its
    /// snapshot is a dependency edge
    pub fn resolve_bridge(node: &Node) -> ConnectionMap {
        node.snapshot
            .iter()
            .filter_map(|(slot, value)| match value {
                Value::Reference(target) => Some((
                    slot.clone(),
                    SlotBinding {
                        producer: target.clone(),
                        component: None,
                    },
                )),
                _ => None,
            })
            .collect()
    }
}
