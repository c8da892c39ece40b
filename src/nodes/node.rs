//! Exportable entity with cached snapshot and tri-state write tracking

use super::value::{Conversion, Value};
use crate::source::AttributeSource;
use std::collections::HashMap;

/// Emission status of a node.
///
/// Legal transitions: `NotWritten -> Written` on first emission,
/// `Written -> Incremental` when a refresh finds a changed attribute, and
/// `Incremental -> Written` on re-emission. The state never regresses to
/// `NotWritten`; `force_invalidate` only clears the cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Never appeared in the protocol stream
    NotWritten,
    /// Previously written, needs a patch block
    Incremental,
    /// Up to date in the protocol stream
    Written,
}

/// Concrete kind of an exportable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Global render options block
    Options,
    /// Shading-network node
    Shader,
    Light,
    Camera,
    /// Geometry instance
    Instance,
    /// Synthesized channel adapter on a mismatched edge
    Bridge(Conversion),
}

impl NodeKind {
    /// Protocol block keyword for this kind
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Options => "options",
            NodeKind::Shader => "shader",
            NodeKind::Light => "light",
            NodeKind::Camera => "camera",
            NodeKind::Instance => "instance",
            NodeKind::Bridge(_) => "adapter",
        }
    }
}

/// One exportable unit of scene state.
///
/// A node is created on first reference during a pass, then mutated in
/// place on every subsequent refresh; the cached snapshot is what makes
/// cheap change detection possible.
#[derive(Debug, Clone)]
pub struct Node {
    identity: String,
    pub kind: NodeKind,
    /// Declaration token written after the identity (shader name); None for
    /// kinds whose block carries no declaration
    pub declaration: Option<String>,
    state: WriteState,
    /// Cached attribute values from the previous refresh
    pub snapshot: HashMap<String, Value>,
    /// Rendered producer references from the previous pass, per slot.
    /// Compared against the freshly resolved map so a rewire is detected
    /// even when every literal value stayed put.
    bindings: HashMap<String, String>,
    /// Animated nodes are re-read even when the clock did not move
    pub animated: bool,
}

impl Node {
    /// Creates a node in the `NotWritten` state with an empty snapshot
    pub fn new(identity: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            identity: identity.into(),
            kind,
            declaration: None,
            state: WriteState::NotWritten,
            snapshot: HashMap::new(),
            bindings: HashMap::new(),
            animated: false,
        }
    }

    /// Stable identity string; immutable after construction
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current write-state
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Whether the next emission pass must write this node's block
    pub fn needs_emit(&self) -> bool {
        self.state != WriteState::Written
    }

    /// Re-reads all attributes from the scene, flagging the node
    /// incremental if anything differs from the cached snapshot.
    ///
    /// `overrides` values win over queried values for matching parameter
    /// names; override entries the scene does not list are stored anyway,
    /// letting the caller inject per-pass attributes. Snapshot entries the
    /// scene no longer exposes (and no override claims) are pruned. When
    /// the clock did not move and the node has no animated inputs, an
    /// already-written node skips the scene re-read; overrides still apply
    /// so a per-pass injection dirties it as usual.
    pub fn refresh(
        &mut self,
        source: &dyn AttributeSource,
        same_frame: bool,
        overrides: Option<&HashMap<String, Value>>,
    ) {
        self.animated = source.is_animated(&self.identity);
        if same_frame && !self.animated && self.state == WriteState::Written {
            log::debug!("refresh: \"{}\" unchanged frame, skipping", self.identity);
            if let Some(over) = overrides {
                for (name, value) in over {
                    self.set_attr(name, value.clone());
                }
            }
            return;
        }

        let params = source.parameters(&self.identity);
        let keep = |name: &str| {
            params.iter().any(|p| p == name)
                || overrides.map_or(false, |o| o.contains_key(name))
        };
        let stale: Vec<String> = self
            .snapshot
            .keys()
            .filter(|name| !keep(name.as_str()))
            .cloned()
            .collect();
        if !stale.is_empty() && self.state == WriteState::Written {
            self.state = WriteState::Incremental;
        }
        for name in stale {
            self.snapshot.remove(&name);
        }

        for param in &params {
            let Some(mut value) = source.get_value(&self.identity, param) else {
                continue;
            };
            if let Some(over) = overrides.and_then(|o| o.get(param)) {
                value = over.clone();
            }
            self.set_attr(param, value);
        }
        if let Some(over) = overrides {
            for (name, value) in over {
                if !params.iter().any(|p| p == name) {
                    self.set_attr(name, value.clone());
                }
            }
        }
    }

    /// Stores an attribute value through the dirty-compare helper.
    ///
    /// Returns true when the value differed from the snapshot; a written
    /// node becomes incremental in that case.
    pub fn set_attr(&mut self, name: &str, value: Value) -> bool {
        match self.snapshot.get(name) {
            Some(prev) if !prev.differs(&value) => false,
            _ => {
                if self.state == WriteState::Written {
                    self.state = WriteState::Incremental;
                }
                self.snapshot.insert(name.to_string(), value);
                true
            }
        }
    }

    /// Replaces the cached producer references, flagging the node
    /// incremental when a slot's binding was added, removed or rewired.
    /// The snapshot dirty-compare never sees connection topology, so this
    /// is the only place a pure rewire turns into a re-emission.
    pub fn set_bindings(&mut self, bindings: HashMap<String, String>) {
        if self.bindings != bindings {
            if self.state == WriteState::Written {
                self.state = WriteState::Incremental;
            }
            self.bindings = bindings;
        }
    }

    /// Unconditionally drops the cached snapshot and producer references;
    /// a written node becomes incremental. Used when cheap diffing is
    /// impossible (scene reload) or a structural upstream change mandates
    /// re-emission.
    pub fn force_invalidate(&mut self) {
        self.snapshot.clear();
        self.bindings.clear();
        if self.state == WriteState::Written {
            self.state = WriteState::Incremental;
        }
    }

    /// Marks the node's block as present in the protocol stream
    pub fn mark_written(&mut self) {
        self.state = WriteState::Written;
    }
}
