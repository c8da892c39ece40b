//! Error taxonomy and non-fatal export diagnostics

use std::fmt;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ExportError>;

/// Hard failures that abort the current export pass
#[derive(Debug, Error)]
pub enum ExportError {
    /// The emitter sink failed (disk full, broken pipe). The sink's received
    /// state is unknown afterwards, so the session schedules a full resync.
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    /// A root entity handed to the exporter is unknown to the scene
    #[error("unknown node \"{0}\": attribute source has no such entity")]
    UnknownNode(String),

    /// Export configuration could not be parsed
    #[error("invalid export config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Classification of a recoverable, per-connection problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A slot's producer could not be found, or no channel conversion exists.
    /// The slot fell back to its literal default.
    UnresolvedConnection,
    /// A shading network contained a reference cycle; the revisited edge was
    /// dropped and the slot fell back to its literal default.
    CyclicDependency,
}

/// A non-fatal warning recorded during resolution or emission.
///
/// Carries enough context (node identity, slot name) for the user to locate
/// the broken connection in the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub node: String,
    pub slot: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Records an unresolved connection on `node`.`slot`
    pub fn unresolved(node: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            slot: slot.into(),
            kind: DiagnosticKind::UnresolvedConnection,
        }
    }

    /// Records a broken dependency cycle at `node`.`slot`
    pub fn cycle(node: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            slot: slot.into(),
            kind: DiagnosticKind::CyclicDependency,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::UnresolvedConnection => write!(
                f,
                "\"{}\".\"{}\": connection could not be resolved, using literal default",
                self.node, self.slot
            ),
            DiagnosticKind::CyclicDependency => write!(
                f,
                "\"{}\".\"{}\": dependency cycle broken at this edge, using literal default",
                self.node, self.slot
            ),
        }
    }
}
