//! Scenewire core library
//!
//! Scenewire is the incremental exporter that sits between a live scene
//! editor and an external renderer process. It walks shading networks,
//! lights, cameras and global render options, and writes them out as a
//! line-oriented render-description protocol, re-emitting only the
//! entities that actually changed between interactive passes:
//! - Per-entity write-state tracking (not written / incremental / written)
//! - Dependency-ordered emission of shading-network graphs
//! - Shared-subgraph deduplication within a pass
//! - On-the-fly adapter synthesis for mismatched channel layouts
//! - Progressive sample-count refinement across preview passes

// Public modules
pub mod config;
pub mod errors;
pub mod nodes;
pub mod protocol;
pub mod session;
pub mod source;

// Re-export commonly used types
pub use config::ExportConfig;
pub use errors::{Diagnostic, DiagnosticKind, ExportError, Result};
pub use nodes::{
    Channel, ChannelLayout, Conversion, DependencyEmitter, Interpretation, Node, NodeKind,
    NodeRegistry, PassContext, ProgressiveController, SampleLevels, Value, WriteState,
};
pub use nodes::resolver::{ConnectionMap, ConnectionResolver, OverrideTable, SlotBinding};
pub use protocol::ProtocolSink;
pub use session::ExportSession;
pub use source::{AttributeSource, Connection};
