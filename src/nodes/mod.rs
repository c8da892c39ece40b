//! Node system - exportable entities, their lifecycle, and emission ordering

// Core exporter modules
pub mod emitter;
pub mod node;
pub mod progressive;
pub mod registry;
pub mod resolver;
pub mod value;

// Re-export core types
pub use emitter::{DependencyEmitter, PassContext, SampleLevels};
pub use node::{Node, NodeKind, WriteState};
pub use progressive::ProgressiveController;
pub use registry::NodeRegistry;
pub use resolver::{ConnectionMap, ConnectionResolver, OverrideTable, SlotBinding};
pub use value::{Channel, ChannelLayout, Conversion, Interpretation, Value};
