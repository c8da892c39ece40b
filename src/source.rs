//! Attribute source - the exporter's view of the live scene
//!
//! The editor's own scene representation stays on the other side of this
//! trait: the exporter only ever pulls current values, connection topology
//! and animation state through it.

use crate::nodes::{Channel, NodeKind, Value};

/// A resolved directed edge from a consumer slot to a producer output
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Identity of the producing entity
    pub producer: String,
    /// Name of the producer's output slot
    pub output: String,
    /// Channel description of the producer output
    pub channel: Channel,
    /// Single-component tap on the producer output, when the editor
    /// connected one channel rather than the whole output
    pub component: Option<char>,
}

/// Query interface onto the live scene
pub trait AttributeSource {
    /// Concrete kind currently backing `identity`, or None if the scene has
    /// no such entity
    fn node_kind(&self, identity: &str) -> Option<NodeKind>;

    /// Declaration token the renderer resolves to the entity's
    /// implementation (shader name), when the kind carries one
    fn declaration(&self, identity: &str) -> Option<String>;

    /// Names of all exportable parameter slots of `identity`
    fn parameters(&self, identity: &str) -> Vec<String>;

    /// Current literal value of a parameter slot
    fn get_value(&self, identity: &str, param: &str) -> Option<Value>;

    /// Channel description of a consumer parameter slot
    fn slot_channel(&self, identity: &str, param: &str) -> Channel;

    /// Incoming connection feeding a parameter slot, if any
    fn get_connection(&self, identity: &str, param: &str) -> Option<Connection>;

    /// Whether the entity has animated inputs and must be re-read even when
    /// the clock did not move
    fn is_animated(&self, _identity: &str) -> bool {
        false
    }

    /// Whether two sample times fall on the same frame
    fn is_same_frame(&self, prev_time: f64, cur_time: f64) -> bool {
        prev_time == cur_time
    }
}
