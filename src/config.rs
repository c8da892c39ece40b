//! Export configuration

use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// Tunables for one export session.
///
/// Loadable from JSON; missing fields keep their defaults, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Decimal places for numeric protocol literals
    pub precision: usize,
    /// Whether interactive passes ramp sample counts progressively
    pub progressive: bool,
    /// Starting minimum sample count for the progressive ramp
    pub progressive_start_min: i32,
    /// Starting maximum sample count for the progressive ramp
    pub progressive_start_max: i32,
    /// Samples added per progressive step
    pub progressive_step: i32,
    /// Final minimum sample count
    pub min_samples: i32,
    /// Final maximum sample count
    pub max_samples: i32,
    /// Starting visibility sample count for the progressive ramp
    pub visibility_samples: i32,
    /// Final visibility sample count
    pub visibility_target: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            precision: 4,
            progressive: false,
            progressive_start_min: -3,
            progressive_start_max: -3,
            progressive_step: 1,
            min_samples: -2,
            max_samples: 0,
            visibility_samples: 1,
            visibility_target: 4,
        }
    }
}

impl ExportConfig {
    /// Parses a config from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the config as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
