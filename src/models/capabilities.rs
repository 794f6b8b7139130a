//! Model capabilities descriptor.

use serde::{Deserialize, Serialize};

/// Describes what a gateway model can do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelCapabilities {
    pub supports_streaming: bool,
    pub supports_json_mode: bool,
    pub supports_json_schema: bool,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            supports_streaming: true,
            supports_json_mode: false,
            supports_json_schema: false,
        }
    }
}

impl ModelCapabilities {
    /// Full-featured model capabilities.
    pub fn full() -> Self {
        Self {
            supports_streaming: true,
            supports_json_mode: true,
            supports_json_schema: true,
        }
    }
}
