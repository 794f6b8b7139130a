//! Gateway model identifiers.

pub mod capabilities;

pub use capabilities::ModelCapabilities;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChatcastError;

/// Model used for the streamed answer.
pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-4o-mini";
/// Model used for structured side queries (city, suggestions).
pub const DEFAULT_STRUCTURED_MODEL: &str = "openai/gpt-4o";

/// A gateway model id of the form `provider/model`, e.g. `openai/gpt-4o`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    provider: String,
    name: String,
}

impl ModelId {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities the gateway exposes for this model's provider.
    pub fn capabilities(&self) -> ModelCapabilities {
        match self.provider.as_str() {
            "openai" | "azure" => ModelCapabilities::full(),
            "google" | "mistral" | "xai" | "groq" => ModelCapabilities {
                supports_json_mode: true,
                ..Default::default()
            },
            _ => ModelCapabilities::default(),
        }
    }
}

impl FromStr for ModelId {
    type Err = ChatcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, name) = s.split_once('/').ok_or_else(|| {
            ChatcastError::InvalidArgument(format!(
                "Invalid model id '{s}'. Use provider/model (e.g. openai/gpt-4o)"
            ))
        })?;
        if provider.is_empty() || name.is_empty() {
            return Err(ChatcastError::InvalidArgument(format!(
                "Invalid model id '{s}'. Provider and model must be non-empty"
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for ModelId {
    type Error = ChatcastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.name)
    }
}
