//! Message types: the UI conversation received from the browser and the
//! model messages sent to the gateway.

use serde::{Deserialize, Serialize};

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message as submitted by the chat client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<UiPart>,
}

impl UiMessage {
    /// Create a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            parts: vec![UiPart::Text { text: text.into() }],
        }
    }

    /// Create an assistant message with a single text part.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            parts: vec![UiPart::Text { text: text.into() }],
        }
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                UiPart::Text { text } => Some(text.as_str()),
                UiPart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A typed part of a UI message. Only text parts carry content for the model;
/// anything else the client sends (step markers, data parts) is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A message in the shape sent to the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: String,
}

impl ModelMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Convert UI messages into model messages, dropping messages without text.
pub fn convert_to_model_messages(messages: &[UiMessage]) -> Vec<ModelMessage> {
    messages
        .iter()
        .filter_map(|m| {
            let content = m.text();
            if content.is_empty() {
                None
            } else {
                Some(ModelMessage {
                    role: m.role,
                    content,
                })
            }
        })
        .collect()
}

/// The trailing message of a conversation, as a one-element slice.
///
/// Side queries (city extraction, suggestions) only look at this message.
pub fn last_message(messages: &[UiMessage]) -> &[UiMessage] {
    let start = messages.len().saturating_sub(1);
    &messages[start..]
}
