//! The outbound chunk model.
//!
//! A [`Chunk`] is one typed event of the stream sent to the chat client. The
//! JSON shape matches the UI message stream protocol: every chunk is an
//! object with a `type` discriminant, and application data travels in
//! `data-<name>` chunks that may carry a reconciliation `id` and a
//! `transient` flag.

use std::borrow::Cow;

use serde::de::{self, DeserializeOwned};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::error::{ChatcastError, Result};

/// One discrete, typed event in the outbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// The assistant message begins.
    Start { message_id: Option<String> },
    /// A model step begins.
    StartStep,
    /// A text part opens.
    TextStart { id: String },
    /// Incremental model text.
    TextDelta { id: String, delta: String },
    /// A text part closes.
    TextEnd { id: String },
    /// A model step ends.
    FinishStep,
    /// The assistant message is complete.
    Finish,
    /// Terminal error for the stream.
    Error { error_text: String },
    /// Metadata merged into the assistant message.
    MessageMetadata { metadata: MessageMetadata },
    /// A source citation shown beside the answer.
    SourceUrl(SourceCitation),
    /// Application data (`data-<name>`).
    Data(DataPart),
}

/// Payload of a `data-<name>` chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPart {
    /// Name without the `data-` prefix.
    pub name: String,
    pub id: Option<String>,
    pub data: Value,
    pub transient: bool,
}

/// Metadata attached to the assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

/// A source citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCitation {
    pub source_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Status of the weather card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeatherStatus {
    Loading,
    Success,
    Error,
}

/// Payload of the `data-weather` chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCard {
    pub city: String,
    pub status: WeatherStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Severity of a notification toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Payload of the `data-notification` chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

/// A follow-up action offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub text: String,
    pub action: String,
}

/// Payload of the `data-suggestions` chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub data: Vec<SuggestedAction>,
}

impl Chunk {
    /// The wire discriminant of this chunk.
    pub fn kind(&self) -> Cow<'static, str> {
        match self {
            Chunk::Start { .. } => Cow::Borrowed("start"),
            Chunk::StartStep => Cow::Borrowed("start-step"),
            Chunk::TextStart { .. } => Cow::Borrowed("text-start"),
            Chunk::TextDelta { .. } => Cow::Borrowed("text-delta"),
            Chunk::TextEnd { .. } => Cow::Borrowed("text-end"),
            Chunk::FinishStep => Cow::Borrowed("finish-step"),
            Chunk::Finish => Cow::Borrowed("finish"),
            Chunk::Error { .. } => Cow::Borrowed("error"),
            Chunk::MessageMetadata { .. } => Cow::Borrowed("message-metadata"),
            Chunk::SourceUrl(_) => Cow::Borrowed("source-url"),
            Chunk::Data(part) => Cow::Owned(format!("data-{}", part.name)),
        }
    }

    /// Reconciliation id, for chunks that carry one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Chunk::TextStart { id } | Chunk::TextDelta { id, .. } | Chunk::TextEnd { id } => Some(id),
            Chunk::Data(part) => part.id.as_deref(),
            _ => None,
        }
    }

    /// Whether the consumer must treat this chunk as an ephemeral signal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Chunk::Data(part) if part.transient)
    }

    /// Decode the payload of a data chunk into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            Chunk::Data(part) => serde_json::from_value(part.data.clone()).ok(),
            _ => None,
        }
    }

    /// Build a chunk from its JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(ChatcastError::InvalidArgument("chunk must be a JSON object".into()));
        };
        let kind = take_string(&mut obj, "type")
            .ok_or_else(|| ChatcastError::InvalidArgument("chunk is missing `type`".into()))?;

        let chunk = match kind.as_str() {
            "start" => Chunk::Start {
                message_id: take_string(&mut obj, "messageId"),
            },
            "start-step" => Chunk::StartStep,
            "text-start" => Chunk::TextStart {
                id: require_string(&mut obj, "id")?,
            },
            "text-delta" => Chunk::TextDelta {
                id: require_string(&mut obj, "id")?,
                delta: require_string(&mut obj, "delta")?,
            },
            "text-end" => Chunk::TextEnd {
                id: require_string(&mut obj, "id")?,
            },
            "finish-step" => Chunk::FinishStep,
            "finish" => Chunk::Finish,
            "error" => Chunk::Error {
                error_text: require_string(&mut obj, "errorText")?,
            },
            "message-metadata" => Chunk::MessageMetadata {
                metadata: serde_json::from_value(
                    obj.remove("messageMetadata")
                        .unwrap_or_else(|| Value::Object(Map::new())),
                )?,
            },
            "source-url" => Chunk::SourceUrl(serde_json::from_value(Value::Object(obj))?),
            other => match other.strip_prefix("data-") {
                Some(name) => Chunk::Data(DataPart {
                    name: name.to_string(),
                    id: take_string(&mut obj, "id"),
                    data: obj.remove("data").unwrap_or(Value::Null),
                    transient: obj
                        .get("transient")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                }),
                None => {
                    return Err(ChatcastError::InvalidArgument(format!(
                        "unknown chunk type `{other}`"
                    )))
                }
            },
        };
        Ok(chunk)
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    match obj.remove(key)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn require_string(obj: &mut Map<String, Value>, key: &str) -> Result<String> {
    take_string(obj, key)
        .ok_or_else(|| ChatcastError::InvalidArgument(format!("chunk is missing `{key}`")))
}

impl Serialize for Chunk {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.kind())?;
        match self {
            Chunk::Start { message_id } => {
                if let Some(id) = message_id {
                    map.serialize_entry("messageId", id)?;
                }
            }
            Chunk::StartStep | Chunk::FinishStep | Chunk::Finish => {}
            Chunk::TextStart { id } | Chunk::TextEnd { id } => {
                map.serialize_entry("id", id)?;
            }
            Chunk::TextDelta { id, delta } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("delta", delta)?;
            }
            Chunk::Error { error_text } => {
                map.serialize_entry("errorText", error_text)?;
            }
            Chunk::MessageMetadata { metadata } => {
                map.serialize_entry("messageMetadata", metadata)?;
            }
            Chunk::SourceUrl(citation) => {
                map.serialize_entry("sourceId", &citation.source_id)?;
                map.serialize_entry("url", &citation.url)?;
                if let Some(title) = &citation.title {
                    map.serialize_entry("title", title)?;
                }
            }
            Chunk::Data(part) => {
                if let Some(id) = &part.id {
                    map.serialize_entry("id", id)?;
                }
                map.serialize_entry("data", &part.data)?;
                if part.transient {
                    map.serialize_entry("transient", &true)?;
                }
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Chunk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Chunk::from_value(value).map_err(de::Error::custom)
    }
}
