//! Chunk encoder: pure builders for the chunks the composer emits.
//!
//! Nothing here performs I/O. Payloads are passed through as given; the
//! client is responsible for defensive parsing.

pub mod sources;

pub use sources::{build_source_urls, city_slug};

use serde_json::Value;

use crate::types::{
    Chunk, DataPart, MessageMetadata, Notification, NotificationLevel, SourceCitation,
    SuggestedAction, Suggestions, WeatherCard, WeatherStatus,
};

/// Fixed reconciliation id of the weather card. Every weather chunk of a turn
/// carries it so the client updates one card in place.
pub const WEATHER_CARD_ID: &str = "weather-1";

const NOTIFICATION: &str = "notification";

/// Build a `data-<kind>` chunk.
///
/// The notification kind is always tagged `data-notification`, however the
/// caller spells it (`Notification`, `data-notification`, ...).
pub fn data_part(kind: &str, payload: Value, id: Option<&str>, transient: bool) -> Chunk {
    let bare = kind.strip_prefix("data-").unwrap_or(kind);
    let name = if bare.eq_ignore_ascii_case(NOTIFICATION) {
        NOTIFICATION.to_string()
    } else {
        bare.to_string()
    };

    Chunk::Data(DataPart {
        name,
        id: id.map(str::to_string),
        data: payload,
        transient,
    })
}

/// A transient toast for the client.
pub fn notification(message: impl Into<String>, level: NotificationLevel) -> Chunk {
    let payload = Notification {
        message: message.into(),
        level,
    };
    data_part(NOTIFICATION, to_payload(&payload), None, true)
}

/// The weather card in its loading state.
pub fn weather_loading(city: &str) -> Chunk {
    weather_chunk(WeatherCard {
        city: city.to_string(),
        status: WeatherStatus::Loading,
        weather: None,
        error: None,
    })
}

/// The weather card in its terminal state.
pub fn weather_resolved(city: &str, outcome: &crate::adapters::WeatherOutcome) -> Chunk {
    use crate::adapters::WeatherOutcome;

    let card = match outcome {
        WeatherOutcome::Summary(text) => WeatherCard {
            city: city.to_string(),
            status: WeatherStatus::Success,
            weather: Some(text.clone()),
            error: None,
        },
        WeatherOutcome::Failed { error } => WeatherCard {
            city: city.to_string(),
            status: WeatherStatus::Error,
            weather: None,
            error: Some(error.clone()),
        },
    };
    weather_chunk(card)
}

fn weather_chunk(card: WeatherCard) -> Chunk {
    data_part("weather", to_payload(&card), Some(WEATHER_CARD_ID), false)
}

/// A persistent suggestions chunk, or `None` when there is nothing to offer.
pub fn suggestions(actions: &[SuggestedAction]) -> Option<Chunk> {
    if actions.is_empty() {
        return None;
    }
    let payload = Suggestions {
        data: actions.to_vec(),
    };
    Some(data_part("suggestions", to_payload(&payload), None, false))
}

pub fn source_url(citation: SourceCitation) -> Chunk {
    Chunk::SourceUrl(citation)
}

pub fn message_metadata(metadata: MessageMetadata) -> Chunk {
    Chunk::MessageMetadata { metadata }
}

/// `prefix-` followed by seven random lowercase alphanumerics.
pub fn make_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &suffix[..7])
}

fn to_payload<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::WeatherOutcome;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn notification_kind_is_normalized() {
        for spelling in ["notification", "Notification", "data-notification", "NOTIFICATION"] {
            let chunk = data_part(spelling, json!({}), None, true);
            assert_eq!(chunk.kind(), "data-notification");
        }
        assert_eq!(data_part("progress", json!({}), None, false).kind(), "data-progress");
    }

    #[test]
    fn id_is_attached_only_when_supplied() {
        assert_eq!(data_part("weather", json!({}), Some("w"), false).id(), Some("w"));
        assert_eq!(data_part("weather", json!({}), None, false).id(), None);
    }

    #[test]
    fn notification_is_transient() {
        let chunk = notification("Processing your request...", NotificationLevel::Info);
        assert!(chunk.is_transient());
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            json!({
                "type": "data-notification",
                "data": {"message": "Processing your request...", "level": "info"},
                "transient": true
            })
        );
    }

    #[test]
    fn weather_states_share_the_card_id() {
        let loading = weather_loading("Laval");
        let done = weather_resolved("Laval", &WeatherOutcome::Summary("3°C - Snow".into()));
        let failed = weather_resolved(
            "Laval",
            &WeatherOutcome::Failed {
                error: "weather fetch failed: 500".into(),
            },
        );

        for chunk in [&loading, &done, &failed] {
            assert_eq!(chunk.kind(), "data-weather");
            assert_eq!(chunk.id(), Some(WEATHER_CARD_ID));
            assert!(!chunk.is_transient());
        }

        let card: WeatherCard = done.data_as().unwrap();
        assert_eq!(card.weather.as_deref(), Some("3°C - Snow"));
        assert_eq!(card.error, None);

        let card: WeatherCard = failed.data_as().unwrap();
        assert_eq!(card.status, WeatherStatus::Error);
        assert_eq!(card.weather, None);
    }

    #[test]
    fn empty_suggestions_produce_no_chunk() {
        assert!(suggestions(&[]).is_none());

        let chunk = suggestions(&[SuggestedAction {
            text: "Tomorrow?".into(),
            action: "What about tomorrow?".into(),
        }])
        .unwrap();
        assert!(!chunk.is_transient());
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            json!({
                "type": "data-suggestions",
                "data": {"data": [{"text": "Tomorrow?", "action": "What about tomorrow?"}]}
            })
        );
    }

    #[test]
    fn make_id_has_prefix_and_seven_chars() {
        let id = make_id("source");
        let suffix = id.strip_prefix("source-").unwrap();
        assert_eq!(suffix.len(), 7);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
        assert_ne!(make_id("source"), make_id("source"));
    }
}
