//! City extraction from the last message of a conversation.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::generation::generate_object;
use crate::provider::ModelProvider;
use crate::types::{convert_to_model_messages, last_message, GenerationSettings, ModelMessage, UiMessage};

const MAX_OUTPUT_TOKENS: u32 = 50;

const SYSTEM_PROMPT: &str = "Extract a single city/location mentioned in the user's message. \
Return JSON with { \"city\": \"City Name\" }, or { \"city\": null } if none.";

#[derive(Debug, Deserialize)]
struct CityExtraction {
    #[serde(default)]
    city: Option<String>,
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "city": { "type": ["string", "null"] }
        },
        "required": ["city"],
        "additionalProperties": false
    })
}

/// Ask the model for the city mentioned in the last message.
///
/// Returns `None` when no city is found or when anything goes wrong; the
/// caller substitutes its default location.
pub async fn extract_city(provider: &dyn ModelProvider, messages: &[UiMessage]) -> Option<String> {
    let mut prompt = vec![ModelMessage::system(SYSTEM_PROMPT)];
    prompt.extend(convert_to_model_messages(last_message(messages)));
    if prompt.len() == 1 {
        debug!("no text to extract a city from");
        return None;
    }

    let settings = GenerationSettings::builder()
        .max_tokens(MAX_OUTPUT_TOKENS)
        .build();

    match generate_object::<CityExtraction>(provider, prompt, settings, schema(), "city_extraction").await {
        Ok(result) => {
            let city = result
                .object
                .city
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            debug!(
                city = ?city,
                usage = %result.usage,
                finish_reason = ?result.finish_reason,
                "city extraction finished"
            );
            city
        }
        Err(e) => {
            warn!(error = %e, "city extraction failed");
            None
        }
    }
}
