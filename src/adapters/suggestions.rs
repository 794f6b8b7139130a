//! Follow-up suggestion generation.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::generation::generate_object;
use crate::provider::ModelProvider;
use crate::types::{
    convert_to_model_messages, last_message, GenerationSettings, ModelMessage, SuggestedAction, UiMessage,
};

const MAX_OUTPUT_TOKENS: u32 = 500;
const MAX_SUGGESTIONS: usize = 4;

const SYSTEM_PROMPT: &str = "You are an assistant. Based on the conversation context and the last \
response, suggest 3-4 relevant follow-up actions or questions. Return a JSON object with an \
`actions` array.";

#[derive(Debug, Deserialize)]
struct SuggestedActions {
    #[serde(default)]
    actions: Vec<SuggestedAction>,
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "actions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "action": { "type": "string" }
                    },
                    "required": ["text", "action"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["actions"],
        "additionalProperties": false
    })
}

/// Ask the model for follow-up actions, seeded with the last message.
///
/// Any failure yields an empty list. Entries with blank text are dropped and
/// at most four are kept.
pub async fn generate_suggested_actions(
    provider: &dyn ModelProvider,
    messages: &[UiMessage],
) -> Vec<SuggestedAction> {
    let mut prompt = vec![ModelMessage::system(SYSTEM_PROMPT)];
    prompt.extend(convert_to_model_messages(last_message(messages)));

    let settings = GenerationSettings::builder()
        .max_tokens(MAX_OUTPUT_TOKENS)
        .build();

    match generate_object::<SuggestedActions>(provider, prompt, settings, schema(), "suggested_actions").await {
        Ok(result) => {
            let actions: Vec<SuggestedAction> = result
                .object
                .actions
                .into_iter()
                .filter(|a| !a.text.trim().is_empty())
                .take(MAX_SUGGESTIONS)
                .collect();
            debug!(
                count = actions.len(),
                usage = %result.usage,
                finish_reason = ?result.finish_reason,
                "suggestions generated"
            );
            actions
        }
        Err(e) => {
            warn!(error = %e, "suggestion generation failed");
            Vec::new()
        }
    }
}
