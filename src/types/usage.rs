//! Token usage summary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage for one model turn.
///
/// Every field is optional: a provider that does not report a count leaves it
/// `None`, and it renders as `unknown` rather than zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl Usage {
    /// Normalize a raw usage payload into the canonical shape.
    ///
    /// Accepts `snake_case` and `camelCase` field names as well as the OpenAI
    /// chat-completions shape (`prompt_tokens`, `completion_tokens` and the
    /// nested `*_details` objects). Unknown or non-numeric fields are ignored.
    pub fn from_raw(raw: &Value) -> Self {
        let input_tokens = first_count(raw, &["input_tokens", "inputTokens", "prompt_tokens", "promptTokens"]);
        let output_tokens = first_count(
            raw,
            &["output_tokens", "outputTokens", "completion_tokens", "completionTokens"],
        );
        let total_tokens = first_count(raw, &["total_tokens", "totalTokens"]).or_else(|| {
            match (input_tokens, output_tokens) {
                (Some(i), Some(o)) => i.checked_add(o),
                _ => None,
            }
        });
        let cached_input_tokens = first_count(raw, &["cached_input_tokens", "cachedInputTokens"])
            .or_else(|| nested_count(raw, &["prompt_tokens_details", "input_tokens_details"], "cached_tokens"));
        let reasoning_tokens = first_count(raw, &["reasoning_tokens", "reasoningTokens"]).or_else(|| {
            nested_count(
                raw,
                &["completion_tokens_details", "output_tokens_details"],
                "reasoning_tokens",
            )
        });

        Self {
            total_tokens,
            input_tokens,
            output_tokens,
            cached_input_tokens,
            reasoning_tokens,
        }
    }

    /// Whether no count at all was reported.
    pub fn is_empty(&self) -> bool {
        *self == Usage::default()
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} input={} output={} cached_input={} reasoning={}",
            display_count(self.total_tokens),
            display_count(self.input_tokens),
            display_count(self.output_tokens),
            display_count(self.cached_input_tokens),
            display_count(self.reasoning_tokens),
        )
    }
}

/// Render an optional count, using `unknown` for absent values.
pub fn display_count(count: Option<u32>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn first_count(raw: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| as_count(raw.get(*k)?))
}

fn nested_count(raw: &Value, parents: &[&str], key: &str) -> Option<u32> {
    parents
        .iter()
        .find_map(|p| as_count(raw.get(*p)?.get(key)?))
}

fn as_count(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}
