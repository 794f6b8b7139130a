//! Structured output: generate typed objects from model responses.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ChatcastError;
use crate::provider::{ModelProvider, ProviderRequest};
use crate::types::*;

/// A typed object parsed from a model response.
#[derive(Debug, Clone)]
pub struct GenerateObjectResult<T> {
    pub object: T,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

/// Generate a typed object by asking the model to produce JSON.
///
/// Uses JSON Schema response format if the model supports it,
/// otherwise uses system prompt instructions.
pub async fn generate_object<T: DeserializeOwned>(
    provider: &dyn ModelProvider,
    mut messages: Vec<ModelMessage>,
    settings: GenerationSettings,
    schema: serde_json::Value,
    type_name: &str,
) -> Result<GenerateObjectResult<T>, ChatcastError> {
    let supports_json_schema = provider.capabilities().supports_json_schema;
    let supports_json_mode = provider.capabilities().supports_json_mode;

    let mut settings = settings;

    if supports_json_schema {
        settings.response_format = Some(ResponseFormat::JsonSchema {
            schema,
            name: type_name.to_string(),
        });
    } else if supports_json_mode {
        settings.response_format = Some(ResponseFormat::JsonObject);
        let schema_instruction = format!(
            "You must respond with valid JSON matching this schema:\n```json\n{}\n```",
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        );
        messages.insert(0, ModelMessage::system(schema_instruction));
    } else {
        let schema_instruction = format!(
            "You must respond with ONLY valid JSON (no markdown, no explanation) matching this schema:\n```json\n{}\n```",
            serde_json::to_string_pretty(&schema).unwrap_or_default()
        );
        messages.insert(0, ModelMessage::system(schema_instruction));
    }

    debug!(model = provider.model_id(), type_name, "generate_object");
    let result = provider
        .generate_text(&ProviderRequest { messages, settings })
        .await?;

    let json_text = strip_code_fences(&result.text);
    let object: T = serde_json::from_str(&json_text)?;

    Ok(GenerateObjectResult {
        object,
        usage: result.usage,
        finish_reason: result.finish_reason,
    })
}

/// Strip markdown code fences from JSON response.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let without_opening = if let Some(rest) = trimmed.strip_prefix("```json") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("```") {
            rest
        } else {
            trimmed
        };
        if let Some(stripped) = without_opening.strip_suffix("```") {
            return stripped.trim().to_string();
        }
        return without_opening.trim().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde::Deserialize;

    use crate::models::ModelCapabilities;
    use crate::provider::ProviderResponse;

    struct Fenced {
        capabilities: ModelCapabilities,
    }

    #[async_trait]
    impl ModelProvider for Fenced {
        fn provider_name(&self) -> &str {
            "test"
        }
        fn model_id(&self) -> &str {
            "test/fenced"
        }
        fn capabilities(&self) -> &ModelCapabilities {
            &self.capabilities
        }
        async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, ChatcastError> {
            assert!(matches!(
                request.settings.response_format,
                Some(ResponseFormat::JsonSchema { ref name, .. }) if name == "city_extraction"
            ));
            Ok(ProviderResponse {
                text: "```json\n{\"city\": \"Laval\"}\n```".into(),
                usage: Usage {
                    total_tokens: Some(17),
                    ..Default::default()
                },
                finish_reason: Some(FinishReason::Stop),
            })
        }
        async fn stream_text(
            &self,
            _: &ProviderRequest,
        ) -> Result<BoxStream<'static, Result<TextStreamDelta, ChatcastError>>, ChatcastError> {
            Err(ChatcastError::Stream("not streamed".into()))
        }
    }

    #[derive(Deserialize)]
    struct City {
        city: String,
    }

    #[tokio::test]
    async fn object_result_carries_usage_and_finish_reason() {
        let provider = Fenced {
            capabilities: ModelCapabilities::full(),
        };
        let result = generate_object::<City>(
            &provider,
            vec![ModelMessage::user("Laval?")],
            GenerationSettings::default(),
            serde_json::json!({"type": "object"}),
            "city_extraction",
        )
        .await
        .unwrap();

        assert_eq!(result.object.city, "Laval");
        assert_eq!(result.usage.total_tokens, Some(17));
        assert_eq!(result.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn strip_code_fences_plain_json() {
        assert_eq!(strip_code_fences(r#"{"key": "value"}"#), r#"{"key": "value"}"#);
    }

    #[test]
    fn strip_code_fences_with_json_fence() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn strip_code_fences_with_bare_fence() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), r#"{"key": "value"}"#);
    }
}
