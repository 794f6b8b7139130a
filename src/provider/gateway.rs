//! AI gateway provider (OpenAI-compatible Chat Completions API).

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ChatcastError;
use crate::models::{ModelCapabilities, ModelId};
use crate::types::*;

use super::http::{bearer_headers, is_done_marker, parse_sse_data, shared_client, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

pub const DEFAULT_BASE_URL: &str = "https://ai-gateway.vercel.sh/v1";

/// A credential bound to a gateway endpoint. Hands out one provider per model.
#[derive(Clone)]
pub struct Gateway {
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("api_key", &"..")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Gateway {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// A provider serving `model` through this gateway.
    pub fn model(&self, model: ModelId) -> GatewayProvider {
        GatewayProvider::new(model, self.api_key.clone(), self.base_url.clone())
    }
}

pub struct GatewayProvider {
    model: ModelId,
    model_id: String,
    api_key: String,
    base_url: String,
    capabilities: ModelCapabilities,
}

impl GatewayProvider {
    pub fn new(model: ModelId, api_key: String, base_url: String) -> Self {
        let capabilities = model.capabilities();
        Self {
            model_id: model.to_string(),
            model,
            api_key,
            base_url,
            capabilities,
        }
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> Value {
        let messages = request
            .messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect::<Vec<_>>();

        let mut body = serde_json::json!({
            "model": self.model_id,
            "messages": messages,
            "stream": stream,
        });

        let Some(obj) = body.as_object_mut() else {
            return body;
        };

        if stream {
            obj.insert("stream_options".into(), serde_json::json!({ "include_usage": true }));
        }
        if let Some(max) = request.settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }

        if let Some(ref fmt) = request.settings.response_format {
            match fmt {
                ResponseFormat::JsonObject => {
                    obj.insert("response_format".into(), serde_json::json!({"type": "json_object"}));
                }
                ResponseFormat::JsonSchema { schema, name } => {
                    obj.insert(
                        "response_format".into(),
                        serde_json::json!({
                            "type": "json_schema",
                            "json_schema": {
                                "name": name,
                                "schema": schema,
                                "strict": true,
                            }
                        }),
                    );
                }
                ResponseFormat::Text => {}
            }
        }

        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, ChatcastError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelProvider for GatewayProvider {
    fn provider_name(&self) -> &str {
        self.model.provider()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, ChatcastError> {
        let body = self.build_request_body(request, false);
        debug!(model = %self.model_id, "gateway generate_text");

        let data: ChatResponse = self.post(&body).await?.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatcastError::api(200, "No choices in gateway response"))?;

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage: data.usage.as_ref().map(Usage::from_raw).unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .and_then(FinishReason::parse_lenient),
        })
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, ChatcastError>>, ChatcastError> {
        let body = self.build_request_body(request, true);
        debug!(model = %self.model_id, "gateway stream_text");

        let byte_stream = self.post(&body).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finish_reason = None;
            let mut usage = None;
            let mut saw_done = false;
            futures::pin_mut!(byte_stream);

            'read: while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ChatcastError::Network(e));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&raw).trim().to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    if is_done_marker(&line) {
                        saw_done = true;
                        break 'read;
                    }
                    let Some(data) = parse_sse_data(&line) else {
                        continue;
                    };
                    let Ok(event) = serde_json::from_str::<StreamChunk>(data) else {
                        continue;
                    };

                    if let Some(err) = event.error {
                        yield Err(ChatcastError::Stream(stream_error_message(&err)));
                        return;
                    }
                    if let Some(raw_usage) = event.usage.as_ref() {
                        usage = Some(Usage::from_raw(raw_usage));
                    }
                    for choice in event.choices {
                        if let Some(reason) = choice.finish_reason.as_deref() {
                            finish_reason = FinishReason::parse_lenient(reason);
                        }
                        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                            yield Ok(TextStreamDelta::text(text));
                        }
                    }
                }
            }

            if saw_done || finish_reason.is_some() {
                yield Ok(TextStreamDelta::done(finish_reason, usage));
            } else {
                yield Err(ChatcastError::Stream("gateway stream ended before completion".into()));
            }
        };

        Ok(Box::pin(stream))
    }
}

fn stream_error_message(err: &Value) -> String {
    err.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

// Gateway response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<Value>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}
