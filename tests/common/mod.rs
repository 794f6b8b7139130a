//! Shared test helpers: scripted model provider, canned weather, turn runner.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use chatcast::adapters::{WeatherOutcome, WeatherService};
use chatcast::compose::{Composer, ComposerOptions, ServiceFactory, StreamFrame, TurnServices};
use chatcast::error::ChatcastError;
use chatcast::models::ModelCapabilities;
use chatcast::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use chatcast::types::*;
use chatcast::writer::spawn_turn;

/// One step of a scripted model stream.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Text(String),
    Done { total_tokens: Option<u32> },
    Fail(String),
    /// Never yields again.
    Hang,
}

/// A provider whose structured replies are keyed by schema name and whose
/// stream follows a fixed script.
pub struct ScriptedProvider {
    model_id: String,
    capabilities: ModelCapabilities,
    structured: Mutex<HashMap<String, Result<String, String>>>,
    script: Mutex<Vec<StreamStep>>,
    open_error: Mutex<Option<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            capabilities: ModelCapabilities::full(),
            structured: Mutex::new(HashMap::new()),
            script: Mutex::new(Vec::new()),
            open_error: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply to structured calls named `schema_name` with `text`.
    pub fn reply(self, schema_name: &str, text: &str) -> Self {
        self.structured
            .lock()
            .unwrap()
            .insert(schema_name.to_string(), Ok(text.to_string()));
        self
    }

    /// Fail structured calls named `schema_name`.
    pub fn fail(self, schema_name: &str, message: &str) -> Self {
        self.structured
            .lock()
            .unwrap()
            .insert(schema_name.to_string(), Err(message.to_string()));
        self
    }

    pub fn stream(self, steps: Vec<StreamStep>) -> Self {
        *self.script.lock().unwrap() = steps;
        self
    }

    /// Stream `words` then finish with `total_tokens`.
    pub fn streaming_words(self, words: &[&str], total_tokens: Option<u32>) -> Self {
        let mut steps: Vec<StreamStep> = words.iter().map(|w| StreamStep::Text(w.to_string())).collect();
        steps.push(StreamStep::Done { total_tokens });
        self.stream(steps)
    }

    pub fn refuse_stream(self, message: &str) -> Self {
        *self.open_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn schema_name(request: &ProviderRequest) -> Option<String> {
        match &request.settings.response_format {
            Some(ResponseFormat::JsonSchema { name, .. }) => Some(name.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, ChatcastError> {
        self.requests.lock().unwrap().push(request.clone());
        let name = Self::schema_name(request).unwrap_or_default();
        let reply = self.structured.lock().unwrap().get(&name).cloned();
        match reply {
            Some(Ok(text)) => Ok(ProviderResponse {
                text,
                usage: Usage::default(),
                finish_reason: Some(FinishReason::Stop),
            }),
            Some(Err(message)) => Err(ChatcastError::api(500, message)),
            None => Err(ChatcastError::api(404, format!("no scripted reply for {name:?}"))),
        }
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, ChatcastError>>, ChatcastError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = self.open_error.lock().unwrap().clone() {
            return Err(ChatcastError::api(502, message));
        }
        let steps = self.script.lock().unwrap().clone();

        let stream = async_stream::stream! {
            for step in steps {
                match step {
                    StreamStep::Text(text) => yield Ok(TextStreamDelta::text(text)),
                    StreamStep::Done { total_tokens } => {
                        let usage = Usage { total_tokens, ..Default::default() };
                        yield Ok(TextStreamDelta::done(Some(FinishReason::Stop), Some(usage)));
                    }
                    StreamStep::Fail(message) => {
                        yield Err(ChatcastError::Stream(message));
                        return;
                    }
                    StreamStep::Hang => futures::future::pending::<()>().await,
                }
            }
        };
        Ok(stream.boxed())
    }
}

/// Weather that answers with a fixed outcome and records what was asked.
pub struct MockWeather {
    outcome: WeatherOutcome,
    delay: Option<Duration>,
    places: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn summary(text: &str) -> Self {
        Self::with_outcome(WeatherOutcome::Summary(text.to_string()))
    }

    pub fn failing(error: &str) -> Self {
        Self::with_outcome(WeatherOutcome::Failed {
            error: error.to_string(),
        })
    }

    fn with_outcome(outcome: WeatherOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            places: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn places(&self) -> Vec<String> {
        self.places.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherService for MockWeather {
    async fn summary(&self, place: &str) -> WeatherOutcome {
        self.places.lock().unwrap().push(place.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

pub const CITY_SCHEMA: &str = "city_extraction";
pub const SUGGESTIONS_SCHEMA: &str = "suggested_actions";

pub fn services(
    chat: Arc<ScriptedProvider>,
    structured: Arc<ScriptedProvider>,
    weather: Arc<MockWeather>,
) -> TurnServices {
    TurnServices {
        chat,
        structured,
        weather,
    }
}

pub fn composer(services: TurnServices) -> Composer {
    Composer::new(services, ComposerOptions::default())
}

/// Run a turn to its end and collect every frame.
pub async fn run_turn(composer: Composer, messages: Vec<UiMessage>, budget: Duration) -> Vec<StreamFrame> {
    spawn_turn(composer, messages, budget).collect().await
}

pub fn chunks(frames: &[StreamFrame]) -> Vec<&Chunk> {
    frames
        .iter()
        .filter_map(|f| match f {
            StreamFrame::Chunk(chunk) => Some(chunk),
            _ => None,
        })
        .collect()
}

pub fn kinds(frames: &[StreamFrame]) -> Vec<String> {
    chunks(frames).iter().map(|c| c.kind().into_owned()).collect()
}

/// Hands out the same services for every request, whatever its key.
pub struct StaticFactory {
    pub services: TurnServices,
}

impl ServiceFactory for StaticFactory {
    fn services(&self, _api_key: Option<&str>) -> Result<TurnServices, ChatcastError> {
        Ok(self.services.clone())
    }

    fn options(&self) -> ComposerOptions {
        ComposerOptions::default()
    }
}
