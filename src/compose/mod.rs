//! Stream composer: one turn's ordered chunk sequence.
//!
//! A turn relays the model sub-stream verbatim and surrounds it with
//! synthetic chunks: a progress notification, source citations and the
//! weather card before the model speaks; usage metadata, the resolved
//! weather card and follow-up suggestions after it. Side queries degrade to
//! defaults. Only a model relay fault fails the turn.

pub mod services;
pub mod sink;

pub use services::{GatewayServices, ServiceFactory};
pub use sink::{channel, ChunkSink, FrameReceiver, StreamFrame, TurnOutcome};

use std::sync::Arc;

use futures::StreamExt;
use strum::Display;
use tracing::{debug, info, warn};

use crate::adapters::{extract_city, generate_suggested_actions, WeatherOutcome, WeatherService};
use crate::config::ChatcastConfig;
use crate::encoder::{
    build_source_urls, message_metadata, notification, source_url, suggestions, weather_loading,
    weather_resolved,
};
use crate::error::Result;
use crate::generation::{to_ui_message_stream, UiMessageStream};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::types::{
    convert_to_model_messages, Chunk, FinishEvent, GenerationSettings, MessageMetadata,
    NotificationLevel, SuggestedAction, UiMessage,
};
use crate::util::task::AbortOnDrop;

pub const PROCESSING_MESSAGE: &str = "Processing your request...";
pub const COMPLETED_MESSAGE: &str = "Request completed";

/// The capabilities one turn talks to, bound to that turn's credential.
#[derive(Clone)]
pub struct TurnServices {
    /// Model whose stream is relayed to the client.
    pub chat: Arc<dyn ModelProvider>,
    /// Model for city extraction and suggestions.
    pub structured: Arc<dyn ModelProvider>,
    pub weather: Arc<dyn WeatherService>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerOptions {
    pub default_city: String,
    /// Start the weather and suggestion calls before relaying the model.
    pub prefetch: bool,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self::from_config(&ChatcastConfig::default())
    }
}

impl ComposerOptions {
    pub fn from_config(config: &ChatcastConfig) -> Self {
        Self {
            default_city: config.default_city.clone(),
            prefetch: config.prefetch_side_queries,
        }
    }
}

/// Composer progress. Transitions only move forward; `Error` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnState {
    Init,
    StreamingModel,
    AwaitingWeather,
    AwaitingSuggestions,
    Done,
    Error,
}

struct StateTracker {
    state: TurnState,
}

impl StateTracker {
    fn new() -> Self {
        debug!(state = %TurnState::Init, "turn started");
        Self { state: TurnState::Init }
    }

    fn advance(&mut self, next: TurnState) {
        debug!(from = %self.state, to = %next, "turn state");
        self.state = next;
    }
}

/// Side query results started ahead of the relay.
struct Prefetched {
    weather: AbortOnDrop<WeatherOutcome>,
    suggestions: AbortOnDrop<Vec<SuggestedAction>>,
}

pub struct Composer {
    services: TurnServices,
    options: ComposerOptions,
}

impl Composer {
    pub fn new(services: TurnServices, options: ComposerOptions) -> Self {
        Self { services, options }
    }

    /// Write one full turn into `sink`.
    ///
    /// Returns an error only when the model relay fails or the consumer went
    /// away. The caller decides how the sink ends.
    pub async fn compose(&self, messages: &[UiMessage], sink: &mut ChunkSink) -> Result<()> {
        let mut tracker = StateTracker::new();

        sink.emit(notification(PROCESSING_MESSAGE, NotificationLevel::Info))?;

        let city = match extract_city(self.services.structured.as_ref(), messages).await {
            Some(city) => city,
            None => {
                debug!(default = %self.options.default_city, "using default city");
                self.options.default_city.clone()
            }
        };
        for citation in build_source_urls(Some(&city)) {
            sink.emit(source_url(citation))?;
        }
        sink.emit(weather_loading(&city))?;

        let prefetched = self.options.prefetch.then(|| self.prefetch(&city, messages));

        tracker.advance(TurnState::StreamingModel);
        if let Err(e) = self.relay_model(messages, sink).await {
            if !e.is_cancellation() {
                tracker.advance(TurnState::Error);
            }
            return Err(e);
        }

        tracker.advance(TurnState::AwaitingWeather);
        let (weather, actions) = match prefetched {
            Some(Prefetched { weather, suggestions }) => {
                let weather = weather.await.unwrap_or_else(|e| WeatherOutcome::Failed {
                    error: e.to_string(),
                });
                sink.emit(weather_resolved(&city, &weather))?;
                tracker.advance(TurnState::AwaitingSuggestions);
                let actions = suggestions.await.unwrap_or_else(|e| {
                    warn!(error = %e, "suggestion task failed");
                    Vec::new()
                });
                (weather, actions)
            }
            None => {
                let weather = self.services.weather.summary(&city).await;
                sink.emit(weather_resolved(&city, &weather))?;
                tracker.advance(TurnState::AwaitingSuggestions);
                let actions =
                    generate_suggested_actions(self.services.structured.as_ref(), messages).await;
                (weather, actions)
            }
        };
        if let WeatherOutcome::Failed { error } = &weather {
            warn!(city = %city, error = %error, "weather unavailable");
        }

        if let Some(chunk) = suggestions(&actions) {
            sink.emit(chunk)?;
        }

        tracker.advance(TurnState::Done);
        Ok(())
    }

    fn prefetch(&self, city: &str, messages: &[UiMessage]) -> Prefetched {
        debug!("prefetching side queries");
        let weather_service = self.services.weather.clone();
        let place = city.to_string();
        let weather = AbortOnDrop::spawn(async move { weather_service.summary(&place).await });

        let structured = self.services.structured.clone();
        let history = messages.to_vec();
        let suggestions = AbortOnDrop::spawn(async move {
            generate_suggested_actions(structured.as_ref(), &history).await
        });

        Prefetched { weather, suggestions }
    }

    async fn relay_model(&self, messages: &[UiMessage], sink: &mut ChunkSink) -> Result<()> {
        let chat = self.services.chat.as_ref();
        let request = ProviderRequest {
            messages: convert_to_model_messages(messages),
            settings: GenerationSettings::default(),
        };
        let deltas = chat.stream_text(&request).await?;
        let UiMessageStream {
            mut chunks,
            completion,
        } = to_ui_message_stream(deltas);

        let mut metadata_sent = false;
        while let Some(item) = chunks.next().await {
            let chunk = item?;
            let is_start = matches!(chunk, Chunk::Start { .. });
            sink.emit(chunk)?;
            if is_start && !metadata_sent {
                metadata_sent = true;
                sink.emit(message_metadata(MessageMetadata {
                    created_at: Some(chrono::Utc::now().timestamp_millis()),
                    model: Some(chat.model_id().to_string()),
                    total_tokens: None,
                }))?;
            }
        }
        drop(chunks);

        if let Some(finish) = completion.wait().await {
            self.report_finish(&finish, sink)?;
        }
        Ok(())
    }

    fn report_finish(&self, finish: &FinishEvent, sink: &mut ChunkSink) -> Result<()> {
        info!(
            model = %self.services.chat.model_id(),
            usage = %finish.usage,
            finish_reason = ?finish.finish_reason,
            "model stream finished"
        );
        sink.emit(notification(COMPLETED_MESSAGE, NotificationLevel::Info))?;
        sink.emit(message_metadata(MessageMetadata {
            total_tokens: finish.usage.total_tokens,
            ..Default::default()
        }))
    }
}
