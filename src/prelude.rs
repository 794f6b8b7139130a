//! Convenience re-exports for common use.

pub use crate::adapters::{WeatherOutcome, WeatherService};
pub use crate::compose::{
    ChunkSink, Composer, ComposerOptions, GatewayServices, ServiceFactory, StreamFrame,
    TurnOutcome, TurnServices,
};
pub use crate::config::ChatcastConfig;
pub use crate::error::{ChatcastError, Result};
pub use crate::models::ModelId;
pub use crate::provider::ModelProvider;
pub use crate::types::{Chunk, GenerationSettings, ModelMessage, Role, UiMessage, Usage};
pub use crate::writer::{spawn_turn, TurnStream};
