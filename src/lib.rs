//! chatcast: a streaming chat backend.
//!
//! One chat turn becomes one ordered stream of typed chunks. The model's
//! token stream is relayed verbatim, and around it the composer interleaves
//! a progress notification, weather source citations, a weather card that
//! moves from `loading` to its final state, usage metadata and follow-up
//! suggestions. The response writer frames the stream as Server-Sent Events
//! under a per-turn time budget and stops the turn when the client leaves.
//!
//! # Quick Start
//!
//! ```no_run
//! use chatcast::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> chatcast::error::Result<()> {
//! let config = ChatcastConfig::from_env()?;
//! let budget = config.turn_budget();
//! let composer = GatewayServices::new(config).composer(None)?;
//! let mut frames = spawn_turn(composer, vec![UiMessage::user("Weather in Laval?")], budget);
//! while let Some(frame) = frames.next().await {
//!     println!("{}", frame.sse_data());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod compose;
pub mod config;
pub mod encoder;
pub mod error;
pub mod generation;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod types;
pub mod util;
pub mod writer;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;
