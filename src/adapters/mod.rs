//! Upstream adapters: best-effort side queries that never fail a turn.

pub mod city;
pub mod suggestions;
pub mod weather;

pub use city::extract_city;
pub use suggestions::generate_suggested_actions;
pub use weather::{WeatherOutcome, WeatherService, WttrClient};
