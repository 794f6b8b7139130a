//! Configuration system (layered: defaults < TOML file < env < command line).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChatcastError, Result};
use crate::models::ModelId;

/// Environment variable holding the process-wide gateway credential.
pub const API_KEY_ENV: &str = "AI_GATEWAY_API_KEY";

/// Process configuration.
///
/// The gateway credential configured here is only a fallback: a request that
/// carries its own key uses that one, and neither is cached across requests.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatcastConfig {
    pub gateway_api_key: Option<String>,
    pub gateway_base_url: Option<String>,
    pub weather_base_url: Option<String>,
    /// Model streamed back to the user.
    pub chat_model: ModelId,
    /// Model used for city extraction and suggestions.
    pub structured_model: ModelId,
    /// Location used when no city can be extracted.
    pub default_city: String,
    /// Wall-clock ceiling for one turn, in seconds.
    pub turn_budget_secs: u64,
    /// Run weather and suggestion calls while the model is still streaming.
    pub prefetch_side_queries: bool,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for ChatcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatcastConfig")
            .field("gateway_api_key", &self.gateway_api_key.as_ref().map(|_| ".."))
            .field("gateway_base_url", &self.gateway_base_url)
            .field("weather_base_url", &self.weather_base_url)
            .field("chat_model", &self.chat_model)
            .field("structured_model", &self.structured_model)
            .field("default_city", &self.default_city)
            .field("turn_budget_secs", &self.turn_budget_secs)
            .field("prefetch_side_queries", &self.prefetch_side_queries)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for ChatcastConfig {
    fn default() -> Self {
        Self {
            gateway_api_key: None,
            gateway_base_url: None,
            weather_base_url: None,
            chat_model: ModelId::new("openai", "gpt-4o-mini"),
            structured_model: ModelId::new("openai", "gpt-4o"),
            default_city: "San Francisco".to_string(),
            turn_budget_secs: 30,
            prefetch_side_queries: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl ChatcastConfig {
    /// Defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Read a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            ChatcastError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.gateway_api_key = Some(key);
        }
        if let Some(url) = get("AI_GATEWAY_BASE_URL") {
            self.gateway_base_url = Some(url);
        }
        if let Some(url) = get("WEATHER_BASE_URL") {
            self.weather_base_url = Some(url);
        }
        if let Some(model) = get("CHATCAST_CHAT_MODEL") {
            self.chat_model = model.parse()?;
        }
        if let Some(model) = get("CHATCAST_STRUCTURED_MODEL") {
            self.structured_model = model.parse()?;
        }
        if let Some(city) = get("CHATCAST_DEFAULT_CITY") {
            self.default_city = city;
        }
        if let Some(secs) = get("CHATCAST_TURN_BUDGET_SECS") {
            self.turn_budget_secs = secs.parse().map_err(|_| {
                ChatcastError::Configuration(format!("CHATCAST_TURN_BUDGET_SECS is not a number: {secs}"))
            })?;
        }
        if let Some(flag) = get("CHATCAST_PREFETCH") {
            self.prefetch_side_queries = matches!(flag.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(host) = get("CHATCAST_HOST") {
            self.host = host;
        }
        if let Some(port) = get("CHATCAST_PORT") {
            self.port = port.parse().map_err(|_| {
                ChatcastError::Configuration(format!("CHATCAST_PORT is not a port number: {port}"))
            })?;
        }
        if let Some(origins) = get("CHATCAST_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn turn_budget(&self) -> Duration {
        Duration::from_secs(self.turn_budget_secs)
    }

    /// The credential for one request: the request's own key when present,
    /// otherwise the configured fallback.
    pub fn resolve_api_key(&self, request_key: Option<&str>) -> Option<String> {
        request_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.gateway_api_key.clone())
    }
}
