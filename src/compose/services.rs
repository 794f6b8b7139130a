//! Per-request construction of the services a turn talks to.

use std::sync::Arc;

use tracing::warn;

use crate::adapters::WttrClient;
use crate::config::{ChatcastConfig, API_KEY_ENV};
use crate::error::Result;
use crate::provider::Gateway;

use super::{Composer, ComposerOptions, TurnServices};

/// Builds the services for one turn from that turn's credential.
pub trait ServiceFactory: Send + Sync {
    /// `api_key` is the key carried by the request, if any.
    fn services(&self, api_key: Option<&str>) -> Result<TurnServices>;

    fn options(&self) -> ComposerOptions;

    fn composer(&self, api_key: Option<&str>) -> Result<Composer> {
        Ok(Composer::new(self.services(api_key)?, self.options()))
    }
}

/// Services backed by the AI gateway and wttr.in.
#[derive(Debug, Clone)]
pub struct GatewayServices {
    config: ChatcastConfig,
}

impl GatewayServices {
    pub fn new(config: ChatcastConfig) -> Self {
        Self { config }
    }
}

impl ServiceFactory for GatewayServices {
    fn services(&self, api_key: Option<&str>) -> Result<TurnServices> {
        // Without a key the gateway rejects the model call and the turn ends
        // with an error frame.
        let key = self.config.resolve_api_key(api_key).unwrap_or_else(|| {
            warn!("no request key and {API_KEY_ENV} unset; calling gateway without credentials");
            String::new()
        });
        let gateway = Gateway::new(key, self.config.gateway_base_url.clone());

        Ok(TurnServices {
            chat: Arc::new(gateway.model(self.config.chat_model.clone())),
            structured: Arc::new(gateway.model(self.config.structured_model.clone())),
            weather: Arc::new(WttrClient::new(self.config.weather_base_url.clone())),
        })
    }

    fn options(&self) -> ComposerOptions {
        ComposerOptions::from_config(&self.config)
    }
}
