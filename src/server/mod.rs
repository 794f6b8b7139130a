//! HTTP surface: `/api/chat` streaming endpoint and `/health`.

pub mod chat;
pub mod error;
pub mod router;

pub use error::ApiError;
pub use router::build_router;

use std::sync::Arc;

use tracing::info;

use crate::compose::{GatewayServices, ServiceFactory};
use crate::config::ChatcastConfig;
use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn ServiceFactory>,
    pub config: Arc<ChatcastConfig>,
}

impl AppState {
    pub fn new(config: ChatcastConfig) -> Self {
        Self {
            factory: Arc::new(GatewayServices::new(config.clone())),
            config: Arc::new(config),
        }
    }

    pub fn with_factory(config: ChatcastConfig, factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            factory,
            config: Arc::new(config),
        }
    }
}

pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let app = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
