//! HTTP surface of the broker.
//!
//! Routes are thin: each one resolves the provider from the path and hands
//! off to its [`OAuthFlow`](crate::oauth::OAuthFlow). Errors are rendered
//! as `{"detail": message}` with the status from
//! [`IntegrationError::status_code`](crate::error::IntegrationError::status_code).

mod page;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;

use crate::cache;
use crate::client::UpstreamClient;
use crate::config::Config;
use crate::oauth::CredentialBroker;
use crate::providers::ProviderRegistry;

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub registry: ProviderRegistry,

    /// Name of the cache backend, reported on `/health`.
    pub cache_backend: &'static str,

    /// Front-end origin allowed by CORS.
    pub allowed_origin: HeaderValue,
}

impl AppState {
    /// Assemble handler state from already-built collaborators.
    ///
    /// # Errors
    ///
    /// Returns error if a provider descriptor or the front-end origin is invalid.
    pub fn new(
        config: &Config,
        broker: CredentialBroker,
        client: UpstreamClient,
    ) -> anyhow::Result<Self> {
        let origin = &config.frontend_origin;
        let allowed_origin = HeaderValue::from_str(origin)
            .map_err(|e| anyhow::anyhow!("invalid origin {origin:?}: {e}"))?;
        let cache_backend = broker.backend();
        let registry = ProviderRegistry::new(config, broker, client)?;

        Ok(Self {
            registry,
            cache_backend,
            allowed_origin,
        })
    }
}

/// The broker service.
#[derive(Debug)]
pub struct BrokerServer {
    state: Arc<AppState>,
}

impl BrokerServer {
    /// Connect the cache, build the upstream client and register providers.
    ///
    /// # Errors
    ///
    /// Returns error if the cache is unreachable or the configuration is invalid.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let broker = CredentialBroker::new(cache::connect(config).await?);
        let client = UpstreamClient::new(config)?;
        let state = AppState::new(config, broker, client)?;

        Ok(Self {
            state: Arc::new(state),
        })
    }

    /// Router over this server's state.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        routes::create_router(Arc::clone(&self.state))
    }

    /// Serve until CTRL+C.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        let providers = self.state.registry.providers();
        if providers.is_empty() {
            tracing::warn!("No provider has client credentials configured");
        }
        tracing::info!(?providers, cache = self.state.cache_backend, "Registered providers");

        let router = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
