//! Integration Broker
//!
//! Connects end users' third-party accounts (Notion, Airtable, HubSpot) over
//! OAuth 2.0, holds the resulting credentials just long enough for the
//! front-end to collect them, and lists the resources those credentials can
//! see as normalized [`IntegrationItem`]s.
//!
//! # Features
//!
//! - **One flow, many providers**: a shared authorization-code driver
//!   parameterized by a per-provider descriptor (PKCE, token auth style)
//! - **One-shot credentials**: handed off exactly once, then gone
//! - **Pluggable cache**: Redis for multi-replica deployments, moka in-process otherwise
//! - **Bounded upstream calls**: every provider request carries a timeout
//!
//! # Example
//!
//! ```no_run
//! use integration_broker::{config::Config, server::BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = BrokerServer::new(&config).await?;
//!
//!     server.run_http(8000).await
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod oauth;
pub mod providers;
pub mod server;

pub use client::UpstreamClient;
pub use config::Config;
pub use error::{CacheError, IntegrationError};
pub use models::IntegrationItem;
