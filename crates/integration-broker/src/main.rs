//! Integration Broker - Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use integration_broker::{config::Config, server::BrokerServer};

#[derive(Parser, Debug)]
#[command(name = "integration-broker")]
#[command(about = "OAuth broker and item loader for third-party integrations")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cli.port,
        "Starting integration broker"
    );

    let config = Config::from_env()?;
    tracing::info!(providers = ?config.configured_providers(), "Loaded configuration");

    let server = BrokerServer::new(&config).await?;
    server.run_http(cli.port).await
}
