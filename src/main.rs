//! canopybot entry point.

use anyhow::Context as _;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// How long shutdown waits for mention replies that are still being answered.
const REPLY_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "canopybot")]
#[command(about = "Slack bot that answers mentions using a Canopy backend")]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A local .env file is only read outside production.
    let environment = std::env::var("FLASK_ENV").ok();
    let dotenv_result = if canopybot::config::is_production_env(environment.as_deref()) {
        None
    } else {
        Some(dotenvy::dotenv())
    };

    canopybot::logging::init_tracing(cli.debug);

    match dotenv_result {
        Some(Ok(path)) => tracing::info!(path = %path.display(), "loaded .env file"),
        Some(Err(error)) => tracing::debug!(%error, "no .env file loaded"),
        None => {}
    }

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = canopybot::config::Config::load()
        .with_context(|| "failed to load configuration from environment")?;
    let port = cli.port.unwrap_or(config.port);

    tracing::info!(
        port,
        canopy_url = %config.canopy.api_url,
        bot_user_id = %config.slack.bot_user_id,
        "configuration loaded"
    );

    let canopy = canopybot::canopy::CanopyClient::new(&config.canopy)
        .with_context(|| "failed to create canopy client")?;
    let slack = canopybot::messaging::SlackAdapter::new(config.slack.bot_token.clone())
        .with_context(|| "failed to create slack adapter")?;

    let state = Arc::new(canopybot::api::ApiState::new(
        config.slack.bot_user_id.clone(),
        Some(config.slack.signing_secret.clone()),
        canopy,
        Arc::new(slack),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let bind = SocketAddr::from(([0, 0, 0, 0], port));
    let server = canopybot::api::start_http_server(bind, state.clone(), shutdown_rx)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("canopybot started");

    tokio::signal::ctrl_c()
        .await
        .with_context(|| "failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(error) = server.await {
        tracing::warn!(%error, "HTTP server task failed");
    }

    if !state.drain_tasks(REPLY_DRAIN_TIMEOUT).await {
        tracing::warn!(
            timeout_secs = REPLY_DRAIN_TIMEOUT.as_secs(),
            "in-flight replies did not finish before shutdown"
        );
    }

    tracing::info!("canopybot stopped");
    Ok(())
}
