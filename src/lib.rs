pub mod bridge;
pub mod commands;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod gesture;
pub mod notify;
pub mod prompts;
pub mod snapping;
pub mod viewer;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bridge::HttpBridge;
use crate::commands::{dispatch, parse_line, ViewerHost};
use crate::config::AppConfig;
use crate::errors::BoxPromptResult;
use crate::prompts::{BoxPromptController, Collaborators};
use crate::viewer::TracingOverlay;

/// Headless viewer driver: reads JSON-line commands from stdin and polls the
/// connection until stdin closes.
pub async fn run() -> BoxPromptResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, ".env not loaded");
    }

    let mut config = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config.toml: {e}. Using defaults.");
        AppConfig::default()
    });
    config::apply_env_overrides(&mut config);

    let host = ViewerHost::new(config.clone());
    let notifications = host.notifications.clone();
    let bridge = Arc::new(HttpBridge::new(&config.bridge)?);
    tracing::info!(endpoint = %bridge.endpoint(), "service bridge ready");

    let mut ctl = BoxPromptController::new(
        &config,
        Collaborators {
            bridge,
            media: Arc::new(host.media.clone()),
            overlay: Box::new(TracingOverlay::default()),
            notifier: notifications.clone(),
            connection: Arc::new(host.connection.clone()),
        },
    )?;

    let polling = config.viewer.poll_interval_ms > 0;
    let mut ticker = tokio::time::interval(Duration::from_millis(config.viewer.poll_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed, shutting down");
                    break;
                };
                match parse_line(&line) {
                    Ok(Some(cmd)) => {
                        if let Err(e) = dispatch(&mut ctl, &host, cmd).await {
                            tracing::warn!(error = %e, "command failed");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, line = %line, "unparseable command"),
                }
            }
            _ = ticker.tick(), if polling => {
                if let Err(e) = ctl.sync_connection().await {
                    tracing::warn!(error = %e, "connection sync failed");
                }
                notifications.prune(chrono::Utc::now());
            }
        }
    }

    Ok(())
}
