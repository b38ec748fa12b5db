use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use karmabot::channel_log::ChannelLogLayer;
use karmabot::config::Config;
use karmabot::karma::{KarmaEngine, ScoreStore};
use karmabot::transport::{drain_reply_writer, parse_line, spawn_reply_writer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "karmabot.json".to_string());
    let config = Config::load(&config_path)?;

    let (replies, writer) = spawn_reply_writer();

    // Setup logging. stdout carries replies, so the console layer uses stderr.
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("karmabot.log"))
        .context("failed to open log file")?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(ref channel) = config.log_channel {
        registry
            .with(ChannelLogLayer::new(replies.clone(), channel.clone()))
            .init();
    } else {
        registry.init();
    }

    info!("Starting karmabot...");
    info!("Loaded config from {}", config.config_path.display());
    info!("Bot user ID: {}", config.bot_user_id);

    let store = if config.dry_run {
        info!("DRY RUN mode enabled, scores are not persisted");
        ScoreStore::in_memory()?
    } else {
        ScoreStore::open(&config.database_path)?
    };
    let mut engine = KarmaEngine::new(store, &config.bot_user_id, config.display_names.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let events = match parse_line(&line) {
                        Ok(events) => events,
                        Err(e) => {
                            warn!("Skipping unreadable event line: {e}");
                            continue;
                        }
                    };
                    for reply in engine.handle_batch(&events) {
                        if replies.send(reply).is_err() {
                            error!("Reply writer stopped");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    info!("Event stream closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read events: {e}");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    // The channel log layer keeps its own sender alive, so the writer never
    // sees the channel close; give it a moment to drain instead.
    drop(replies);
    drain_reply_writer(writer, Duration::from_millis(500)).await;
    Ok(())
}
