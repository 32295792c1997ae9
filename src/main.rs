use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, reload};

use sublink_bot::channels::{Channel, TelegramChannel, UpdateStream};
use sublink_bot::config::{BotConfig, DEFAULT_CONFIG_PATH};
use sublink_bot::pipeline::Consumer;

/// Filter used until the config says which environment we run in.
const STARTUP_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing before anything can fail. RUST_LOG wins; otherwise
    // the filter is swapped for the environment default once config loads.
    let explicit = log_filter(std::env::var("RUST_LOG").ok().as_deref());
    let rust_log_set = explicit.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(explicit.unwrap_or_else(|| EnvFilter::new(STARTUP_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let config_path =
        std::env::var("SUBLINK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match BotConfig::load_with_token_override(
        &config_path,
        std::env::var("TELEGRAM_BOT_TOKEN").ok(),
    ) {
        Ok(config) => config,
        Err(e) => {
            error!(config = %config_path, error = %e, "Failed to load configuration");
            return Err(e).context("Failed to load configuration");
        }
    };

    if !rust_log_set {
        let env_filter = EnvFilter::new(config.env.default_log_filter());
        if let Err(e) = filter_handle.reload(env_filter) {
            warn!(error = %e, "Couldn't apply environment log filter");
        }
    }

    info!(env = %config.env, config = %config_path, "sublink-bot v{}", env!("CARGO_PKG_VERSION"));

    let (channel, updates) = connect(&config)
        .await
        .context("Couldn't connect to Telegram API")?;
    let consumer = Consumer::new(channel);

    tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down...");
            Ok(())
        }
        stats = consumer.run(updates) => {
            error!(
                updates = stats.updates,
                replies_sent = stats.replies_sent,
                "Update stream closed"
            );
            Err(anyhow::anyhow!("update stream closed"))
        }
    }
}

/// Parse explicit `RUST_LOG` directives. Unset, blank or invalid yields `None`.
fn log_filter(directives: Option<&str>) -> Option<EnvFilter> {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
}

/// Verify the token and open the update stream.
async fn connect(config: &BotConfig) -> sublink_bot::Result<(Arc<TelegramChannel>, UpdateStream)> {
    let channel = Arc::new(TelegramChannel::from_config(config));

    let me = channel.health_check().await?;
    info!(
        channel = channel.name(),
        username = %me.username,
        id = me.id,
        "Connected to Telegram API"
    );

    let updates = channel.start().await?;
    Ok((channel, updates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_needs_directives() {
        assert!(log_filter(None).is_none());
        assert!(log_filter(Some("")).is_none());
        assert!(log_filter(Some("   ")).is_none());
    }

    #[test]
    fn log_filter_accepts_rust_log_directives() {
        let filter = log_filter(Some("warn,sublink_bot=debug")).unwrap();
        assert!(filter.to_string().contains("sublink_bot=debug"));
    }
}
