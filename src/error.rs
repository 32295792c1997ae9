//! Error types for the link bot.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid value for environment: {0:?} (expected \"debug\" or \"production\")")]
    InvalidEnvironment(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("Failed to send reply on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Rate limited on channel {name}, retry after {retry_after:?}s")]
    RateLimited {
        name: String,
        retry_after: Option<u64>,
    },

    #[error("Channel {name} API error {status}: {description}")]
    Api {
        name: String,
        status: u16,
        description: String,
    },

    #[error("Invalid response from channel {name}: {reason}")]
    InvalidResponse { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
