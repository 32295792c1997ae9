//! Configuration types.
//!
//! The bot reads a small JSON file:
//!
//! ```json
//! { "token": "123456:ABC-DEF", "env": "production" }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default Telegram Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Default long-poll timeout for `getUpdates`, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

/// Deployment environment. Only affects logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Environment {
    #[default]
    Debug,
    Production,
}

/// Parse an environment name, ignoring ASCII case.
pub fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    if value.eq_ignore_ascii_case("debug") {
        Ok(Environment::Debug)
    } else if value.eq_ignore_ascii_case("production") {
        Ok(Environment::Production)
    } else {
        Err(ConfigError::InvalidEnvironment(value.to_string()))
    }
}

impl Environment {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_environment(s)
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_environment(&value)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => f.write_str("debug"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// On-disk shape of the config file.
#[derive(Deserialize)]
struct RawConfig {
    token: String,
    env: Environment,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    poll_timeout_secs: Option<u64>,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. Opaque, passed straight to the transport.
    pub token: SecretString,
    /// Deployment environment.
    pub env: Environment,
    /// Bot API base URL, without trailing slash.
    pub api_url: String,
    /// Long-poll timeout for `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Read and parse the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse config from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if raw.token.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "token".into(),
                hint: "Set \"token\" to the bot token issued by @BotFather.".into(),
            });
        }

        let api_url = raw
            .api_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            token: SecretString::from(raw.token),
            env: raw.env,
            api_url,
            poll_timeout_secs: raw.poll_timeout_secs.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
        })
    }

    /// Load `path`, then apply the `token` override.
    pub fn load_with_token_override(
        path: impl AsRef<Path>,
        token: Option<String>,
    ) -> crate::Result<Self> {
        Ok(Self::load(path)?.with_token_override(token))
    }

    /// Replace the token when `token` is present and non-empty.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = SecretString::from(token);
        }
        self
    }
}
