//! Telegram channel — long-polls the Bot API for updates.
//!
//! Talks to the Bot API directly over `reqwest`: `getMe` for the startup
//! identity check, `getUpdates` for intake and `sendMessage` for replies.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, ReplySender, UpdateStream};
use crate::config::{BotConfig, DEFAULT_API_URL, DEFAULT_POLL_TIMEOUT_SECS};
use crate::error::ChannelError;
use crate::pipeline::types::{InboundMessage, OutboundReply, Update};

const CHANNEL_NAME: &str = "telegram";

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Updates buffered between the poll task and the consumer.
const UPDATE_BUFFER: usize = 100;

/// Pause after a failed poll before trying again.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_REQUEST_SLACK: Duration = Duration::from_secs(10);

/// Timeout for non-polling API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The bot account behind a token, as reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// Telegram channel — connects to the Bot API via long-polling.
#[derive(Clone)]
pub struct TelegramChannel {
    token: SecretString,
    api_url: String,
    poll_timeout: Duration,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            api_url: DEFAULT_API_URL.to_string(),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            retry_delay: DEFAULT_RETRY_DELAY,
            client: reqwest::Client::new(),
        }
    }

    /// Build a channel from the bot configuration.
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.token.clone())
            .with_api_url(&config.api_url)
            .with_poll_timeout(Duration::from_secs(config.poll_timeout_secs))
    }

    /// Point at a different Bot API server (self-hosted, or a test double).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Full method URL. Contains the token, never log it.
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token.expose_secret())
    }

    /// Verify the token and return the bot account it belongs to.
    pub async fn health_check(&self) -> Result<BotIdentity, ChannelError> {
        let me: TgUser = self
            .call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT)
            .await
            .map_err(|e| match e {
                ChannelError::AuthFailed { .. } => e,
                other => ChannelError::StartupFailed {
                    name: CHANNEL_NAME.into(),
                    reason: other.to_string(),
                },
            })?;

        Ok(BotIdentity {
            id: me.id,
            username: me.username.unwrap_or_default(),
        })
    }

    /// Invoke a Bot API method and decode its `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
        timeout: Duration,
    ) -> Result<T, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        let status = resp.status();
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        if !body.ok || !status.is_success() {
            return Err(api_error(status.as_u16(), body));
        }

        serde_json::from_value(body.result.unwrap_or_default()).map_err(|e| {
            ChannelError::InvalidResponse {
                name: CHANNEL_NAME.into(),
                reason: format!("{method}: {e}"),
            }
        })
    }

    /// One long-poll round trip.
    async fn get_updates(&self, offset: i64) -> Result<Vec<serde_json::Value>, ChannelError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
        };
        self.call("getUpdates", &body, self.poll_timeout + POLL_REQUEST_SLACK)
            .await
    }

    /// Poll until the receiver goes away or Telegram rejects the token.
    async fn poll_loop(self, tx: mpsc::Sender<Update>) {
        let mut offset: i64 = 0;

        info!("Telegram channel listening for updates...");

        loop {
            let result = tokio::select! {
                _ = tx.closed() => {
                    info!("Telegram update receiver dropped, stopping poller");
                    return;
                }
                r = self.get_updates(offset) => r,
            };

            let batch = match result {
                Ok(batch) => batch,
                Err(ChannelError::AuthFailed { reason, .. }) => {
                    error!(%reason, "Telegram rejected the bot token, closing update stream");
                    return;
                }
                Err(ChannelError::RateLimited { retry_after, .. }) => {
                    let delay = retry_after.map_or(self.retry_delay, Duration::from_secs);
                    warn!(delay_secs = delay.as_secs(), "Telegram poll rate limited");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Telegram poll error");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            for raw in batch {
                // Advance offset past this update, even if it fails to decode.
                let Some(update_id) = raw.get("update_id").and_then(serde_json::Value::as_i64)
                else {
                    warn!("Telegram update without update_id");
                    continue;
                };
                offset = offset.max(update_id + 1);

                let update = match serde_json::from_value::<TgUpdate>(raw) {
                    Ok(u) => u.into_update(),
                    Err(e) => {
                        warn!(update_id, error = %e, "Skipping malformed Telegram update");
                        continue;
                    }
                };

                debug!(update_id, has_message = update.message.is_some(), "Telegram update");

                if tx.send(update).await.is_err() {
                    info!("Telegram update receiver dropped, stopping poller");
                    return;
                }
            }
        }
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl ReplySender for TelegramChannel {
    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError> {
        for chunk in split_message(&reply.text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            let body = SendMessageRequest {
                chat_id: reply.chat_id,
                text: &chunk,
                reply_parameters: ReplyParameters {
                    message_id: reply.reply_to_message_id,
                },
            };
            let _: serde_json::Value = self
                .call("sendMessage", &body, REQUEST_TIMEOUT)
                .await
                .map_err(into_send_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<UpdateStream, ChannelError> {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        tokio::spawn(self.clone().poll_loop(tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

impl TgUpdate {
    fn into_update(self) -> Update {
        Update {
            update_id: self.update_id,
            message: self.message.map(|m| InboundMessage {
                chat_id: m.chat.id,
                message_id: m.message_id,
                text: m.text.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    reply_parameters: ReplyParameters,
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a non-`ok` Bot API response to a channel error.
fn api_error(http_status: u16, body: ApiResponse) -> ChannelError {
    let status = body.error_code.unwrap_or(http_status);
    let description = body
        .description
        .unwrap_or_else(|| "no description".to_string());

    match status {
        401 => ChannelError::AuthFailed {
            name: CHANNEL_NAME.into(),
            reason: description,
        },
        429 => ChannelError::RateLimited {
            name: CHANNEL_NAME.into(),
            retry_after: body.parameters.and_then(|p| p.retry_after),
        },
        _ => ChannelError::Api {
            name: CHANNEL_NAME.into(),
            status,
            description,
        },
    }
}

/// Collapse transport and API failures on the send path into `SendFailed`.
fn into_send_error(e: ChannelError) -> ChannelError {
    match e {
        ChannelError::RateLimited { .. } | ChannelError::AuthFailed { .. } => e,
        other => ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: other.to_string(),
        },
    }
}

/// Split a message into chunks that fit Telegram's character limit.
/// Splits between lines, hard-cutting only lines that are too long on their own.
/// Whitespace-only chunks are dropped.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if !current.is_empty() && current.len() + line.len() > max_len {
            chunks.push(std::mem::take(&mut current));
        }

        let mut rest = line;
        while rest.len() > max_len {
            let mut cut = max_len;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }
            chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    // Telegram rejects blank messages, e.g. a lone "\n" left by a hard cut.
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
