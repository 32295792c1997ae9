//! Update consumer — turns inbound messages into link replies.
//!
//! Flow per update:
//! 1. Skip updates without a message payload
//! 2. Extract forum references from the text
//! 3. Skip messages without references
//! 4. Format and send one threaded reply
//!
//! Updates are handled strictly one at a time, so replies go out in the
//! order their triggering messages arrived. Nothing that happens while
//! handling one update can stop the loop.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::channels::ReplySender;
use crate::pipeline::extract::extract;
use crate::pipeline::reply::format_reply;
use crate::pipeline::types::{OutboundReply, Update};

/// What happened to a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The update carried no message.
    NoMessage,
    /// The message mentioned no communities or users.
    NoReferences,
    /// A reply linking `references` mentions was sent.
    Replied { references: usize },
    /// The reply could not be delivered and was dropped.
    SendFailed,
}

/// Counters for one `Consumer::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Updates pulled from the source.
    pub updates: u64,
    /// Replies delivered.
    pub replies_sent: u64,
    /// Replies that failed to send.
    pub send_failures: u64,
    /// Updates that needed no reply.
    pub skipped: u64,
}

impl ConsumerStats {
    fn record(&mut self, outcome: Outcome) {
        self.updates += 1;
        match outcome {
            Outcome::NoMessage | Outcome::NoReferences => self.skipped += 1,
            Outcome::Replied { .. } => self.replies_sent += 1,
            Outcome::SendFailed => self.send_failures += 1,
        }
    }
}

/// Sequential update consumer.
pub struct Consumer {
    sender: Arc<dyn ReplySender>,
}

impl Consumer {
    /// Create a consumer that replies through `sender`.
    pub fn new(sender: Arc<dyn ReplySender>) -> Self {
        Self { sender }
    }

    /// Consume `updates` until the stream ends.
    pub async fn run<S>(&self, updates: S) -> ConsumerStats
    where
        S: Stream<Item = Update>,
    {
        let mut updates = std::pin::pin!(updates);
        let mut stats = ConsumerStats::default();

        info!("Consumer listening for updates");

        while let Some(update) = updates.next().await {
            let outcome = self.handle_update(update).await;
            stats.record(outcome);
        }

        info!(
            updates = stats.updates,
            replies_sent = stats.replies_sent,
            send_failures = stats.send_failures,
            "Update stream ended"
        );
        stats
    }

    /// Handle exactly one update.
    pub async fn handle_update(&self, update: Update) -> Outcome {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Skipping update without message");
            return Outcome::NoMessage;
        };

        let references = extract(&message.text);
        for reference in &references {
            debug!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                reference = %reference,
                "Got match"
            );
        }

        let Some(text) = format_reply(&references) else {
            debug!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                "No references in message"
            );
            return Outcome::NoReferences;
        };

        let reply = OutboundReply::to(&message, text);
        match self.sender.send_reply(&reply).await {
            Ok(()) => {
                debug!(
                    chat_id = reply.chat_id,
                    reply_to = reply.reply_to_message_id,
                    references = references.len(),
                    "Sent reply"
                );
                Outcome::Replied {
                    references: references.len(),
                }
            }
            Err(e) => {
                warn!(
                    chat_id = reply.chat_id,
                    reply_to = reply.reply_to_message_id,
                    error = %e,
                    "Couldn't send reply"
                );
                Outcome::SendFailed
            }
        }
    }
}
