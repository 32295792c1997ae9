//! Shared types for the message processing pipeline.

// ── Inbound ─────────────────────────────────────────────────────────

/// One event delivered by the transport.
///
/// Only new messages carry a payload; edits, channel posts and other
/// event kinds arrive with `message: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Transport-assigned update id, monotonically increasing.
    pub update_id: i64,
    /// The user-authored message, if this update carries one.
    pub message: Option<InboundMessage>,
}

impl Update {
    /// An update carrying a message.
    pub fn message(update_id: i64, message: InboundMessage) -> Self {
        Self {
            update_id,
            message: Some(message),
        }
    }

    /// An update without a message payload.
    pub fn empty(update_id: i64) -> Self {
        Self {
            update_id,
            message: None,
        }
    }
}

/// A user-authored chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Conversation the message was posted in.
    pub chat_id: i64,
    /// Message id within the conversation.
    pub message_id: i64,
    /// Message text. Empty for media messages without text.
    pub text: String,
}

impl InboundMessage {
    pub fn new(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
        }
    }
}

// ── Outbound ────────────────────────────────────────────────────────

/// A reply threaded under the message that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    /// Conversation to post into.
    pub chat_id: i64,
    /// Reply body.
    pub text: String,
    /// Message being replied to.
    pub reply_to_message_id: i64,
}

impl OutboundReply {
    /// Build a reply to `message` in its own conversation.
    pub fn to(message: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            chat_id: message.chat_id,
            text: text.into(),
            reply_to_message_id: message.message_id,
        }
    }
}
