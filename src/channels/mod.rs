//! Transport abstraction for update intake and reply delivery.

pub mod telegram;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::pipeline::types::{OutboundReply, Update};

pub use telegram::{BotIdentity, TelegramChannel};

/// Lazy, possibly endless sequence of updates. Ends when the source closes.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Update> + Send>>;

/// Delivers replies back to the platform.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Post `reply`. Errors are reported to the caller and never retried here.
    async fn send_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError>;
}

/// A messaging platform connection.
#[async_trait]
pub trait Channel: ReplySender {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Begin receiving updates.
    async fn start(&self) -> Result<UpdateStream, ChannelError>;
}
