//! Message processing pipeline.
//!
//! Every update from the channel flows through:
//! 1. `Consumer::handle_update()` — payload filter
//! 2. `extract()` — forum reference scan
//! 3. `format_reply()` — one link line per reference
//! 4. `ReplySender::send_reply()` — threaded reply

pub mod consumer;
pub mod extract;
pub mod reply;
pub mod types;

pub use consumer::{Consumer, ConsumerStats, Outcome};
pub use extract::{ForumReference, ReferenceKind, extract};
pub use reply::format_reply;
pub use types::{InboundMessage, OutboundReply, Update};
