//! sublink-bot — links Reddit communities and users mentioned in Telegram chats.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;

pub use error::{Error, Result};
