// src/chat/mod.rs
use async_trait::async_trait;
use thiserror::Error;

pub mod discord;

pub use discord::DiscordSession;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("chat api error: {0}")]
    ChatApi(String),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("could not reach Discord: {0}")]
    Transport(String),
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("no READY from the gateway within {0} seconds")]
    Timeout(u64),
}

/// A logged in chat client.
///
/// One session may be shared by several pollers, so implementations must
/// accept concurrent calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Replaces the bot's "Playing ..." activity.
    async fn set_presence(&self, text: &str) -> Result<(), PublishError>;

    /// Ids of the channels of a guild, `None` if the guild is unknown.
    async fn guild_channel_ids(&self, guild_id: u64) -> Result<Option<Vec<u64>>, PublishError>;

    async fn rename_channel(&self, channel_id: u64, name: &str) -> Result<(), PublishError>;
}
