// src/publisher.rs
use crate::chat::{ChatSession, PublishError};
use crate::models::server::ServerStatus;

/// Where a target's status is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTarget {
    /// The bot's own "Playing ..." activity.
    Presence,
    /// The name of a channel in a guild.
    Channel { guild_id: u64, channel_id: u64 },
}

pub fn player_word(count: u32) -> &'static str {
    if count == 1 { "player" } else { "players" }
}

pub fn presence_text(status: &ServerStatus) -> String {
    format!(
        "with {} {}! | Slot: {} players",
        status.online_players,
        player_word(status.online_players),
        status.max_players
    )
}

pub fn channel_name(label: &str, status: &ServerStatus) -> String {
    format!("{} : {} / {}", label, status.online_players, status.max_players)
}

/// Writes `status` to the configured sink. `label` prefixes channel names.
pub async fn publish(
    session: &dyn ChatSession,
    target: &PublishTarget,
    label: &str,
    status: &ServerStatus,
) -> Result<(), PublishError> {
    match *target {
        PublishTarget::Presence => session.set_presence(&presence_text(status)).await,
        PublishTarget::Channel { guild_id, channel_id } => {
            let channels = session
                .guild_channel_ids(guild_id)
                .await?
                .ok_or_else(|| PublishError::NotFound(format!("Guild {} not found", guild_id)))?;

            if !channels.contains(&channel_id) {
                return Err(PublishError::NotFound(format!(
                    "Channel {} not found in guild {}",
                    channel_id, guild_id
                )));
            }

            session.rename_channel(channel_id, &channel_name(label, status)).await
        }
    }
}
