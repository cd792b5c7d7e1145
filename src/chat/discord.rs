// src/chat/discord.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::oneshot;
use twilight_gateway::{
    CloseFrame, Event, EventTypeFlags, Intents, MessageSender, Shard, ShardId, StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::error::ErrorType;
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use twilight_model::id::Id;

use super::{ChatSession, LoginError, PublishError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot session backed by twilight: REST for channels, one gateway shard
/// for presence. Both handles are safe to use from several tasks at once.
pub struct DiscordSession {
    http: Arc<HttpClient>,
    sender: MessageSender,
}

impl DiscordSession {
    /// Checks the token over REST, then opens a shard and waits for READY.
    /// `tag` prefixes the session's log lines.
    pub async fn login(token: String, tag: &'static str) -> Result<Self, LoginError> {
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(HTTP_TIMEOUT)
                .build(),
        );

        let user = http
            .current_user()
            .await
            .map_err(|e| login_error(http_status(&e), e.to_string()))?
            .model()
            .await
            .map_err(|e| LoginError::Transport(format!("error parsing current user: {}", e)))?;

        let shard = Shard::new(ShardId::ONE, token, Intents::GUILDS);
        let sender = shard.sender();
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(shard_runner(shard, ready_tx, tag));

        let ready = match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LoginError::Gateway("gateway closed before READY".to_string())),
            Err(_) => Err(LoginError::Timeout(READY_TIMEOUT.as_secs())),
        };
        if let Err(e) = ready {
            let _ = sender.close(CloseFrame::NORMAL);
            return Err(e);
        }

        info!("[{}] Connected to Discord as {} (ID={})", tag, user.name, user.id);
        Ok(Self { http, sender })
    }
}

async fn shard_runner(mut shard: Shard, ready: oneshot::Sender<()>, tag: &'static str) {
    let shard_id = shard.id().number();
    let mut ready = Some(ready);

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(Event::Ready(data)) => {
                debug!("[{}] Shard {} => READY as {}", tag, shard_id, data.user.name);
                if let Some(tx) = ready.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::GatewayClose(frame)) => {
                warn!("[{}] Shard {} => gateway closed: {:?}", tag, shard_id, frame);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("[{}] Shard {} => error receiving event: {}", tag, shard_id, e);
            }
        }
    }

    warn!("[{}] Shard {} event loop ended", tag, shard_id);
}

/// Gateway command that shows `text` as "Playing <text>".
pub fn presence_command(text: &str) -> Result<UpdatePresence, PublishError> {
    let activity = MinimalActivity {
        kind: ActivityType::Playing,
        name: text.to_string(),
        url: None,
    };

    UpdatePresence::new(vec![activity.into()], false, None, Status::Online)
        .map_err(|e| PublishError::ChatApi(format!("invalid presence: {}", e)))
}

fn http_status(e: &twilight_http::Error) -> Option<u16> {
    match e.kind() {
        ErrorType::Response { status, .. } => Some(status.get()),
        _ => None,
    }
}

/// Only a 401 means the token itself is bad; anything else is a failed
/// round trip that may succeed on the next start.
fn login_error(status: Option<u16>, message: String) -> LoginError {
    match status {
        Some(401) => LoginError::Rejected(message),
        _ => LoginError::Transport(message),
    }
}

fn guild_id(raw: u64) -> Result<Id<GuildMarker>, PublishError> {
    Id::new_checked(raw).ok_or_else(|| PublishError::NotFound(format!("invalid guild id {}", raw)))
}

fn channel_id(raw: u64) -> Result<Id<ChannelMarker>, PublishError> {
    Id::new_checked(raw).ok_or_else(|| PublishError::NotFound(format!("invalid channel id {}", raw)))
}

#[async_trait]
impl ChatSession for DiscordSession {
    async fn set_presence(&self, text: &str) -> Result<(), PublishError> {
        let command = presence_command(text)?;
        self.sender
            .command(&command)
            .map_err(|e| PublishError::ChatApi(format!("gateway rejected presence: {}", e)))
    }

    async fn guild_channel_ids(&self, guild: u64) -> Result<Option<Vec<u64>>, PublishError> {
        let response = match self.http.guild_channels(guild_id(guild)?).await {
            Ok(response) => response,
            // 403 means the bot is not a member, which is the same as unknown here.
            Err(e) if matches!(http_status(&e), Some(403 | 404)) => return Ok(None),
            Err(e) => return Err(PublishError::ChatApi(format!("error fetching guild channels: {}", e))),
        };

        let channels = response
            .model()
            .await
            .map_err(|e| PublishError::ChatApi(format!("error parsing guild channels: {}", e)))?;

        Ok(Some(channels.into_iter().map(|c| c.id.get()).collect()))
    }

    async fn rename_channel(&self, channel: u64, name: &str) -> Result<(), PublishError> {
        match self.http.update_channel(channel_id(channel)?).name(name).await {
            Ok(_) => Ok(()),
            Err(e) if http_status(&e) == Some(404) => {
                Err(PublishError::NotFound(format!("channel {} not found", channel)))
            }
            Err(e) => Err(PublishError::ChatApi(format!("error renaming channel: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_is_a_playing_activity() {
        let command = presence_command("with 3 players! | Slot: 32 players").unwrap();
        let activity = &command.d.activities[0];
        assert_eq!(activity.kind, ActivityType::Playing);
        assert_eq!(activity.name, "with 3 players! | Slot: 32 players");
        assert_eq!(command.d.status, Status::Online);
        assert!(!command.d.afk);
    }

    #[test]
    fn only_unauthorized_rejects_the_token() {
        assert!(matches!(login_error(Some(401), "401".into()), LoginError::Rejected(_)));
        assert!(matches!(login_error(None, "dns failure".into()), LoginError::Transport(_)));
        assert!(matches!(login_error(Some(500), "500".into()), LoginError::Transport(_)));
        assert!(matches!(login_error(Some(429), "429".into()), LoginError::Transport(_)));

        let message = login_error(None, "connection refused".into()).to_string();
        assert!(!message.contains("token rejected"));
    }

    #[test]
    fn zero_ids_are_rejected() {
        assert!(matches!(guild_id(0), Err(PublishError::NotFound(_))));
        assert!(matches!(channel_id(0), Err(PublishError::NotFound(_))));
        assert_eq!(channel_id(42).unwrap().get(), 42);
    }
}
