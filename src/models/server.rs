// src/models/server.rs
use serde::{Deserialize, Serialize};

/// Player count snapshot shared by every backend.
///
/// `online_players` is never checked against `max_players`: some servers
/// report more players than slots and the value is published as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online_players: u32,
    pub max_players: u32,
}

impl ServerStatus {
    pub fn new(online_players: u32, max_players: u32) -> Self {
        Self { online_players, max_players }
    }
}

/// One record of the RAGE:MP masterlist, keyed by `"address:port"`.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterlistEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gamemode: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub lang: String,
    pub players: u32,
    #[serde(default)]
    pub peak: u32,
    pub maxplayers: u32,
}

impl From<&MasterlistEntry> for ServerStatus {
    fn from(entry: &MasterlistEntry) -> Self {
        ServerStatus::new(entry.players, entry.maxplayers)
    }
}

/// Decoded reply to a SA-MP information query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampInfo {
    pub passworded: bool,
    pub players: u16,
    pub max_players: u16,
    pub host_name: String,
    pub game_mode: String,
    pub language: String,
}

impl From<&SampInfo> for ServerStatus {
    fn from(info: &SampInfo) -> Self {
        ServerStatus::new(info.players.into(), info.max_players.into())
    }
}
