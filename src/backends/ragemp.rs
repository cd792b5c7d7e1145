// src/backends/ragemp.rs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{Backend, BackendKind, QueryError};
use crate::models::server::{MasterlistEntry, ServerStatus};

pub const DEFAULT_MASTERLIST_URL: &str = "https://cdn.rage.mp/master/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Raw masterlist body. Entries stay untyped so one malformed record of an
/// unrelated server cannot break the lookup of ours.
pub type Masterlist = HashMap<String, serde_json::Value>;

/// Reads player counts from the RAGE:MP masterlist.
pub struct RageMpBackend {
    client: reqwest::Client,
    masterlist_url: String,
}

impl RageMpBackend {
    pub fn new(masterlist_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            masterlist_url: masterlist_url.into(),
        }
    }

    async fn fetch_masterlist(&self, timeout: Duration) -> Result<Masterlist, reqwest::Error> {
        let response = self
            .client
            .get(&self.masterlist_url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        response.json::<Masterlist>().await
    }
}

pub fn masterlist_key(address: &str, port: u16) -> String {
    format!("{}:{}", address, port)
}

/// Looks up one server in a fetched masterlist and decodes its record.
pub fn find_server(masterlist: &Masterlist, address: &str, port: u16) -> Result<MasterlistEntry, QueryError> {
    let key = masterlist_key(address, port);
    let record = masterlist
        .get(&key)
        .ok_or_else(|| QueryError::NotFound(format!("{} is not on the masterlist", key)))?;

    MasterlistEntry::deserialize(record)
        .map_err(|e| QueryError::Network(format!("malformed masterlist record for {}: {}", key, e)))
}

#[async_trait]
impl Backend for RageMpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RageMp
    }

    async fn query(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ServerStatus, QueryError> {
        let masterlist = self
            .fetch_masterlist(timeout)
            .await
            .map_err(|e| QueryError::Network(format!("masterlist fetch failed: {}", e)))?;

        let tag = self.tag();
        debug!("[{}] Fetched masterlist with {} servers", tag, masterlist.len());
        let entry = find_server(&masterlist, address, port)?;
        debug!(
            "[{}] {}:{} is \"{}\" ({}, {}, {}), peak {}",
            tag, address, port, entry.name, entry.gamemode, entry.lang, entry.url, entry.peak
        );
        Ok(ServerStatus::from(&entry))
    }
}
