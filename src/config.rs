// src/config.rs
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::backends::ragemp::DEFAULT_MASTERLIST_URL;
use crate::backends::BackendKind;
use crate::publisher::PublishTarget;

pub const DEFAULT_LOOKUP_INTERVAL_MS: u64 = 5000;

pub const SHARED_TOKEN_KEY: &str = "APP_DISCORD_BOT_TOKEN";
pub const LOOKUP_INTERVAL_KEY: &str = "APP_LOOKUP_INTERVAL";
pub const MASTERLIST_URL_KEY: &str = "RAGEMP_MASTERLIST_URL";

/// Which targets the process runs, chosen by the start-up argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Selection {
    All,
    Ragemp,
    Samp,
}

impl Selection {
    pub fn backends(self) -> &'static [BackendKind] {
        match self {
            Self::All => &[BackendKind::RageMp, BackendKind::Samp],
            Self::Ragemp => &[BackendKind::RageMp],
            Self::Samp => &[BackendKind::Samp],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} doesn't have value!")]
    Missing(String),
    #[error("{key} must be a number! Found: {value}")]
    NotANumber { key: String, value: String },
    #[error("{key} must be greater than 0! Found: {value}")]
    NotPositive { key: String, value: String },
    #[error("{key} must be a port between 1 and 65535! Found: {value}")]
    InvalidPort { key: String, value: String },
    #[error("{key} must be one of: presence, channel. Found: {value}")]
    UnknownUpdateType { key: String, value: String },
    #[error("{key} must be a Discord id! Found: {value}")]
    InvalidId { key: String, value: String },
    #[error("{key} must be a valid URL! Found: {value}")]
    InvalidUrl { key: String, value: String },
}

/// Key/value pairs the configuration is read from. Blank values count as
/// absent.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    values: HashMap<String, String>,
}

impl RawConfig {
    pub fn from_env() -> Self {
        env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub kind: BackendKind,
    pub address: String,
    pub port: u16,
    /// `None` uses the backend's default timeout.
    pub timeout: Option<Duration>,
    pub publish: PublishTarget,
    /// Own bot token, only kept when no shared token is configured.
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub shared_token: Option<String>,
    pub interval: Duration,
    pub masterlist_url: String,
    pub targets: Vec<TargetConfig>,
}

fn key(kind: BackendKind, suffix: &str) -> String {
    format!("{}_{}", kind.env_prefix(), suffix)
}

fn require<'a>(raw: &'a RawConfig, key: &str, errors: &mut Vec<ConfigError>) -> Option<&'a str> {
    let value = raw.get(key);
    if value.is_none() {
        errors.push(ConfigError::Missing(key.to_string()));
    }
    value
}

fn parse_millis(raw: &RawConfig, key: &str, errors: &mut Vec<ConfigError>) -> Option<Option<Duration>> {
    match raw.get(key) {
        None => Some(None),
        Some(value) => match value.parse::<u64>() {
            Ok(ms) if ms > 0 => Some(Some(Duration::from_millis(ms))),
            Ok(_) => {
                errors.push(ConfigError::NotPositive {
                    key: key.to_string(),
                    value: value.to_string(),
                });
                None
            }
            Err(_) => {
                errors.push(ConfigError::NotANumber {
                    key: key.to_string(),
                    value: value.to_string(),
                });
                None
            }
        },
    }
}

fn parse_id(raw: &RawConfig, key: &str, errors: &mut Vec<ConfigError>) -> Option<u64> {
    let value = require(raw, key, errors)?;
    match value.parse::<u64>() {
        Ok(id) if id != 0 => Some(id),
        _ => {
            errors.push(ConfigError::InvalidId {
                key: key.to_string(),
                value: value.to_string(),
            });
            None
        }
    }
}

fn validate_target(
    raw: &RawConfig,
    kind: BackendKind,
    shared_token: bool,
    errors: &mut Vec<ConfigError>,
) -> Option<TargetConfig> {
    let timeout = parse_millis(raw, &key(kind, "LOOKUP_TIMEOUT"), errors);
    let address = require(raw, &key(kind, "ADDRESS"), errors);

    let port_key = key(kind, "PORT");
    let port = require(raw, &port_key, errors).and_then(|value| match value.parse::<u16>() {
        Ok(port) if port != 0 => Some(port),
        _ => {
            errors.push(ConfigError::InvalidPort {
                key: port_key.clone(),
                value: value.to_string(),
            });
            None
        }
    });

    let type_key = key(kind, "UPDATE_TYPE");
    let publish = match require(raw, &type_key, errors) {
        None => None,
        Some("presence") => Some(PublishTarget::Presence),
        Some("channel") | Some("channel-rename") => {
            let guild_id = parse_id(raw, &key(kind, "UPDATE_GUILD_ID"), errors);
            let channel_id = parse_id(raw, &key(kind, "UPDATE_CHANNEL_ID"), errors);
            match (guild_id, channel_id) {
                (Some(guild_id), Some(channel_id)) => Some(PublishTarget::Channel { guild_id, channel_id }),
                _ => None,
            }
        }
        Some(other) => {
            errors.push(ConfigError::UnknownUpdateType {
                key: type_key.clone(),
                value: other.to_string(),
            });
            None
        }
    };

    let token = if shared_token {
        None
    } else {
        require(raw, &key(kind, "DISCORD_BOT_TOKEN"), errors).map(str::to_string)
    };

    Some(TargetConfig {
        kind,
        address: address?.to_string(),
        port: port?,
        timeout: timeout?,
        publish: publish?,
        token: if shared_token { None } else { Some(token?) },
    })
}

/// Checks every rule for the selected targets and reports all violations
/// at once.
pub fn validate(raw: &RawConfig, selection: Selection) -> Result<Settings, Vec<ConfigError>> {
    let mut errors = Vec::new();

    let shared_token = raw.get(SHARED_TOKEN_KEY).map(str::to_string);
    let interval = parse_millis(raw, LOOKUP_INTERVAL_KEY, &mut errors)
        .map(|ms| ms.unwrap_or(Duration::from_millis(DEFAULT_LOOKUP_INTERVAL_MS)));

    let masterlist_url = raw.get(MASTERLIST_URL_KEY).unwrap_or(DEFAULT_MASTERLIST_URL).to_string();
    if selection.backends().contains(&BackendKind::RageMp) && reqwest::Url::parse(&masterlist_url).is_err() {
        errors.push(ConfigError::InvalidUrl {
            key: MASTERLIST_URL_KEY.to_string(),
            value: masterlist_url.clone(),
        });
    }

    let targets: Vec<Option<TargetConfig>> = selection
        .backends()
        .iter()
        .map(|kind| validate_target(raw, *kind, shared_token.is_some(), &mut errors))
        .collect();

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Settings {
        shared_token,
        interval: interval.unwrap_or(Duration::from_millis(DEFAULT_LOOKUP_INTERVAL_MS)),
        masterlist_url,
        targets: targets.into_iter().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samp_presence() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SAMP_ADDRESS", "127.0.0.1"),
            ("SAMP_PORT", "7777"),
            ("SAMP_UPDATE_TYPE", "presence"),
            ("SAMP_DISCORD_BOT_TOKEN", "samp-token"),
        ]
    }

    #[test]
    fn reports_every_missing_field_at_once() {
        let raw = RawConfig::default();
        let errors = validate(&raw, Selection::All).unwrap_err();

        let expected: Vec<ConfigError> = [
            "RAGEMP_ADDRESS",
            "RAGEMP_PORT",
            "RAGEMP_UPDATE_TYPE",
            "RAGEMP_DISCORD_BOT_TOKEN",
            "SAMP_ADDRESS",
            "SAMP_PORT",
            "SAMP_UPDATE_TYPE",
            "SAMP_DISCORD_BOT_TOKEN",
        ]
        .iter()
        .map(|k| ConfigError::Missing(k.to_string()))
        .collect();
        assert_eq!(errors, expected);
    }

    #[test]
    fn missing_address_and_mode_are_both_reported() {
        let raw: RawConfig = vec![("SAMP_PORT", "7777"), ("SAMP_DISCORD_BOT_TOKEN", "t")]
            .into_iter()
            .collect();
        let errors = validate(&raw, Selection::Samp).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::Missing("SAMP_ADDRESS".into()),
                ConfigError::Missing("SAMP_UPDATE_TYPE".into()),
            ]
        );
    }

    #[test]
    fn valid_presence_target_with_defaults() {
        let raw: RawConfig = samp_presence().into_iter().collect();
        let settings = validate(&raw, Selection::Samp).unwrap();

        assert_eq!(settings.interval, Duration::from_millis(5000));
        assert_eq!(settings.shared_token, None);
        assert_eq!(
            settings.targets,
            vec![TargetConfig {
                kind: BackendKind::Samp,
                address: "127.0.0.1".into(),
                port: 7777,
                timeout: None,
                publish: PublishTarget::Presence,
                token: Some("samp-token".into()),
            }]
        );
    }

    #[test]
    fn numbers_must_parse() {
        let mut pairs = samp_presence();
        pairs.push(("APP_LOOKUP_INTERVAL", "soon"));
        pairs.push(("SAMP_LOOKUP_TIMEOUT", "3s"));
        let raw: RawConfig = pairs.into_iter().collect();

        let errors = validate(&raw, Selection::Samp).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ConfigError::NotANumber { .. })));
    }

    #[test]
    fn zero_interval_and_timeout_are_refused() {
        let mut pairs = samp_presence();
        pairs.push(("APP_LOOKUP_INTERVAL", "0"));
        pairs.push(("SAMP_LOOKUP_TIMEOUT", "000"));
        let raw: RawConfig = pairs.into_iter().collect();

        let errors = validate(&raw, Selection::Samp).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::NotPositive {
                    key: "APP_LOOKUP_INTERVAL".into(),
                    value: "0".into(),
                },
                ConfigError::NotPositive {
                    key: "SAMP_LOOKUP_TIMEOUT".into(),
                    value: "000".into(),
                },
            ]
        );
    }

    #[test]
    fn custom_interval_and_timeout() {
        let mut pairs = samp_presence();
        pairs.push(("APP_LOOKUP_INTERVAL", "10000"));
        pairs.push(("SAMP_LOOKUP_TIMEOUT", "1500"));
        let raw: RawConfig = pairs.into_iter().collect();

        let settings = validate(&raw, Selection::Samp).unwrap();
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.targets[0].timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn channel_mode_needs_guild_and_channel() {
        let raw: RawConfig = vec![
            ("RAGEMP_ADDRESS", "1.2.3.4"),
            ("RAGEMP_PORT", "22005"),
            ("RAGEMP_UPDATE_TYPE", "channel"),
            ("RAGEMP_DISCORD_BOT_TOKEN", "t"),
        ]
        .into_iter()
        .collect();

        let errors = validate(&raw, Selection::Ragemp).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::Missing("RAGEMP_UPDATE_GUILD_ID".into()),
                ConfigError::Missing("RAGEMP_UPDATE_CHANNEL_ID".into()),
            ]
        );
    }

    #[test]
    fn channel_mode_target() {
        let raw: RawConfig = vec![
            ("APP_DISCORD_BOT_TOKEN", "shared"),
            ("RAGEMP_ADDRESS", "1.2.3.4"),
            ("RAGEMP_PORT", "22005"),
            ("RAGEMP_UPDATE_TYPE", "channel"),
            ("RAGEMP_UPDATE_GUILD_ID", "123456789012345678"),
            ("RAGEMP_UPDATE_CHANNEL_ID", "876543210987654321"),
        ]
        .into_iter()
        .collect();

        let settings = validate(&raw, Selection::Ragemp).unwrap();
        assert_eq!(settings.shared_token.as_deref(), Some("shared"));
        assert_eq!(settings.masterlist_url, DEFAULT_MASTERLIST_URL);
        assert_eq!(
            settings.targets[0].publish,
            PublishTarget::Channel {
                guild_id: 123456789012345678,
                channel_id: 876543210987654321,
            }
        );
        assert_eq!(settings.targets[0].token, None);
    }

    #[test]
    fn shared_token_replaces_per_target_tokens() {
        let raw: RawConfig = vec![
            ("APP_DISCORD_BOT_TOKEN", "shared"),
            ("SAMP_ADDRESS", "127.0.0.1"),
            ("SAMP_PORT", "7777"),
            ("SAMP_UPDATE_TYPE", "presence"),
        ]
        .into_iter()
        .collect();
        assert!(validate(&raw, Selection::Samp).is_ok());
    }

    #[test]
    fn unknown_update_type_and_bad_values() {
        let raw: RawConfig = vec![
            ("SAMP_ADDRESS", "127.0.0.1"),
            ("SAMP_PORT", "77777"),
            ("SAMP_UPDATE_TYPE", "banner"),
            ("SAMP_DISCORD_BOT_TOKEN", "t"),
        ]
        .into_iter()
        .collect();

        let errors = validate(&raw, Selection::Samp).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::InvalidPort { key: "SAMP_PORT".into(), value: "77777".into() },
                ConfigError::UnknownUpdateType { key: "SAMP_UPDATE_TYPE".into(), value: "banner".into() },
            ]
        );
    }

    #[test]
    fn only_selected_targets_are_checked() {
        let raw: RawConfig = samp_presence().into_iter().collect();
        assert!(validate(&raw, Selection::Samp).is_ok());
        assert!(validate(&raw, Selection::All).is_err());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = samp_presence();
        pairs[0] = ("SAMP_ADDRESS", "   ");
        let raw: RawConfig = pairs.into_iter().collect();
        assert_eq!(
            validate(&raw, Selection::Samp).unwrap_err(),
            vec![ConfigError::Missing("SAMP_ADDRESS".into())]
        );
    }
}
