// src/main.rs
mod backends;
mod chat;
mod config;
mod models;
mod poller;
mod publisher;
mod utils;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::backends::{BackendKind, RageMpBackend, SampBackend};
use crate::chat::{ChatSession, DiscordSession};
use crate::config::{RawConfig, Selection, TargetConfig};
use crate::poller::Poller;

/// Log tag for lines that belong to no single target.
const APP_TAG: &str = "APP";

/// Publishes RAGE:MP and SA-MP player counts on Discord.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Which servers to poll
    #[arg(value_enum)]
    target: Selection,
}

fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "{} {:<5} {}", buf.timestamp_seconds(), record.level(), record.args())
        })
        .init();
}

/// Logs in if needed, then polls the target until the process exits.
/// A failed login leaves the target idle for good.
async fn run_target(
    target: TargetConfig,
    shared: Option<Arc<dyn ChatSession>>,
    interval: Duration,
    masterlist_url: String,
) {
    let tag = target.kind.tag();

    let session: Arc<dyn ChatSession> = match (shared, target.token.clone()) {
        (Some(session), _) => session,
        (None, Some(token)) => match DiscordSession::login(token, tag).await {
            Ok(session) => {
                info!("[{}] Logged in.", tag);
                Arc::new(session) as Arc<dyn ChatSession>
            }
            Err(e) => {
                warn!("[{}] Failed to login -> {}", tag, e);
                return;
            }
        },
        (None, None) => {
            error!("[{}] No Discord session available", tag);
            return;
        }
    };

    match target.kind {
        BackendKind::RageMp => {
            Poller::new(RageMpBackend::new(masterlist_url), target, session, interval)
                .run()
                .await
        }
        BackendKind::Samp => Poller::new(SampBackend::new(), target, session, interval).run().await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parsed before anything else: a bad argument exits without touching the config.
    let args = Args::parse();

    init_logger();
    dotenv::dotenv().ok();

    let settings = match config::validate(&RawConfig::from_env(), args.target) {
        Ok(settings) => settings,
        Err(errors) => {
            for e in &errors {
                error!("[{}] {}", APP_TAG, e);
            }
            error!("[{}] App detected error. Please re-check the configuration!", APP_TAG);
            std::process::exit(1);
        }
    };

    let shared: Option<Arc<dyn ChatSession>> = match &settings.shared_token {
        Some(token) => match DiscordSession::login(token.clone(), APP_TAG).await {
            Ok(session) => {
                info!("[{}] Logged in.", APP_TAG);
                Some(Arc::new(session) as Arc<dyn ChatSession>)
            }
            Err(e) => {
                error!("[{}] Failed to login -> {}", APP_TAG, e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let mut targets = JoinSet::new();
    for target in settings.targets {
        targets.spawn(run_target(
            target,
            shared.clone(),
            settings.interval,
            settings.masterlist_url.clone(),
        ));
    }

    while let Some(result) = targets.join_next().await {
        if let Err(e) = result {
            error!("[{}] Target task failed: {}", APP_TAG, e);
        }
    }

    error!("[{}] No target is running, shutting down", APP_TAG);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_argument_selects_backends() {
        for (raw, selection) in [
            ("all", Selection::All),
            ("ragemp", Selection::Ragemp),
            ("samp", Selection::Samp),
        ] {
            let args = Args::try_parse_from(["gamestat-bot", raw]).unwrap();
            assert_eq!(args.target, selection);
        }
    }

    #[test]
    fn unknown_target_is_refused() {
        let err = Args::try_parse_from(["gamestat-bot", "foo"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn target_argument_is_required() {
        let err = Args::try_parse_from(["gamestat-bot"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
