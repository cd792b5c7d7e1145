// src/poller.rs
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use crate::backends::{Backend, QueryError};
use crate::chat::{ChatSession, PublishError};
use crate::config::TargetConfig;
use crate::models::server::ServerStatus;
use crate::publisher::publish;

/// Delay between login and the first cycle.
pub const WARM_UP_DELAY: Duration = Duration::from_secs(2);

/// Result of one query + publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(ServerStatus),
    QueryFailed(QueryError),
    PublishFailed(PublishError),
}

/// Polls one target forever.
///
/// A cycle is always awaited to completion before the next sleep starts, so
/// there is never more than one cycle in flight and every outcome is
/// followed by exactly one retry after `interval`.
pub struct Poller<B: Backend> {
    backend: B,
    target: TargetConfig,
    session: Arc<dyn ChatSession>,
    interval: Duration,
    warm_up: Duration,
}

impl<B: Backend> Poller<B> {
    pub fn new(backend: B, target: TargetConfig, session: Arc<dyn ChatSession>, interval: Duration) -> Self {
        Self {
            backend,
            target,
            session,
            interval,
            warm_up: WARM_UP_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up = warm_up;
        self
    }

    fn timeout(&self) -> Duration {
        self.target.timeout.unwrap_or_else(|| self.backend.default_timeout())
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let tag = self.backend.tag();

        let status = match self
            .backend
            .query(&self.target.address, self.target.port, self.timeout())
            .await
        {
            Ok(status) => status,
            Err(e) => {
                error!("[{}] Error while looking up {}:{}: {}", tag, self.target.address, self.target.port, e);
                return CycleOutcome::QueryFailed(e);
            }
        };

        match publish(self.session.as_ref(), &self.target.publish, tag, &status).await {
            Ok(()) => {
                info!(
                    "[{}] Published {} / {} players",
                    tag, status.online_players, status.max_players
                );
                CycleOutcome::Published(status)
            }
            Err(e) => {
                error!("[{}] Error while publishing status: {}", tag, e);
                CycleOutcome::PublishFailed(e)
            }
        }
    }

    /// Never returns; the process exit is the only way out.
    pub async fn run(self) {
        info!(
            "[{}] Polling {}:{} every {} ms",
            self.backend.tag(),
            self.target.address,
            self.target.port,
            self.interval.as_millis()
        );
        tokio::time::sleep(self.warm_up).await;

        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
