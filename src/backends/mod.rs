// src/backends/mod.rs
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::server::ServerStatus;

pub mod ragemp;
pub mod samp;

pub use ragemp::RageMpBackend;
pub use samp::SampBackend;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Transport, timeout or decoding failure.
    #[error("network error: {0}")]
    Network(String),
    #[error("server not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    RageMp,
    Samp,
}

impl BackendKind {
    /// Prefix of this backend's configuration keys.
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::RageMp => "RAGEMP",
            Self::Samp => "SAMP",
        }
    }

    /// Tag used in log lines and channel names.
    pub fn tag(self) -> &'static str {
        match self {
            Self::RageMp => "RAGEMP",
            Self::Samp => "SA-MP",
        }
    }

    pub fn default_timeout(self) -> Duration {
        match self {
            Self::RageMp => ragemp::DEFAULT_TIMEOUT,
            Self::Samp => samp::DEFAULT_TIMEOUT,
        }
    }
}

/// A game server query protocol.
///
/// Implementations perform exactly one attempt per call; retrying is left
/// to the poller.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn tag(&self) -> &'static str {
        self.kind().tag()
    }

    fn default_timeout(&self) -> Duration {
        self.kind().default_timeout()
    }

    async fn query(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ServerStatus, QueryError>;
}
