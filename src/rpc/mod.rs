//! Transmission RPC client
//!
//! Implements the parts of the Transmission RPC protocol the limiter needs:
//! - `session-stats` for the cumulative transfer counters
//! - `session-set` to toggle alternative speed limits
//! - `torrent-stop` / `torrent-start` to pause or resume every torrent
//!
//! Handles the `X-Transmission-Session-Id` handshake and HTTP basic auth.

mod auth;
mod client;

pub use auth::Credentials;
pub use client::TransmissionClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the transfer client
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication failed: check TRANSMISSION_USERNAME and TRANSMISSION_PASSWORD")]
    Unauthorized,

    #[error("Session handshake failed: {0}")]
    SessionError(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("RPC method '{method}' rejected: {result}")]
    Rejected { method: String, result: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// How "disable transfers" is carried out on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EnforcementMode {
    /// Switch Transmission's alternative speed limits on while over the cap
    #[default]
    AltSpeed,
    /// Stop every torrent while over the cap and start them again after
    Pause,
}

impl std::fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnforcementMode::AltSpeed => write!(f, "alt-speed"),
            EnforcementMode::Pause => write!(f, "pause"),
        }
    }
}

/// Remote capability the limiter depends on.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Total bytes moved (downloaded plus uploaded) as reported by the client.
    async fn cumulative_bytes(&self) -> Result<u64>;

    /// Allow (`true`) or block (`false`) transfer activity.
    async fn set_enabled(&self, enabled: bool) -> Result<()>;
}
