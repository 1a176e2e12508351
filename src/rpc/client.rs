//! Transmission RPC client implementation
//!
//! Every call is a JSON `POST` of `{"method": ..., "arguments": ...}` to the
//! RPC endpoint, answered with `{"result": "success", "arguments": ...}`.

use crate::rpc::auth::{SessionAuth, SESSION_ID_HEADER};
use crate::rpc::{Credentials, EnforcementMode, Result, RpcError, TransferClient};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Default RPC path when the configured URL has none
const RPC_PATH: &str = "/transmission/rpc";

/// Byte counters from `session-stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    #[serde(default)]
    pub downloaded_bytes: u64,
    #[serde(default)]
    pub uploaded_bytes: u64,
}

impl TransferStats {
    pub fn total_bytes(&self) -> u64 {
        self.downloaded_bytes.saturating_add(self.uploaded_bytes)
    }
}

/// `session-stats` response arguments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStats {
    /// Totals across Transmission restarts
    #[serde(rename = "cumulative-stats", default)]
    pub cumulative_stats: TransferStats,

    /// Totals since the daemon started
    #[serde(rename = "current-stats", default)]
    pub current_stats: TransferStats,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

/// Transmission RPC client
pub struct TransmissionClient {
    /// HTTP client
    http: reqwest::Client,

    /// Full RPC endpoint URL
    endpoint: Url,

    /// Session id and credentials
    auth: SessionAuth,

    /// What "disable" means on this client
    mode: EnforcementMode,

    /// User agent string
    user_agent: String,
}

impl TransmissionClient {
    /// Create a client for `url`, appending the default RPC path if the URL has none.
    pub fn new(
        url: &Url,
        credentials: Option<Credentials>,
        mode: EnforcementMode,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            http,
            endpoint: rpc_endpoint(url),
            auth: SessionAuth::new(credentials),
            mode,
            user_agent: format!("bandwidth-gate/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch session statistics
    pub async fn session_stats(&self) -> Result<SessionStats> {
        self.call("session-stats", json!({})).await
    }

    /// Toggle alternative speed limits
    pub async fn set_alt_speed(&self, enabled: bool) -> Result<()> {
        let _: Value = self
            .call("session-set", json!({ "alt-speed-enabled": enabled }))
            .await?;
        Ok(())
    }

    /// Start (`true`) or stop (`false`) every torrent
    pub async fn set_all_torrents_running(&self, running: bool) -> Result<()> {
        let method = if running { "torrent-start" } else { "torrent-stop" };
        let _: Value = self.call(method, json!({})).await?;
        Ok(())
    }

    /// Issue one RPC call, performing the session id handshake if required.
    async fn call<T: DeserializeOwned>(&self, method: &str, arguments: Value) -> Result<T> {
        let body = RpcRequest { method, arguments };

        let mut response = self.send(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            self.auth.update_session_id(&response)?;
            response = self.send(&body).await?;

            if response.status() == StatusCode::CONFLICT {
                return Err(RpcError::SessionError(
                    "server rejected a freshly issued session id".to_string(),
                ));
            }
        }

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(RpcError::Unauthorized),
            status if !status.is_success() => {
                return Err(RpcError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let rpc_response: RpcResponse = response.json().await?;

        if rpc_response.result != "success" {
            return Err(RpcError::Rejected {
                method: method.to_string(),
                result: rpc_response.result,
            });
        }

        tracing::debug!("Transmission RPC '{}' succeeded", method);

        Ok(serde_json::from_value(rpc_response.arguments)?)
    }

    async fn send(&self, body: &RpcRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(USER_AGENT, &self.user_agent)
            .json(body);

        if let Some(session_id) = self.auth.session_id()? {
            request = request.header(SESSION_ID_HEADER, session_id);
        }

        if let Some(cred) = self.auth.credentials() {
            request = request.basic_auth(&cred.username, Some(&cred.password));
        }

        Ok(request.send().await?)
    }
}

#[async_trait]
impl TransferClient for TransmissionClient {
    async fn cumulative_bytes(&self) -> Result<u64> {
        let stats = self.session_stats().await?;
        tracing::debug!(
            "Transmission stats: cumulative {} down / {} up, current session {} down / {} up",
            stats.cumulative_stats.downloaded_bytes,
            stats.cumulative_stats.uploaded_bytes,
            stats.current_stats.downloaded_bytes,
            stats.current_stats.uploaded_bytes
        );
        Ok(stats.cumulative_stats.total_bytes())
    }

    async fn set_enabled(&self, enabled: bool) -> Result<()> {
        match self.mode {
            // Alternative speed limits are the "slow" mode, so they are on while disabled
            EnforcementMode::AltSpeed => self.set_alt_speed(!enabled).await,
            EnforcementMode::Pause => self.set_all_torrents_running(enabled).await,
        }
    }
}

/// Append the default RPC path to a bare `scheme://host:port` URL.
fn rpc_endpoint(url: &Url) -> Url {
    let mut endpoint = url.clone();
    if endpoint.path().is_empty() || endpoint.path() == "/" {
        endpoint.set_path(RPC_PATH);
    }
    endpoint
}
