//! Transmission authentication
//!
//! Transmission protects its RPC endpoint against CSRF:
//! 1. A request without a valid session id is answered with 409 Conflict
//! 2. The 409 response carries the id in `X-Transmission-Session-Id`
//! 3. The request is repeated with that header, and so are all later ones
//!
//! Basic auth credentials are sent on every request when configured.

use crate::rpc::{Result, RpcError};
use std::sync::RwLock;

/// Header used for the CSRF session id
pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

const USERNAME_VAR: &str = "TRANSMISSION_USERNAME";
const PASSWORD_VAR: &str = "TRANSMISSION_PASSWORD";

/// RPC credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from `TRANSMISSION_USERNAME` / `TRANSMISSION_PASSWORD`.
    ///
    /// Returns `None` when no username is set.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(USERNAME_VAR).ok()?;
        if username.is_empty() {
            return None;
        }
        let password = std::env::var(PASSWORD_VAR).unwrap_or_default();

        Some(Self { username, password })
    }
}

/// Session id cache plus optional credentials
pub struct SessionAuth {
    session_id: RwLock<Option<String>>,
    credentials: Option<Credentials>,
}

impl SessionAuth {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            session_id: RwLock::new(None),
            credentials,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn session_id(&self) -> Result<Option<String>> {
        let session_id = self.session_id.read().map_err(|e| {
            RpcError::SessionError(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(session_id.clone())
    }

    /// Remember the id handed out by a 409 response.
    pub fn update_session_id(&self, response: &reqwest::Response) -> Result<String> {
        let id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                RpcError::SessionError(format!("409 response without {} header", SESSION_ID_HEADER))
            })?;

        let mut session_id = self.session_id.write().map_err(|e| {
            RpcError::SessionError(format!("Failed to acquire write lock: {}", e))
        })?;
        *session_id = Some(id.clone());

        tracing::debug!("Transmission session id refreshed");
        Ok(id)
    }
}
