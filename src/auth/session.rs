//! Session credential handling.
//!
//! The backend issues a short-lived JWT access token plus a longer-lived
//! refresh token at login. Both are opaque to this crate: the client only
//! attaches the access token and reacts to the server's 401 signal. The
//! expiry accounting here is advisory (for display and proactive refresh),
//! never a substitute for the 401 path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Access token validity in minutes, matching the backend's default.
const TOKEN_EXPIRY_MINUTES: i64 = 30;

/// Buffer time before expiry to trigger a proactive refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.created_at
            + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

/// Shared handle to the ambient session credential.
///
/// The resource client reads the access token through this handle; the
/// authenticator replaces the token pair in place after login or refresh.
/// Clone shares the same underlying slot.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<SessionData>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|d| d.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|d| d.refresh_token.clone())
    }

    pub async fn current(&self) -> Option<SessionData> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, data: SessionData) {
        *self.inner.write().await = Some(data);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn is_valid(&self) -> bool {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|d| !d.is_expired())
            .unwrap_or(false)
    }
}

/// Disk persistence for the session, so the CLI survives between invocations
pub struct SessionStore {
    cache_dir: PathBuf,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Load a previously saved session, dropping it if already expired
    pub fn load(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
