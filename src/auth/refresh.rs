//! Credential refresh against the backend's login routes.
//!
//! `Authenticator` is the collaborator the resource client invokes on a 401.
//! The production implementation exchanges the refresh token for a new token
//! pair via POST /login/refresh and writes the pair into the shared
//! `SessionHandle`; concurrent refreshes are not deduplicated (a failed
//! refresh is user-recoverable via re-login, so the occasional double rotate
//! is acceptable).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::api::transport::{Method, Transport};
use crate::auth::session::{SessionData, SessionHandle, SessionStore};

/// Refreshes the ambient session credential in place
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Authenticator backed by the backend's /login routes.
/// Holds its own transport so refresh traffic bypasses the retry policy.
pub struct LoginAuthenticator<T: Transport> {
    transport: T,
    session: SessionHandle,
    store: SessionStore,
}

impl<T: Transport> LoginAuthenticator<T> {
    pub fn new(transport: T, session: SessionHandle, store: SessionStore) -> Self {
        Self {
            transport,
            session,
            store,
        }
    }

    /// Primary login with username and password.
    /// On success the backend returns a fresh token pair which replaces
    /// whatever session was ambient before.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = json!({ "username": username, "password": password });
        let response = self
            .transport
            .send(Method::Post, "/login/userlogin", None, Some(&body))
            .await
            .context("Failed to send login request")?;

        if !response.is_success() {
            return Err(anyhow!(
                "Login rejected (status {}): {}",
                response.status,
                response.body
            ));
        }

        let tokens: TokenResponse = serde_json::from_str(&response.body)
            .context("Failed to parse login response")?;

        let data = SessionData {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            username: username.to_string(),
            created_at: Utc::now(),
        };
        self.store.save(&data)?;
        self.session.replace(data).await;
        debug!(username, "Login successful, session replaced");
        Ok(())
    }

    /// Revoke the current tokens server-side and drop the local session.
    /// The local session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        let token = self.session.access_token().await;
        let result = self
            .transport
            .send(Method::Delete, "/login/logout", token.as_deref(), None)
            .await;

        self.session.clear().await;
        self.store.clear()?;

        match result {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => {
                warn!(status = response.status, "Logout rejected by server, local session cleared anyway");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed, local session cleared anyway");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Authenticator for LoginAuthenticator<T> {
    async fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .session
            .refresh_token()
            .await
            .ok_or_else(|| anyhow!("No session to refresh"))?;

        // The refresh token rides in the Authorization slot; the backend
        // rotates both tokens and revokes the old pair.
        let response = self
            .transport
            .send(Method::Post, "/login/refresh", Some(&refresh_token), None)
            .await
            .context("Failed to send refresh request")?;

        if !response.is_success() {
            return Err(anyhow!(
                "Refresh rejected (status {}): {}",
                response.status,
                response.body
            ));
        }

        let tokens: TokenResponse = serde_json::from_str(&response.body)
            .context("Failed to parse refresh response")?;

        let username = self
            .session
            .current()
            .await
            .map(|d| d.username)
            .unwrap_or_default();

        let data = SessionData {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            username,
            created_at: Utc::now(),
        };
        self.store.save(&data)?;
        self.session.replace(data).await;
        debug!("Session tokens rotated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{TransportError, TransportResponse};
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<Vec<Result<TransportResponse, TransportError>>>,
        seen_tokens: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _method: Method,
            _path: &str,
            token: Option<&str>,
            _body: Option<&serde_json::Value>,
        ) -> Result<TransportResponse, TransportError> {
            self.seen_tokens
                .lock()
                .unwrap()
                .push(token.map(|t| t.to_string()));
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn seeded_session() -> SessionData {
        SessionData {
            access_token: "old-access".into(),
            refresh_token: "old-refresh".into(),
            username: "alice".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_refresh_rotates_both_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionHandle::new();
        session.replace(seeded_session()).await;

        let transport = ScriptedTransport::new(vec![Ok(TransportResponse {
            status: 200,
            body: r#"{"access_token":"new-access","refresh_token":"new-refresh"}"#.into(),
        })]);
        let auth = LoginAuthenticator::new(
            transport,
            session.clone(),
            SessionStore::new(dir.path().to_path_buf()),
        );

        auth.refresh().await.unwrap();

        assert_eq!(session.access_token().await.as_deref(), Some("new-access"));
        assert_eq!(session.refresh_token().await.as_deref(), Some("new-refresh"));
        // The refresh token, not the access token, authorizes the rotation
        assert_eq!(
            auth.transport.seen_tokens.lock().unwrap()[0].as_deref(),
            Some("old-refresh")
        );
    }

    #[tokio::test]
    async fn test_refresh_rejected_leaves_session_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionHandle::new();
        session.replace(seeded_session()).await;

        let transport = ScriptedTransport::new(vec![Ok(TransportResponse {
            status: 401,
            body: r#"{"detail":"Invalid Token."}"#.into(),
        })]);
        let auth = LoginAuthenticator::new(
            transport,
            session.clone(),
            SessionStore::new(dir.path().to_path_buf()),
        );

        assert!(auth.refresh().await.is_err());
        assert_eq!(session.access_token().await.as_deref(), Some("old-access"));
    }

    #[tokio::test]
    async fn test_refresh_without_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![]);
        let auth = LoginAuthenticator::new(
            transport,
            SessionHandle::new(),
            SessionStore::new(dir.path().to_path_buf()),
        );
        assert!(auth.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionHandle::new();
        session.replace(seeded_session()).await;

        let transport = ScriptedTransport::new(vec![Err(TransportError(
            "connection refused".into(),
        ))]);
        let auth = LoginAuthenticator::new(
            transport,
            session.clone(),
            SessionStore::new(dir.path().to_path_buf()),
        );

        auth.logout().await.unwrap();
        assert!(session.current().await.is_none());
    }
}
