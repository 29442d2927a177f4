//! Authenticated resource client.
//!
//! The one policy every page of the old dashboard re-implemented by hand:
//! send a request with the current credential, and on a 401 refresh the
//! session once and re-issue the original request once. The second attempt
//! is final - a 401 on the retry resolves to `AuthExpired`, never a loop.
//!
//! Per request the flow is:
//! `Sent -> {Success, Failure, NeedsRefresh}`;
//! `NeedsRefresh -> RefreshSent -> {RetrySent -> {Success, Failure}, Failure(AuthExpired)}`.
//!
//! The client holds no state between calls beyond reading the ambient
//! credential. Two concurrent calls that both hit 401 each run their own
//! refresh; the authenticator does not deduplicate them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::refresh::Authenticator;
use crate::auth::session::SessionHandle;

use super::error::Failure;
use super::transport::{Method, Transport, TransportResponse};

/// One request to a server-relative route. Built per call-site, consumed once.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// Normalized result of `execute`: decoded JSON or a classified failure
pub type Outcome = Result<Value, Failure>;

/// Policy layer over the transport: credential attachment plus the
/// refresh-once-then-retry-once handling of expired sessions.
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    session: SessionHandle,
}

impl ResourceClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        session: SessionHandle,
    ) -> Self {
        Self {
            transport,
            authenticator,
            session,
        }
    }

    /// Execute one request, refreshing and retrying at most once on 401.
    /// Every path resolves to an Outcome; nothing is thrown past here.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Outcome {
        let first = match self.send(&descriptor).await {
            Ok(response) => response,
            Err(e) => return Err(Failure::transport(e.to_string())),
        };

        if first.status != 401 {
            return Self::conclude(&descriptor, first);
        }

        debug!(
            method = %descriptor.method,
            path = %descriptor.path,
            "Got 401, attempting session refresh"
        );

        if let Err(e) = self.authenticator.refresh().await {
            warn!(error = %e, "Session refresh failed");
            return Err(Failure::AuthExpired);
        }

        let second = match self.send(&descriptor).await {
            Ok(response) => response,
            Err(e) => return Err(Failure::transport(e.to_string())),
        };

        if second.status == 401 {
            // The refreshed credential was rejected too. Give up.
            warn!(path = %descriptor.path, "Retry after refresh rejected with 401");
            return Err(Failure::AuthExpired);
        }

        Self::conclude(&descriptor, second)
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<TransportResponse, super::transport::TransportError> {
        let token = self.session.access_token().await;
        self.transport
            .send(
                descriptor.method,
                &descriptor.path,
                token.as_deref(),
                descriptor.body.as_ref(),
            )
            .await
    }

    /// Map a terminal response (anything but a first-pass 401) to an Outcome
    fn conclude(descriptor: &RequestDescriptor, response: TransportResponse) -> Outcome {
        if !response.is_success() {
            return Err(Failure::from_status(response.status, &response.body));
        }

        if response.body.trim().is_empty() {
            // Some routes answer 2xx with no body
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body).map_err(|e| {
            Failure::transport(format!(
                "Malformed JSON from {}: {}",
                descriptor.path, e
            ))
        })
    }
}
