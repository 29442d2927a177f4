//! Typed API surface for the sensor management backend.
//!
//! Every method builds a request descriptor, runs it through the resource
//! client (which owns credential attachment and the refresh-retry policy),
//! and decodes the backend's `{ "data": ... }` envelope into domain types.
//! Callers see domain values or a `Failure`; user-facing messaging for the
//! Forbidden case stays with the caller.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::models::{FixedJob, NewFixedJob, Sensor, SensorLocations};

use super::error::Failure;
use super::resource::{Outcome, RequestDescriptor, ResourceClient};

#[derive(Clone)]
pub struct SensorApi {
    client: ResourceClient,
}

impl SensorApi {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    /// Unwrap the backend's response envelope and decode the `data` field
    fn decode_data<T: DeserializeOwned>(outcome: Outcome, what: &str) -> Result<T, Failure> {
        let value = outcome?;
        let data = Self::data_field(value, what)?;
        serde_json::from_value(data)
            .map_err(|e| Failure::transport(format!("Failed to parse {}: {}", what, e)))
    }

    fn data_field(value: Value, what: &str) -> Result<Value, Failure> {
        match value {
            Value::Object(mut map) => map
                .remove("data")
                .ok_or_else(|| Failure::transport(format!("Missing data field in {} response", what))),
            _ => Err(Failure::transport(format!(
                "Unexpected {} response shape",
                what
            ))),
        }
    }

    /// List all fixed jobs
    pub async fn list_fixed_jobs(&self) -> Result<Vec<FixedJob>, Failure> {
        let outcome = self
            .client
            .execute(RequestDescriptor::get("/fixedjobs/"))
            .await;
        let jobs: Vec<FixedJob> = Self::decode_data(outcome, "fixed job list")?;
        debug!(count = jobs.len(), "Fetched fixed jobs");
        Ok(jobs)
    }

    /// Fetch one fixed job by its server-assigned id
    pub async fn fetch_fixed_job(&self, job_id: &str) -> Result<FixedJob, Failure> {
        let outcome = self
            .client
            .execute(RequestDescriptor::get(format!(
                "/fixedjobs/job_id/{}",
                job_id
            )))
            .await;
        Self::decode_data(outcome, "fixed job")
    }

    /// Create a fixed job. Validation runs locally first so obviously broken
    /// jobs never reach the wire.
    pub async fn create_fixed_job(&self, job: &NewFixedJob) -> Result<(), Failure> {
        job.validate()
            .map_err(|e| Failure::transport(e.to_string()))?;

        let body = serde_json::to_value(job)
            .map_err(|e| Failure::transport(format!("Failed to serialize job: {}", e)))?;
        self.client
            .execute(RequestDescriptor::post("/fixedjobs/", body))
            .await?;
        debug!(name = %job.name, "Created fixed job");
        Ok(())
    }

    /// Delete a fixed job by id. The id is the authoritative key; names are
    /// display-only and may collide.
    pub async fn delete_fixed_job(&self, job_id: &str) -> Result<(), Failure> {
        self.client
            .execute(RequestDescriptor::delete(format!(
                "/fixedjobs/?job_id={}",
                job_id
            )))
            .await?;
        debug!(job_id, "Deleted fixed job");
        Ok(())
    }

    /// Fetch one sensor with its last reported status
    pub async fn fetch_sensor(&self, sensor_id: i64) -> Result<Sensor, Failure> {
        let outcome = self
            .client
            .execute(RequestDescriptor::get(format!("/sensors/{}", sensor_id)))
            .await;
        Self::decode_data(outcome, "sensor")
    }

    /// Fetch sensor positions split into online and offline lists
    pub async fn fetch_sensor_locations(&self) -> Result<SensorLocations, Failure> {
        let outcome = self
            .client
            .execute(RequestDescriptor::get("/sensors/get_locations"))
            .await;
        let data = Self::data_field(outcome?, "sensor locations")?;
        SensorLocations::from_data(&data)
            .ok_or_else(|| Failure::transport("Malformed sensor locations response"))
    }

    /// Issue a fresh token bundle for a sensor. The sensor's previous token
    /// becomes invalid server-side.
    pub async fn create_sensor_token(&self, sensor_id: i64) -> Result<Value, Failure> {
        self.client
            .execute(RequestDescriptor::get(format!(
                "/login/sensor_token/{}",
                sensor_id
            )))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{Method, Transport, TransportError, TransportResponse};
    use crate::auth::refresh::Authenticator;
    use crate::auth::session::{SessionData, SessionHandle};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Transport that answers every request with the same canned response
    /// and records what was sent.
    struct CannedTransport {
        response: TransportResponse,
        requests: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: TransportResponse {
                    status,
                    body: body.into(),
                },
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(
            &self,
            method: Method,
            path: &str,
            _token: Option<&str>,
            body: Option<&Value>,
        ) -> Result<TransportResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((method, path.to_string(), body.cloned()));
            Ok(self.response.clone())
        }
    }

    struct NoRefresh;

    #[async_trait]
    impl Authenticator for NoRefresh {
        async fn refresh(&self) -> anyhow::Result<()> {
            panic!("refresh must not be invoked in these tests");
        }
    }

    async fn api_over(transport: Arc<CannedTransport>) -> SensorApi {
        let session = SessionHandle::new();
        session
            .replace(SessionData {
                access_token: "tok".into(),
                refresh_token: "ref".into(),
                username: "alice".into(),
                created_at: chrono::Utc::now(),
            })
            .await;
        SensorApi::new(ResourceClient::new(transport, Arc::new(NoRefresh), session))
    }

    #[tokio::test]
    async fn test_list_fixed_jobs_unwraps_envelope() {
        let transport = CannedTransport::new(
            200,
            r#"{"data": [{"id":"a1","name":"scan","start_time":1,"end_time":2,"command":"get_status","status":"running"}], "code": 200, "message": ""}"#,
        );
        let api = api_over(transport.clone()).await;

        let jobs = api.list_fixed_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "scan");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, Method::Get);
        assert_eq!(requests[0].1, "/fixedjobs/");
    }

    #[tokio::test]
    async fn test_missing_data_field_is_transport_failure() {
        let transport = CannedTransport::new(200, r#"{"code": 200, "message": "ok"}"#);
        let api = api_over(transport).await;

        let failure = api.list_fixed_jobs().await.unwrap_err();
        assert!(matches!(failure, Failure::Transport { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_job_before_sending() {
        let transport = CannedTransport::new(200, r#"{"data": null}"#);
        let api = api_over(transport.clone()).await;

        // end before start, must never reach the wire
        let job = NewFixedJob::new("scan", 200, 100, "get_status");
        assert!(api.create_fixed_job(&job).await.is_err());
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_payload() {
        let transport = CannedTransport::new(200, r#"{"data": null, "message": "added"}"#);
        let api = api_over(transport.clone()).await;

        let job = NewFixedJob::new("scan", 100, 200, "iridium_sniffing")
            .with_argument("center_frequency_mhz", "1626");
        api.create_fixed_job(&job).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, Method::Post);
        let body = requests[0].2.as_ref().unwrap();
        assert_eq!(body["arguments"]["center_frequency_mhz"], "1626");
    }

    #[tokio::test]
    async fn test_delete_targets_id_not_name() {
        let transport = CannedTransport::new(200, r#"{"data": null}"#);
        let api = api_over(transport.clone()).await;

        api.delete_fixed_job("63f8b1a2e4").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, Method::Delete);
        assert_eq!(requests[0].1, "/fixedjobs/?job_id=63f8b1a2e4");
    }

    #[tokio::test]
    async fn test_fetch_sensor_locations() {
        let transport = CannedTransport::new(
            200,
            r#"{"data": [[[49.44, 7.74]], [[49.99, 8.24]]]}"#,
        );
        let api = api_over(transport).await;

        let locations = api.fetch_sensor_locations().await.unwrap();
        assert_eq!(locations.online, vec![(49.44, 7.74)]);
        assert_eq!(locations.offline, vec![(49.99, 8.24)]);
    }

    #[tokio::test]
    async fn test_forbidden_surfaces_to_caller() {
        let transport = CannedTransport::new(403, "Insufficient rights.");
        let api = api_over(transport).await;

        let failure = api.fetch_sensor(7).await.unwrap_err();
        assert!(matches!(failure, Failure::Forbidden(_)));
    }
}
