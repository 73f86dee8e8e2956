//! Remote job API over HTTP.
//!
//! [`JobApi`] is the seam between job orchestration and the wire: the
//! controller and poller only see this trait, so tests drive them with
//! scripted implementations while production uses [`RemoteJobClient`].

use std::future::Future;

use serde_json::{json, Value};
use tracing::debug;

use crate::api::{ForecastResponse, RawStatus, StartAck, StatusEnvelope};
use crate::config::{ClientConfig, Endpoints, ForecastModel};
use crate::errors::{ClientError, Result};
use crate::http::HttpClient;
use crate::jobs::{JobHandle, JobKind};

/// Operations the backend exposes for long-running jobs.
pub trait JobApi: Send + Sync + 'static {
    /// Submit a start request. `Ok` means the server acknowledged the job;
    /// a decline is [`ClientError::ServerRejected`].
    fn start(&self, kind: JobKind, payload: Value)
        -> impl Future<Output = Result<JobHandle>> + Send;

    /// Fetch the current status of the active job of this kind.
    fn poll_status(&self, kind: JobKind) -> impl Future<Output = Result<RawStatus>> + Send;

    /// Ask the server to stop the active job of this kind.
    fn stop(&self, kind: JobKind) -> impl Future<Output = Result<()>> + Send;

    /// Ask the server to clear its record of the last run.
    fn reset(&self, kind: JobKind) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP-backed [`JobApi`] implementation.
#[derive(Clone)]
pub struct RemoteJobClient {
    http: HttpClient,
    endpoints: Endpoints,
}

impl RemoteJobClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(&config.base_url, config.timeout_secs)?,
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn from_parts(http: HttpClient, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Check the backend is reachable.
    pub async fn test_connection(&self) -> Result<()> {
        let _: Value = self.http.get(&self.endpoints.health).await?;
        Ok(())
    }

    /// Run a one-shot forecast with the selected model.
    pub async fn forecast(&self, model: ForecastModel) -> Result<ForecastResponse> {
        let path = match model {
            ForecastModel::Prophet => &self.endpoints.prophet_forecast,
            ForecastModel::Lstm => &self.endpoints.lstm_forecast,
        };
        let resp: ForecastResponse = self.http.post_json(path, &json!({})).await?;
        if !resp.success {
            return Err(ClientError::rejected(
                model.as_str(),
                "forecast did not succeed",
            ));
        }
        Ok(resp)
    }
}

impl JobApi for RemoteJobClient {
    fn start(
        &self,
        kind: JobKind,
        payload: Value,
    ) -> impl Future<Output = Result<JobHandle>> + Send {
        async move {
            let path = self.endpoints.start_path(kind);
            debug!(kind = %kind, path, "starting remote job");
            let ack: StartAck = self.http.post_json(path, &payload).await?;
            if !ack.accepted() {
                return Err(ClientError::rejected(kind.as_str(), ack.rejection_reason()));
            }
            Ok(JobHandle::new(kind, ack.job_id()))
        }
    }

    fn poll_status(&self, kind: JobKind) -> impl Future<Output = Result<RawStatus>> + Send {
        async move {
            let env: StatusEnvelope = self.http.get(self.endpoints.status_path(kind)).await?;
            Ok(env.into_raw())
        }
    }

    fn stop(&self, kind: JobKind) -> impl Future<Output = Result<()>> + Send {
        async move {
            // Only the pipeline exposes a remote stop; single-stage jobs
            // run to completion server-side and are only detached locally.
            if kind == JobKind::Pipeline {
                let _: Value = self
                    .http
                    .post_json(&self.endpoints.stop_pipeline, &json!({}))
                    .await?;
            }
            Ok(())
        }
    }

    fn reset(&self, kind: JobKind) -> impl Future<Output = Result<()>> + Send {
        async move {
            if kind == JobKind::Pipeline {
                let _: Value = self
                    .http
                    .post_json(&self.endpoints.reset_pipeline, &json!({}))
                    .await?;
            }
            Ok(())
        }
    }
}
