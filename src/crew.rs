use crate::data_structures::{AnalysisRequest, JobHandle, KickoffPayload, KickoffResponse, RawStatus};
use crate::error::JobError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Remote job-execution contract: start a job, then read its status.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn kickoff(&self, request: &AnalysisRequest) -> Result<JobHandle, JobError>;

    /// Returns the raw reply so that non-200 or malformed bodies can be retried by the caller.
    /// Only transport failures are errors here.
    async fn status(&self, handle: &JobHandle) -> Result<RawStatus, JobError>;
}

/// reqwest-backed client for the crew kickoff/status API
pub struct CrewClient {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl CrewClient {
    pub fn new(base_url: &str, bearer_token: &str, request_timeout: Duration) -> Result<Self, JobError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| JobError::transport(&e))?;

        Ok(CrewClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
        })
    }

    fn kickoff_url(&self) -> String {
        format!("{}/kickoff", self.base_url)
    }

    fn status_url(&self, handle: &JobHandle) -> String {
        format!("{}/status/{}", self.base_url, handle)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.bearer_token)
    }
}

#[async_trait]
impl JobApi for CrewClient {
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    async fn kickoff(&self, request: &AnalysisRequest) -> Result<JobHandle, JobError> {
        let response = self.client
            .post(self.kickoff_url())
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&KickoffPayload { inputs: request })
            .send()
            .await
            .map_err(|e| JobError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::submission_http(
                status.as_u16(),
                format!("kickoff returned {}", status),
            ));
        }

        let text = response.text().await.map_err(|e| JobError::transport(&e))?;
        let body: KickoffResponse = serde_json::from_str(&text)
            .map_err(|e| JobError::submission(format!("invalid kickoff response: {}", e)))?;

        match body.kickoff_id {
            Some(id) if !id.is_empty() => {
                debug!(kickoff_id = %id, "Kickoff accepted");
                Ok(JobHandle(id))
            }
            _ => Err(JobError::submission("kickoff response has no kickoff_id")),
        }
    }

    async fn status(&self, handle: &JobHandle) -> Result<RawStatus, JobError> {
        let response = self.client
            .get(self.status_url(handle))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| JobError::transport(&e))?;

        let http_status = response.status().as_u16();
        let body = response.text().await.map_err(|e| JobError::transport(&e))?;

        Ok(RawStatus { http_status, body })
    }
}
