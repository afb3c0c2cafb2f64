use crate::crew::JobApi;
use crate::data_structures::{
    extract_result, snippet, AnalysisRequest, AnalysisResult, JobHandle, JobStatus, RawStatus, StatusResponse,
};
use crate::error::{ErrorResult, JobError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const LOG_SNIPPET_CHARS: usize = 50;

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub max_attempts: u32,
    /// Fixed wait before every status check
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a single status check told us
#[derive(Clone, Debug)]
pub enum PollObservation {
    Status(StatusResponse),
    /// 200 with a body that is not valid JSON
    Malformed(String),
    /// Non-200 or empty body
    Unavailable { http_status: u16 },
}

impl PollObservation {
    pub fn from_raw(raw: RawStatus) -> Self {
        if raw.http_status != 200 || raw.body.is_empty() {
            return PollObservation::Unavailable { http_status: raw.http_status };
        }
        match serde_json::from_str::<StatusResponse>(&raw.body) {
            Ok(status) => PollObservation::Status(status),
            Err(e) => PollObservation::Malformed(e.to_string()),
        }
    }
}

/// Lifecycle of one submitted job.
///
/// `Succeeded`, `Failed` and `TimedOut` are terminal. `attempt` counts status
/// checks already made for the job.
#[derive(Clone, Debug)]
pub enum PollState {
    Submitted(JobHandle),
    Polling { handle: JobHandle, attempt: u32 },
    Succeeded(AnalysisResult),
    Failed(JobError),
    TimedOut { attempts: u32 },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Succeeded(_) | PollState::Failed(_) | PollState::TimedOut { .. }
        )
    }

    /// Applies the outcome of status check number `attempt`.
    pub fn on_observation(handle: JobHandle, attempt: u32, max_attempts: u32, observation: PollObservation) -> Self {
        match observation {
            PollObservation::Status(status) => match status.job_status() {
                JobStatus::Success => Self::on_success(status.result_json),
                JobStatus::Error => Self::on_error(),
                JobStatus::Pending => Self::on_pending(handle, attempt, max_attempts),
            },
            PollObservation::Malformed(reason) => {
                warn!(attempt, %reason, "Error parsing status response, will retry");
                Self::on_pending(handle, attempt, max_attempts)
            }
            PollObservation::Unavailable { http_status } => {
                debug!(attempt, http_status, "Status not available yet");
                Self::on_pending(handle, attempt, max_attempts)
            }
        }
    }

    pub fn on_success(result_json: Option<Value>) -> Self {
        match extract_result(result_json) {
            Ok(result) => PollState::Succeeded(result),
            Err(reason) => {
                warn!(%reason, "Job succeeded without a usable result");
                PollState::Failed(JobError::Parse(reason))
            }
        }
    }

    pub fn on_error() -> Self {
        warn!("Task failed on server side");
        PollState::Failed(JobError::RemoteJob)
    }

    pub fn on_pending(handle: JobHandle, attempt: u32, max_attempts: u32) -> Self {
        if attempt >= max_attempts {
            PollState::TimedOut { attempts: attempt }
        } else {
            PollState::Polling { handle, attempt }
        }
    }
}

/// Submits analysis jobs to the crew and waits for them to finish
pub struct JobPoller {
    api: Arc<dyn JobApi>,
    config: PollerConfig,
}

impl JobPoller {
    pub fn new(api: Arc<dyn JobApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    /// Runs one full submit/poll cycle; every failure comes back as an `ErrorResult`.
    pub async fn submit_and_await(&self, symbol: &str) -> Result<AnalysisResult, ErrorResult> {
        self.run(symbol).await.map_err(ErrorResult::from)
    }

    #[instrument(skip(self), fields(max_attempts = self.config.max_attempts))]
    pub async fn run(&self, symbol: &str) -> Result<AnalysisResult, JobError> {
        let request = AnalysisRequest::for_today(symbol);
        let handle = self.api.kickoff(&request).await?;
        info!(kickoff_id = %handle, "Execution started");

        let mut state = PollState::Submitted(handle);
        loop {
            state = match state {
                PollState::Succeeded(result) => {
                    info!(fields = result.len(), "Result data received");
                    return Ok(result);
                }
                PollState::Failed(error) => return Err(error),
                PollState::TimedOut { attempts } => {
                    warn!(attempts, "Gave up waiting for job");
                    return Err(JobError::Timeout { attempts });
                }
                PollState::Submitted(handle) => self.poll_once(handle, 1).await,
                PollState::Polling { handle, attempt } => self.poll_once(handle, attempt + 1).await,
            };
        }
    }

    async fn poll_once(&self, handle: JobHandle, attempt: u32) -> PollState {
        let max_attempts = self.config.max_attempts;
        if attempt > max_attempts {
            return PollState::TimedOut { attempts: max_attempts };
        }

        tokio::time::sleep(self.config.poll_interval).await;
        info!(attempt, max_attempts, "Checking status");

        let raw = match self.api.status(&handle).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(attempt, %error, "Status request failed");
                return PollState::Failed(error);
            }
        };
        debug!(
            attempt,
            http_status = raw.http_status,
            body = snippet(&raw.body, LOG_SNIPPET_CHARS),
            "Raw status response"
        );

        let observation = PollObservation::from_raw(raw);
        if let PollObservation::Status(status) = &observation {
            info!(attempt, state = ?status.state, status = ?status.status, "Job state");
        }
        PollState::on_observation(handle, attempt, max_attempts, observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::scripted::{pending, ScriptedApi};
    use serde_json::json;

    fn poller(api: Arc<ScriptedApi>, max_attempts: u32) -> JobPoller {
        JobPoller::new(
            api,
            PollerConfig {
                max_attempts,
                poll_interval: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_pending_on_last_attempt_times_out() {
        let handle = JobHandle("job".to_string());
        assert!(matches!(
            PollState::on_pending(handle.clone(), 3, 20),
            PollState::Polling { attempt: 3, .. }
        ));
        assert!(matches!(
            PollState::on_pending(handle, 20, 20),
            PollState::TimedOut { attempts: 20 }
        ));
    }

    #[test]
    fn test_malformed_observation_keeps_polling() {
        let observation = PollObservation::from_raw(RawStatus {
            http_status: 200,
            body: "<html>gateway</html>".to_string(),
        });
        assert!(matches!(observation, PollObservation::Malformed(_)));
        let next = PollState::on_observation(JobHandle("job".to_string()), 1, 20, observation);
        assert!(!next.is_terminal());
    }

    #[test]
    fn test_non_200_is_unavailable() {
        let observation = PollObservation::from_raw(RawStatus {
            http_status: 503,
            body: "{\"state\":\"ERROR\"}".to_string(),
        });
        assert!(matches!(observation, PollObservation::Unavailable { http_status: 503 }));
    }

    #[test]
    fn test_success_with_empty_result_fails() {
        let state = PollState::on_success(Some(json!({})));
        assert!(matches!(state, PollState::Failed(JobError::Parse(_))));
    }

    #[tokio::test]
    async fn test_success_on_third_poll_returns_payload_unchanged() {
        let payload = json!({"state": "SUCCESS", "result_json": {"stock_ticker": "FPT", "decision": "Mua"}});
        let api = Arc::new(ScriptedApi::with_statuses(vec![
            Ok(pending()),
            Ok(pending()),
            Ok(RawStatus { http_status: 200, body: payload.to_string() }),
        ]));

        let result = poller(api.clone(), 20).submit_and_await("FPT").await.unwrap();

        assert_eq!(
            serde_json::Value::Object(result),
            json!({"stock_ticker": "FPT", "decision": "Mua"})
        );
        assert_eq!(api.status_calls(), 3);
        assert_eq!(api.last_symbol().as_deref(), Some("FPT"));
    }

    #[tokio::test]
    async fn test_error_state_stops_immediately() {
        let api = Arc::new(ScriptedApi::with_statuses(vec![Ok(RawStatus {
            http_status: 200,
            body: json!({"state": "ERROR"}).to_string(),
        })]));

        let result = poller(api.clone(), 20).submit_and_await("VCB").await;

        assert_eq!(
            result.unwrap_err(),
            ErrorResult::new("Lỗi phân tích dữ liệu từ server. Xin hãy thử lại sau ít phút.")
        );
        assert_eq!(api.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_always_pending_times_out_after_max_attempts() {
        let api = Arc::new(ScriptedApi::with_statuses(Vec::new()));

        let result = poller(api.clone(), 20).run("HPG").await;

        assert_eq!(result.unwrap_err(), JobError::Timeout { attempts: 20 });
        assert_eq!(api.status_calls(), 20);
    }

    #[tokio::test]
    async fn test_transport_timeout_aborts_without_retry() {
        let api = Arc::new(ScriptedApi::with_statuses(vec![
            Ok(pending()),
            Err(JobError::Transport {
                message: "operation timed out".to_string(),
                timed_out: true,
            }),
        ]));

        let result = poller(api.clone(), 20).run("FPT").await;

        assert!(matches!(result, Err(JobError::Transport { timed_out: true, .. })));
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_garbage_responses_are_retried() {
        let api = Arc::new(ScriptedApi::with_statuses(vec![
            Ok(RawStatus { http_status: 200, body: "not json".to_string() }),
            Ok(RawStatus { http_status: 502, body: String::new() }),
            Ok(RawStatus { http_status: 200, body: String::new() }),
            Ok(RawStatus {
                http_status: 200,
                body: json!({"state": "SUCCESS", "result_json": {"stock_ticker": "MWG"}}).to_string(),
            }),
        ]));

        let result = poller(api.clone(), 20).run("MWG").await.unwrap();

        assert_eq!(result.get("stock_ticker"), Some(&json!("MWG")));
        assert_eq!(api.status_calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_kickoff_never_polls() {
        let api = Arc::new(ScriptedApi::failing_kickoff(JobError::submission(
            "kickoff response has no kickoff_id",
        )));

        let result = poller(api.clone(), 20).run("FPT").await;

        assert!(matches!(result, Err(JobError::Submission { .. })));
        assert_eq!(api.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_attempts_times_out_without_polling() {
        let api = Arc::new(ScriptedApi::with_statuses(Vec::new()));

        let result = poller(api.clone(), 0).run("FPT").await;

        assert_eq!(result.unwrap_err(), JobError::Timeout { attempts: 0 });
        assert_eq!(api.status_calls(), 0);
    }
}
