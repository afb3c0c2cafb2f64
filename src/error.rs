use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const MSG_SERVER_ANALYSIS_FAILED: &str = "Lỗi phân tích dữ liệu từ server. Xin hãy thử lại sau ít phút.";
pub(crate) const MSG_TIMED_OUT: &str = "Yêu cầu đến API bị hết thời gian chờ. Vui lòng thử lại sau.";

/// Failure modes of one submit-and-poll cycle against the crew API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// Kickoff was answered but rejected (`http_status` set) or carried no usable job handle
    #[error("job submission failed: {message}")]
    Submission { message: String, http_status: Option<u16> },

    /// Server reported the job as ERROR
    #[error("remote job reported ERROR")]
    RemoteJob,

    /// Job succeeded but carried an empty or unusable result
    #[error("job result could not be used: {0}")]
    Parse(String),

    /// Ran out of polling attempts without a terminal state
    #[error("job did not finish within {attempts} polling attempts")]
    Timeout { attempts: u32 },

    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },
}

impl JobError {
    pub fn transport(error: &reqwest::Error) -> Self {
        JobError::Transport {
            message: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }

    pub fn submission(message: impl Into<String>) -> Self {
        JobError::Submission {
            message: message.into(),
            http_status: None,
        }
    }

    pub fn submission_http(http_status: u16, message: impl Into<String>) -> Self {
        JobError::Submission {
            message: message.into(),
            http_status: Some(http_status),
        }
    }

    /// Whether this error should be surfaced as a gateway timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            JobError::Timeout { .. } | JobError::Transport { timed_out: true, .. }
        )
    }

    /// User-facing message shown by the dashboard
    pub fn localized_message(&self) -> String {
        match self {
            JobError::RemoteJob | JobError::Parse(_) => MSG_SERVER_ANALYSIS_FAILED.to_string(),
            JobError::Timeout { .. } | JobError::Transport { timed_out: true, .. } => {
                MSG_TIMED_OUT.to_string()
            }
            JobError::Transport { message, .. } => format!("Lỗi kết nối API: {}", message),
            JobError::Submission { message, http_status: Some(_) } => format!("Lỗi HTTP từ API: {}", message),
            JobError::Submission { message, http_status: None } => {
                format!("Đã xảy ra lỗi không mong muốn: {}", message)
            }
        }
    }
}

/// Uniform error record returned to callers: `{"status": "error", "error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub status: String,
    pub error: String,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: message.into(),
        }
    }
}

impl From<&JobError> for ErrorResult {
    fn from(error: &JobError) -> Self {
        ErrorResult::new(error.localized_message())
    }
}

impl From<JobError> for ErrorResult {
    fn from(error: JobError) -> Self {
        ErrorResult::from(&error)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_side_failures_share_generic_message() {
        let remote = ErrorResult::from(JobError::RemoteJob);
        let parse = ErrorResult::from(JobError::Parse("empty result_json".to_string()));
        assert_eq!(remote.status, "error");
        assert_eq!(remote.error, MSG_SERVER_ANALYSIS_FAILED);
        assert_eq!(remote, parse);
    }

    #[test]
    fn test_timeouts_use_timeout_message() {
        let exhausted = JobError::Timeout { attempts: 20 };
        let transport = JobError::Transport {
            message: "operation timed out".to_string(),
            timed_out: true,
        };
        assert!(exhausted.is_timeout());
        assert!(transport.is_timeout());
        assert_eq!(exhausted.localized_message(), MSG_TIMED_OUT);
        assert_eq!(transport.localized_message(), MSG_TIMED_OUT);
    }

    #[test]
    fn test_connection_error_keeps_detail() {
        let error = JobError::Transport {
            message: "connection refused".to_string(),
            timed_out: false,
        };
        assert!(!error.is_timeout());
        assert_eq!(error.localized_message(), "Lỗi kết nối API: connection refused");
    }

    #[test]
    fn test_submission_message_depends_on_cause() {
        let rejected = JobError::submission_http(401, "kickoff returned 401 Unauthorized");
        assert_eq!(
            rejected.localized_message(),
            "Lỗi HTTP từ API: kickoff returned 401 Unauthorized"
        );

        let no_handle = JobError::submission("kickoff response has no kickoff_id");
        assert_eq!(
            no_handle.localized_message(),
            "Đã xảy ra lỗi không mong muốn: kickoff response has no kickoff_id"
        );
        assert!(!no_handle.is_timeout());
    }

    #[test]
    fn test_error_result_serializes_with_status_field() {
        let json = serde_json::to_value(ErrorResult::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "error": "boom"}));
    }
}
