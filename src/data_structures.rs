use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// --- Analysis Payloads ---

/// Analysis produced by the crew on success (ticker, company name, decision, price targets...)
pub type AnalysisResult = Map<String, Value>;

/// Inputs sent to the crew on kickoff
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub current_date: NaiveDate,
}

impl AnalysisRequest {
    pub fn new(symbol: impl Into<String>, current_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            current_date,
        }
    }

    /// Request dated today on the Vietnamese market calendar
    pub fn for_today(symbol: impl Into<String>) -> Self {
        let today = Utc::now().with_timezone(&Ho_Chi_Minh).date_naive();
        Self::new(symbol, today)
    }
}

#[derive(Debug, Serialize)]
pub struct KickoffPayload<'a> {
    pub inputs: &'a AnalysisRequest,
}

// --- Job Tracking ---

/// Opaque `kickoff_id` handed out by the crew
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct KickoffResponse {
    pub kickoff_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Success,
    Error,
}

impl JobStatus {
    /// Anything other than SUCCESS/ERROR, including a missing state, is still running
    pub fn from_state(state: Option<&str>) -> Self {
        match state {
            Some("SUCCESS") => JobStatus::Success,
            Some("ERROR") => JobStatus::Error,
            _ => JobStatus::Pending,
        }
    }
}

/// Body of `GET /status/{kickoff_id}`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusResponse {
    pub state: Option<String>,
    pub status: Option<Value>,
    pub result_json: Option<Value>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_state(self.state.as_deref())
    }
}

/// Raw reply of one status poll, before any JSON parsing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawStatus {
    pub http_status: u16,
    pub body: String,
}

// --- Result Payload Helpers ---

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Turns a SUCCESS payload into an `AnalysisResult`.
///
/// The crew sometimes returns `result_json` as an encoded JSON string rather
/// than an object; both forms are accepted. Empty payloads are rejected.
pub fn extract_result(result_json: Option<Value>) -> Result<AnalysisResult, String> {
    let value = match result_json {
        Some(Value::String(encoded)) if !encoded.trim().is_empty() => {
            serde_json::from_str::<Value>(&encoded)
                .map_err(|e| format!("result_json is not valid JSON: {}", e))?
        }
        Some(value) => value,
        None => return Err("result_json missing".to_string()),
    };

    if is_falsy(&value) {
        return Err("result_json empty".to_string());
    }

    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("result_json is not an object: {}", other)),
    }
}

/// First `max_chars` characters of a body, for logging
pub fn snippet(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kickoff_payload_shape() {
        let request = AnalysisRequest::new("FPT", NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
        let body = serde_json::to_value(KickoffPayload { inputs: &request }).unwrap();
        assert_eq!(
            body,
            json!({"inputs": {"symbol": "FPT", "current_date": "2025-08-15"}})
        );
    }

    #[test]
    fn test_job_status_from_state() {
        assert_eq!(JobStatus::from_state(Some("SUCCESS")), JobStatus::Success);
        assert_eq!(JobStatus::from_state(Some("ERROR")), JobStatus::Error);
        assert_eq!(JobStatus::from_state(Some("RUNNING")), JobStatus::Pending);
        assert_eq!(JobStatus::from_state(None), JobStatus::Pending);
    }

    #[test]
    fn test_extract_result_object() {
        let result = extract_result(Some(json!({"stock_ticker": "FPT", "decision": "Mua"}))).unwrap();
        assert_eq!(result.get("decision"), Some(&json!("Mua")));
    }

    #[test]
    fn test_extract_result_encoded_string() {
        let encoded = json!("{\"stock_ticker\":\"HPG\",\"target_price\":32000}");
        let result = extract_result(Some(encoded)).unwrap();
        assert_eq!(result.get("stock_ticker"), Some(&json!("HPG")));
        assert_eq!(result.get("target_price"), Some(&json!(32000)));
    }

    #[test]
    fn test_extract_result_rejects_empty() {
        assert!(extract_result(None).is_err());
        assert!(extract_result(Some(Value::Null)).is_err());
        assert!(extract_result(Some(json!({}))).is_err());
        assert!(extract_result(Some(json!(""))).is_err());
        assert!(extract_result(Some(json!("{}"))).is_err());
        assert!(extract_result(Some(json!("not json"))).is_err());
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        assert_eq!(snippet("Mua cổ phiếu", 5), "Mua c");
        assert_eq!(snippet("short", 50), "short");
    }
}
