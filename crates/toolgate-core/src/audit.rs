//! Audit records for outbound calls.
//!
//! The JSON shape is the wire format consumed by downstream logging and
//! tracing; timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retry::{RetryAttempt, RetryResult};

/// Summary of one outbound call and its attempt trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub tool_name: String,
    pub url: String,
    pub method: String,
    pub success: bool,
    pub total_attempts: usize,
    pub retries_count: usize,
    pub total_duration_ms: u64,
    pub final_status_code: Option<u16>,
    pub final_error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    pub recorded_at: DateTime<Utc>,
    pub attempts: Vec<RetryAttempt>,
}

impl AuditRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

pub fn create_audit_record<R>(
    tool_name: &str,
    url: &str,
    method: &str,
    result: &RetryResult<R>,
) -> AuditRecord {
    AuditRecord {
        tool_name: tool_name.to_string(),
        url: url.to_string(),
        method: method.to_ascii_uppercase(),
        success: result.success,
        total_attempts: result.total_attempts(),
        retries_count: result.retries_count(),
        total_duration_ms: result.total_duration_ms,
        final_status_code: result.final_status_code(),
        final_error: result.final_error().map(str::to_string),
        timed_out: result.timed_out,
        recorded_at: Utc::now(),
        attempts: result.attempts.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_types::ErrorCategory;

    fn attempt(number: u32, status: u16, category: Option<ErrorCategory>) -> RetryAttempt {
        let now = Utc::now();
        RetryAttempt {
            attempt_number: number,
            started_at: now,
            ended_at: now,
            duration_ms: 12,
            success: category.is_none(),
            category,
            message: category.map(|_| format!("HTTP {}", status)),
            status_code: Some(status),
            delay_before_ms: if number == 1 { 0 } else { 1000 },
        }
    }

    fn two_attempt_result() -> RetryResult<()> {
        RetryResult {
            attempts: vec![attempt(1, 503, Some(ErrorCategory::Server)), attempt(2, 200, None)],
            success: true,
            response: Some(()),
            error: None,
            total_duration_ms: 1030,
            timed_out: false,
        }
    }

    #[test]
    fn test_record_summarises_result() {
        let record =
            create_audit_record("web_fetch", "https://example.com/a", "get", &two_attempt_result());
        assert_eq!(record.method, "GET");
        assert!(record.success);
        assert_eq!(record.total_attempts, 2);
        assert_eq!(record.retries_count, 1);
        assert_eq!(record.final_status_code, Some(200));
        assert_eq!(record.final_error, None);
    }

    #[test]
    fn test_json_shape() {
        let record =
            create_audit_record("web_fetch", "https://example.com/a", "GET", &two_attempt_result());
        let json = record.to_json_value().unwrap();

        for key in [
            "tool_name",
            "url",
            "method",
            "success",
            "total_attempts",
            "retries_count",
            "total_duration_ms",
            "final_status_code",
            "final_error",
            "attempts",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }

        let first = &json["attempts"][0];
        assert_eq!(first["category"], "server");
        assert_eq!(first["status_code"], 503);
        assert_eq!(first["delay_before_ms"], 0);
        let started = first["started_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(started).is_ok());
        assert!(json["attempts"][1]["category"].is_null());
    }

    #[test]
    fn test_json_parses_back() {
        let record =
            create_audit_record("archive", "https://example.com/", "POST", &two_attempt_result());
        let parsed: AuditRecord = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(parsed, record);
    }
}
