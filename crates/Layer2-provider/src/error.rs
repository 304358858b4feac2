//! Log store error types
//!
//! LogStoreError는 원격 log store 호출의 세부 에러를 관리합니다.
//! 재시도 판단은 구조화된 상태 코드와 에러 문구 두 경로로 이루어집니다.

use crate::retry::{RetryClassification, RetryableError};
use std::fmt;
use thiserror::Error;

/// Canonical status codes reported by the log store API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    ResourceExhausted,
    Unavailable,
    DeadlineExceeded,
    Internal,
    Unknown,
}

impl StatusCode {
    /// Map an HTTP status to the closest canonical code
    pub fn from_http(status: u16) -> Self {
        match status {
            400 => StatusCode::InvalidArgument,
            401 => StatusCode::Unauthenticated,
            403 => StatusCode::PermissionDenied,
            404 => StatusCode::NotFound,
            429 => StatusCode::ResourceExhausted,
            503 => StatusCode::Unavailable,
            504 => StatusCode::DeadlineExceeded,
            500..=599 => StatusCode::Internal,
            _ => StatusCode::Unknown,
        }
    }

    /// Parse the `error.status` string of an API error body
    pub fn from_api_status(status: &str) -> Option<Self> {
        let code = match status {
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => {
                StatusCode::InvalidArgument
            }
            "UNAUTHENTICATED" => StatusCode::Unauthenticated,
            "PERMISSION_DENIED" => StatusCode::PermissionDenied,
            "NOT_FOUND" => StatusCode::NotFound,
            "RESOURCE_EXHAUSTED" => StatusCode::ResourceExhausted,
            "UNAVAILABLE" => StatusCode::Unavailable,
            "DEADLINE_EXCEEDED" => StatusCode::DeadlineExceeded,
            "INTERNAL" | "DATA_LOSS" => StatusCode::Internal,
            "UNKNOWN" => StatusCode::Unknown,
            _ => return None,
        };
        Some(code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::InvalidArgument => "InvalidArgument",
            StatusCode::Unauthenticated => "Unauthenticated",
            StatusCode::PermissionDenied => "PermissionDenied",
            StatusCode::NotFound => "NotFound",
            StatusCode::ResourceExhausted => "ResourceExhausted",
            StatusCode::Unavailable => "Unavailable",
            StatusCode::DeadlineExceeded => "DeadlineExceeded",
            StatusCode::Internal => "Internal",
            StatusCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while querying the remote log store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogStoreError {
    /// Structured API status
    #[error("rpc error: code = {code} desc = {message}")]
    Status { code: StatusCode, message: String },

    /// Connection failed, DNS, TLS, etc.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing project id or credentials
    #[error("Log store not configured: {0}")]
    NotConfigured(String),
}

impl LogStoreError {
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        LogStoreError::Status {
            code,
            message: message.into(),
        }
    }

    /// Structured status code, if the error carries one
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            LogStoreError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ============================================================================
// Quota classification
// ============================================================================

/// Phrases that mark an error as quota / rate-limit related (lower case)
const QUOTA_PHRASES: &[&str] = &["quota exceeded", "rate limit", "resource exhausted"];

/// Structured path: does the status code mean "resource exhausted"?
pub fn is_quota_status(code: StatusCode) -> bool {
    code == StatusCode::ResourceExhausted
}

/// Text path: case-insensitive match on quota / rate-limit phrasing
pub fn mentions_quota(text: &str) -> bool {
    let text = text.to_lowercase();
    QUOTA_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// Single retry predicate: structured code first, error text as fallback
pub fn is_quota_exceeded(err: &LogStoreError) -> bool {
    if err.status_code().is_some_and(is_quota_status) {
        return true;
    }
    mentions_quota(&err.to_string())
}

impl RetryableError for LogStoreError {
    fn classify(&self) -> RetryClassification {
        if is_quota_exceeded(self) {
            RetryClassification::RateLimited
        } else {
            RetryClassification::NoRetry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_path() {
        assert!(is_quota_status(StatusCode::ResourceExhausted));
        assert!(!is_quota_status(StatusCode::PermissionDenied));

        let err = LogStoreError::status(StatusCode::ResourceExhausted, "try later");
        assert!(is_quota_exceeded(&err));
        assert_eq!(err.classify(), RetryClassification::RateLimited);
    }

    #[test]
    fn test_text_path() {
        assert!(mentions_quota("Quota Exceeded for metric 'read requests'"));
        assert!(mentions_quota("RATE LIMIT hit"));
        assert!(mentions_quota("resource exhausted (try again)"));
        assert!(!mentions_quota("permission denied"));

        // unstructured error whose text signals quota exhaustion
        let err = LogStoreError::Network("upstream said: rate limit reached".into());
        assert!(is_quota_exceeded(&err));
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let cases = vec![
            LogStoreError::status(StatusCode::InvalidArgument, "unparseable filter"),
            LogStoreError::status(StatusCode::Unauthenticated, "token expired"),
            LogStoreError::status(StatusCode::DeadlineExceeded, "attempt timed out"),
            LogStoreError::Network("connection refused".into()),
        ];
        for err in cases {
            assert_eq!(err.classify(), RetryClassification::NoRetry, "{}", err);
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(StatusCode::from_http(429), StatusCode::ResourceExhausted);
        assert_eq!(StatusCode::from_http(401), StatusCode::Unauthenticated);
        assert_eq!(StatusCode::from_http(502), StatusCode::Internal);
        assert_eq!(StatusCode::from_http(302), StatusCode::Unknown);
        assert_eq!(
            StatusCode::from_api_status("RESOURCE_EXHAUSTED"),
            Some(StatusCode::ResourceExhausted)
        );
        assert_eq!(StatusCode::from_api_status("SOMETHING_NEW"), None);
    }
}
