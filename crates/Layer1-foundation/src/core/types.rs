//! Core Types - 공용 타입 정의
//!
//! 모든 레이어에서 공통으로 사용하는 로그/쿼리 타입들

use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Query policy constants
// ============================================================================

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Hard ceiling on records fetched per query. Not configurable.
pub const MAX_PAGE_SIZE: usize = 20;

/// Sort order used when the caller does not ask for one
pub const DEFAULT_ORDER_BY: &str = "timestamp desc";

/// Clamp a requested page size to the quota policy.
///
/// Zero or negative means "unspecified" and yields [`DEFAULT_PAGE_SIZE`];
/// anything above [`MAX_PAGE_SIZE`] is capped.
pub fn effective_page_size(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        (requested as u64).min(MAX_PAGE_SIZE as u64) as usize
    }
}

// ============================================================================
// LogRecord - 원격 로그 엔트리의 읽기 전용 투영
// ============================================================================

/// Payload of a log entry: free text or a structured mapping, never both
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LogPayload {
    #[serde(rename = "textPayload")]
    Text(String),

    #[serde(rename = "jsonPayload")]
    Json(serde_json::Map<String, serde_json::Value>),
}

/// Monitored resource descriptor attached to a log entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub labels: BTreeMap<String, String>,
}

/// One remote log entry as returned to tool callers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// RFC3339 timestamp
    pub timestamp: String,

    pub severity: String,

    /// Source log name (`projects/<id>/logs/<name>`)
    pub log_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<MonitoredResource>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(flatten)]
    pub payload: Option<LogPayload>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        severity: impl Into<String>,
        log_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            severity: severity.into(),
            log_name: log_name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.payload = Some(LogPayload::Text(text.into()));
        self
    }

    pub fn with_json(mut self, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        self.payload = Some(LogPayload::Json(payload));
        self
    }

    pub fn with_resource(mut self, resource: MonitoredResource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// QueryRequest - 정규화된 쿼리 입력
// ============================================================================

/// Normalized input to one query operation.
///
/// Field order matters: it is the order in which the request is hashed
/// into a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Free-text query (may be empty for the list tool)
    pub query: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Severity floor, e.g. `warning`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Monitored resource type, e.g. `cloud_run_revision`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,

    /// Backend filter passed through by the list tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_filter: Option<String>,

    pub page_size: usize,

    pub order_by: String,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            start_time: None,
            end_time: None,
            severity: None,
            resource_type: None,
            log_name: None,
            raw_filter: None,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: DEFAULT_ORDER_BY.to_string(),
        }
    }
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_time_range(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_log_name(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = Some(log_name.into());
        self
    }

    pub fn with_raw_filter(mut self, filter: impl Into<String>) -> Self {
        self.raw_filter = Some(filter.into());
        self
    }

    /// Apply the page-size policy to a caller-supplied value
    pub fn with_page_size(mut self, requested: i64) -> Self {
        self.page_size = effective_page_size(requested);
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Blank optional fields become `None`, blank sort order becomes the default,
    /// and the page size is re-clamped.
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.query = self.query.trim().to_string();
        self.start_time = blank_to_none(self.start_time);
        self.end_time = blank_to_none(self.end_time);
        self.severity = blank_to_none(self.severity);
        self.resource_type = blank_to_none(self.resource_type);
        self.log_name = blank_to_none(self.log_name);
        self.raw_filter = blank_to_none(self.raw_filter);
        self.page_size = effective_page_size(self.page_size as i64);
        if self.order_by.trim().is_empty() {
            self.order_by = DEFAULT_ORDER_BY.to_string();
        }
        self
    }

    /// Whether the request pins an explicit historical start time
    pub fn is_historical(&self) -> bool {
        self.start_time.is_some()
    }

    /// True when there is nothing to filter on at all
    pub fn is_unfiltered(&self) -> bool {
        self.query.is_empty()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.severity.is_none()
            && self.resource_type.is_none()
            && self.log_name.is_none()
            && self.raw_filter.is_none()
    }
}
