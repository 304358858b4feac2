//! Filter Compiler - 쿼리 요청을 backend filter 문자열로 변환
//!
//! 가능한 한 많은 조건을 서버 측 predicate 로 밀어 넣어 반환되는
//! 엔트리 수(와 quota 소모)를 줄입니다.
//!
//! ## 절 순서
//!
//! ```text
//! timestamp >= start
//! timestamp <= end
//! severity >= LEVEL
//! resource.type="..."
//! resource.type="cloud_run_revision" AND resource.labels.service_name="..."
//! logName="..."
//! (raw filter)
//! [severity >= ERROR] (textPayload:"q" OR jsonPayload.message:"q")
//! timestamp >= now - lookback        (시간 조건이 없을 때만)
//! ```

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use o11y_foundation::QueryRequest;
use tracing::warn;

/// Resource type used for service-name clauses
pub const CLOUD_RUN_RESOURCE: &str = "cloud_run_revision";

/// Backend severity names, lowest first
pub const SEVERITY_LEVELS: &[&str] = &[
    "DEFAULT",
    "DEBUG",
    "INFO",
    "NOTICE",
    "WARNING",
    "ERROR",
    "CRITICAL",
    "ALERT",
    "EMERGENCY",
];

const CLAUSE_SEPARATOR: &str = " AND ";

/// Compiles a [`QueryRequest`] into one filter expression
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    default_lookback: Duration,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl FilterCompiler {
    /// `default_lookback` bounds queries that carry no time clause of their own
    pub fn new(default_lookback: Duration) -> Self {
        Self { default_lookback }
    }

    pub fn default_lookback(&self) -> Duration {
        self.default_lookback
    }

    /// Compile against the current wall clock
    pub fn compile(&self, request: &QueryRequest) -> String {
        self.compile_at(request, Utc::now())
    }

    /// Compile against a fixed instant. Same inputs, same output.
    ///
    /// A request with nothing to filter on yields the empty string (match all).
    pub fn compile_at(&self, request: &QueryRequest, now: DateTime<Utc>) -> String {
        if request.is_unfiltered() {
            return String::new();
        }

        let mut clauses = Clauses::default();

        if let Some(start) = &request.start_time {
            clauses.push_time(format!("timestamp >= {}", quote(start)));
        }
        if let Some(end) = &request.end_time {
            clauses.push_time(format!("timestamp <= {}", quote(end)));
        }

        if let Some(severity) = &request.severity {
            match normalize_severity(severity) {
                Some(level) => clauses.push(format!("severity >= {}", level)),
                None => warn!("Dropping unknown severity {:?}", severity),
            }
        }

        if let Some(resource_type) = &request.resource_type {
            clauses.push(format!("resource.type={}", quote(resource_type)));
        }

        if let Some(service) = extract_service_name(&request.query) {
            clauses.push(format!("resource.type={}", quote(CLOUD_RUN_RESOURCE)));
            clauses.push(format!("resource.labels.service_name={}", quote(&service)));
        }

        if let Some(log_name) = &request.log_name {
            clauses.push(format!("logName={}", quote(log_name)));
        }

        if let Some(raw) = &request.raw_filter {
            if raw.contains("timestamp") {
                clauses.has_time = true;
            }
            clauses.push(format!("({})", raw));
        }

        if !request.query.is_empty() {
            if request.query.to_lowercase().contains("error") {
                clauses.push("severity >= ERROR".to_string());
            }
            let q = quote(&request.query);
            clauses.push(format!("(textPayload:{} OR jsonPayload.message:{})", q, q));
        }

        // guardrail: never scan the full retention window
        if !clauses.has_time {
            // out-of-range lookback clamps to the epoch
            let since = now
                .checked_sub_signed(self.default_lookback)
                .unwrap_or_default();
            clauses.push_time(format!("timestamp >= {}", quote(&format_timestamp(since))));
        }

        clauses.join()
    }
}

#[derive(Debug, Default)]
struct Clauses {
    parts: Vec<String>,
    has_time: bool,
}

impl Clauses {
    fn push(&mut self, clause: String) {
        self.parts.push(clause);
    }

    fn push_time(&mut self, clause: String) {
        self.has_time = true;
        self.parts.push(clause);
    }

    fn join(self) -> String {
        self.parts.join(CLAUSE_SEPARATOR)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// RFC 3339, second precision, `Z` suffix
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Escape backslashes and double quotes for use inside a quoted string
pub(crate) fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Double-quote a value, escaping backslashes and quotes
fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Map a user-supplied severity onto one of [`SEVERITY_LEVELS`].
/// Common aliases (`warn`, `err`, `fatal`, `emerg`) are accepted; anything else is `None`.
pub fn normalize_severity(severity: &str) -> Option<&'static str> {
    let upper = severity.trim().to_uppercase();
    let name = match upper.as_str() {
        "WARN" => "WARNING",
        "ERR" => "ERROR",
        "FATAL" => "CRITICAL",
        "EMERG" => "EMERGENCY",
        other => other,
    };
    SEVERITY_LEVELS.iter().copied().find(|level| *level == name)
}

/// First lower-cased token that looks like a service name (`payment-api`)
fn extract_service_name(query: &str) -> Option<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .find(|token| token.contains('-') && token.len() > 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn compile(request: &QueryRequest) -> String {
        FilterCompiler::default().compile_at(request, now())
    }

    #[test]
    fn test_empty_request_matches_all() {
        assert_eq!(compile(&QueryRequest::default()), "");
    }

    #[test]
    fn test_keyword_only_gets_default_window() {
        let filter = compile(&QueryRequest::new("timeout"));
        assert_eq!(
            filter,
            r#"(textPayload:"timeout" OR jsonPayload.message:"timeout") AND timestamp >= "2024-04-30T12:00:00Z""#
        );
    }

    #[test]
    fn test_error_keyword_adds_severity_floor() {
        let filter = compile(&QueryRequest::new("Connection ERROR"));
        assert!(filter.starts_with(
            r#"severity >= ERROR AND (textPayload:"Connection ERROR" OR jsonPayload.message:"Connection ERROR")"#
        ));
    }

    #[test]
    fn test_clause_order() {
        let request = QueryRequest::new("timeout")
            .with_time_range(
                Some("2024-05-01T00:00:00Z".into()),
                Some("2024-05-01T06:00:00Z".into()),
            )
            .with_severity("warn")
            .with_resource_type("gce_instance")
            .with_log_name("projects/p/logs/syslog");

        let filter = compile(&request);
        let clauses: Vec<&str> = filter.split(" AND ").collect();
        assert_eq!(
            clauses,
            vec![
                r#"timestamp >= "2024-05-01T00:00:00Z""#,
                r#"timestamp <= "2024-05-01T06:00:00Z""#,
                "severity >= WARNING",
                r#"resource.type="gce_instance""#,
                r#"logName="projects/p/logs/syslog""#,
                r#"(textPayload:"timeout" OR jsonPayload.message:"timeout")"#,
            ]
        );
    }

    #[test]
    fn test_end_time_alone_suppresses_default_window() {
        let request =
            QueryRequest::new("timeout").with_time_range(None, Some("2024-05-01T06:00:00Z".into()));
        let filter = compile(&request);
        assert_eq!(filter.matches("timestamp").count(), 1);
    }

    #[test]
    fn test_service_name_heuristic() {
        let filter = compile(&QueryRequest::new("Payment-API timeout"));
        assert!(filter.contains(
            r#"resource.type="cloud_run_revision" AND resource.labels.service_name="payment-api""#
        ));

        // too short
        let filter = compile(&QueryRequest::new("a-b timeout"));
        assert!(!filter.contains("service_name"));
    }

    #[test]
    fn test_raw_filter_with_timestamp_counts_as_time_clause() {
        let request =
            QueryRequest::default().with_raw_filter(r#"timestamp >= "2024-05-01T00:00:00Z""#);
        assert_eq!(compile(&request), r#"(timestamp >= "2024-05-01T00:00:00Z")"#);

        let request = QueryRequest::default().with_raw_filter("severity>=ERROR");
        assert_eq!(
            compile(&request),
            r#"(severity>=ERROR) AND timestamp >= "2024-04-30T12:00:00Z""#
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let filter = compile(&QueryRequest::new(r#"say "hi" \o/"#));
        assert!(filter.contains(r#"textPayload:"say \"hi\" \\o/""#));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let request = QueryRequest::new("timeout").with_severity("error");
        assert_eq!(compile(&request), compile(&request));
    }

    #[test]
    fn test_configurable_lookback() {
        let compiler = FilterCompiler::new(Duration::hours(1));
        let filter = compiler.compile_at(&QueryRequest::new("x"), now());
        assert!(filter.ends_with(r#"timestamp >= "2024-05-01T11:00:00Z""#));
    }

    #[test]
    fn test_normalize_severity() {
        assert_eq!(normalize_severity("warning"), Some("WARNING"));
        assert_eq!(normalize_severity("Warn"), Some("WARNING"));
        assert_eq!(normalize_severity("err"), Some("ERROR"));
        assert_eq!(normalize_severity("fatal"), Some("CRITICAL"));
        assert_eq!(normalize_severity(" notice "), Some("NOTICE"));
        assert_eq!(normalize_severity("verbose"), None);
        assert_eq!(normalize_severity("ERROR OR true"), None);
    }

    #[test]
    fn test_unknown_severity_never_reaches_filter() {
        let request = QueryRequest::new("timeout").with_severity(r#"DEBUG OR logName="x""#);
        let filter = compile(&request);
        assert!(!filter.contains("severity"));
        assert!(!filter.contains("logName"));
    }

    #[test]
    fn test_huge_lookback_saturates() {
        let compiler = FilterCompiler::new(Duration::days(1_000_000_000));
        let filter = compiler.compile_at(&QueryRequest::new("x"), now());
        assert!(filter.ends_with(r#"timestamp >= "1970-01-01T00:00:00Z""#));
    }
}
