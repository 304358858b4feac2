//! Builtin Tools - 로그 조회 도구들
//!
//! ## 도구 목록
//! - `list_log_entries` - raw filter 로 엔트리 조회
//! - `search_logs` - 텍스트 / 구조화 조건 검색
//! - `preset_query` - 미리 정의된 쿼리 실행
//!
//! 세 도구 모두 하나의 `QueryExecutor` (와 그 ResultCache) 를 공유합니다.

pub mod list;
pub mod preset;
pub mod search;

pub use list::ListLogEntriesTool;
pub use preset::PresetQueryTool;
pub use search::SearchLogsTool;

use super::{Tool, ToolOutput};
use crate::query::{QueryError, QueryOutcome, QueryExecutor};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::error;

/// 모든 쿼리 도구 인스턴스 생성
pub fn query_tools(executor: Arc<QueryExecutor>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListLogEntriesTool::new(Arc::clone(&executor))) as Arc<dyn Tool>,
        Arc::new(SearchLogsTool::new(Arc::clone(&executor))),
        Arc::new(PresetQueryTool::new(executor)),
    ]
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Parse tool arguments; a missing argument object counts as `{}`
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolOutput> {
    let input = if input.is_null() {
        Value::Object(Map::new())
    } else {
        input
    };
    serde_json::from_value(input).map_err(|e| ToolOutput::error(format!("Invalid arguments: {}", e)))
}

/// JSON body: `{ <echo fields>, count, entries, cached?: true }`
pub(crate) fn render_outcome(echo: Map<String, Value>, outcome: &QueryOutcome) -> ToolOutput {
    let entries = match serde_json::to_value(outcome.records.as_ref()) {
        Ok(entries) => entries,
        Err(e) => return ToolOutput::error(format!("internal error: {}", e)),
    };

    let mut body = echo;
    body.insert("count".to_string(), json!(outcome.count()));
    body.insert("entries".to_string(), entries);
    if outcome.cached {
        body.insert("cached".to_string(), Value::Bool(true));
    }

    match serde_json::to_string_pretty(&body) {
        Ok(text) => ToolOutput::success(text),
        Err(e) => ToolOutput::error(format!("internal error: {}", e)),
    }
}

/// Error-flagged result for a failed query
pub(crate) fn render_error(tool: &str, context: &str, err: &QueryError) -> ToolOutput {
    match err {
        QueryError::Validation(_) | QueryError::Preset(_) => ToolOutput::error(format!("Error: {}", err)),
        _ => {
            error!("{} failed: {}", tool, err);
            ToolOutput::error(format!("{}: {}", context, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use o11y_foundation::LogRecord;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Args {
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn test_parse_input_null_is_empty_object() {
        let args: Args = parse_input(Value::Null).unwrap();
        assert!(args.name.is_none());
    }

    #[test]
    fn test_parse_input_wrong_type() {
        let err = parse_input::<Args>(json!({"name": 5})).unwrap_err();
        assert!(err.is_error);
        assert!(err.content.starts_with("Invalid arguments"));
    }

    #[test]
    fn test_render_outcome_marks_cached() {
        let outcome = QueryOutcome {
            records: Arc::new(vec![LogRecord::new("t", "INFO", "l").with_text("hi")]),
            cached: true,
            filter: None,
        };
        let mut echo = Map::new();
        echo.insert("query".into(), json!("hi"));

        let output = render_outcome(echo, &outcome);
        let body: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["query"], "hi");
        assert_eq!(body["count"], 1);
        assert_eq!(body["cached"], true);
        assert_eq!(body["entries"][0]["textPayload"], "hi");
    }

    #[test]
    fn test_render_outcome_fresh_has_no_cached_field() {
        let outcome = QueryOutcome {
            records: Arc::new(Vec::new()),
            cached: false,
            filter: Some(String::new()),
        };
        let output = render_outcome(Map::new(), &outcome);
        let body: Value = serde_json::from_str(&output.content).unwrap();
        assert!(body.get("cached").is_none());
        assert_eq!(body["count"], 0);
    }
}
