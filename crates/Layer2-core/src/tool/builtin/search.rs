//! Search Logs Tool - 텍스트 / 구조화 조건 검색
//!
//! 키워드와 선택적 필터(시간, severity, resource, logName)를
//! FilterCompiler 로 하나의 서버 측 filter 로 합칩니다.

use super::{parse_input, render_error, render_outcome};
use crate::query::QueryExecutor;
use crate::tool::{Tool, ToolOutput};
use async_trait::async_trait;
use o11y_foundation::QueryRequest;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Search 도구 입력
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogsInput {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,

    /// Monitored resource type
    #[serde(default, alias = "resourceType")]
    pub resource: Option<String>,

    #[serde(default)]
    pub log_name: Option<String>,

    #[serde(default)]
    pub page_size: Option<i64>,

    #[serde(default)]
    pub order_by: Option<String>,
}

impl From<SearchLogsInput> for QueryRequest {
    fn from(input: SearchLogsInput) -> Self {
        let mut request = QueryRequest::new(input.query)
            .with_time_range(input.start_time, input.end_time)
            .with_page_size(input.page_size.unwrap_or(0));
        request.severity = input.severity;
        request.resource_type = input.resource;
        request.log_name = input.log_name;
        if let Some(order_by) = input.order_by {
            request.order_by = order_by;
        }
        request
    }
}

/// Search 도구
pub struct SearchLogsTool {
    executor: Arc<QueryExecutor>,
}

impl SearchLogsTool {
    pub const NAME: &'static str = "search_logs";

    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for SearchLogsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Search log entries with advanced filtering options including text query, time range, \
         severity level, resource type, and log name."
            .to_string()
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to match in textPayload or jsonPayload.message"
                },
                "startTime": {
                    "type": "string",
                    "description": "RFC3339 lower bound (enables the longer cache TTL)"
                },
                "endTime": {
                    "type": "string",
                    "description": "RFC3339 upper bound"
                },
                "severity": {
                    "type": "string",
                    "description": "Minimum severity, e.g. WARNING or error"
                },
                "resource": {
                    "type": "string",
                    "description": "Monitored resource type, e.g. cloud_run_revision"
                },
                "logName": {
                    "type": "string"
                },
                "pageSize": {
                    "type": "integer",
                    "description": "Maximum entries to return (default 10, capped at 20)"
                },
                "orderBy": {
                    "type": "string",
                    "description": "Sort order (default: timestamp desc)"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> ToolOutput {
        let parsed: SearchLogsInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(output) => return output,
        };

        let request = QueryRequest::from(parsed).normalized();
        let query = request.query.clone();

        match self.executor.search(request).await {
            Ok(outcome) => {
                let mut echo = Map::new();
                echo.insert("query".to_string(), Value::String(query));
                render_outcome(echo, &outcome)
            }
            Err(e) => render_error(Self::NAME, "Error searching logs", &e),
        }
    }
}
