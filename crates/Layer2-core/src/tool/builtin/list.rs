//! List Log Entries Tool - raw filter 조회

use super::{parse_input, render_error, render_outcome};
use crate::query::QueryExecutor;
use crate::tool::{Tool, ToolOutput};
use async_trait::async_trait;
use o11y_foundation::QueryRequest;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// List 도구 입력
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogEntriesInput {
    /// Backend filter expression, passed through as one clause
    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub page_size: Option<i64>,

    #[serde(default)]
    pub order_by: Option<String>,
}

impl From<ListLogEntriesInput> for QueryRequest {
    fn from(input: ListLogEntriesInput) -> Self {
        let mut request = QueryRequest::default().with_page_size(input.page_size.unwrap_or(0));
        request.raw_filter = input.filter;
        if let Some(order_by) = input.order_by {
            request.order_by = order_by;
        }
        request
    }
}

/// List 도구
pub struct ListLogEntriesTool {
    executor: Arc<QueryExecutor>,
}

impl ListLogEntriesTool {
    pub const NAME: &'static str = "list_log_entries";

    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ListLogEntriesTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "List log entries from Google Cloud Logging. Supports filtering by timestamp, severity, \
         resource, and custom filters. Without a timestamp clause only the last 24 hours are read."
            .to_string()
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "string",
                    "description": "Cloud Logging filter expression"
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
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> ToolOutput {
        let parsed: ListLogEntriesInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(output) => return output,
        };

        let request = QueryRequest::from(parsed).normalized();
        let filter = request.raw_filter.clone().unwrap_or_default();

        match self.executor.list_entries(request).await {
            Ok(outcome) => {
                let mut echo = Map::new();
                echo.insert("filter".to_string(), Value::String(filter));
                render_outcome(echo, &outcome)
            }
            Err(e) => render_error(Self::NAME, "Error listing log entries", &e),
        }
    }
}
