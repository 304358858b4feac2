//! Preset Query Tool - 미리 정의된 쿼리 실행

use super::{parse_input, render_error, render_outcome};
use crate::query::QueryExecutor;
use crate::tool::{Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Preset 도구 입력
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetQueryInput {
    #[serde(default)]
    pub query_name: String,

    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Preset 도구
pub struct PresetQueryTool {
    executor: Arc<QueryExecutor>,
}

impl PresetQueryTool {
    pub const NAME: &'static str = "preset_query";

    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for PresetQueryTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        let presets: Vec<String> = self
            .executor
            .presets()
            .list()
            .iter()
            .map(|p| {
                if p.parameters.is_empty() {
                    format!("{} ({})", p.name, p.description)
                } else {
                    format!("{}[{}] ({})", p.name, p.parameters.join(", "), p.description)
                }
            })
            .collect();

        format!(
            "Execute predefined optimized queries for common use cases. Available: {}",
            presets.join("; ")
        )
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "queryName": {
                    "type": "string",
                    "enum": self.executor.presets().names()
                },
                "parameters": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Positional parameters, e.g. the service name"
                }
            },
            "required": ["queryName"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> ToolOutput {
        let parsed: PresetQueryInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(output) => return output,
        };

        match self
            .executor
            .preset(&parsed.query_name, &parsed.parameters)
            .await
        {
            Ok(outcome) => {
                let mut echo = Map::new();
                echo.insert(
                    "queryName".to_string(),
                    Value::String(parsed.query_name.trim().to_string()),
                );
                if let Some(filter) = &outcome.filter {
                    echo.insert("filter".to_string(), Value::String(filter.clone()));
                }
                render_outcome(echo, &outcome)
            }
            Err(e) => render_error(Self::NAME, "Error executing preset query", &e),
        }
    }
}
