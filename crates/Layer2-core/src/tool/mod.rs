//! Tool System - MCP 클라이언트가 호출하는 도구
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                                │
//! │  ├── register(tool) - 도구 등록                              │
//! │  ├── get(name) - 도구 조회                                   │
//! │  └── definitions() - MCP tools/list 응답                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Builtin Tools (Tool trait 구현, QueryExecutor 공유)          │
//! │  ├── ListLogEntriesTool - raw filter 조회                    │
//! │  ├── SearchLogsTool - 텍스트 검색                            │
//! │  └── PresetQueryTool - 이름 있는 preset 실행                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod builtin;
mod registry;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub use builtin::{query_tools, ListLogEntriesTool, PresetQueryTool, SearchLogsTool};
pub use registry::ToolRegistry;

/// 도구 인터페이스
#[async_trait]
pub trait Tool: Send + Sync {
    /// 도구 이름 (고유 식별자)
    fn name(&self) -> &str;

    /// 사람이 읽는 설명
    fn description(&self) -> String;

    /// JSON 스키마 반환 (MCP `inputSchema`)
    fn schema(&self) -> Value;

    /// 도구 실행
    ///
    /// Failures are reported through [`ToolOutput::error`], never by panicking
    /// or returning early to the transport.
    async fn execute(&self, input: Value) -> ToolOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description(),
            input_schema: self.schema(),
        }
    }
}

/// Tool metadata as listed by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// 도구 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}
