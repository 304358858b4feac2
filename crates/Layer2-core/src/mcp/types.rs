//! MCP Types - MCP 관련 타입 정의

use crate::tool::{ToolDefinition, ToolOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision reported by `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP 도구 호출 (`tools/call` params)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolCall {
    /// 도구 이름
    pub name: String,

    /// 인자
    #[serde(default)]
    pub arguments: Value,
}

/// MCP 도구 실행 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolResult {
    /// 결과 콘텐츠
    pub content: Vec<McpContent>,

    /// 실패 여부
    #[serde(default)]
    pub is_error: bool,
}

/// MCP 콘텐츠
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    /// 텍스트 콘텐츠
    Text { text: String },
}

impl McpToolResult {
    /// 성공 결과 생성
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// 오류 결과 생성
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text { text: text.into() }],
            is_error: true,
        }
    }
}

impl From<ToolOutput> for McpToolResult {
    fn from(output: ToolOutput) -> Self {
        if output.is_error {
            Self::error(output.content)
        } else {
            Self::success(output.content)
        }
    }
}

/// `tools/list` 결과
#[derive(Debug, Clone, Serialize)]
pub struct McpToolList {
    pub tools: Vec<ToolDefinition>,
}

/// `initialize` 결과
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}
