//! MCP Server - Model Context Protocol 서버
//!
//! 쿼리 도구를 MCP 클라이언트에 노출합니다.
//!
//! ## 지원 메서드
//! - `initialize`, `notifications/initialized`, `ping`
//! - `tools/list`, `tools/call`
//!
//! ## 지원 전송
//! - stdio (newline-delimited JSON-RPC 2.0)
//!
//! ## 참고
//! - https://modelcontextprotocol.io/

mod server;
mod transport;
mod types;

pub use server::McpServer;
pub use transport::{decode_request, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use types::{McpContent, McpToolCall, McpToolResult, MCP_PROTOCOL_VERSION};
