//! o11y-core: Core Runtime for o11y-mcp
//!
//! Layer2 - quota 보호 쿼리 레이어와 MCP 서버
//!
//! # 주요 모듈
//!
//! - `filter`: 쿼리 요청 → backend filter 변환 (FilterCompiler)
//! - `preset`: 이름 있는 쿼리 템플릿 (PresetCatalog)
//! - `query`: 캐시 / 재시도 / 원격 호출 조합 (QueryExecutor)
//! - `tool`: Tool 시스템 및 list / search / preset 도구
//! - `mcp`: MCP (Model Context Protocol) stdio 서버
//!
//! # 사용 예시
//!
//! ```ignore
//! use o11y_core::{McpServer, QueryExecutor, ToolRegistry};
//!
//! let executor = Arc::new(QueryExecutor::from_config(store, cache, &config));
//! let registry = Arc::new(ToolRegistry::with_query_tools(executor));
//!
//! McpServer::new(registry, &config.server)
//!     .serve_stdio(shutdown)
//!     .await?;
//! ```

pub mod filter;
pub mod mcp;
pub mod preset;
pub mod query;
pub mod tool;

// Re-exports: Filter / Preset
pub use filter::{normalize_severity, FilterCompiler};
pub use preset::{PresetCatalog, PresetDefinition, PresetError, ResolvedPreset};

// Re-exports: Query
pub use query::{ExecutorPolicy, QueryError, QueryExecutor, QueryOutcome};

// Re-exports: Tool
pub use tool::{Tool, ToolDefinition, ToolOutput, ToolRegistry};

// Re-exports: MCP
pub use mcp::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer, McpToolResult};
