//! Tool Registry - 도구 등록 및 조회

use super::{builtin, Tool, ToolDefinition};
use crate::query::QueryExecutor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 도구 레지스트리
///
/// ## 사용법
/// ```ignore
/// let registry = ToolRegistry::with_query_tools(executor);
///
/// if let Some(tool) = registry.get("search_logs") {
///     let output = tool.execute(arguments).await;
/// }
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// list / search / preset 도구를 포함한 레지스트리
    pub fn with_query_tools(executor: Arc<QueryExecutor>) -> Self {
        let mut registry = Self::new();
        for tool in builtin::query_tools(executor) {
            registry.register(tool);
        }
        registry
    }

    /// 도구 등록 (같은 이름은 교체)
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// 도구 조회
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 모든 도구 이름 (정렬됨)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// MCP `tools/list` 용 정의 목록 (이름순)
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
