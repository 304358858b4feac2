//! End-to-end 시나리오: 도구 호출 → 캐시 → 원격 store
//!
//! 호출 횟수를 세는 LogStore 로 캐시가 원격 호출을 막는지 확인합니다.

use async_trait::async_trait;
use o11y_core::{QueryExecutor, ToolRegistry};
use o11y_foundation::{LogRecord, ResultCache};
use o11y_provider::{EntriesQuery, LogStore, LogStoreError, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counts calls and remembers every filter it was asked for
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
    filters: Mutex<Vec<String>>,
    limits: Mutex<Vec<usize>>,
    quota_failures: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_filter(&self) -> String {
        self.filters.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LogStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn list_entries(&self, query: &EntriesQuery) -> Result<Vec<LogRecord>, LogStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().unwrap().push(query.filter.clone());
        self.limits.lock().unwrap().push(query.limit);
        // stay in flight for one poll so concurrent callers overlap
        tokio::task::yield_now().await;

        if self
            .quota_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LogStoreError::status(
                StatusCode::ResourceExhausted,
                "Quota exceeded for quota metric 'Read requests'",
            ));
        }

        Ok((0..query.limit.min(3))
            .map(|i| {
                LogRecord::new("2024-05-01T10:00:00Z", "ERROR", "projects/p/logs/run")
                    .with_text(format!("upstream timeout #{}", i))
            })
            .collect())
    }
}

fn setup() -> (Arc<CountingStore>, ToolRegistry) {
    let store = Arc::new(CountingStore::default());
    let executor = QueryExecutor::new(store.clone(), Arc::new(ResultCache::new()));
    (store, ToolRegistry::with_query_tools(Arc::new(executor)))
}

async fn call(registry: &ToolRegistry, tool: &str, args: Value) -> (Value, bool) {
    let output = registry.get(tool).unwrap().execute(args).await;
    let body = serde_json::from_str(&output.content).unwrap_or(Value::String(output.content));
    (body, output.is_error)
}

#[tokio::test(start_paused = true)]
async fn test_repeated_search_is_served_from_cache() {
    let (store, registry) = setup();

    let (first, is_error) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert!(!is_error);
    assert_eq!(first["query"], "timeout");
    assert_eq!(first["count"], 3);
    assert!(first.get("cached").is_none());
    assert_eq!(store.calls(), 1);

    let (second, _) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["entries"], first["entries"]);
    assert_eq!(store.calls(), 1);

    // live TTL is two minutes
    tokio::time::advance(Duration::from_secs(121)).await;
    let (third, _) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert!(third.get("cached").is_none());
    assert_eq!(store.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quota_errors_are_absorbed_by_retry() {
    let (store, registry) = setup();
    store.quota_failures.store(2, Ordering::SeqCst);

    let (body, is_error) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert!(!is_error);
    assert_eq!(body["count"], 3);
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_quota_exhaustion_becomes_tool_error() {
    let (store, registry) = setup();
    store.quota_failures.store(usize::MAX, Ordering::SeqCst);

    let (body, is_error) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert!(is_error);
    assert!(body.as_str().unwrap().contains("max retries exceeded"));
    assert_eq!(store.calls(), 4);
}

#[tokio::test]
async fn test_list_applies_default_window_and_page_ceiling() {
    let (store, registry) = setup();

    let (body, is_error) = call(
        &registry,
        "list_log_entries",
        json!({"filter": "severity>=ERROR", "pageSize": 500}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(body["filter"], "severity>=ERROR");

    let filter = store.last_filter();
    assert!(filter.starts_with("(severity>=ERROR) AND timestamp >= "));
    assert_eq!(store.limits.lock().unwrap().last(), Some(&20));
}

#[tokio::test]
async fn test_preset_tool() {
    let (store, registry) = setup();

    let (body, is_error) = call(
        &registry,
        "preset_query",
        json!({"queryName": "cloud_run_service_errors", "parameters": ["svc-a"]}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(body["queryName"], "cloud_run_service_errors");
    assert!(body["filter"]
        .as_str()
        .unwrap()
        .contains(r#"resource.labels.service_name="svc-a""#));

    let (missing, is_error) = call(
        &registry,
        "preset_query",
        json!({"queryName": "cloud_run_service_errors"}),
    )
    .await;
    assert!(is_error);
    assert!(missing.as_str().unwrap().contains("requires parameter"));

    let (_, is_error) = call(&registry, "preset_query", json!({"queryName": "nonexistent"})).await;
    assert!(is_error);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_invalid_arguments_are_tool_errors() {
    let (store, registry) = setup();

    let (body, is_error) = call(&registry, "search_logs", json!({"query": 42})).await;
    assert!(is_error);
    assert!(body.as_str().unwrap().starts_with("Invalid arguments"));

    let (body, is_error) = call(&registry, "search_logs", json!({})).await;
    assert!(is_error);
    assert_eq!(body, "Error: query parameter is required");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_tools_do_not_share_cache_entries() {
    let (store, registry) = setup();

    let calls = vec![
        call(&registry, "list_log_entries", json!({})),
        call(&registry, "preset_query", json!({"queryName": "recent_logs"})),
    ];
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|(_, is_error)| !is_error));
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_identical_misses_each_reach_the_store() {
    let (store, registry) = setup();

    // no single-flight: both callers miss before either populates the cache
    let calls = vec![
        call(&registry, "search_logs", json!({"query": "timeout"})),
        call(&registry, "search_logs", json!({"query": "timeout"})),
    ];
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|(body, is_error)| !is_error && body.get("cached").is_none()));
    assert_eq!(store.calls(), 2);

    // the entry written by either caller serves the next one
    let (third, _) = call(&registry, "search_logs", json!({"query": "timeout"})).await;
    assert_eq!(third["cached"], true);
    assert_eq!(store.calls(), 2);
}
