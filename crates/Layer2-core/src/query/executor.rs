//! Query Executor - cache, filter, retry 를 하나의 흐름으로 조합
//!
//! ```text
//! normalize ─▶ cache key ─▶ hit? ──yes──▶ cached records
//!                             │ no
//!                             ▼
//!              FilterCompiler / PresetCatalog
//!                             ▼
//!        RetryCoordinator ─▶ LogStore (attempt timeout)
//!                             ▼
//!                 ResultCache.put(ttl) ─▶ fresh records
//! ```

use crate::filter::{normalize_severity, FilterCompiler};
use crate::preset::{PresetCatalog, PresetError};
use o11y_foundation::{LogRecord, QueryRequest, ResultCache, ServerConfig};
use o11y_provider::{
    EntriesQuery, LogStore, LogStoreError, RetryCoordinator, RetryError, RetryPolicy, StatusCode,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cache scopes, one per tool
pub const LIST_SCOPE: &str = "list_log_entries";
pub const SEARCH_SCOPE: &str = "search_logs";
pub const PRESET_SCOPE: &str = "preset_query";

/// Executor-level failure
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request rejected before any remote call
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Preset(#[from] PresetError),

    /// Non-retryable store error, unchanged
    #[error(transparent)]
    Store(LogStoreError),

    #[error("max retries exceeded: {0}")]
    RetriesExhausted(LogStoreError),

    #[error("query cancelled")]
    Cancelled,
}

impl From<RetryError<LogStoreError>> for QueryError {
    fn from(err: RetryError<LogStoreError>) -> Self {
        match err {
            RetryError::Fatal(e) => QueryError::Store(e),
            RetryError::Exhausted { last, .. } => QueryError::RetriesExhausted(last),
            RetryError::Cancelled { .. } => QueryError::Cancelled,
        }
    }
}

/// Records returned by one executor call
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub records: Arc<Vec<LogRecord>>,

    /// Served from the result cache without a remote call
    pub cached: bool,

    /// Filter sent to the store (fresh results only)
    pub filter: Option<String>,
}

impl QueryOutcome {
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// TTL and timeout policy
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorPolicy {
    /// Requests without an explicit start time
    pub live_ttl: Duration,

    /// Requests pinned to a historical start time
    pub historical_ttl: Duration,

    /// Bound on a single remote call
    pub attempt_timeout: Duration,
}

impl Default for ExecutorPolicy {
    fn default() -> Self {
        Self {
            live_ttl: Duration::from_secs(120),
            historical_ttl: Duration::from_secs(600),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs list / search / preset queries against a [`LogStore`]
///
/// One instance per process; the [`ResultCache`] is shared with the sweeper.
pub struct QueryExecutor {
    store: Arc<dyn LogStore>,
    cache: Arc<ResultCache>,
    retry: RetryCoordinator,
    compiler: FilterCompiler,
    presets: PresetCatalog,
    policy: ExecutorPolicy,
    cancel: CancellationToken,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn LogStore>, cache: Arc<ResultCache>) -> Self {
        Self {
            store,
            cache,
            retry: RetryCoordinator::default(),
            compiler: FilterCompiler::default(),
            presets: PresetCatalog::builtin(),
            policy: ExecutorPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Executor with TTLs, retry and lookback taken from config
    pub fn from_config(
        store: Arc<dyn LogStore>,
        cache: Arc<ResultCache>,
        config: &ServerConfig,
    ) -> Self {
        Self::new(store, cache)
            .with_retry_policy(RetryPolicy::from(&config.retry))
            .with_compiler(FilterCompiler::new(config.query.default_lookback()))
            .with_policy(ExecutorPolicy {
                live_ttl: config.cache.live_ttl(),
                historical_ttl: config.cache.historical_ttl(),
                attempt_timeout: config.query.attempt_timeout(),
            })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryCoordinator::new(policy);
        self
    }

    pub fn with_compiler(mut self, compiler: FilterCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_policy(mut self, policy: ExecutorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort backoff waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// `list_log_entries`: raw filter pass-through (plus the default time window)
    pub async fn list_entries(&self, request: QueryRequest) -> Result<QueryOutcome, QueryError> {
        let request = request.normalized();
        let key = ResultCache::generate_key(LIST_SCOPE, &request);

        self.fetch_cached(LIST_SCOPE, key, self.policy.live_ttl, || {
            Ok(self.entries_query(&request))
        })
        .await
    }

    /// `search_logs`: free-text query compiled into server-side clauses
    pub async fn search(&self, request: QueryRequest) -> Result<QueryOutcome, QueryError> {
        let request = request.normalized();
        if request.query.is_empty() {
            return Err(QueryError::Validation(
                "query parameter is required".to_string(),
            ));
        }
        if let Some(severity) = &request.severity {
            if normalize_severity(severity).is_none() {
                return Err(QueryError::Validation(format!(
                    "invalid severity {:?}, expected one of DEFAULT, DEBUG, INFO, NOTICE, \
                     WARNING, ERROR, CRITICAL, ALERT, EMERGENCY",
                    severity
                )));
            }
        }

        let ttl = if request.is_historical() {
            self.policy.historical_ttl
        } else {
            self.policy.live_ttl
        };
        let key = ResultCache::generate_key(SEARCH_SCOPE, &request);

        self.fetch_cached(SEARCH_SCOPE, key, ttl, || Ok(self.entries_query(&request)))
            .await
    }

    /// `preset_query`: resolve a named preset, keyed on (name, parameters)
    pub async fn preset(&self, name: &str, params: &[String]) -> Result<QueryOutcome, QueryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueryError::Validation(
                "queryName parameter is required".to_string(),
            ));
        }

        let key = ResultCache::generate_key(PRESET_SCOPE, &(name, params));

        self.fetch_cached(PRESET_SCOPE, key, self.policy.live_ttl, || {
            let resolved = self.presets.resolve(name, params)?;
            Ok(EntriesQuery::new(
                resolved.filter,
                o11y_foundation::DEFAULT_ORDER_BY,
                resolved.page_size,
            ))
        })
        .await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn entries_query(&self, request: &QueryRequest) -> EntriesQuery {
        EntriesQuery::new(
            self.compiler.compile(request),
            request.order_by.clone(),
            request.page_size,
        )
    }

    async fn fetch_cached<F>(
        &self,
        scope: &str,
        key: String,
        ttl: Duration,
        resolve: F,
    ) -> Result<QueryOutcome, QueryError>
    where
        F: FnOnce() -> Result<EntriesQuery, QueryError>,
    {
        if let Some(records) = self.cache.get(&key) {
            debug!("{}: cache hit {} ({} records)", scope, key, records.len());
            return Ok(QueryOutcome {
                records,
                cached: true,
                filter: None,
            });
        }
        debug!("{}: cache miss {}", scope, key);

        let query = resolve()?;
        let records = Arc::new(self.fetch(scope, &query).await?);

        self.cache.put(key, Arc::clone(&records), ttl);
        info!(
            "{}: fetched {} records from {}",
            scope,
            records.len(),
            self.store.name()
        );

        Ok(QueryOutcome {
            records,
            cached: false,
            filter: Some(query.filter),
        })
    }

    async fn fetch(&self, scope: &str, query: &EntriesQuery) -> Result<Vec<LogRecord>, QueryError> {
        let store = &self.store;
        let timeout = self.policy.attempt_timeout;

        let records = self
            .retry
            .execute_with_backoff(scope, &self.cancel, || async move {
                match tokio::time::timeout(timeout, store.list_entries(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(LogStoreError::status(
                        StatusCode::DeadlineExceeded,
                        format!("attempt timed out after {:?}", timeout),
                    )),
                }
            })
            .await?;

        Ok(records)
    }
}
