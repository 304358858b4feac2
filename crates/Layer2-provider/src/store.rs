//! LogStore trait - 원격 로그 저장소 추상화

use crate::error::LogStoreError;
use async_trait::async_trait;
use o11y_foundation::LogRecord;

/// Parameters of a single remote list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntriesQuery {
    /// Compiled filter expression (may be empty)
    pub filter: String,

    /// e.g. "timestamp desc"
    pub order_by: String,

    /// Upper bound on returned records
    pub limit: usize,
}

impl EntriesQuery {
    pub fn new(filter: impl Into<String>, order_by: impl Into<String>, limit: usize) -> Self {
        Self {
            filter: filter.into(),
            order_by: order_by.into(),
            limit,
        }
    }
}

/// Remote log store that can list entries matching a filter
///
/// Implementations never retry on their own; that is the caller's job.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Return at most `query.limit` records in the requested order
    async fn list_entries(&self, query: &EntriesQuery) -> Result<Vec<LogRecord>, LogStoreError>;
}
