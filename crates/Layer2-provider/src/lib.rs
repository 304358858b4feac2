//! # o11y-provider
//!
//! Remote log store abstraction layer for o11y-mcp.
//!
//! ## Features
//! - `LogStore` trait with a Cloud Logging REST implementation
//! - Access tokens refreshed from ADC user credentials or the metadata server
//! - Quota-aware error classification
//! - Retry with exponential backoff, cancellable between attempts

pub mod auth;
pub mod cloud_logging;
pub mod error;
pub mod retry;
pub mod store;

// Store
pub use auth::{token_source, RefreshingToken, StaticToken, TokenGrant, TokenSource};
pub use cloud_logging::CloudLoggingClient;
pub use store::{EntriesQuery, LogStore};

// Error and retry
pub use error::{is_quota_exceeded, is_quota_status, mentions_quota, LogStoreError, StatusCode};
pub use retry::{RetryClassification, RetryCoordinator, RetryError, RetryPolicy, RetryableError};
