//! Google Cloud Logging REST client
//!
//! `POST {endpoint}/v2/entries:list` 를 사용하며 `nextPageToken` 을 따라
//! 요청한 개수만큼 엔트리를 모읍니다.

use crate::auth::{token_source, TokenSource};
use crate::error::{LogStoreError, StatusCode};
use crate::store::{EntriesQuery, LogStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use o11y_foundation::{LogPayload, LogRecord, MonitoredResource, ProjectSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable consulted when no project id is configured
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// The API rejects larger page sizes
const MAX_API_PAGE_SIZE: usize = 1000;

/// Cloud Logging client
pub struct CloudLoggingClient {
    client: Client,
    endpoint: String,
    project_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl CloudLoggingClient {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, LogStoreError> {
        Ok(Self::with_client(http_client()?, endpoint, project_id, tokens))
    }

    fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            tokens,
        }
    }

    /// Build from settings, falling back to environment variables
    pub fn from_settings(settings: &ProjectSettings) -> Result<Self, LogStoreError> {
        let project_id = settings
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| std::env::var(PROJECT_ENV).ok().filter(|id| !id.trim().is_empty()))
            .ok_or_else(|| {
                LogStoreError::NotConfigured(format!(
                    "no project id (set project.id or {})",
                    PROJECT_ENV
                ))
            })?;

        let client = http_client()?;
        let tokens = token_source(settings, &client)?;
        Ok(Self::with_client(client, &settings.endpoint, project_id, tokens))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn list_url(&self) -> String {
        format!("{}/v2/entries:list", self.endpoint)
    }

    /// One page. A rejected token is dropped and the page requested once more.
    async fn fetch_page(
        &self,
        request: &ListEntriesRequest<'_>,
    ) -> Result<ListEntriesResponse, LogStoreError> {
        match self.post_page(request).await {
            Err(err) if err.status_code() == Some(StatusCode::Unauthenticated) => {
                warn!("Access token rejected, fetching a new one: {}", err);
                self.tokens.invalidate().await;
                self.post_page(request).await
            }
            other => other,
        }
    }

    async fn post_page(
        &self,
        request: &ListEntriesRequest<'_>,
    ) -> Result<ListEntriesResponse, LogStoreError> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(self.list_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| LogStoreError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LogStoreError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| LogStoreError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LogStore for CloudLoggingClient {
    fn name(&self) -> &str {
        "cloud-logging"
    }

    async fn list_entries(&self, query: &EntriesQuery) -> Result<Vec<LogRecord>, LogStoreError> {
        let resource_names = vec![format!("projects/{}", self.project_id)];
        let mut records = Vec::with_capacity(query.limit);
        let mut page_token: Option<String> = None;

        while records.len() < query.limit {
            let request = ListEntriesRequest {
                resource_names: &resource_names,
                filter: &query.filter,
                order_by: &query.order_by,
                page_size: (query.limit - records.len()).min(MAX_API_PAGE_SIZE),
                page_token: page_token.as_deref(),
            };

            let page = self.fetch_page(&request).await?;
            debug!(
                "entries:list page returned {} entries (more: {})",
                page.entries.len(),
                page.next_page_token.is_some()
            );

            records.extend(page.entries.into_iter().map(RawEntry::into_record));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        records.truncate(query.limit);
        Ok(records)
    }
}

fn http_client() -> Result<Client, LogStoreError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| LogStoreError::NotConfigured(format!("HTTP client: {}", e)))
}

// ============================================================================
// Error parsing
// ============================================================================

fn parse_error_response(status: u16, body: &str) -> LogStoreError {
    if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
        let error = error_response.error;
        let code = error
            .status
            .as_deref()
            .and_then(StatusCode::from_api_status)
            .unwrap_or_else(|| StatusCode::from_http(status));
        return LogStoreError::status(code, error.message);
    }

    let message = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        body.trim().to_string()
    };
    LogStoreError::status(StatusCode::from_http(status), message)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesRequest<'a> {
    resource_names: &'a [String],
    #[serde(skip_serializing_if = "str::is_empty")]
    filter: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    order_by: &'a str,
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<RawEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    log_name: String,
    timestamp: Option<String>,
    receive_timestamp: Option<String>,
    severity: Option<String>,
    resource: Option<RawResource>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    text_payload: Option<String>,
    json_payload: Option<serde_json::Map<String, serde_json::Value>>,
    proto_payload: Option<serde_json::Map<String, serde_json::Value>>,
    insert_id: Option<String>,
    trace: Option<String>,
    span_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResource {
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl RawEntry {
    fn into_record(self) -> LogRecord {
        let timestamp = self
            .timestamp
            .or(self.receive_timestamp)
            .map(|ts| normalize_timestamp(&ts))
            .unwrap_or_default();

        let payload = if let Some(text) = self.text_payload {
            Some(LogPayload::Text(text))
        } else {
            self.json_payload
                .or(self.proto_payload)
                .map(LogPayload::Json)
        };

        LogRecord {
            timestamp,
            severity: self.severity.unwrap_or_else(|| "DEFAULT".to_string()),
            log_name: self.log_name,
            resource: self.resource.map(|r| MonitoredResource {
                resource_type: r.resource_type,
                labels: r.labels,
            }),
            labels: self.labels,
            payload,
            insert_id: self.insert_id,
            trace_id: self.trace,
            span_id: self.span_id,
        }
    }
}

/// RFC 3339 with second precision, UTC `Z` suffix. Unparseable input is kept as-is.
fn normalize_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| {
            ts.with_timezone(&chrono::Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}
