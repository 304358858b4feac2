//! Access tokens for the Cloud Logging API
//!
//! - `StaticToken`: 환경 변수에서 받은 토큰을 그대로 사용 (갱신 없음)
//! - `RefreshingToken`: ADC 사용자 자격 증명 또는 metadata server 에서 발급받고
//!   만료 1분 전에 다시 발급
//!
//! ## 선택 순서 (`token_source`)
//! 1. `project.access_token_env` 에 토큰이 있으면 StaticToken
//! 2. `$GOOGLE_APPLICATION_CREDENTIALS` 또는 gcloud 기본 ADC 파일 (authorized_user)
//! 3. GCE / Cloud Run metadata server

use crate::error::{LogStoreError, StatusCode};
use async_trait::async_trait;
use o11y_foundation::ProjectSettings;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Explicit credentials file, as honoured by Google client libraries
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

pub const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens, one call per HTTP request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, LogStoreError>;

    /// Forget any cached token after the API rejected it
    async fn invalidate(&self) {}
}

// ============================================================================
// StaticToken
// ============================================================================

pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, LogStoreError> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// RefreshingToken
// ============================================================================

/// How a [`RefreshingToken`] obtains a new access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// `GET` with `Metadata-Flavor: Google`
    Metadata { url: String },

    /// OAuth2 `refresh_token` grant (gcloud application-default user credentials)
    RefreshToken {
        url: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

impl TokenGrant {
    pub fn metadata() -> Self {
        TokenGrant::Metadata {
            url: METADATA_TOKEN_URL.to_string(),
        }
    }

    /// Read an ADC credentials file. Only `authorized_user` files are supported.
    pub fn from_credentials_file(path: &Path) -> Result<Self, LogStoreError> {
        let not_configured =
            |msg: String| LogStoreError::NotConfigured(format!("{}: {}", path.display(), msg));

        let content = std::fs::read_to_string(path).map_err(|e| not_configured(e.to_string()))?;
        let file: CredentialsFile =
            serde_json::from_str(&content).map_err(|e| not_configured(e.to_string()))?;

        match (file.kind.as_str(), file.client_id, file.client_secret, file.refresh_token) {
            ("authorized_user", Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Ok(TokenGrant::RefreshToken {
                    url: OAUTH_TOKEN_URL.to_string(),
                    client_id,
                    client_secret,
                    refresh_token,
                })
            }
            ("authorized_user", ..) => Err(not_configured(
                "authorized_user credentials need client_id, client_secret and refresh_token"
                    .to_string(),
            )),
            (kind, ..) => Err(not_configured(format!(
                "unsupported credentials type '{}' (use authorized_user, the metadata server or an access token)",
                kind
            ))),
        }
    }

    /// Same grant against a different token endpoint
    pub fn with_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        match self {
            TokenGrant::Metadata { .. } => TokenGrant::Metadata { url },
            TokenGrant::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
                ..
            } => TokenGrant::RefreshToken {
                url,
                client_id,
                client_secret,
                refresh_token,
            },
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Token cached until shortly before expiry, then fetched again
pub struct RefreshingToken {
    client: Client,
    grant: TokenGrant,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingToken {
    pub fn new(client: Client, grant: TokenGrant) -> Self {
        Self {
            client,
            grant,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<TokenResponse, LogStoreError> {
        let request = match &self.grant {
            TokenGrant::Metadata { url } => self.client.get(url).header("Metadata-Flavor", "Google"),
            TokenGrant::RefreshToken {
                url,
                client_id,
                client_secret,
                refresh_token,
            } => self.client.post(url).form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| LogStoreError::Network(format!("token request: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LogStoreError::Network(format!("token request: {}", e)))?;

        if !status.is_success() {
            return Err(LogStoreError::status(
                StatusCode::Unauthenticated,
                format!("token request failed (HTTP {}): {}", status.as_u16(), body.trim()),
            ));
        }

        serde_json::from_str(&body).map_err(|e| LogStoreError::Parse(format!("token response: {}", e)))
    }
}

#[async_trait]
impl TokenSource for RefreshingToken {
    async fn token(&self) -> Result<String, LogStoreError> {
        // held across the fetch so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!("Fetched access token (valid for {}s)", fresh.expires_in);

        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Pick a token source for `settings` (see module docs for the order)
pub fn token_source(
    settings: &ProjectSettings,
    client: &Client,
) -> Result<Arc<dyn TokenSource>, LogStoreError> {
    if let Some(token) = std::env::var(&settings.access_token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
    {
        warn!(
            "Using static token from ${}; it is not refreshed",
            settings.access_token_env
        );
        return Ok(Arc::new(StaticToken::new(token)));
    }

    if let Some(path) = std::env::var_os(CREDENTIALS_ENV).map(PathBuf::from) {
        info!("Using credentials from {}", path.display());
        let grant = TokenGrant::from_credentials_file(&path)?;
        return Ok(Arc::new(RefreshingToken::new(client.clone(), grant)));
    }

    if let Some(path) = well_known_credentials_path().filter(|p| p.is_file()) {
        info!("Using application default credentials from {}", path.display());
        let grant = TokenGrant::from_credentials_file(&path)?;
        return Ok(Arc::new(RefreshingToken::new(client.clone(), grant)));
    }

    info!("Using metadata server credentials");
    Ok(Arc::new(RefreshingToken::new(client.clone(), TokenGrant::metadata())))
}

/// gcloud's `application_default_credentials.json`
fn well_known_credentials_path() -> Option<PathBuf> {
    let base = if cfg!(windows) {
        dirs::config_dir()
    } else {
        dirs::home_dir().map(|home| home.join(".config"))
    };
    base.map(|dir| dir.join("gcloud").join("application_default_credentials.json"))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type", default)]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metadata_grant(server: &MockServer) -> TokenGrant {
        TokenGrant::metadata().with_url(format!("{}/token", server.uri()))
    }

    async fn mount_token(server: &MockServer, token: &str, expires_in: u64, times: u64) {
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "expires_in": expires_in,
                "token_type": "Bearer"
            })))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_token_cached_until_near_expiry() {
        let server = MockServer::start().await;
        mount_token(&server, "t-1", 3600, 1).await;

        let source = RefreshingToken::new(Client::new(), metadata_grant(&server));
        assert_eq!(source.token().await.unwrap(), "t-1");
        assert_eq!(source.token().await.unwrap(), "t-1");
    }

    #[tokio::test]
    async fn test_short_lived_token_refetched() {
        let server = MockServer::start().await;
        // inside the refresh margin, so never reused
        mount_token(&server, "t-1", 30, 2).await;

        let source = RefreshingToken::new(Client::new(), metadata_grant(&server));
        source.token().await.unwrap();
        source.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let server = MockServer::start().await;
        mount_token(&server, "t-1", 3600, 2).await;

        let source = RefreshingToken::new(Client::new(), metadata_grant(&server));
        source.token().await.unwrap();
        source.invalidate().await;
        source.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_token_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "user-token"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let grant = TokenGrant::RefreshToken {
            url: format!("{}/oauth", server.uri()),
            client_id: "id".into(),
            client_secret: "secret".into(),
            refresh_token: "r-1".into(),
        };
        let source = RefreshingToken::new(Client::new(), grant);
        assert_eq!(source.token().await.unwrap(), "user-token");
    }

    #[tokio::test]
    async fn test_token_endpoint_failure_is_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(path("/token"))
            .respond_with(ResponseTemplate::new(403).set_body_string("no service account"))
            .mount(&server)
            .await;

        let source = RefreshingToken::new(Client::new(), metadata_grant(&server));
        let err = source.token().await.unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::Unauthenticated));
    }

    #[test]
    fn test_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type":"authorized_user","client_id":"id","client_secret":"s","refresh_token":"r"}}"#
        )
        .unwrap();

        let grant = TokenGrant::from_credentials_file(file.path()).unwrap();
        assert_eq!(
            grant,
            TokenGrant::RefreshToken {
                url: OAUTH_TOKEN_URL.into(),
                client_id: "id".into(),
                client_secret: "s".into(),
                refresh_token: "r".into(),
            }
        );
    }

    #[test]
    fn test_service_account_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type":"service_account","private_key":"..."}}"#).unwrap();

        let err = TokenGrant::from_credentials_file(file.path()).unwrap_err();
        assert!(matches!(err, LogStoreError::NotConfigured(ref msg) if msg.contains("service_account")));
    }
}
