//! Service-account authentication for Drive.
//!
//! Tokens come from gcp_auth behind a small cache with a refresh margin and
//! single-flight refresh. The [`TokenSource`] trait is the seam the client
//! is built against, so tests and fakes can stand in for a real service
//! account.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{DriveError, DriveResult};

/// OAuth scope for files created by this application.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Refresh margin: refresh the token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative token TTL when expiry is unknown (50 minutes).
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// Where a base64-encoded service account is materialized on disk.
const SERVICE_ACCOUNT_PATH: &str = "service-account.json";

/// Source of bearer tokens for Drive requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Get a valid access token.
    async fn access_token(&self) -> DriveResult<String>;

    /// Drop any cached token, forcing a refresh on the next request.
    async fn invalidate(&self) {}
}

/// Fixed-token source for tests and local development.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> DriveResult<String> {
        Ok(self.token.clone())
    }
}

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Token source backed by a gcp_auth service account.
pub struct ServiceAccountTokenSource {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Load the service account named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env() -> DriveResult<Self> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            DriveError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Self::new(Arc::new(sa))),
            None => Err(DriveError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Wrap an existing token provider.
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    /// Refresh the token, updating the cache under the held write lock.
    async fn refresh_token(&self, cache: &mut Option<CachedToken>) -> DriveResult<String> {
        match self.auth.token(&[DRIVE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();

                // Prefer the real expiry, fall back to a conservative default.
                let expires_at = {
                    let now = Utc::now();
                    let exp = token.expires_at();
                    if exp > now {
                        match (exp - now).to_std() {
                            Ok(ttl) => Instant::now() + ttl,
                            Err(_) => Instant::now() + TOKEN_DEFAULT_TTL,
                        }
                    } else {
                        Instant::now()
                    }
                };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!("Refreshed Drive auth token");
                Ok(access_token)
            }
            Err(e) => {
                // A still-usable token beats failing the upload outright.
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }

                Err(DriveError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                )))
            }
        }
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> DriveResult<String> {
        // Fast path under the read lock.
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        // Slow path: single-flight refresh under the write lock.
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        self.refresh_token(&mut cache).await
    }

    async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

/// Decode `SERVICE_ACCOUNT_B64` into `service-account.json` when present.
///
/// Deployments that cannot mount a key file ship the service account as a
/// base64 environment variable instead; this writes it to disk and points
/// `GOOGLE_APPLICATION_CREDENTIALS` at it unless already set.
pub fn materialize_service_account() -> DriveResult<()> {
    let encoded = match std::env::var("SERVICE_ACCOUNT_B64") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(()),
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| DriveError::config_error(format!("SERVICE_ACCOUNT_B64 is not valid base64: {}", e)))?;

    std::fs::write(SERVICE_ACCOUNT_PATH, decoded)?;
    info!(path = SERVICE_ACCOUNT_PATH, "Materialized service account from SERVICE_ACCOUNT_B64");

    if std::env::var("GOOGLE_APPLICATION_CREDENTIALS").is_err() {
        std::env::set_var(
            "GOOGLE_APPLICATION_CREDENTIALS",
            Path::new(SERVICE_ACCOUNT_PATH),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_scope() {
        assert!(DRIVE_SCOPE.contains("drive.file"));
    }

    #[test]
    fn test_token_refresh_margin() {
        assert_eq!(TOKEN_REFRESH_MARGIN, Duration::from_secs(60));
    }

    #[test]
    fn test_token_default_ttl() {
        assert_eq!(TOKEN_DEFAULT_TTL, Duration::from_secs(50 * 60));
    }

    #[tokio::test]
    async fn test_static_token_source() {
        let source = StaticTokenSource::new("tok");
        assert_eq!(source.access_token().await.unwrap(), "tok");
        source.invalidate().await; // default no-op
        assert_eq!(source.access_token().await.unwrap(), "tok");
    }
}
