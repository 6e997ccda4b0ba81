//! Drive REST API client.
//!
//! Uploads use the resumable protocol: a metadata POST opens an upload
//! session, then the file body is streamed from disk in a single PUT. The
//! file is never buffered in memory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use ltake_models::UploadedArtifact;

use crate::auth::{ServiceAccountTokenSource, TokenSource};
use crate::error::{DriveError, DriveResult};

/// Default resumable-upload endpoint.
const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Configuration for the Drive client.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Target folder for uploads; unset uploads to the account's default
    /// location instead of failing
    pub folder_id: Option<String>,
    /// Resumable-upload endpoint (overridable for tests)
    pub upload_base_url: String,
    /// Whole-request timeout, sized for streaming large video bodies
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: None,
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl DriveConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let folder_id = std::env::var("GOOGLE_DRIVE_FOLDER_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let timeout_secs: u64 = std::env::var("DRIVE_UPLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        Self {
            folder_id,
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }
}

/// Google Drive client.
pub struct DriveClient {
    http: Client,
    config: DriveConfig,
    tokens: Arc<dyn TokenSource>,
}

impl DriveClient {
    /// Create a new client with an injected token source.
    pub fn new(config: DriveConfig, tokens: Arc<dyn TokenSource>) -> DriveResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("ltake-drive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DriveError::Network)?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Create from environment variables with service-account auth.
    pub fn from_env() -> DriveResult<Self> {
        let tokens = Arc::new(ServiceAccountTokenSource::from_env()?);
        Self::new(DriveConfig::from_env(), tokens)
    }

    /// The configured target folder, if any.
    pub fn folder_id(&self) -> Option<&str> {
        self.config.folder_id.as_deref()
    }

    /// Upload a local file, returning its remote id and shareable link.
    ///
    /// Streams the body from disk; any failure (network, auth, quota)
    /// surfaces with its underlying cause and is not retried here.
    pub async fn create_file(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        mime_type: &str,
    ) -> DriveResult<UploadedArtifact> {
        let path = path.as_ref();

        // Open before contacting the API so a missing local file never
        // opens an upload session.
        let file = tokio::fs::File::open(path).await?;
        let content_length = file.metadata().await?.len();

        debug!(
            path = %path.display(),
            name,
            bytes = content_length,
            "Starting Drive upload"
        );

        let session_url = self.start_session(name, mime_type).await?;

        let response = self
            .http
            .put(&session_url)
            .header(CONTENT_LENGTH, content_length)
            .header(CONTENT_TYPE, mime_type)
            .body(reqwest::Body::from(file))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::upload_failed(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let artifact: UploadedArtifact = response
            .json()
            .await
            .map_err(|e| DriveError::invalid_response(format!("upload response: {}", e)))?;

        info!(name, id = %artifact.id, "Uploaded file to Drive");
        Ok(artifact)
    }

    /// Open a resumable upload session, returning the session URL.
    async fn start_session(&self, name: &str, mime_type: &str) -> DriveResult<String> {
        let mut metadata = json!({
            "name": name,
            "mimeType": mime_type,
        });
        if let Some(folder) = &self.config.folder_id {
            metadata["parents"] = json!([folder]);
        }

        let mut token = self.tokens.access_token().await?;
        let mut response = self.session_request(&token, mime_type, &metadata).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            token = self.tokens.access_token().await?;
            response = self.session_request(&token, mime_type, &metadata).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::upload_failed(format!(
                "session start returned {}: {}",
                status, body
            )));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                DriveError::invalid_response("session start response missing Location header")
            })
    }

    async fn session_request(
        &self,
        token: &str,
        mime_type: &str,
        metadata: &serde_json::Value,
    ) -> DriveResult<reqwest::Response> {
        Ok(self
            .http
            .post(&self.config.upload_base_url)
            .query(&[("uploadType", "resumable"), ("fields", "id,webViewLink")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", mime_type)
            .json(metadata)
            .send()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, folder_id: Option<&str>) -> DriveClient {
        let config = DriveConfig {
            folder_id: folder_id.map(String::from),
            upload_base_url: server.uri(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        };
        DriveClient::new(config, Arc::new(StaticTokenSource::new("test-token"))).unwrap()
    }

    async fn test_file(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("t.mp4");
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_create_file_streams_and_parses_response() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = test_file(&dir, "fake video data").await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("fields", "id,webViewLink"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "name": "t.mp4",
                "mimeType": "video/mp4",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("location", format!("{}/upload-session", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/upload-session"))
            .and(body_string("fake video data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "f1",
                "webViewLink": "https://drive.google.com/file/d/f1/view",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let artifact = test_client(&server, None)
            .create_file(&file, "t.mp4", "video/mp4")
            .await
            .unwrap();

        assert_eq!(artifact.id, "f1");
        assert_eq!(
            artifact.web_view_link,
            "https://drive.google.com/file/d/f1/view"
        );
    }

    #[tokio::test]
    async fn test_create_file_sends_parent_folder() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = test_file(&dir, "x").await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "parents": ["folder123"],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("location", format!("{}/s", server.uri()).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "f2",
                "webViewLink": "https://drive.google.com/file/d/f2/view",
            })))
            .mount(&server)
            .await;

        let client = test_client(&server, Some("folder123"));
        assert_eq!(client.folder_id(), Some("folder123"));

        let artifact = client
            .create_file(&file, "t.mp4", "video/mp4")
            .await
            .unwrap();
        assert_eq!(artifact.id, "f2");
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_cause() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = test_file(&dir, "x").await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("location", format!("{}/s", server.uri()).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = test_client(&server, None)
            .create_file(&file, "t.mp4", "video/mp4")
            .await
            .unwrap_err();

        match err {
            DriveError::UploadFailed(msg) => {
                assert!(msg.contains("403"));
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_start_failure() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = test_file(&dir, "x").await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let err = test_client(&server, None)
            .create_file(&file, "t.mp4", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_local_file_short_circuits() {
        // No mocks mounted: a missing local file must fail before any
        // request is made.
        let server = MockServer::start().await;

        let err = test_client(&server, None)
            .create_file("does/not/exist.mp4", "t.mp4", "video/mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Io(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
