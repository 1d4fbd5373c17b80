use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use super::model::FileRecord;
use super::retry::RetryPolicy;
use crate::error::{AppError, Result};

/// Header carrying the backend API token.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header carrying the derived hidden key on CDN lookups.
pub const HIDDEN_KEY_HEADER: &str = "X-Hidden-Key";
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Boundary to the remote backend.
#[async_trait]
pub trait RemoteFileService: Send + Sync {
    /// Ask for one more file, passing the files collected so far as context.
    async fn fetch_next_file(&self, known: &[Arc<FileRecord>]) -> Result<FileRecord>;

    /// Resolve `path` through the CDN endpoint and download the image bytes.
    async fn fetch_preview_image(&self, path: &str, hidden_key: &str) -> Result<Vec<u8>>;
}

/// Connection settings handed to [`HttpFileService`] by the composition root.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct NextFileRequest<'a> {
    received_files: Vec<&'a FileRecord>,
}

/// `reqwest`-backed implementation of [`RemoteFileService`].
pub struct HttpFileService {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpFileService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        // Endpoints are joined relative to the base, which needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Turn the CDN endpoint's answer into a fetchable URL.
    ///
    /// The body is either plain text or a JSON string literal; relative
    /// targets resolve against the base URL.
    fn resolve_target(&self, body: &str) -> Result<Url> {
        let trimmed = body.trim();
        let target = if trimmed.starts_with('"') {
            serde_json::from_str::<String>(trimmed)?
        } else {
            trimmed.to_string()
        };
        if target.is_empty() {
            return Err(AppError::InvalidUrl("empty CDN target".into()));
        }
        self.base_url
            .join(&target)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", target, e)))
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    async fn post_next_file(&self, url: Url, body: &NextFileRequest<'_>) -> Result<FileRecord> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_cdn_target(&self, url: Url, path: &str, hidden_key: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(&[("path", path)])
            .header(API_KEY_HEADER, &self.api_key)
            .header(HIDDEN_KEY_HEADER, hidden_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        let mut request = self.client.get(url.clone());
        if self.same_origin(&url) {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RemoteFileService for HttpFileService {
    async fn fetch_next_file(&self, known: &[Arc<FileRecord>]) -> Result<FileRecord> {
        let url = self.endpoint("api/file")?;
        let body = NextFileRequest {
            received_files: known.iter().map(|r| r.as_ref()).collect(),
        };
        let record = self
            .retry
            .run("POST /api/file", || self.post_next_file(url.clone(), &body))
            .await?;
        tracing::debug!(path = %record.path, known = known.len(), "received file candidate");
        Ok(record)
    }

    async fn fetch_preview_image(&self, path: &str, hidden_key: &str) -> Result<Vec<u8>> {
        let url = self.endpoint("api/cdn")?;
        let body = self
            .retry
            .run("GET /api/cdn", || {
                self.get_cdn_target(url.clone(), path, hidden_key)
            })
            .await?;
        let target = self.resolve_target(&body)?;
        tracing::debug!(path, target = %target, "resolved preview target");
        let bytes = self
            .retry
            .run("GET cdn target", || self.get_bytes(target.clone()))
            .await?;
        tracing::info!(path, bytes = bytes.len(), "downloaded preview");
        Ok(bytes)
    }
}
