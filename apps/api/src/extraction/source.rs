//! Source Resolver: turns a `SourceReference` into a `RawDocument`.
//!
//! URLs are fetched directly. Storage keys are first exchanged for a freshly minted
//! signed URL. Any non-2xx status, timeout or network failure is a hard `FetchError`;
//! nothing is retried here and no placeholder content is invented.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{redirect, Client, Url};
use thiserror::Error;
use tracing::info;

use crate::extraction::dispatch::{DocumentFormat, MIME_OCTET_STREAM};
use crate::extraction::storage::{strip_bucket_prefix, ObjectStore, StorageError};
use crate::extraction::RawDocument;

const MAX_REDIRECTS: usize = 10;
/// Signed URLs live at least this long.
pub const MIN_SIGNED_URL_TTL: Duration = Duration::from_secs(300);
const FALLBACK_STEM: &str = "cv";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch of {url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Fetch of {url} timed out")]
    Timeout { url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not mint signed URL: {0}")]
    Signing(#[from] StorageError),

    #[error("Document is at least {actual} bytes, limit is {limit}")]
    TooLarge { limit: usize, actual: usize },

    #[error("Invalid source reference: {0}")]
    InvalidReference(String),
}

/// Where a document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    Url(String),
    /// `key` never starts with `{bucket}/`; `from_raw` strips it.
    StorageKey { bucket: String, key: String },
}

impl SourceReference {
    /// Classifies caller input: `http(s)://…` is a URL, anything else a key in `bucket`.
    pub fn from_raw(reference: &str, bucket: &str) -> Result<Self, FetchError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FetchError::InvalidReference("reference is empty".to_string()));
        }

        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(SourceReference::Url(reference.to_string()));
        }

        let key = strip_bucket_prefix(bucket, reference);
        if key.is_empty() {
            return Err(FetchError::InvalidReference(format!(
                "'{reference}' has no object key"
            )));
        }
        Ok(SourceReference::StorageKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceReference::Url(_) => "url",
            SourceReference::StorageKey { .. } => "storage_key",
        }
    }
}

/// A response as seen by the resolver. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// HTTP GET capability. Carried as `Arc<dyn HttpFetch>` so tests can fake it.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Implementations stop reading with `FetchError::TooLarge` once the body
    /// exceeds `max_bytes`.
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<FetchedResponse, FetchError>;
}

/// Production fetcher: bounded timeout, browser user agent, redirects followed,
/// caching disabled.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<FetchedResponse, FetchError> {
        let mut response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The resolver only reports the status of a failed fetch, so its body is not read.
        if !response.status().is_success() {
            return Ok(FetchedResponse {
                final_url,
                status,
                content_type,
                body: Bytes::new(),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: max_bytes,
                    actual: usize::try_from(declared).unwrap_or(usize::MAX),
                });
            }
        }

        // Content-Length may be absent or wrong; count what actually arrives.
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify(url, e))? {
            if body.len() + chunk.len() > max_bytes {
                return Err(FetchError::TooLarge {
                    limit: max_bytes,
                    actual: body.len() + chunk.len(),
                });
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();

        Ok(FetchedResponse {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    // Never echo the URL from reqwest's message: it may be a signed URL.
    let url = redact_query(url);
    if e.is_timeout() {
        FetchError::Timeout { url }
    } else {
        FetchError::Network(format!("request to {url} failed: {}", e.without_url()))
    }
}

/// Drops the query string so signature parameters never reach logs or errors.
fn redact_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub signed_url_ttl: Duration,
    pub max_document_bytes: usize,
}

/// Fetches the bytes behind a `SourceReference`.
#[derive(Clone)]
pub struct SourceResolver {
    fetcher: Arc<dyn HttpFetch>,
    store: Arc<dyn ObjectStore>,
    settings: ResolverSettings,
}

impl SourceResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        store: Arc<dyn ObjectStore>,
        mut settings: ResolverSettings,
    ) -> Self {
        settings.signed_url_ttl = settings.signed_url_ttl.max(MIN_SIGNED_URL_TTL);
        Self {
            fetcher,
            store,
            settings,
        }
    }

    pub async fn resolve(&self, reference: &SourceReference) -> Result<RawDocument, FetchError> {
        info!("Resolving {} source", reference.kind());

        let url = match reference {
            SourceReference::Url(url) => url.clone(),
            SourceReference::StorageKey { bucket, key } => {
                let key = strip_bucket_prefix(bucket, key);
                // A new signed URL per call; links are never reused across attempts.
                let signed = self
                    .store
                    .sign(bucket, key, self.settings.signed_url_ttl)
                    .await?;
                info!(
                    "Signed download for {}/{} valid until {}",
                    bucket, key, signed.expires_at
                );
                signed.url
            }
        };

        let limit = self.settings.max_document_bytes;
        let response = self.fetcher.fetch(&url, limit).await?;
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                status: response.status,
                url: redact_query(&url),
            });
        }

        if response.body.len() > limit {
            return Err(FetchError::TooLarge {
                limit,
                actual: response.body.len(),
            });
        }

        let mime_type = response
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(MIME_OCTET_STREAM)
            .to_string();
        let filename = filename_from_url(&response.final_url)
            .unwrap_or_else(|| fallback_filename(&mime_type));

        info!(
            "Fetched {} bytes (HTTP {}, {})",
            response.body.len(),
            response.status,
            mime_type
        );

        Ok(RawDocument {
            bytes: response.body,
            mime_type,
            filename,
        })
    }
}

/// Last non-empty path segment of `url`, if any.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

fn fallback_filename(mime_type: &str) -> String {
    let format = DocumentFormat::detect(mime_type, "");
    format!("{FALLBACK_STEM}.{}", format.default_extension())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::extraction::storage::SignedDownload;

    /// In-memory `HttpFetch`: canned responses keyed by URL, 404 for anything else.
    #[derive(Default)]
    pub struct FakeFetcher {
        pub responses: Mutex<HashMap<String, FetchedResponse>>,
        pub failures: Mutex<HashMap<String, fn(&str) -> FetchError>>,
        pub requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn with_response(
            self,
            url: &str,
            status: u16,
            content_type: Option<&str>,
            body: &[u8],
        ) -> Self {
            self.with_redirected_response(url, url, status, content_type, body)
        }

        pub fn with_redirected_response(
            self,
            url: &str,
            final_url: &str,
            status: u16,
            content_type: Option<&str>,
            body: &[u8],
        ) -> Self {
            self.responses.lock().unwrap().insert(
                url.to_string(),
                FetchedResponse {
                    final_url: final_url.to_string(),
                    status,
                    content_type: content_type.map(str::to_string),
                    body: Bytes::copy_from_slice(body),
                },
            );
            self
        }

        pub fn with_failure(self, url: &str, failure: fn(&str) -> FetchError) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(url.to_string(), failure);
            self
        }
    }

    #[async_trait]
    impl HttpFetch for FakeFetcher {
        async fn fetch(
            &self,
            url: &str,
            _max_bytes: usize,
        ) -> Result<FetchedResponse, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            if let Some(failure) = self.failures.lock().unwrap().get(url) {
                return Err(failure(url));
            }
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or(FetchedResponse {
                    final_url: url.to_string(),
                    status: 404,
                    content_type: Some("text/html".to_string()),
                    body: Bytes::from_static(b"<h1>Not Found</h1>"),
                }))
        }
    }

    /// In-memory `ObjectStore` that signs `https://storage.test/{bucket}/{key}?sig=N`.
    #[derive(Default)]
    pub struct FakeStore {
        pub signed: Mutex<Vec<(String, String, Duration)>>,
        pub deleted: Mutex<Vec<(String, String)>>,
        pub fail_signing: bool,
    }

    impl FakeStore {
        pub fn signed_url(bucket: &str, key: &str, n: usize) -> String {
            format!("https://storage.test/{bucket}/{key}?sig={n}")
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn sign(
            &self,
            bucket: &str,
            key: &str,
            ttl: Duration,
        ) -> Result<SignedDownload, StorageError> {
            if self.fail_signing {
                return Err(StorageError::Presign {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: "access denied".to_string(),
                });
            }
            let mut signed = self.signed.lock().unwrap();
            signed.push((bucket.to_string(), key.to_string(), ttl));
            Ok(SignedDownload {
                url: Self::signed_url(bucket, key, signed.len()),
                expires_at: Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64),
            })
        }

        async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
            self.deleted
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string()));
            Ok(())
        }
    }
}
