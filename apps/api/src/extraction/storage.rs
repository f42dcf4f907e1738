//! Object store capability: signed download URLs and object removal.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to sign {bucket}/{key}: {message}")]
    Presign {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Failed to delete {bucket}/{key}: {message}")]
    Delete {
        bucket: String,
        key: String,
        message: String,
    },
}

/// A short-lived download link. Carries a credential, so it is never logged or stored.
#[derive(Clone)]
pub struct SignedDownload {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for SignedDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedDownload")
            .field("url", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Storage backend seen by the resolver and the file-removal route.
/// Carried in `AppState` as `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn sign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedDownload, StorageError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Removes a leading `/` and a leading `{bucket}/` from a storage key.
pub fn strip_bucket_prefix<'a>(bucket: &str, key: &'a str) -> &'a str {
    let key = key.trim_start_matches('/');
    if bucket.is_empty() {
        return key;
    }
    key.strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

/// S3 / MinIO implementation.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn sign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedDownload, StorageError> {
        let presign_error = |message: String| StorageError::Presign {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| presign_error(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| presign_error(e.to_string()))?;

        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        Ok(SignedDownload {
            url: request.uri().to_string(),
            expires_at,
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Deleted s3://{}/{}", bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bucket_prefix() {
        assert_eq!(strip_bucket_prefix("files", "files/users/42/doc.pdf"), "users/42/doc.pdf");
        assert_eq!(strip_bucket_prefix("files", "/files/users/42/doc.pdf"), "users/42/doc.pdf");
    }

    #[test]
    fn test_strip_bucket_prefix_leaves_other_keys() {
        assert_eq!(strip_bucket_prefix("files", "users/42/doc.pdf"), "users/42/doc.pdf");
        // A key that merely starts with the bucket name is not a prefix match.
        assert_eq!(strip_bucket_prefix("files", "filesystem/doc.pdf"), "filesystem/doc.pdf");
        assert_eq!(strip_bucket_prefix("", "/doc.pdf"), "doc.pdf");
    }

    #[test]
    fn test_signed_download_debug_redacts_url() {
        let signed = SignedDownload {
            url: "https://s3.local/files/doc.pdf?X-Amz-Signature=secret".to_string(),
            expires_at: Utc::now(),
        };
        let debug = format!("{signed:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }
}
