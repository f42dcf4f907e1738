use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::dispatch::{DocumentFormat, MIME_OCTET_STREAM};
use crate::extraction::source::SourceReference;
use crate::extraction::storage::strip_bucket_prefix;
use crate::extraction::{Extraction, RawDocument};
use crate::state::AppState;

const NO_TEXT_MESSAGE: &str = "No text found in file";
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// Absolute URL or storage key.
    pub reference: String,
    /// Must name the configured bucket when present.
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub empty: bool,
    pub format: DocumentFormat,
    pub strategy: &'static str,
    pub filename: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<Extraction> for ExtractResponse {
    fn from(extraction: Extraction) -> Self {
        let empty = extraction.is_empty();
        Self {
            text: extraction.text,
            empty,
            format: extraction.format,
            strategy: extraction.strategy,
            filename: extraction.filename,
            mime_type: extraction.mime_type,
            message: empty.then_some(NO_TEXT_MESSAGE),
        }
    }
}

/// POST /api/v1/cv/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let bucket = state.config.s3_bucket.as_str();
    // Only the configured bucket is served; the credentials may reach others.
    if let Some(requested) = req.bucket.as_deref() {
        if requested != bucket {
            return Err(AppError::Validation(format!(
                "Bucket '{requested}' is not available"
            )));
        }
    }
    let reference = SourceReference::from_raw(&req.reference, bucket)?;
    let extraction = state.extractor.extract_text(&reference).await?;
    Ok(Json(extraction.into()))
}

/// POST /api/v1/cv/extract/upload
pub async fn handle_extract_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(MIME_OCTET_STREAM)
            .to_string();
        let bytes: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        info!("Received upload {filename:?} ({} bytes, {mime_type})", bytes.len());
        let extraction = state.extractor.extract_document(RawDocument {
            bytes,
            mime_type,
            filename,
        });
        return Ok(Json(extraction.into()));
    }

    Err(AppError::Validation(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// DELETE /api/v1/files/*key
pub async fn handle_delete_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    let bucket = &state.config.s3_bucket;
    let key = strip_bucket_prefix(bucket, &key);
    if key.is_empty() {
        return Err(AppError::Validation("File key is required".to_string()));
    }

    state.store.delete(bucket, key).await?;
    Ok(StatusCode::NO_CONTENT)
}
