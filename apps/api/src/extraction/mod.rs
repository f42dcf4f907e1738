//! Document text extraction.
//!
//! Pipeline: `SourceResolver` → `RawDocument` → `Dispatcher` → format strategy →
//! normalizer. Fetch problems are hard failures (`FetchError`). Parse problems are
//! soft: they fall through to cruder strategies and end at a raw UTF-8 decode, so a
//! fetched document always yields a string, possibly empty.

pub mod dispatch;
pub mod docx;
pub mod handlers;
pub mod normalize;
pub mod odt;
pub mod package;
pub mod pdf;
pub mod source;
pub mod storage;

use bytes::Bytes;
use quick_xml::events::BytesText;
use thiserror::Error;
use tracing::info;

use crate::extraction::dispatch::{DocumentFormat, Dispatcher};
use crate::extraction::source::{FetchError, SourceReference, SourceResolver};

/// Soft failure of a single extraction strategy. Never leaves the dispatcher.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("ZIP error: {0}")]
    Zip(String),

    #[error("Package part '{0}' not found")]
    MissingPart(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("No text found: {0}")]
    NoText(&'static str),
}

/// Bytes of one document plus the metadata used for routing.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    pub mime_type: String,
    pub filename: String,
}

/// Result of one extraction. An empty `text` means "fetched, but no text found".
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub format: DocumentFormat,
    pub strategy: &'static str,
    pub filename: String,
    pub mime_type: String,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Entry point used by handlers. Holds no per-call state, so one instance is shared
/// across concurrent requests.
#[derive(Clone)]
pub struct TextExtractor {
    resolver: SourceResolver,
    dispatcher: Dispatcher,
}

impl TextExtractor {
    pub fn new(resolver: SourceResolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Fetches and extracts. Fails only when the source cannot be fetched.
    pub async fn extract_text(&self, reference: &SourceReference) -> Result<Extraction, FetchError> {
        let doc = self.resolver.resolve(reference).await?;
        Ok(self.extract_document(doc))
    }

    /// Extracts from bytes already in hand (uploads). Never fails.
    pub fn extract_document(&self, doc: RawDocument) -> Extraction {
        let dispatched = self.dispatcher.dispatch(&doc);
        info!(
            "Extracted {} chars from {} (format={}, strategy={})",
            dispatched.text.chars().count(),
            doc.filename,
            dispatched.format.as_str(),
            dispatched.strategy
        );

        Extraction {
            text: dispatched.text,
            format: dispatched.format,
            strategy: dispatched.strategy,
            filename: doc.filename,
            mime_type: doc.mime_type,
        }
    }

    /// Fetches a document without extracting it, for callers with their own decoding.
    pub async fn fetch(&self, reference: &SourceReference) -> Result<RawDocument, FetchError> {
        self.resolver.resolve(reference).await
    }
}

/// Unescaped XML text; falls back to the raw bytes when an entity is not recognised.
pub(crate) fn xml_text(e: &BytesText) -> String {
    match e.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}
