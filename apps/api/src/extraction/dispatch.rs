//! Format Dispatcher: picks a document format from MIME type and filename, then runs
//! that format's ordered strategy list until one succeeds.

use serde::Serialize;
use tracing::{debug, warn};

use crate::extraction::normalize::normalize_text;
use crate::extraction::{docx, odt, pdf, ExtractError, RawDocument};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_ODT: &str = "application/vnd.oasis.opendocument.text";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "rtf"];

/// Document families the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Odt,
    Text,
    /// Nothing matched; decoded as text all the same.
    Unknown,
}

impl DocumentFormat {
    /// Fixed priority: PDF → DOCX → ODT → text. Each family matches on MIME type or
    /// extension, so one correct signal is enough even when the other is wrong.
    pub fn detect(mime_type: &str, filename: &str) -> Self {
        let mime = essence(mime_type);
        let ext = extension(filename);
        let ext = ext.as_deref();

        if mime == MIME_PDF || ext == Some("pdf") {
            DocumentFormat::Pdf
        } else if mime == MIME_DOCX || ext == Some("docx") {
            DocumentFormat::Docx
        } else if mime == MIME_ODT || ext == Some("odt") {
            DocumentFormat::Odt
        } else if mime.starts_with("text/") || ext.is_some_and(|e| TEXT_EXTENSIONS.contains(&e))
        {
            DocumentFormat::Text
        } else {
            DocumentFormat::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Odt => "odt",
            DocumentFormat::Text => "text",
            DocumentFormat::Unknown => "unknown",
        }
    }

    /// Extension used when a filename has to be invented.
    pub fn default_extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf | DocumentFormat::Unknown => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Odt => "odt",
            DocumentFormat::Text => "txt",
        }
    }
}

/// One way of turning bytes into text. Strategies may fail; the dispatcher moves on.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&[u8]) -> Result<String, ExtractError>,
}

const PDF_LIBRARY: Strategy = Strategy {
    name: "pdf-library",
    run: pdf::structured,
};
const PDF_TEXT_OPERATORS: Strategy = Strategy {
    name: "pdf-text-operators",
    run: pdf::text_operators,
};
const PDF_STREAMS: Strategy = Strategy {
    name: "pdf-streams",
    run: pdf::stream_scan,
};
const PDF_RAW: Strategy = Strategy {
    name: "pdf-raw",
    run: pdf::raw_printable,
};
const DOCX_XML: Strategy = Strategy {
    name: "docx-xml",
    run: docx::extract_docx,
};
const ODT_XML: Strategy = Strategy {
    name: "odt-xml",
    run: odt::extract_odt,
};

/// Universal last resort, applied after every chain is exhausted.
pub const RAW_UTF8: &str = "raw-utf8";

fn decode_utf8_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// The text produced for one document, with the route it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub text: String,
    pub format: DocumentFormat,
    pub strategy: &'static str,
}

/// Stateless router from `RawDocument` to normalized text.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    structured_pdf: bool,
}

impl Dispatcher {
    /// `structured_pdf` puts the `pdf-extract` backed strategy ahead of the heuristics.
    pub fn new(structured_pdf: bool) -> Self {
        Self { structured_pdf }
    }

    pub fn strategies(&self, format: DocumentFormat) -> Vec<Strategy> {
        match format {
            DocumentFormat::Pdf => {
                let mut chain = Vec::with_capacity(4);
                if self.structured_pdf {
                    chain.push(PDF_LIBRARY);
                }
                chain.extend([PDF_TEXT_OPERATORS, PDF_STREAMS, PDF_RAW]);
                chain
            }
            DocumentFormat::Docx => vec![DOCX_XML],
            DocumentFormat::Odt => vec![ODT_XML],
            DocumentFormat::Text | DocumentFormat::Unknown => vec![],
        }
    }

    /// Never fails: when every strategy errors the raw bytes are decoded as UTF-8.
    pub fn dispatch(&self, doc: &RawDocument) -> Dispatched {
        let format = DocumentFormat::detect(&doc.mime_type, &doc.filename);
        let chain = self.strategies(format);

        for strategy in &chain {
            match (strategy.run)(&doc.bytes) {
                Ok(text) => {
                    return Dispatched {
                        text: normalize_text(&text),
                        format,
                        strategy: strategy.name,
                    };
                }
                Err(e) => debug!(
                    "Strategy {} failed for {} ({}): {e}",
                    strategy.name,
                    doc.filename,
                    format.as_str()
                ),
            }
        }

        if !chain.is_empty() {
            warn!(
                "All {} strategies failed for {}; decoding raw bytes",
                format.as_str(),
                doc.filename
            );
        }

        Dispatched {
            text: normalize_text(&decode_utf8_lossy(&doc.bytes)),
            format,
            strategy: RAW_UTF8,
        }
    }
}

/// Lowercased MIME type without parameters (`text/plain; charset=utf-8` → `text/plain`).
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase()).filter(|e| !e.is_empty())
}
