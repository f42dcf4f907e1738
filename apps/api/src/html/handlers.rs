use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::extraction::source::SourceReference;
use crate::html::html_to_text;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HtmlTextRequest {
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct HtmlTextResponse {
    pub text: String,
}

/// POST /api/v1/html/text
pub async fn handle_html_text(Json(req): Json<HtmlTextRequest>) -> Json<HtmlTextResponse> {
    Json(HtmlTextResponse {
        text: html_to_text(&req.html),
    })
}

#[derive(Debug, Deserialize)]
pub struct PostingRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PostingResponse {
    pub text: String,
    pub empty: bool,
    pub url: String,
}

/// POST /api/v1/postings/extract
/// Fetches a job posting page and returns its readable text.
pub async fn handle_extract_posting(
    State(state): State<AppState>,
    Json(req): Json<PostingRequest>,
) -> Result<Json<PostingResponse>, AppError> {
    let reference = SourceReference::from_raw(&req.url, "")?;
    let SourceReference::Url(url) = reference else {
        return Err(AppError::Validation(
            "url must be an absolute http(s) URL".to_string(),
        ));
    };

    let page = state.extractor.fetch(&SourceReference::Url(url.clone())).await?;
    let text = html_to_text(&String::from_utf8_lossy(&page.bytes));

    Ok(Json(PostingResponse {
        empty: text.is_empty(),
        text,
        url,
    }))
}
