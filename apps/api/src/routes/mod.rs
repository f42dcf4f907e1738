pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::extraction::handlers;
use crate::html::handlers as html_handlers;
use crate::state::AppState;

/// Extra headroom over the document limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_document_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // CV extraction
        .route("/api/v1/cv/extract", post(handlers::handle_extract))
        .route(
            "/api/v1/cv/extract/upload",
            post(handlers::handle_extract_upload),
        )
        .route("/api/v1/files/*key", delete(handlers::handle_delete_file))
        // Web content
        .route("/api/v1/html/text", post(html_handlers::handle_html_text))
        .route(
            "/api/v1/postings/extract",
            post(html_handlers::handle_extract_posting),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
