use std::sync::Arc;

use crate::config::Config;
use crate::extraction::storage::ObjectStore;
use crate::extraction::TextExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Resolver + dispatcher. Stateless, shared by every request.
    pub extractor: Arc<TextExtractor>,
    /// Same store the resolver signs against; used directly for file removal.
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
}
