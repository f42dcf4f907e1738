mod config;
mod errors;
mod extraction;
mod html;
mod routes;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::dispatch::Dispatcher;
use crate::extraction::source::{ReqwestFetcher, ResolverSettings, SourceResolver};
use crate::extraction::storage::{ObjectStore, S3ObjectStore};
use crate::extraction::TextExtractor;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coverdraft API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(s3));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize the source fetcher
    let fetcher = Arc::new(ReqwestFetcher::new(
        config.fetch_timeout,
        &config.user_agent,
    )?);
    info!(
        "HTTP fetcher initialized (timeout: {}s)",
        config.fetch_timeout.as_secs()
    );

    let resolver = SourceResolver::new(
        fetcher,
        store.clone(),
        ResolverSettings {
            signed_url_ttl: config.signed_url_ttl,
            max_document_bytes: config.max_document_bytes,
        },
    );
    let dispatcher = Dispatcher::new(config.enable_structured_pdf);
    info!(
        "Extractor ready (structured PDF: {}, max document: {} bytes)",
        config.enable_structured_pdf, config.max_document_bytes
    );

    // Build app state
    let state = AppState {
        extractor: Arc::new(TextExtractor::new(resolver, dispatcher)),
        store,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "coverdraft-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not virtual host; presigned URLs must match.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
