// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raumbuch Server - room book extraction from IFC models.
//!
//! Upload an IFC model, inspect its room book and download it as xlsx.
//! The PSet/Property allow-list is read once at startup; a request may
//! bring its own.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/allow-list` - Configured allow-list
//! - `POST /api/v1/raumbuch/preview` - Room book preview (JSON)
//! - `POST /api/v1/raumbuch/export` - Room book download (xlsx)

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use raumbuch_processing::AllowListIndex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::cache::DiskCache;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub allow_list: Arc<AllowListIndex>,
    /// `None` when caching is disabled
    pub cache: Option<Arc<DiskCache>>,
    pub config: Arc<Config>,
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        .route("/api/v1/allow-list", get(routes::raumbuch::allow_list))
        // Room book endpoints
        .route("/api/v1/raumbuch/preview", post(routes::raumbuch::preview))
        .route("/api/v1/raumbuch/export", post(routes::raumbuch::export))
        // Middleware
        .layer(DefaultBodyLimit::max(config.max_file_size_bytes()))
        .layer(CompressionLayer::new())
        // Request decompression handled in ReportJob::prepare to support multipart
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "info,tower_http=debug,raumbuch_server=debug,raumbuch_processing=debug".into()
        }))
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        allow_list_path = %config.allow_list_path.display(),
        cache_dir = %config.cache_dir,
        cache_enabled = config.cache_enabled,
        max_file_size_mb = config.max_file_size_mb,
        "Starting Raumbuch Server"
    );

    let allow_list = AllowListIndex::load(&config.allow_list_path).with_context(|| {
        format!(
            "failed to load allow-list from {}",
            config.allow_list_path.display()
        )
    })?;

    let cache = if config.cache_enabled {
        Some(Arc::new(DiskCache::new(&config.cache_dir).await))
    } else {
        None
    };

    let state = AppState {
        allow_list: Arc::new(allow_list),
        cache,
        config: Arc::new(config.clone()),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
