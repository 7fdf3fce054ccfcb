//! Static fixture site for hermetic end-to-end runs.
//!
//! Serves a miniature search flow: a search page whose form submits to a
//! results page, plus a `/health` endpoint the harness polls during startup.
//! The pages live under `assets/` and are served verbatim.

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the fixture router: `/health` plus static pages from `assets_dir`.
///
/// `ServeDir` resolves `/` to `index.html`, so the search page is the site
/// root, matching how the live flow navigates.
pub fn router(assets_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback_service(ServeDir::new(assets_dir))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}
