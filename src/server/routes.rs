//! Router configuration for Markdown Server.
//!
//! # Route Structure
//!
//! ```text
//! /_gitlab_assets/{*asset}   - Cached GitLab stylesheets and fonts
//! /favicon.svg               - Cached favicon
//! /{*path}                   - Served root: listings, rendered Markdown, files
//! ```
//!
//! The asset routes read from the cache directory only. Everything else goes
//! through the dispatcher, which confines itself to the served root.

use axum::{routing::get, Router};
use http::header::{HeaderValue, SERVER};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{serve_path, AppState};
use crate::assets::{ASSETS_DIR, FAVICON_FILE};
use crate::render::MarkdownRenderer;

/// Value of the `Server` response header.
pub const SERVER_HEADER: &str = concat!("MarkdownServer/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether to mount the cached GitLab asset routes
    pub serve_assets: bool,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            serve_assets: true,
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Create a router configuration with assets and tracing enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the asset routes.
    pub fn with_assets(mut self, enabled: bool) -> Self {
        self.serve_assets = enabled;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Only `GET` and `HEAD` reach the dispatcher; other methods get
/// `405 Method Not Allowed`.
pub fn create_router<R>(state: AppState<R>, config: RouterConfig) -> Router
where
    R: MarkdownRenderer + 'static,
{
    let cache_dir = state.config.cache_dir().to_path_buf();

    let mut router = Router::new();
    if config.serve_assets {
        router = router
            .nest_service(
                &format!("/{}", ASSETS_DIR),
                ServeDir::new(cache_dir.join(ASSETS_DIR)),
            )
            .route_service(
                &format!("/{}", FAVICON_FILE),
                ServeFile::new(cache_dir.join(FAVICON_FILE)),
            );
    }

    let router = router
        .fallback_service(get(serve_path::<R>).with_state::<()>(state))
        .layer(SetResponseHeaderLayer::if_not_present(
            SERVER,
            HeaderValue::from_static(SERVER_HEADER),
        ));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
