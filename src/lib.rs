//! # Markdown Server
//!
//! A local HTTP file server that renders Markdown files to HTML through the
//! GitLab Markdown API.
//!
//! Requests for `*.md` files are read from disk, posted to
//! `{gitlab_server}/api/v4/markdown`, and the returned HTML is wrapped in a
//! page that uses GitLab's own stylesheets. Directories are listed and every
//! other file is served unchanged. No response ever reaches outside the served
//! root, even through symlinks.
//!
//! ## Architecture
//!
//! - [`resolver`] - Request path normalisation, symlink resolution, containment
//! - [`render`] - Rendering client trait and the GitLab implementation
//! - [`server`] - Axum dispatcher, page composer, listings and router
//! - [`assets`] - GitLab stylesheet and font cache
//! - [`config`] - CLI and the immutable server configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use markdown_server::{create_router, AppState, GitLabRenderer, RouterConfig, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new(".", std::env::var("GITLAB_TOKEN")?)?;
//!     let renderer = GitLabRenderer::from_config(&config)?;
//!     let addr = config.bind_address();
//!
//!     let router = create_router(AppState::new(config, renderer), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod error;
pub mod render;
pub mod resolver;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ServerConfig};
pub use error::{AssetError, ConfigError, RenderError, ServeError};
pub use render::{GitLabRenderer, MarkdownRenderer, RenderResult, RenderedHtml};
pub use resolver::{resolve, Miss, ResolvedTarget, TargetKind};
pub use server::{create_router, AppState, PageShell, RenderedPage, RouterConfig};
