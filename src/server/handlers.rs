//! Request dispatch for the Markdown Server.
//!
//! Every `GET`/`HEAD` that is not an asset request lands in [`serve_path`]:
//!
//! ```text
//! Received ──resolve──▶ Classified ──┬──▶ Serving   (directory, other file)
//!                                    ├──▶ Rendering (markdown file)
//!                                    └──▶ Denying   (not found / escaped)
//!                                                 │
//!                                                 ▼
//!                                             Responded
//! ```
//!
//! Each branch produces exactly one response. Failures are converted to HTML
//! error pages by [`ServeError`]'s `IntoResponse` impl and never leave the
//! request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info};

use super::listing::{listing_response, read_listing};
use super::page::PageShell;
use crate::config::ServerConfig;
use crate::error::ServeError;
use crate::render::MarkdownRenderer;
use crate::resolver::{contained_canonical, resolve, Miss, ResolvedTarget, TargetKind};

/// Index files served in place of a directory listing, in order of preference.
pub const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Everything here is read-only after startup; handlers never take a lock.
pub struct AppState<R: MarkdownRenderer> {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,

    /// Markdown rendering backend
    pub renderer: Arc<R>,

    /// Head resources for rendered pages
    pub shell: Arc<PageShell>,
}

impl<R: MarkdownRenderer> AppState<R> {
    /// Create application state with the GitLab page shell.
    pub fn new(config: ServerConfig, renderer: R) -> Self {
        Self {
            config: Arc::new(config),
            renderer: Arc::new(renderer),
            shell: Arc::new(PageShell::gitlab()),
        }
    }

    /// Replace the page shell.
    pub fn with_shell(mut self, shell: PageShell) -> Self {
        self.shell = Arc::new(shell);
        self
    }
}

impl<R: MarkdownRenderer> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            renderer: Arc::clone(&self.renderer),
            shell: Arc::clone(&self.shell),
        }
    }
}

// =============================================================================
// Dispatch Plan
// =============================================================================

/// What to do with a classified request.
#[derive(Debug)]
pub enum Step {
    /// Directory requested without trailing slash
    Redirect(String),
    /// Serve an index file or list the directory
    Directory { path: PathBuf, relative_path: String },
    /// Read, render and wrap a Markdown file
    Render { path: PathBuf, title: String, relative_path: String },
    /// Stream a file unchanged
    Serve(PathBuf),
    /// Answer with an error page
    Deny(ServeError),
}

/// Redirect target for a directory requested without its trailing slash.
///
/// Leading slashes collapse to one so `//host` can never become a
/// protocol-relative `Location`.
fn directory_location(uri: &Uri) -> String {
    let path = uri.path().trim_start_matches('/');
    match uri.query() {
        Some(query) => format!("/{}/?{}", path, query),
        None => format!("/{}/", path),
    }
}

/// Decide the next step for a resolved request.
pub fn plan(target: ResolvedTarget, uri: &Uri) -> Step {
    let title = target.file_name().to_string();
    let ResolvedTarget {
        relative_path,
        kind,
    } = target;

    match kind {
        TargetKind::Directory(path) => {
            if uri.path().ends_with('/') {
                Step::Directory {
                    path,
                    relative_path,
                }
            } else {
                Step::Redirect(directory_location(uri))
            }
        }
        TargetKind::MarkdownFile(path) => Step::Render {
            path,
            title,
            relative_path,
        },
        TargetKind::OtherFile(path) => Step::Serve(path),
        TargetKind::NotFound(Miss::Escaped) => Step::Deny(ServeError::PathEscape {
            request_path: uri.path().to_string(),
        }),
        TargetKind::NotFound(Miss::Missing) => Step::Deny(ServeError::NotFound {
            request_path: uri.path().to_string(),
        }),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle every request for a path under the served root.
///
/// # Response
///
/// - `200 OK`: rendered Markdown page, directory listing, or file bytes
/// - `301 Moved Permanently`: directory requested without trailing slash
/// - `403 Forbidden`: rendering service rejected the API token
/// - `404 Not Found`: missing path, or a path escaping the root
/// - `500 Internal Server Error`: file vanished or became unreadable
/// - `502 Bad Gateway`: rendering service unreachable or malformed reply
pub async fn serve_path<R: MarkdownRenderer + 'static>(
    State(state): State<AppState<R>>,
    request: Request,
) -> Result<Response, ServeError> {
    let uri = request.uri().clone();
    let root = state.config.root_directory();

    let target = resolve(uri.path(), root).await;
    debug!(path = %uri.path(), kind = ?target.kind, "Classified request");

    match plan(target, &uri) {
        Step::Redirect(location) => Ok((
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, location)],
        )
            .into_response()),
        Step::Directory {
            path,
            relative_path,
        } => serve_directory(&path, root, &relative_path, request).await,
        Step::Render {
            path,
            title,
            relative_path,
        } => {
            info!("Requesting markdown rendering for /{}", relative_path);
            render_markdown(&state, &path, &title, relative_path).await
        }
        Step::Serve(path) => Ok(serve_file(&path, request).await),
        Step::Deny(err) => Err(err),
    }
}

/// Read a Markdown file, render it remotely and wrap it in the page shell.
async fn render_markdown<R: MarkdownRenderer>(
    state: &AppState<R>,
    path: &Path,
    title: &str,
    relative_path: String,
) -> Result<Response, ServeError> {
    let markdown = tokio::fs::read(path)
        .await
        .map_err(|source| ServeError::FilesystemRead {
            relative_path,
            source,
        })?;

    let html = state.renderer.render(&markdown).await?;
    Ok(state.shell.compose(title, html).into_response())
}

/// Serve an index file if the directory has one, otherwise list it.
async fn serve_directory(
    dir: &Path,
    root: &Path,
    relative_path: &str,
    request: Request,
) -> Result<Response, ServeError> {
    for index in INDEX_FILES {
        if let Some(index_path) = contained_canonical(&dir.join(index), root).await {
            let is_file = tokio::fs::metadata(&index_path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                return Ok(serve_file(&index_path, request).await);
            }
        }
    }

    let entries =
        read_listing(dir, root)
            .await
            .map_err(|source| ServeError::FilesystemRead {
                relative_path: relative_path.to_string(),
                source,
            })?;
    Ok(listing_response(relative_path, &entries))
}

/// Stream a file that has already passed containment checks.
///
/// Content type, `Last-Modified`, conditional and range requests are handled
/// by `ServeFile`.
async fn serve_file(path: &Path, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

// =============================================================================
// Tests
// =============================================================================
