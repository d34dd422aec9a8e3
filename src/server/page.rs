//! Page composition - wraps rendered Markdown and error messages in HTML.

use std::sync::OnceLock;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use regex::Regex;
use tracing::{debug, error, warn};

use crate::assets::{ASSETS_DIR, CSS_ASSETS, FAVICON_FILE, FONT_ASSETS};
use crate::error::{RenderError, ServeError};
use crate::render::RenderedHtml;

/// Content type of every page produced here.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// GitLab emits `class="code ..."` on highlighted blocks without the theme
/// class; add `white` so the cached highlight stylesheet applies.
fn apply_highlight_theme(html: &str) -> String {
    static CODE_BLOCK: OnceLock<Regex> = OnceLock::new();
    let re = CODE_BLOCK
        .get_or_init(|| Regex::new(r#"<pre ([^>]*?)class="code "#).expect("valid regex"));
    re.replace_all(html, r#"<pre ${1}class="code white "#)
        .into_owned()
}

// =============================================================================
// Page Shell
// =============================================================================

/// The `<head>` resources shared by every rendered page.
#[derive(Debug, Clone, Default)]
pub struct PageShell {
    stylesheets: Vec<String>,
    fonts: Vec<String>,
    favicon: Option<String>,
}

impl PageShell {
    /// Shell referencing the cached GitLab stylesheets, fonts and favicon.
    pub fn gitlab() -> Self {
        Self {
            stylesheets: CSS_ASSETS
                .iter()
                .map(|css| format!("/{}/{}", ASSETS_DIR, css))
                .collect(),
            fonts: FONT_ASSETS
                .iter()
                .map(|font| format!("/{}/{}", ASSETS_DIR, font))
                .collect(),
            favicon: Some(format!("/{}", FAVICON_FILE)),
        }
    }

    /// Shell with no external resources.
    pub fn bare() -> Self {
        Self::default()
    }

    fn head(&self) -> String {
        let mut head = String::new();
        if let Some(favicon) = &self.favicon {
            head.push_str(&format!("<link rel=\"icon\" href=\"{}\">\n", favicon));
        }
        for css in &self.stylesheets {
            head.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">\n", css));
        }
        for font in &self.fonts {
            head.push_str(&format!(
                "<link as=\"font\" crossorigin=\"\" href=\"{}\" rel=\"preload\">\n",
                font
            ));
        }
        head
    }

    /// Wrap rendered Markdown into a complete page titled after the file.
    pub fn compose(&self, title: &str, html: RenderedHtml) -> RenderedPage {
        RenderedPage {
            title: title.to_string(),
            body_html: apply_highlight_theme(html.as_str().trim()),
            head: self.head(),
        }
    }
}

// =============================================================================
// Rendered Page
// =============================================================================

/// A complete HTML document for one rendered Markdown file.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub title: String,
    pub body_html: String,
    head: String,
}

impl RenderedPage {
    /// Serialize the page to an HTML document.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n\
             <html class=\"\" lang=\"en\">\n\
             <head>\n\
             <meta charset=\"utf-8\">\n\
             <title>{title}</title>\n\
             {head}\
             </head>\n\
             <body>\n\
             <div class=\"file-content md\">\n\
             {body}\n\
             </div>\n\
             </body>\n\
             </html>\n",
            title = html_escape(&self.title),
            head = self.head,
            body = self.body_html,
        )
    }
}

impl IntoResponse for RenderedPage {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
            self.to_html(),
        )
            .into_response()
    }
}

// =============================================================================
// Error Pages
// =============================================================================

/// Build a minimal HTML error page stating only the failure category.
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{code} {reason}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{code} {reason}</h1>\n\
         <p>{message}</p>\n\
         </body>\n\
         </html>\n",
        code = status.as_u16(),
        reason = reason,
        message = html_escape(message),
    );
    (status, [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)], body).into_response()
}

/// Message shared by every 404, whatever the internal reason.
pub const NOT_FOUND_MESSAGE: &str = "File not found.";

/// Status code and user-facing message for a dispatcher failure.
pub fn status_and_message(err: &ServeError) -> (StatusCode, &'static str) {
    match err {
        ServeError::PathEscape { .. } | ServeError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
        }
        ServeError::Render(RenderError::Rejected { .. }) => (
            StatusCode::FORBIDDEN,
            "The Markdown rendering service rejected the request. Check the API token.",
        ),
        ServeError::Render(RenderError::Unreachable(_)) => (
            StatusCode::BAD_GATEWAY,
            "The Markdown rendering service could not be reached.",
        ),
        ServeError::Render(RenderError::Malformed(_)) => (
            StatusCode::BAD_GATEWAY,
            "The Markdown rendering service returned an unusable response.",
        ),
        ServeError::FilesystemRead { source, .. }
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
        }
        ServeError::FilesystemRead { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The file could not be read.",
        ),
    }
}

/// Convert ServeError to an HTML error page.
///
/// The full error (with relative path and upstream detail) is logged; the page
/// only carries the category message.
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, message) = status_and_message(&self);

        match &self {
            ServeError::PathEscape { .. } => {
                warn!(status = status.as_u16(), "Rejected path escape: {}", self)
            }
            ServeError::Render(render_err) => warn!(
                error_type = render_err.kind(),
                status = status.as_u16(),
                "Rendering failed: {}",
                render_err
            ),
            _ if status.is_server_error() => {
                error!(status = status.as_u16(), "Server error: {}", self)
            }
            _ => debug!(status = status.as_u16(), "{}", self),
        }

        error_page(status, message)
    }
}

// =============================================================================
// Tests
// =============================================================================
