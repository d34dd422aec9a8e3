//! Markdown rendering through a remote service.
//!
//! The dispatcher only sees the [`MarkdownRenderer`] trait. The production
//! implementation is [`GitLabRenderer`], which posts the Markdown source to
//! GitLab's `/api/v4/markdown` endpoint.
//!
//! Rendering is never retried and never cached: each call is one remote
//! request, so credential or connectivity problems surface immediately.

mod gitlab;

use async_trait::async_trait;

use crate::error::RenderError;

pub use gitlab::{GitLabRenderer, RenderRequest, RenderResponse, MARKDOWN_API_PATH};

/// HTML produced by the rendering service, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHtml(pub String);

impl RenderedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Outcome of one rendering call.
pub type RenderResult = Result<RenderedHtml, RenderError>;

/// Turns Markdown source into HTML.
///
/// Implementations must not hold locks shared with other requests while the
/// call is in flight.
#[async_trait]
pub trait MarkdownRenderer: Send + Sync {
    /// Render the raw bytes of a Markdown file.
    async fn render(&self, markdown: &[u8]) -> RenderResult;
}
