//! GitLab Markdown API client.
//!
//! # Wire format
//!
//! ```text
//! POST {gitlab_server}/api/v4/markdown
//! PRIVATE-TOKEN: <token>
//! Content-Type: application/json
//!
//! {"text": "# Title", "gfm": true, "project": "group/project"}
//!
//! 201 Created
//! {"html": "<h1 data-sourcepos=...>Title</h1>"}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{MarkdownRenderer, RenderResult, RenderedHtml};
use crate::config::ServerConfig;
use crate::error::{ConfigError, RenderError};

/// Path of the rendering endpoint, relative to the GitLab base URL.
pub const MARKDOWN_API_PATH: &str = "api/v4/markdown";

/// Header carrying the personal access token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// JSON body sent to the rendering endpoint.
#[derive(Debug, Serialize)]
pub struct RenderRequest<'a> {
    /// Raw Markdown source
    pub text: &'a str,

    /// Request GitLab Flavored Markdown rather than plain CommonMark
    pub gfm: bool,

    /// Project used to resolve references such as `#123`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<&'a str>,
}

/// JSON body returned by the rendering endpoint.
#[derive(Debug, Deserialize)]
pub struct RenderResponse {
    pub html: String,
}

/// Renders Markdown through the GitLab API.
///
/// Holds a pooled HTTP client with the configured timeout; cloning is cheap.
#[derive(Clone)]
pub struct GitLabRenderer {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    project: Option<String>,
}

impl GitLabRenderer {
    /// Build a renderer from the server configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("markdown-server/", env!("CARGO_PKG_VERSION")))
            .timeout(config.render_timeout())
            .build()?;

        let endpoint = config
            .gitlab_server()
            .join(MARKDOWN_API_PATH)
            .map_err(|source| ConfigError::InvalidServer {
                value: config.gitlab_server().to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            token: config.api_token().to_string(),
            project: config.gitlab_project().map(str::to_string),
        })
    }

    /// The full URL rendering requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Describe a transport failure without echoing request headers.
fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    }
}

#[async_trait]
impl MarkdownRenderer for GitLabRenderer {
    async fn render(&self, markdown: &[u8]) -> RenderResult {
        let text = String::from_utf8_lossy(markdown);
        let body = RenderRequest {
            text: &text,
            gfm: true,
            project: self.project.as_deref(),
        };

        debug!(endpoint = %self.endpoint, bytes = markdown.len(), "Rendering markdown");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::Unreachable(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Rejected {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Unreachable(describe_transport_error(&e)))?;
        if bytes.is_empty() {
            return Err(RenderError::Malformed("empty response body".to_string()));
        }

        let parsed: RenderResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RenderError::Malformed(format!("invalid JSON: {}", e)))?;

        Ok(RenderedHtml(parsed.html))
    }
}

// =============================================================================
// Tests
// =============================================================================
