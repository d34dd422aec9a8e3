use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single call to the remote rendering endpoint.
///
/// None of the messages carry the API token.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Connection refused, DNS failure, or timeout
    #[error("Rendering service unreachable: {0}")]
    Unreachable(String),

    /// The rendering service answered with a non-2xx status
    #[error("Rendering service rejected the request with status {status}")]
    Rejected { status: u16 },

    /// 2xx response without a usable `html` payload
    #[error("Rendering service returned a malformed response: {0}")]
    Malformed(String),
}

impl RenderError {
    /// Short identifier used in logs and error pages.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Unreachable(_) => "render_unreachable",
            RenderError::Rejected { .. } => "render_rejected",
            RenderError::Malformed(_) => "render_malformed",
        }
    }
}

/// Per-request failures of the dispatcher.
///
/// Every variant resolves to an HTTP response; none is fatal to the server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The request resolved outside the served root after symlink resolution
    #[error("Path escapes the served root: {request_path}")]
    PathEscape { request_path: String },

    /// Nothing exists at the requested path
    #[error("Not found: {request_path}")]
    NotFound { request_path: String },

    /// The rendering service failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The target was classified but could not be read afterwards
    #[error("Failed to read {relative_path}: {source}")]
    FilesystemRead {
        relative_path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building the server configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The served root does not exist or cannot be canonicalised
    #[error("Cannot serve {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The served root exists but is not a directory
    #[error("Cannot serve {0}: not a directory")]
    RootNotDirectory(PathBuf),

    /// No token file, GITLAB_TOKEN or netrc entry was found
    #[error("No GitLab API token provided. Set --gitlab-token-file, GITLAB_TOKEN or a netrc entry")]
    MissingToken,

    /// The token source was present but empty
    #[error("GitLab API token is empty")]
    EmptyToken,

    /// The token file could not be read
    #[error("Failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The GitLab server could not be parsed as a URL
    #[error("Invalid GitLab server '{value}': {source}")]
    InvalidServer {
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// A numeric option is outside its accepted range
    #[error("{0}")]
    Invalid(String),

    /// The outbound HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors raised while fetching GitLab stylesheet and font assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// HTTP failure talking to the GitLab server
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// Local cache directory could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
