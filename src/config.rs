//! Configuration management for Markdown Server.
//!
//! Startup options come from command-line arguments via clap, with
//! environment-variable fallbacks. They are validated once and turned into an
//! immutable [`ServerConfig`] that every request handler borrows.
//!
//! # Environment Variables
//!
//! - `MDSERVE_BIND` - Address to bind to (default: 127.0.0.1)
//! - `MDSERVE_PORT` - Port to listen on (default: 9000)
//! - `MDSERVE_DIRECTORY` - Directory to serve (default: .)
//! - `MDSERVE_GITLAB_SERVER` - GitLab host or base URL (default: https://gitlab.com)
//! - `MDSERVE_GITLAB_TOKEN_FILE` - File containing the GitLab API token
//! - `GITLAB_TOKEN` - The GitLab API token itself, used when no token file is given
//! - `MDSERVE_GITLAB_PROJECT` - Project used as reference context (group/project)
//! - `MDSERVE_RENDER_TIMEOUT` - Rendering call timeout in seconds (default: 10)
//! - `MDSERVE_CACHE_DIR` - Where GitLab assets are cached
//! - `NETRC` - netrc file consulted when no token is given (default: ~/.netrc)

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use netrc_rs::Netrc;
use url::Url;

use crate::error::ConfigError;

// =============================================================================
// Default Values
// =============================================================================

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default GitLab server.
pub const DEFAULT_GITLAB_SERVER: &str = "https://gitlab.com";

/// Default timeout for a single rendering call, in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// Upper bound accepted for the rendering timeout, in seconds.
pub const MAX_RENDER_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Markdown Server - serve a directory, rendering Markdown through GitLab.
///
/// Files ending in `.md` are sent to the GitLab Markdown API and returned as
/// HTML. Everything else is served as-is.
#[derive(Parser, Debug, Clone)]
#[command(name = "markdown-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind to.
    #[arg(short, long, default_value = DEFAULT_BIND, env = "MDSERVE_BIND")]
    pub bind: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MDSERVE_PORT")]
    pub port: u16,

    /// Directory to serve from.
    #[arg(short, long, default_value = ".", env = "MDSERVE_DIRECTORY")]
    pub directory: PathBuf,

    /// GitLab server host name or base URL.
    #[arg(long, default_value = DEFAULT_GITLAB_SERVER, env = "MDSERVE_GITLAB_SERVER")]
    pub gitlab_server: String,

    /// File containing the GitLab API token.
    #[arg(long, env = "MDSERVE_GITLAB_TOKEN_FILE")]
    pub gitlab_token_file: Option<PathBuf>,

    /// GitLab API token. Prefer the token file; this is read from GITLAB_TOKEN.
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true, hide = true)]
    pub gitlab_token: Option<String>,

    /// GitLab project used as context when creating references (group/project).
    #[arg(long, env = "MDSERVE_GITLAB_PROJECT")]
    pub gitlab_project: Option<String>,

    /// Timeout for each rendering call, in seconds.
    #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_SECS, env = "MDSERVE_RENDER_TIMEOUT")]
    pub render_timeout: u64,

    /// Directory where GitLab assets are cached.
    #[arg(long, env = "MDSERVE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Skip downloading GitLab stylesheets and fonts at startup.
    #[arg(long, default_value_t = false)]
    pub no_assets: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate options that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_timeout == 0 || self.render_timeout > MAX_RENDER_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "render_timeout must be between 1 and {} seconds",
                MAX_RENDER_TIMEOUT_SECS
            )));
        }
        parse_gitlab_server(&self.gitlab_server)?;
        Ok(())
    }

    /// Resolve the API token: token file, then `GITLAB_TOKEN`, then netrc.
    pub fn load_token(&self) -> Result<String, ConfigError> {
        self.load_token_with_netrc(netrc_path().as_deref())
    }

    /// Resolve the API token, consulting the given netrc file last.
    pub fn load_token_with_netrc(&self, netrc: Option<&Path>) -> Result<String, ConfigError> {
        let token = match (&self.gitlab_token_file, &self.gitlab_token) {
            (Some(path), _) => {
                std::fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
                    path: path.clone(),
                    source,
                })?
            }
            (None, Some(token)) if !token.is_empty() => token.clone(),
            (None, _) => {
                let server = parse_gitlab_server(&self.gitlab_server)?;
                let host = server.host_str().unwrap_or_default();
                netrc
                    .and_then(|path| netrc_password(path, host))
                    .ok_or(ConfigError::MissingToken)?
            }
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        Ok(token.to_string())
    }

    /// Validate everything and build the immutable runtime configuration.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        self.validate()?;
        let token = self.load_token()?;
        let gitlab_server = parse_gitlab_server(&self.gitlab_server)?;

        let config = ServerConfig::new(&self.directory, token)?
            .with_bind(self.bind, self.port)
            .with_gitlab_server(gitlab_server)
            .with_render_timeout(Duration::from_secs(self.render_timeout))
            .with_cache_dir(self.cache_dir.unwrap_or_else(default_cache_dir));

        Ok(match self.gitlab_project {
            Some(project) if !project.is_empty() => config.with_project(project),
            _ => config,
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Immutable configuration shared by every request handler.
///
/// `root_directory` is canonical and known to be a directory.
#[derive(Clone)]
pub struct ServerConfig {
    root_directory: PathBuf,
    bind_host: String,
    port: u16,
    api_token: String,
    gitlab_server: Url,
    gitlab_project: Option<String>,
    render_timeout: Duration,
    cache_dir: PathBuf,
}

impl ServerConfig {
    /// Create a configuration serving `root` with the given API token.
    ///
    /// The root is canonicalised here so later containment checks compare
    /// symlink-free paths. Other settings take their defaults.
    pub fn new(root: impl AsRef<Path>, api_token: impl Into<String>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let root_directory =
            std::fs::canonicalize(root).map_err(|source| ConfigError::RootUnavailable {
                path: root.to_path_buf(),
                source,
            })?;
        if !root_directory.is_dir() {
            return Err(ConfigError::RootNotDirectory(root.to_path_buf()));
        }

        Ok(Self {
            root_directory,
            bind_host: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            api_token: api_token.into(),
            gitlab_server: parse_gitlab_server(DEFAULT_GITLAB_SERVER)?,
            gitlab_project: None,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            cache_dir: default_cache_dir(),
        })
    }

    /// Set the bind host and port.
    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.bind_host = host.into();
        self.port = port;
        self
    }

    /// Set the GitLab base URL used for rendering and assets.
    pub fn with_gitlab_server(mut self, server: Url) -> Self {
        self.gitlab_server = server;
        self
    }

    /// Set the project passed as rendering context.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.gitlab_project = Some(project.into());
        self
    }

    /// Set the timeout applied to each rendering call.
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Set the asset cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn bind_host(&self) -> &str {
        &self.bind_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn gitlab_server(&self) -> &Url {
        &self.gitlab_server
    }

    pub fn gitlab_project(&self) -> Option<&str> {
        self.gitlab_project.as_deref()
    }

    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("root_directory", &self.root_directory)
            .field("bind_host", &self.bind_host)
            .field("port", &self.port)
            .field("api_token", &"<redacted>")
            .field("gitlab_server", &self.gitlab_server.as_str())
            .field("gitlab_project", &self.gitlab_project)
            .field("render_timeout", &self.render_timeout)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

/// Location of the user's netrc file: `$NETRC`, then `$HOME/.netrc`.
pub fn netrc_path() -> Option<PathBuf> {
    netrc_path_from(std::env::var_os("NETRC"), std::env::var_os("HOME"))
}

fn netrc_path_from(netrc: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    match netrc {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => home
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".netrc")),
    }
}

/// Password stored for `host` in a netrc file, falling back to its
/// `default` entry.
///
/// A missing or unparsable file is treated as having no entry.
pub fn netrc_password(path: &Path, host: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let netrc = match Netrc::parse(content, false) {
        Ok(netrc) => netrc,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = ?e, "Ignoring unparsable netrc file");
            return None;
        }
    };

    netrc
        .machines
        .iter()
        .find(|machine| machine.name.as_deref() == Some(host))
        .or_else(|| netrc.machines.iter().find(|machine| machine.name.is_none()))
        .and_then(|machine| machine.password.clone())
}

/// Parse a GitLab host name or URL into a base URL ending in `/`.
///
/// A bare host such as `gitlab.example.com` is promoted to HTTPS.
pub fn parse_gitlab_server(value: &str) -> Result<Url, ConfigError> {
    let value = value.trim();
    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("https://{}", value)
    };

    let mut url = Url::parse(&candidate).map_err(|source| ConfigError::InvalidServer {
        value: value.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `$XDG_CACHE_HOME/markdown_server`, falling back to `~/.cache/markdown_server`.
pub fn default_cache_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("markdown_server")
}

// =============================================================================
// Tests
// =============================================================================
