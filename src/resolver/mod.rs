//! Request path resolution.
//!
//! Maps the path of an incoming request to a filesystem location confined to
//! the served root:
//!
//! ```text
//! "/docs/%2E%2E/notes/README.md"
//!        │  percent-decode, collapse "." and ".."
//!        ▼
//! "notes/README.md"
//!        │  join to root, canonicalize (follows every symlink)
//!        ▼
//! "/srv/root/notes/README.md"
//!        │  containment check on the canonical path
//!        ▼
//! TargetKind::MarkdownFile
//! ```
//!
//! Containment is checked after symlink resolution. A symlink inside the tree
//! that points outside it resolves to [`Miss::Escaped`], which callers answer
//! exactly like a missing file.

use std::path::{Component, Path, PathBuf};

/// Name suffix (compared case-insensitively) that marks a file for rendering.
pub const MARKDOWN_SUFFIX: &str = ".md";

/// Why a request resolved to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// Nothing exists at the path, or the path could not be decoded
    Missing,
    /// The path exists but its canonical form lies outside the served root
    Escaped,
}

/// Classification of a resolved request.
///
/// Variants other than `NotFound` carry the canonical, symlink-free path,
/// which is always a descendant of (or equal to) the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    Directory(PathBuf),
    MarkdownFile(PathBuf),
    OtherFile(PathBuf),
    NotFound(Miss),
}

/// Result of resolving one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Normalized path relative to the root, `/`-separated, no leading slash
    pub relative_path: String,

    /// What the path points at
    pub kind: TargetKind,
}

impl ResolvedTarget {
    /// Canonical filesystem path, if the target was found inside the root.
    pub fn absolute_path(&self) -> Option<&Path> {
        match &self.kind {
            TargetKind::Directory(path)
            | TargetKind::MarkdownFile(path)
            | TargetKind::OtherFile(path) => Some(path),
            TargetKind::NotFound(_) => None,
        }
    }

    /// Last segment of the relative path, or an empty string for the root.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    fn not_found(relative_path: String, miss: Miss) -> Self {
        Self {
            relative_path,
            kind: TargetKind::NotFound(miss),
        }
    }
}

/// A request path after decoding and dot-segment removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    /// Segments joined with `/`, empty for the root
    pub relative: String,

    /// Whether the request ended in `/`
    pub trailing_slash: bool,
}

/// Percent-decode a request path and collapse `.` and `..` segments.
///
/// `..` never climbs above the root; extra ones are dropped. Returns `None`
/// for paths that are not valid UTF-8 after decoding, contain NUL bytes, or
/// contain segments the platform would interpret as anything other than a
/// plain file name.
pub fn normalize_request_path(raw: &str) -> Option<NormalizedPath> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => {
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(name),
                    _ => return None,
                }
            }
        }
    }

    Some(NormalizedPath {
        relative: segments.join("/"),
        trailing_slash: decoded.len() > 1 && decoded.ends_with('/'),
    })
}

/// Whether a file name ends in `.md`, ignoring case. A bare `.md` counts.
pub fn is_markdown_name(name: &str) -> bool {
    let suffix = MARKDOWN_SUFFIX.as_bytes();
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Canonicalize `path` and return it only if it stays inside `root`.
///
/// `root` must already be canonical.
pub async fn contained_canonical(path: &Path, root: &Path) -> Option<PathBuf> {
    let canonical = tokio::fs::canonicalize(path).await.ok()?;
    canonical.starts_with(root).then_some(canonical)
}

/// Resolve a request path against the canonical served root.
///
/// Only filesystem stat and readlink calls are made.
pub async fn resolve(request_path: &str, root: &Path) -> ResolvedTarget {
    let Some(normalized) = normalize_request_path(request_path) else {
        return ResolvedTarget::not_found(String::new(), Miss::Missing);
    };
    let relative_path = normalized.relative;

    let joined = root.join(&relative_path);
    let canonical = match tokio::fs::canonicalize(&joined).await {
        Ok(path) => path,
        Err(_) => return ResolvedTarget::not_found(relative_path, Miss::Missing),
    };

    if !canonical.starts_with(root) {
        return ResolvedTarget::not_found(relative_path, Miss::Escaped);
    }

    let metadata = match tokio::fs::metadata(&canonical).await {
        Ok(metadata) => metadata,
        Err(_) => return ResolvedTarget::not_found(relative_path, Miss::Missing),
    };

    let kind = if metadata.is_dir() {
        TargetKind::Directory(canonical)
    } else if normalized.trailing_slash {
        // "file.md/" names nothing
        TargetKind::NotFound(Miss::Missing)
    } else if is_markdown_name(&relative_path) {
        TargetKind::MarkdownFile(canonical)
    } else {
        TargetKind::OtherFile(canonical)
    };

    ResolvedTarget {
        relative_path,
        kind,
    }
}

// =============================================================================
// Tests
// =============================================================================
