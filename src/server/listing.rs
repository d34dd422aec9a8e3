//! Directory listings.
//!
//! Lists the entries physically present in a directory. Entries whose
//! canonical target lies outside the served root (symlinks pointing out of the
//! tree) and dangling symlinks are left out entirely.

use std::path::Path;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::page::{html_escape, HTML_CONTENT_TYPE};
use crate::resolver::contained_canonical;

/// One visible entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingEntry {
    /// Name shown to the user: `@` marks symlinks, `/` marks directories.
    pub fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Percent-encoded link target, relative to the listed directory.
    pub fn href(&self) -> String {
        let encoded = urlencoding::encode(&self.name);
        if self.is_dir {
            format!("{}/", encoded)
        } else {
            encoded.into_owned()
        }
    }
}

/// Read the entries of `dir` that stay within `root`, sorted by name.
///
/// `dir` and `root` must both be canonical.
pub async fn read_listing(dir: &Path, root: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let file_type = entry.file_type().await?;

        let is_symlink = file_type.is_symlink();
        let is_dir = if is_symlink {
            let Some(target) = contained_canonical(&entry.path(), root).await else {
                continue;
            };
            tokio::fs::metadata(&target)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
        } else {
            file_type.is_dir()
        };

        entries.push(ListingEntry {
            name,
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(entries)
}

/// Render a listing page for the directory at `relative_path`.
pub fn listing_page(relative_path: &str, entries: &[ListingEntry]) -> String {
    let display_path = if relative_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", relative_path)
    };
    let title = format!("Directory listing for {}", html_escape(&display_path));

    let mut items = String::new();
    for entry in entries {
        items.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            html_escape(&entry.href()),
            html_escape(&entry.display_name())
        ));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <hr>\n\
         <ul>\n\
         {items}\
         </ul>\n\
         <hr>\n\
         </body>\n\
         </html>\n"
    )
}

/// Wrap a listing page in an HTTP response.
pub fn listing_response(relative_path: &str, entries: &[ListingEntry]) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
        listing_page(relative_path, entries),
    )
        .into_response()
}
