//! GitLab stylesheet, font and icon assets.
//!
//! Rendered Markdown uses GitLab's own CSS classes. At startup the assets are
//! downloaded once from `{gitlab_server}/assets/<name>` into the cache
//! directory and then served locally under `/_gitlab_assets/`, so browsing
//! does not depend on the GitLab server beyond the rendering calls.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;

use crate::error::AssetError;

/// URL prefix (and cache subdirectory) for the downloaded assets.
pub const ASSETS_DIR: &str = "_gitlab_assets";

/// File name of the favicon inside the cache directory.
pub const FAVICON_FILE: &str = "favicon.svg";

/// Stylesheets linked from every rendered page.
pub const CSS_ASSETS: &[&str] = &[
    "application-f6b592d2e7570ce5d28f3dbf7170c0b3aa19dcb951f8c9e9ebe6cd5ec44691e8.css",
    "application_utilities-6773fc1499bcdafb1e7241a3b30e1b2f36085ea9e3d80797bab0e321decce6fa.css",
    "fonts-6abb7a7d0ae407e52928fa44bea1731b9df55dabf1099c1eb5c621c0bc1ae7cf.css",
    "highlight/themes/white-73664f1dda219554f74bc7ed1516f1dbd8a89a7095af456e3738626734a5da12.css",
    "page_bundles/tree-84ff27d40d7ca999fb0db1276a53fac19fdb1290e05b4bae9d5c1baf485252b0.css",
];

/// Fonts preloaded by every rendered page.
pub const FONT_ASSETS: &[&str] = &[
    "gitlab-sans/GitLabSans-9757b224a485f1403ce9f30978395b27d5a330e1f0d0c527fff9c602938eac87.woff2",
    "jetbrains-mono/JetBrainsMono-4169743728db99dd64f52ea045e42a18343f69dfb695a29573cf6a7006da4f30.woff2",
    "jetbrains-mono/JetBrainsMono-Bold-3b11c8d04a8803f99c188a1def6c6ec2566d26c7e7eec8f07e8fac87e8bc67c0.woff2",
    "jetbrains-mono/JetBrainsMono-Italic-0418e064ec340b09a1249d3299fb4ea5b252288250e54cbe9583f1f6b2c49abc.woff2",
    "jetbrains-mono/JetBrainsMono-BoldItalic-c4e50fc8fe8c8b5079f7cde7ea1e00e3869750a5ec41414ffa938d5eea2c6f9b.woff2",
];

/// Icons referenced from the stylesheets.
pub const OTHER_ASSETS: &[&str] = &[
    "icon_anchor-297aa9b0225eff3d6d0da74ce042a0ed5575b92aa66b7109a5e060a795b42e36.svg",
    "icons-stacked-34c49d72f3e92e94fff37432f8d93779d166d6f184dfc15fce7fbfd2580e2de8.svg",
    "illustrations/image_comment_light_cursor-c587347a929a56f8b4d78d991607598f69daef0bcc58e972cabcb72ed96663d2.svg",
];

/// "M" with a down arrow, cut out of a rounded square.
pub const FAVICON_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="208" height="128" viewBox="0 0 208 128">"#,
    r#"<mask id="mask"><rect style="fill:#fff" width="100%" height="100%" />"#,
    r#"<path d="m 30,98 0,-68 20,0 20,25 20,-25 20,0 0,68 -20,0 0,-39 -20,25 -20,-25 0,39 z" />"#,
    r#"<path d="m 155,98 -30,-33 20,0 0,-35 20,0 0,35 20,0 z" /></mask>"#,
    r#"<rect width="100%" height="100%" ry="15" mask="url(#mask)" /></svg>"#,
);

/// Every asset name, in download order.
pub fn all_assets() -> impl Iterator<Item = &'static str> {
    CSS_ASSETS
        .iter()
        .chain(FONT_ASSETS.iter())
        .chain(OTHER_ASSETS.iter())
        .copied()
}

/// Local path of an asset inside the cache directory.
pub fn asset_path(cache_dir: &Path, asset: &str) -> PathBuf {
    cache_dir.join(ASSETS_DIR).join(asset)
}

/// Summary of one download pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Download missing assets into the cache directory and write the favicon.
///
/// Individual download failures are logged and counted, not fatal: pages
/// still render, only less faithfully styled.
pub async fn download_assets(
    client: &reqwest::Client,
    gitlab_server: &Url,
    cache_dir: &Path,
) -> Result<AssetReport, AssetError> {
    let mut report = AssetReport::default();

    for asset in all_assets() {
        let path = asset_path(cache_dir, asset);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(asset, "Asset already cached");
            report.cached += 1;
            continue;
        }

        match fetch_asset(client, gitlab_server, asset, &path).await {
            Ok(()) => {
                info!("Wrote GitLab asset file to {}", path.display());
                report.downloaded += 1;
            }
            Err(e) => {
                warn!("{}", e);
                report.failed += 1;
            }
        }
    }

    write_favicon(cache_dir).await?;
    Ok(report)
}

/// Fetch one asset and store it atomically at `path`.
async fn fetch_asset(
    client: &reqwest::Client,
    gitlab_server: &Url,
    asset: &str,
    path: &Path,
) -> Result<(), AssetError> {
    let url = gitlab_server
        .join(&format!("assets/{}", asset))
        .map_err(|e| AssetError::Download {
            url: asset.to_string(),
            message: e.to_string(),
        })?;

    let download_error = |message: String| AssetError::Download {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| download_error(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_error(format!("status {}", status.as_u16())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    write_file(path, &bytes).await
}

/// Write the favicon served at `/favicon.svg`.
pub async fn write_favicon(cache_dir: &Path) -> Result<(), AssetError> {
    write_file(&cache_dir.join(FAVICON_FILE), FAVICON_SVG.as_bytes()).await
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), AssetError> {
    let write_error = |source| AssetError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    // Rename into place so an interrupted download never looks cached.
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, contents)
        .await
        .map_err(write_error)?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(write_error)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
