//! Asset route tests.
//!
//! Tests verify:
//! - Cached GitLab assets and the favicon are served from the cache directory
//! - Asset routes are absent when disabled
//! - Every response carries the `Server` header

use std::fs;

use axum::http::{header, StatusCode};

use markdown_server::assets::{asset_path, write_favicon, CSS_ASSETS, FAVICON_SVG};
use markdown_server::server::SERVER_HEADER;
use markdown_server::{create_router, AppState, PageShell, RouterConfig};

use super::test_utils::{body_string, get, Fixture, MockRenderer};

#[tokio::test]
async fn test_cached_asset_is_served() {
    let fixture = Fixture::new();
    let css = asset_path(&fixture.cache, CSS_ASSETS[0]);
    fs::create_dir_all(css.parent().unwrap()).unwrap();
    fs::write(&css, "body { color: black; }").unwrap();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, &format!("/_gitlab_assets/{}", CSS_ASSETS[0])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    assert_eq!(body_string(response).await, "body { color: black; }");
}

#[tokio::test]
async fn test_favicon_is_served() {
    let fixture = Fixture::new();
    write_favicon(&fixture.cache).await.unwrap();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/favicon.svg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, FAVICON_SVG);
}

#[tokio::test]
async fn test_asset_routes_cannot_reach_served_root() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/_gitlab_assets/../../root/README.md").await;
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_assets_disabled_falls_through_to_root() {
    let fixture = Fixture::new();
    fixture.write("_gitlab_assets/local.css", "local");
    let state = AppState::new(fixture.config(), MockRenderer::html("<p>x</p>"))
        .with_shell(PageShell::bare());
    let router = create_router(
        state,
        RouterConfig::new().with_assets(false).with_tracing(false),
    );

    let response = get(&router, "/_gitlab_assets/local.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "local");
}

#[tokio::test]
async fn test_server_header_on_all_responses() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    for uri in ["/", "/README.md", "/nope"] {
        let response = get(&router, uri).await;
        assert_eq!(
            response.headers().get(header::SERVER).unwrap(),
            SERVER_HEADER,
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn test_gitlab_shell_links_assets() {
    let fixture = Fixture::new();
    let state = AppState::new(fixture.config(), MockRenderer::html("<p>x</p>"));
    let router = create_router(state, RouterConfig::new().with_tracing(false));

    let body = body_string(get(&router, "/README.md").await).await;
    assert!(body.contains(&format!(
        "<link rel=\"stylesheet\" href=\"/_gitlab_assets/{}\">",
        CSS_ASSETS[0]
    )));
    assert!(body.contains("<link rel=\"icon\" href=\"/favicon.svg\">"));
}
