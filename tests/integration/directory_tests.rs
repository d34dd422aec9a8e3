//! Directory and static file tests.
//!
//! Tests verify:
//! - Directory listings enumerate only entries inside the root
//! - Directories without a trailing slash are redirected
//! - Index files replace the listing
//! - Other files are streamed unchanged with a guessed content type

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{body_bytes, body_string, get, Fixture, MockRenderer};

#[tokio::test]
async fn test_root_listing() {
    let fixture = Fixture::new();
    let renderer = MockRenderer::html("<p>x</p>");
    let router = fixture.router(renderer.clone());

    let response = get(&router, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );

    let body = body_string(response).await;
    assert!(body.contains("Directory listing for /"));
    assert!(body.contains("<a href=\"README.md\">README.md</a>"));
    assert!(body.contains("<a href=\"docs/\">docs/</a>"));
    assert_eq!(renderer.call_count(), 0);
}

#[tokio::test]
async fn test_nested_listing() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let body = body_string(get(&router, "/docs/").await).await;
    assert!(body.contains("Directory listing for /docs/"));
    assert!(body.contains("guide.MD"));
    assert!(body.contains("notes.txt"));
    assert!(body.contains("sub/"));
    assert!(!body.contains("README.md"));
}

#[tokio::test]
async fn test_directory_without_slash_redirects() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/docs?view=1").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/docs/?view=1"
    );
}

#[tokio::test]
async fn test_redirect_stays_on_this_host() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.root.join("evil.example")).unwrap();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "//evil.example").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/evil.example/"
    );
}

#[tokio::test]
async fn test_index_html_replaces_listing() {
    let fixture = Fixture::new();
    fixture.write("site/index.html", "<h1>Index</h1>");
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/site/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(body_string(response).await, "<h1>Index</h1>");
}

#[tokio::test]
async fn test_other_file_is_served_raw() {
    let fixture = Fixture::new();
    let renderer = MockRenderer::html("<p>x</p>");
    let router = fixture.router(renderer.clone());

    let response = get(&router, "/docs/notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(body_bytes(response).await, b"plain notes");
    assert_eq!(renderer.call_count(), 0);
}

#[tokio::test]
async fn test_binary_file_bytes_are_unchanged() {
    let fixture = Fixture::new();
    let bytes: Vec<u8> = (0..=255u8).collect();
    std::fs::write(fixture.root.join("blob.bin"), &bytes).unwrap();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/blob.bin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, bytes);
}

#[tokio::test]
async fn test_range_request_is_honoured() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let request = Request::builder()
        .uri("/docs/notes.txt")
        .header(header::RANGE, "bytes=0-4")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"plain");
}

#[tokio::test]
async fn test_file_with_trailing_slash_is_not_found() {
    let fixture = Fixture::new();
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/docs/notes.txt/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_listing_omits_escaping_symlinks() {
    let fixture = Fixture::new();
    fixture.symlink(&fixture.outside, "escape");
    fixture.symlink(&fixture.outside.join("secret.md"), "leak.md");
    fixture.symlink(&fixture.root.join("docs"), "alias");
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let body = body_string(get(&router, "/").await).await;
    assert!(!body.contains("escape"));
    assert!(!body.contains("leak.md"));
    assert!(body.contains("<a href=\"alias/\">alias@</a>"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_index_symlink_outside_root_is_ignored() {
    let fixture = Fixture::new();
    std::fs::write(fixture.outside.join("index.html"), "TOP SECRET").unwrap();
    std::fs::create_dir_all(fixture.root.join("site")).unwrap();
    fixture.symlink(&fixture.outside.join("index.html"), "site/index.html");
    let router = fixture.router(MockRenderer::html("<p>x</p>"));

    let response = get(&router, "/site/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Directory listing for /site/"));
    assert!(!body.contains("TOP SECRET"));
}
