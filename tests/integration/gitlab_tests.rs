//! End-to-end tests against a mocked GitLab Markdown API.
//!
//! The real `GitLabRenderer` is used; only the remote endpoint is faked.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use markdown_server::config::parse_gitlab_server;
use markdown_server::{create_router, AppState, GitLabRenderer, PageShell, RouterConfig};

use super::test_utils::{body_bytes, body_string, closed_port, get, mock_gitlab, Fixture, TEST_TOKEN};

fn gitlab_router(fixture: &Fixture, gitlab: SocketAddr, timeout: Duration) -> Router {
    let server = parse_gitlab_server(&format!("http://{}", gitlab)).unwrap();
    let config = fixture
        .config()
        .with_gitlab_server(server)
        .with_render_timeout(timeout);
    let renderer = GitLabRenderer::from_config(&config).unwrap();
    let state = AppState::new(config, renderer).with_shell(PageShell::bare());
    create_router(state, RouterConfig::new().with_tracing(false))
}

#[tokio::test]
async fn test_rendered_html_is_wrapped() {
    let fixture = Fixture::new();
    let gitlab = mock_gitlab(StatusCode::CREATED, r#"{"html":"<p>hi</p>"}"#).await;
    let router = gitlab_router(&fixture, gitlab, Duration::from_secs(5));

    let response = get(&router, "/README.md").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("<p>hi</p>"));
    assert!(body.contains("<div class=\"file-content md\">"));
}

#[tokio::test]
async fn test_identical_responses_are_byte_identical() {
    let fixture = Fixture::new();
    let gitlab = mock_gitlab(StatusCode::CREATED, r#"{"html":"<h1>Hello</h1>"}"#).await;
    let router = gitlab_router(&fixture, gitlab, Duration::from_secs(5));

    let first = body_bytes(get(&router, "/README.md").await).await;
    let second = body_bytes(get(&router, "/README.md").await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unauthorized_token_is_forbidden() {
    let fixture = Fixture::new();
    let gitlab = mock_gitlab(StatusCode::UNAUTHORIZED, r#"{"message":"401 Unauthorized"}"#).await;
    let router = gitlab_router(&fixture, gitlab, Duration::from_secs(5));

    let response = get(&router, "/README.md").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_string(response).await;
    assert!(!body.contains(TEST_TOKEN));
    assert!(!body.contains("401 Unauthorized"));
}

#[tokio::test]
async fn test_connection_refused_is_bad_gateway_within_timeout() {
    let fixture = Fixture::new();
    let gitlab = closed_port().await;
    let timeout = Duration::from_secs(2);
    let router = gitlab_router(&fixture, gitlab, timeout);

    let started = Instant::now();
    let response = get(&router, "/README.md").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() <= timeout + Duration::from_secs(1));
    assert!(!body_string(response).await.contains(TEST_TOKEN));
}

#[tokio::test]
async fn test_stalled_endpoint_times_out() {
    let fixture = Fixture::new();
    let stalled = Router::new().route(
        "/api/v4/markdown",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            (StatusCode::CREATED, r#"{"html":""}"#)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gitlab = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stalled).await.unwrap();
    });

    let timeout = Duration::from_millis(300);
    let router = gitlab_router(&fixture, gitlab, timeout);

    let started = Instant::now();
    let response = get(&router, "/README.md").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_stalled_render_does_not_block_other_requests() {
    let fixture = Fixture::new();
    let stalled = Router::new().route(
        "/api/v4/markdown",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            (StatusCode::CREATED, r#"{"html":""}"#)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gitlab = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stalled).await.unwrap();
    });
    let router = gitlab_router(&fixture, gitlab, Duration::from_secs(20));

    let pending = tokio::spawn({
        let router = router.clone();
        async move { get(&router, "/README.md").await.status() }
    });

    let started = Instant::now();
    let response = get(&router, "/docs/notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(5));

    pending.abort();
}

#[tokio::test]
async fn test_malformed_success_is_bad_gateway() {
    let fixture = Fixture::new();
    let gitlab = mock_gitlab(StatusCode::CREATED, r#"{"unexpected":true}"#).await;
    let router = gitlab_router(&fixture, gitlab, Duration::from_secs(5));

    let response = get(&router, "/README.md").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
