//! Markdown Server - serve a directory, rendering Markdown through GitLab.
//!
//! This binary parses the CLI, fetches GitLab assets and starts the HTTP server.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markdown_server::{
    assets::download_assets,
    config::{Config, ServerConfig},
    server::{create_router, AppState, PageShell, RouterConfig},
    GitLabRenderer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Config::parse();
    init_logging(cli.verbose);

    let no_assets = cli.no_assets;
    let no_tracing = cli.no_tracing;

    let config = match cli.into_server_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Serving: {}", config.root_directory().display());
    info!("  GitLab server: {}", config.gitlab_server());
    if let Some(project) = config.gitlab_project() {
        info!("  GitLab project: {}", project);
    }
    info!("  Render timeout: {}s", config.render_timeout().as_secs());

    let renderer = match GitLabRenderer::from_config(&config) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to create rendering client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shell = if no_assets {
        PageShell::bare()
    } else {
        fetch_assets(&config).await;
        PageShell::gitlab()
    };

    let router_config = RouterConfig::new()
        .with_assets(!no_assets)
        .with_tracing(!no_tracing);

    let addr = config.bind_address();
    let state = AppState::new(config, renderer).with_shell(shell);
    let router = create_router(state, router_config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Markdown Server started at http://{}", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Markdown Server stopped");
    ExitCode::SUCCESS
}

/// Download GitLab assets into the cache directory. Failures only degrade styling.
async fn fetch_assets(config: &ServerConfig) {
    info!("Downloading GitLab asset files");

    let client = match reqwest::Client::builder()
        .timeout(config.render_timeout())
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Skipping asset download: {}", e);
            return;
        }
    };

    match download_assets(&client, config.gitlab_server(), config.cache_dir()).await {
        Ok(report) => {
            info!(
                "  Assets: {} downloaded, {} cached, {} failed",
                report.downloaded, report.cached, report.failed
            );
        }
        Err(e) => warn!("Asset cache unavailable: {}", e),
    }
}

/// Resolve when Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "markdown_server=debug,tower_http=debug"
    } else {
        "markdown_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
