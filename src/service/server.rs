use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::api::{self, AppState, SharedState};
use super::devin::{DEFAULT_DEVIN_API_URL, DEFAULT_DEVIN_APP_URL, DevinClient};
use super::dispatcher::Dispatcher;
use super::github::{DEFAULT_GITHUB_API_URL, GitHubClient};
use super::registry::SessionRegistry;
use crate::config::PilotConfig;

/// Configuration for the backend server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
    pub cors_permissive: bool,
    pub github_api_url: String,
    pub devin_api_url: String,
    pub devin_app_url: String,
    pub http_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            dev_mode: false,
            cors_permissive: true,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            devin_api_url: DEFAULT_DEVIN_API_URL.to_string(),
            devin_app_url: DEFAULT_DEVIN_APP_URL.to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&PilotConfig> for ServerConfig {
    fn from(config: &PilotConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            dev_mode: config.server.dev_mode,
            cors_permissive: config.server.cors_permissive,
            github_api_url: config.upstream.github_api_url.clone(),
            devin_api_url: config.upstream.devin_api_url.clone(),
            devin_app_url: config.upstream.devin_app_url.clone(),
            http_timeout: config.http_timeout(),
        }
    }
}

impl ServerConfig {
    /// Dev mode listens on every interface.
    pub fn bind_address(&self) -> String {
        let host = if self.dev_mode { "0.0.0.0" } else { self.host.as_str() };
        format!("{}:{}", host, self.port)
    }
}

/// Wire the real GitHub and Devin clients into a fresh registry.
pub fn build_state(config: &ServerConfig) -> Result<SharedState> {
    let issues = GitHubClient::new(&config.github_api_url, config.http_timeout)?;
    let agent = DevinClient::new(&config.devin_api_url, &config.devin_app_url, config.http_timeout)?;
    let dispatcher = Dispatcher::new(
        Arc::new(issues),
        Arc::new(agent),
        Arc::new(SessionRegistry::new()),
    );
    Ok(Arc::new(AppState { dispatcher }))
}

/// Build the full application router with request tracing and optional CORS.
pub fn build_router(state: SharedState, cors_permissive: bool) -> Router {
    let mut app = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Start the backend server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = build_state(&config).context("Failed to initialize upstream clients")?;
    let app = build_router(state, config.cors_permissive);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, dev_mode = config.dev_mode, "server listening");
    println!("issue-pilot backend running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler, running until killed");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
