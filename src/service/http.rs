use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::errors::{DispatchError, DispatchResult, Upstream};

/// User-Agent sent on every outbound request (GitHub rejects requests without one).
pub const USER_AGENT: &str = concat!("issue-pilot/", env!("CARGO_PKG_VERSION"));

/// Build the shared outbound client with the configured timeout.
pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request, classifying transport failures.
pub async fn send(service: Upstream, request: reqwest::RequestBuilder) -> DispatchResult<reqwest::Response> {
    request
        .send()
        .await
        .map_err(|e| DispatchError::from_transport(service, e))
}

/// Turn a non-success response into the matching `DispatchError`, using the
/// upstream's own error message as the detail when it provides one.
pub async fn ensure_success(service: Upstream, resp: reqwest::Response) -> DispatchResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DispatchError::from_status(
        service,
        status.as_u16(),
        error_detail(&body, status),
    ))
}

/// Check the status and decode a JSON body.
pub async fn read_json<T: DeserializeOwned>(service: Upstream, resp: reqwest::Response) -> DispatchResult<T> {
    ensure_success(service, resp)
        .await?
        .json::<T>()
        .await
        .map_err(|e| DispatchError::from_transport(service, e))
}

/// Pull a readable message out of an error body. GitHub and Devin use
/// `message`, FastAPI-style services use `detail`, this backend uses `error`.
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        ["message", "detail", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });
    match field {
        Some(msg) => msg,
        None if !body.trim().is_empty() => body.trim().chars().take(200).collect(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}
