use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{build_client, ensure_success, read_json, send};
use super::models::{Credential, RepoSlug};
use crate::errors::{DispatchResult, Upstream};

pub const DEFAULT_DEVIN_API_URL: &str = "https://api.devin.ai";
pub const DEFAULT_DEVIN_APP_URL: &str = "https://app.devin.ai";

/// Body of `POST /v1/sessions`.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub prompt: &'a str,
    pub repo_path_or_url: String,
}

/// Response of `POST /v1/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// One entry of a session's message log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevinMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /v1/sessions/{id}` (fields we use).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionDetails {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_enum: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub messages: Vec<DevinMessage>,
}

impl SessionDetails {
    /// The machine-readable status, preferring `status_enum`.
    pub fn raw_status(&self) -> Option<&str> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }
        present(&self.status_enum).or_else(|| present(&self.status))
    }

    /// Text of every message Devin itself wrote, joined by newlines.
    pub fn devin_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.kind == "devin_message")
            .map(|m| m.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn latest_devin_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.kind == "devin_message" && !m.message.trim().is_empty())
            .map(|m| m.message.as_str())
    }
}

/// The agent service. Real implementation: `DevinClient`. Tests use fakes.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_session(&self, prompt: &str, repo: &RepoSlug, key: &Credential) -> DispatchResult<CreatedSession>;

    /// Post a follow-up message into an existing session.
    async fn send_message(&self, session_id: &str, message: &str, key: &Credential) -> DispatchResult<()>;

    async fn get_session(&self, session_id: &str, key: &Credential) -> DispatchResult<SessionDetails>;

    /// Human-facing link to a session.
    fn session_url(&self, session_id: &str) -> String;
}

/// Devin REST client authenticated per call with a caller-supplied key.
pub struct DevinClient {
    http: reqwest::Client,
    api_url: String,
    app_url: String,
}

impl DevinClient {
    pub fn new(
        api_url: impl Into<String>,
        app_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            app_url: app_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.api_url, path)
    }
}

#[async_trait]
impl AgentService for DevinClient {
    async fn create_session(&self, prompt: &str, repo: &RepoSlug, key: &Credential) -> DispatchResult<CreatedSession> {
        let body = CreateSessionRequest {
            prompt,
            repo_path_or_url: repo.github_url(),
        };
        let request = self
            .http
            .post(self.url("/sessions"))
            .header("Authorization", key.bearer())
            .json(&body);
        let resp = send(Upstream::Devin, request).await?;
        read_json(Upstream::Devin, resp).await
    }

    async fn send_message(&self, session_id: &str, message: &str, key: &Credential) -> DispatchResult<()> {
        let request = self
            .http
            .post(self.url(&format!("/sessions/{}/message", session_id)))
            .header("Authorization", key.bearer())
            .json(&serde_json::json!({ "message": message }));
        let resp = send(Upstream::Devin, request).await?;
        ensure_success(Upstream::Devin, resp).await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str, key: &Credential) -> DispatchResult<SessionDetails> {
        let request = self
            .http
            .get(self.url(&format!("/sessions/{}", session_id)))
            .header("Authorization", key.bearer());
        let resp = send(Upstream::Devin, request).await?;
        read_json(Upstream::Devin, resp).await
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.app_url, session_id)
    }
}
