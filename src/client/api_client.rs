use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::errors::{DispatchResult, Upstream};
use crate::service::http::{build_client, read_json, send};
use crate::service::models::{Credential, Issue, RepoSlug, SessionResponse, check_session_id};

/// The backend as seen by the CLI. Real implementation: `BackendClient`.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn list_issues(&self, repo: &RepoSlug, github_token: &Credential) -> DispatchResult<Vec<Issue>>;

    async fn scope(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
    ) -> DispatchResult<SessionResponse>;

    async fn complete(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
        session_id: Option<&str>,
    ) -> DispatchResult<SessionResponse>;

    async fn session(&self, session_id: &str, devin_api_key: &Credential) -> DispatchResult<SessionResponse>;
}

/// HTTP client for the issue-pilot backend API.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn list_issues(&self, repo: &RepoSlug, github_token: &Credential) -> DispatchResult<Vec<Issue>> {
        let request = self.http.get(self.url("/api/issues")).query(&[
            ("repo", repo.as_str()),
            ("github_token", github_token.expose()),
        ]);
        let resp = send(Upstream::Backend, request).await?;
        read_json(Upstream::Backend, resp).await
    }

    async fn scope(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
    ) -> DispatchResult<SessionResponse> {
        let body = json!({
            "repo": repo,
            "issue_number": issue_number,
            "github_token": github_token,
            "devin_api_key": devin_api_key,
        });
        let request = self.http.post(self.url("/api/scope")).json(&body);
        let resp = send(Upstream::Backend, request).await?;
        read_json(Upstream::Backend, resp).await
    }

    async fn complete(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
        session_id: Option<&str>,
    ) -> DispatchResult<SessionResponse> {
        let mut body = json!({
            "repo": repo,
            "issue_number": issue_number,
            "github_token": github_token,
            "devin_api_key": devin_api_key,
        });
        if let Some(session_id) = session_id {
            body["session_id"] = json!(session_id);
        }
        let request = self.http.post(self.url("/api/complete")).json(&body);
        let resp = send(Upstream::Backend, request).await?;
        read_json(Upstream::Backend, resp).await
    }

    async fn session(&self, session_id: &str, devin_api_key: &Credential) -> DispatchResult<SessionResponse> {
        let session_id = check_session_id(session_id)?;
        let request = self
            .http
            .get(self.url(&format!("/api/session/{}", session_id)))
            .query(&[("devin_api_key", devin_api_key.expose())]);
        let resp = send(Upstream::Backend, request).await?;
        read_json(Upstream::Backend, resp).await
    }
}
