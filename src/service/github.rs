use async_trait::async_trait;
use tracing::debug;

use super::http::{build_client, read_json, send};
use super::models::{Credential, Issue, RepoSlug};
use crate::errors::{DispatchResult, Upstream};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

/// Source of issues. Real implementation: `GitHubClient`. Tests use fakes.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// All open issues of `repo`, in the order GitHub returns them.
    async fn list_open_issues(&self, repo: &RepoSlug, token: &Credential) -> DispatchResult<Vec<Issue>>;

    async fn get_issue(&self, repo: &RepoSlug, number: u64, token: &Credential) -> DispatchResult<Issue>;
}

/// GitHub REST client authenticated per call with a caller-supplied token.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str, token: &Credential) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.api_url, path))
            .header("Authorization", token.bearer())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    /// Paginates through all pages; stops at the first short page.
    async fn list_open_issues(&self, repo: &RepoSlug, token: &Credential) -> DispatchResult<Vec<Issue>> {
        let path = format!("/repos/{}/issues", repo);
        let mut all_issues = Vec::new();
        let per_page = PER_PAGE.to_string();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            let request = self.get(&path, token).query(&[
                ("state", "open"),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
            ]);
            let resp = send(Upstream::GitHub, request).await?;
            let batch: Vec<Issue> = read_json(Upstream::GitHub, resp).await?;

            let count = batch.len();
            debug!(repo = %repo, page, count, "fetched issues page");
            all_issues.extend(batch);

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all_issues)
    }

    async fn get_issue(&self, repo: &RepoSlug, number: u64, token: &Credential) -> DispatchResult<Issue> {
        let request = self.get(&format!("/repos/{}/issues/{}", repo, number), token);
        let resp = send(Upstream::GitHub, request).await?;
        read_json(Upstream::GitHub, resp).await
    }
}
