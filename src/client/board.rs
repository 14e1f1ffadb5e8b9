//! Client-side view state: the issue list, one session per issue and a
//! single error banner.
//!
//! Failed backend calls never clear what is already on the board; they only
//! replace the banner.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::api_client::BackendApi;
use crate::errors::{DispatchError, DispatchResult};
use crate::service::models::{Credential, Issue, RepoSlug, SessionKind, SessionResponse};

pub struct IssueBoard {
    repo: RepoSlug,
    issues: Vec<Issue>,
    sessions: BTreeMap<u64, SessionResponse>,
    error: Option<String>,
    /// Session whose failed refresh raised the current banner.
    error_session: Option<String>,
}

impl IssueBoard {
    pub fn new(repo: RepoSlug) -> Self {
        Self {
            repo,
            issues: Vec::new(),
            sessions: BTreeMap::new(),
            error: None,
            error_session: None,
        }
    }

    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn session(&self, issue_number: u64) -> Option<&SessionResponse> {
        self.sessions.get(&issue_number)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &SessionResponse> {
        self.sessions.values()
    }

    /// The current error banner, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Scoping is offered only while the issue has no session at all.
    pub fn can_scope(&self, issue_number: u64) -> bool {
        !self.sessions.contains_key(&issue_number)
    }

    /// The session a completion should continue: the issue's scope session.
    pub fn continuation_session(&self, issue_number: u64) -> Option<&str> {
        self.sessions
            .get(&issue_number)
            .filter(|s| s.record.kind == SessionKind::Scope)
            .map(|s| s.record.session_id.as_str())
    }

    /// Session ids that should be refreshed on the next poll tick.
    pub fn pollable_sessions(&self) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.should_poll)
            .map(|s| s.record.session_id.clone())
            .collect()
    }

    pub fn has_active(&self) -> bool {
        self.sessions.values().any(|s| s.should_poll)
    }

    /// Record a session returned by the backend. Sessions for another repo
    /// are ignored.
    pub fn track(&mut self, session: SessionResponse) {
        if session.record.repo != self.repo {
            warn!(session_id = %session.record.session_id, repo = %session.record.repo, "ignoring session for another repo");
            return;
        }
        self.sessions.insert(session.record.issue_number, session);
    }

    /// Whether `session_id` is still the session tracked for its issue.
    pub fn is_tracked(&self, session_id: &str) -> bool {
        self.sessions
            .values()
            .any(|s| s.record.session_id == session_id)
    }

    /// Apply the outcome of one poll refresh. A result for a session that
    /// has since been replaced on its issue is dropped.
    pub fn apply_refresh(&mut self, session_id: &str, result: DispatchResult<SessionResponse>) {
        match result {
            Ok(session) => {
                let current = self
                    .sessions
                    .get(&session.record.issue_number)
                    .is_some_and(|s| s.record.session_id == session_id);
                if !current || session.record.session_id != session_id {
                    debug!(session_id, "dropping refresh for a superseded session");
                    return;
                }
                debug!(session_id, status = %session.record.status, "session refreshed");
                self.track(session);
                if self.error_session.as_deref() == Some(session_id) {
                    self.clear_error();
                }
            }
            Err(e) if self.is_tracked(session_id) => {
                self.fail(format!("Failed to refresh session {}: {}", session_id, e));
                self.error_session = Some(session_id.to_string());
            }
            Err(e) => debug!(session_id, error = %e, "ignoring failed refresh for a superseded session"),
        }
    }

    /// Replace the issue list with a backend result. On failure the
    /// previous list stays and the banner is set.
    pub fn apply_issues(&mut self, result: DispatchResult<Vec<Issue>>) -> bool {
        match result {
            Ok(issues) => {
                self.issues = issues;
                self.clear_error();
                true
            }
            Err(e) => {
                self.fail(format!("Failed to load issues: {}", e));
                false
            }
        }
    }

    pub async fn load_issues(&mut self, backend: &dyn BackendApi, github_token: &Credential) -> bool {
        let result = backend.list_issues(&self.repo, github_token).await;
        self.apply_issues(result)
    }

    /// Check that an issue may be scoped; raises the banner when it already
    /// has a session.
    pub fn begin_scope(&mut self, issue_number: u64) -> bool {
        if !self.can_scope(issue_number) {
            self.fail(format!("Issue #{} already has a session", issue_number));
            return false;
        }
        true
    }

    /// Scope an issue unless it already has a session.
    pub async fn scope(
        &mut self,
        backend: &dyn BackendApi,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
    ) -> Option<SessionResponse> {
        if !self.begin_scope(issue_number) {
            return None;
        }
        let result = backend
            .scope(&self.repo, issue_number, github_token, devin_api_key)
            .await;
        self.accept(result, "scope", issue_number)
    }

    /// The session a completion continues: `explicit` when given, otherwise
    /// the issue's scope session if there is one.
    pub fn resolve_continuation(&self, issue_number: u64, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.continuation_session(issue_number).map(str::to_string))
    }

    /// Complete an issue, continuing `session_id` when given and otherwise
    /// the issue's scope session if there is one.
    pub async fn complete(
        &mut self,
        backend: &dyn BackendApi,
        issue_number: u64,
        github_token: &Credential,
        devin_api_key: &Credential,
        session_id: Option<String>,
    ) -> Option<SessionResponse> {
        let session_id = self.resolve_continuation(issue_number, session_id);
        let result = backend
            .complete(
                &self.repo,
                issue_number,
                github_token,
                devin_api_key,
                session_id.as_deref(),
            )
            .await;
        self.accept(result, "complete", issue_number)
    }

    /// Record the outcome of a scope or complete call.
    pub fn accept(
        &mut self,
        result: Result<SessionResponse, DispatchError>,
        action: &str,
        issue_number: u64,
    ) -> Option<SessionResponse> {
        match result {
            Ok(session) => {
                self.track(session.clone());
                self.clear_error();
                Some(session)
            }
            Err(e) => {
                self.fail(format!("Failed to {} issue #{}: {}", action, issue_number, e));
                None
            }
        }
    }

    /// Raise the banner for a problem outside any backend call.
    pub fn report(&mut self, message: impl Into<String>) {
        self.fail(message.into());
    }

    fn clear_error(&mut self) {
        self.error = None;
        self.error_session = None;
    }

    fn fail(&mut self, message: String) {
        warn!(repo = %self.repo, "{}", message);
        self.error = Some(message);
        self.error_session = None;
    }
}
