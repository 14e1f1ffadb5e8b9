//! Orchestration of the scope / complete / refresh workflows.
//!
//! The dispatcher owns no state of its own beyond the injected
//! [`SessionRegistry`]; GitHub and Devin are reached through the
//! [`IssueSource`] and [`AgentService`] seams so the workflows can be
//! exercised against in-memory fakes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::devin::{AgentService, SessionDetails};
use super::github::IssueSource;
use super::models::{
    Credential, Issue, IssueKey, RepoSlug, SessionKind, SessionRecord, SessionStatus,
    check_session_id,
};
use super::prompts::{
    COMPLETING_STATUS_MESSAGE, CONTINUATION_MESSAGE, SCOPING_STATUS_MESSAGE, complete_prompt,
    parse_confidence_and_plan, scope_prompt,
};
use super::registry::SessionRegistry;
use crate::errors::{DispatchError, DispatchResult};

/// Input of the scope workflow.
#[derive(Debug, Clone)]
pub struct ScopeCommand {
    pub repo: RepoSlug,
    pub issue_number: u64,
    pub github_token: Credential,
    pub devin_api_key: Credential,
}

/// Input of the complete workflow. `session_id` selects continuation.
#[derive(Debug, Clone)]
pub struct CompleteCommand {
    pub repo: RepoSlug,
    pub issue_number: u64,
    pub github_token: Credential,
    pub devin_api_key: Credential,
    pub session_id: Option<String>,
}

pub struct Dispatcher {
    issues: Arc<dyn IssueSource>,
    agent: Arc<dyn AgentService>,
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(
        issues: Arc<dyn IssueSource>,
        agent: Arc<dyn AgentService>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            issues,
            agent,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn list_issues(&self, repo: &RepoSlug, token: &Credential) -> DispatchResult<Vec<Issue>> {
        token.require("github_token")?;
        let issues = self.issues.list_open_issues(repo, token).await.inspect_err(|e| {
            warn!(repo = %repo, error = %e, "listing issues failed");
        })?;
        info!(repo = %repo, count = issues.len(), "listed open issues");
        Ok(issues)
    }

    /// Start a scoping session. Does not check for an existing record: the
    /// presentation layer decides whether scoping again is intended.
    pub async fn scope_issue(&self, cmd: ScopeCommand) -> DispatchResult<SessionRecord> {
        validate_issue_number(cmd.issue_number)?;
        cmd.github_token.require("github_token")?;
        cmd.devin_api_key.require("devin_api_key")?;

        let issue = self
            .issues
            .get_issue(&cmd.repo, cmd.issue_number, &cmd.github_token)
            .await?;
        let prompt = scope_prompt(&cmd.repo, &issue);
        let created = self
            .agent
            .create_session(&prompt, &cmd.repo, &cmd.devin_api_key)
            .await
            .inspect_err(|e| warn!(repo = %cmd.repo, issue_number = cmd.issue_number, error = %e, "scope session creation failed"))?;

        let session_url = created
            .url
            .clone()
            .unwrap_or_else(|| self.agent.session_url(&created.session_id));
        let record = SessionRecord {
            session_id: created.session_id,
            status: SessionStatus::Scoping,
            kind: SessionKind::Scope,
            repo: cmd.repo,
            issue_number: cmd.issue_number,
            message: Some(SCOPING_STATUS_MESSAGE.to_string()),
            session_url: Some(session_url),
            confidence_score: None,
            action_plan: None,
        };
        self.registry.put(record.clone());

        info!(
            repo = %record.repo,
            issue_number = record.issue_number,
            session_id = %record.session_id,
            "scoping session started"
        );
        Ok(record)
    }

    /// Continue the given session into implementation, or start a fresh
    /// completion session when no `session_id` is supplied. A session id
    /// Devin no longer recognizes is reported as an error, never replaced.
    pub async fn complete_issue(&self, cmd: CompleteCommand) -> DispatchResult<SessionRecord> {
        validate_issue_number(cmd.issue_number)?;
        cmd.github_token.require("github_token")?;
        cmd.devin_api_key.require("devin_api_key")?;

        let session_id = cmd
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(check_session_id)
            .transpose()?
            .map(str::to_string);

        let record = match session_id {
            Some(session_id) => self.continue_session(&cmd, session_id).await?,
            None => self.start_completion(&cmd).await?,
        };
        self.registry.put(record.clone());

        info!(
            repo = %record.repo,
            issue_number = record.issue_number,
            session_id = %record.session_id,
            "completion session running"
        );
        Ok(record)
    }

    async fn continue_session(&self, cmd: &CompleteCommand, session_id: String) -> DispatchResult<SessionRecord> {
        self.agent
            .send_message(&session_id, CONTINUATION_MESSAGE, &cmd.devin_api_key)
            .await
            .inspect_err(|e| warn!(session_id = %session_id, error = %e, "continuation rejected"))?;

        // Carry the scoping output over only if it belongs to this session.
        let previous = self
            .registry
            .get(&IssueKey::new(cmd.repo.clone(), cmd.issue_number))
            .filter(|prev| prev.session_id == session_id);

        let session_url = previous
            .as_ref()
            .and_then(|prev| prev.session_url.clone())
            .unwrap_or_else(|| self.agent.session_url(&session_id));

        Ok(SessionRecord {
            status: SessionStatus::Implementing,
            kind: SessionKind::Complete,
            repo: cmd.repo.clone(),
            issue_number: cmd.issue_number,
            message: Some(COMPLETING_STATUS_MESSAGE.to_string()),
            session_url: Some(session_url),
            confidence_score: previous.as_ref().and_then(|prev| prev.confidence_score),
            action_plan: previous.and_then(|prev| prev.action_plan),
            session_id,
        })
    }

    async fn start_completion(&self, cmd: &CompleteCommand) -> DispatchResult<SessionRecord> {
        let issue = self
            .issues
            .get_issue(&cmd.repo, cmd.issue_number, &cmd.github_token)
            .await?;
        let prompt = complete_prompt(&cmd.repo, &issue);
        let created = self
            .agent
            .create_session(&prompt, &cmd.repo, &cmd.devin_api_key)
            .await
            .inspect_err(|e| warn!(repo = %cmd.repo, issue_number = cmd.issue_number, error = %e, "completion session creation failed"))?;

        let session_url = created
            .url
            .clone()
            .unwrap_or_else(|| self.agent.session_url(&created.session_id));
        Ok(SessionRecord {
            session_id: created.session_id,
            status: SessionStatus::Implementing,
            kind: SessionKind::Complete,
            repo: cmd.repo.clone(),
            issue_number: cmd.issue_number,
            message: Some(COMPLETING_STATUS_MESSAGE.to_string()),
            session_url: Some(session_url),
            confidence_score: None,
            action_plan: None,
        })
    }

    /// Pull the current state of a tracked session from Devin and merge it
    /// into the registry. On failure the stored record is left untouched.
    pub async fn refresh_session(&self, session_id: &str, key: &Credential) -> DispatchResult<SessionRecord> {
        let session_id = check_session_id(session_id)?;
        key.require("devin_api_key")?;

        let previous = self
            .registry
            .find_by_session(session_id)
            .ok_or_else(|| DispatchError::NotFound(format!("Session {} not found", session_id)))?;

        let details = self
            .agent
            .get_session(session_id, key)
            .await
            .inspect_err(|e| warn!(session_id = %session_id, error = %e, "status refresh failed"))?;

        let fallback_url = self.agent.session_url(session_id);
        let record = reconcile(&previous, &details, fallback_url);
        if !self.registry.update_if_current(record.clone()) {
            debug!(session_id = %session_id, "session replaced during refresh, not stored");
            return Ok(record);
        }

        if record.status != previous.status {
            info!(
                session_id = %record.session_id,
                from = %previous.status,
                to = %record.status,
                "session status changed"
            );
        }
        Ok(record)
    }
}

fn validate_issue_number(issue_number: u64) -> DispatchResult<()> {
    if issue_number == 0 {
        return Err(DispatchError::Validation(
            "issue_number must be a positive integer".into(),
        ));
    }
    Ok(())
}

/// Translate Devin's status vocabulary into ours.
///
/// `working` means the session is still busy with whatever its kind asked
/// for; unknown values pass through verbatim. With no status at all the
/// previous status stands.
pub fn map_status(kind: SessionKind, raw: Option<&str>, previous: &SessionStatus) -> SessionStatus {
    match raw {
        None => previous.clone(),
        Some("working" | "resumed" | "resume_requested" | "resume_requested_frontend") => {
            kind.active_status()
        }
        Some(other) => SessionStatus::from(other),
    }
}

/// Merge fresh session details into the previously stored record.
///
/// Optional outputs only ever move forward: a value Devin does not report
/// this time keeps the stored one.
pub fn reconcile(previous: &SessionRecord, details: &SessionDetails, fallback_url: String) -> SessionRecord {
    let mut record = previous.clone();
    record.status = map_status(previous.kind, details.raw_status(), &previous.status);

    if previous.kind == SessionKind::Scope {
        let (confidence, plan) = parse_confidence_and_plan(&details.devin_text());
        if confidence.is_some() {
            record.confidence_score = confidence;
        }
        if plan.is_some() {
            record.action_plan = plan;
        }
    }

    if let Some(message) = details.latest_devin_message() {
        record.message = Some(message.to_string());
    }

    if record.session_url.is_none() {
        record.session_url = Some(details.url.clone().unwrap_or(fallback_url));
    }
    record
}
