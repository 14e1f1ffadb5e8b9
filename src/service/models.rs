use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DispatchError, DispatchResult};

/// Check a Devin session id before it is placed in a URL path. Returns the
/// trimmed id; only ASCII letters, digits, `-` and `_` are accepted.
pub fn check_session_id(raw: &str) -> DispatchResult<&str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(DispatchError::Validation("session_id is required".into()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(DispatchError::Validation(format!(
            "session_id contains invalid characters: '{}'",
            raw
        )));
    }
    Ok(id)
}

/// A validated `owner/name` repository slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug(String);

impl RepoSlug {
    /// Parse `owner/name`. Surrounding whitespace and a trailing `.git` are
    /// tolerated; anything else that is not exactly two segments is rejected.
    pub fn parse(raw: &str) -> DispatchResult<Self> {
        let trimmed = raw.trim().trim_end_matches(".git");
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(DispatchError::Validation(format!(
                "repo must be in owner/name form, got '{}'",
                raw
            )));
        }
        let valid = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !parts.iter().all(|p| valid(p)) {
            return Err(DispatchError::Validation(format!(
                "repo contains invalid characters: '{}'",
                raw
            )));
        }
        Ok(Self(format!("{}/{}", parts[0], parts[1])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Browser URL of the repository, handed to Devin as the working repo.
    pub fn github_url(&self) -> String {
        format!("https://github.com/{}", self.0)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RepoSlug {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.0
    }
}

/// A caller-supplied secret (GitHub token or Devin API key).
///
/// Only ever forwarded upstream. `Debug` and `Display` redact the value so a
/// credential cannot leak through a log line or an error message.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Reject a blank credential with a validation error naming `field`.
    pub fn require(&self, field: &str) -> DispatchResult<&Self> {
        if self.is_blank() {
            return Err(DispatchError::Validation(format!("{} is required", field)));
        }
        Ok(self)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// A label attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// A GitHub issue as returned by the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Which workflow created a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Scope,
    Complete,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scope => "scope",
            Self::Complete => "complete",
        }
    }

    /// The status a live session of this kind reports while Devin works.
    pub fn active_status(&self) -> SessionStatus {
        match self {
            Self::Scope => SessionStatus::Scoping,
            Self::Complete => SessionStatus::Implementing,
        }
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scope" => Ok(Self::Scope),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Invalid session kind: {}", s)),
        }
    }
}

/// Session status. Unknown strings from Devin pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    Scoping,
    Implementing,
    Blocked,
    Finished,
    Other(String),
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scoping => "scoping",
            Self::Implementing => "implementing",
            Self::Blocked => "blocked",
            Self::Finished => "finished",
            Self::Other(s) => s,
        }
    }

    /// Active sessions are the only ones the client keeps polling.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scoping | Self::Implementing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl From<String> for SessionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "scoping" => Self::Scoping,
            "implementing" => Self::Implementing,
            "blocked" => Self::Blocked,
            "finished" => Self::Finished,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for SessionStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<SessionStatus> for String {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite registry key: one tracked session per issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub repo: RepoSlug,
    pub issue_number: u64,
}

impl IssueKey {
    pub fn new(repo: RepoSlug, issue_number: u64) -> Self {
        Self { repo, issue_number }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.issue_number)
    }
}

/// The last known state of a Devin session attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub status: SessionStatus,
    pub kind: SessionKind,
    pub repo: RepoSlug,
    pub issue_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_plan: Option<String>,
}

impl SessionRecord {
    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.repo.clone(), self.issue_number)
    }

    pub fn should_poll(&self) -> bool {
        self.status.is_active()
    }
}

/// Wire shape of a session returned by the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub record: SessionRecord,
    pub should_poll: bool,
}

impl From<SessionRecord> for SessionResponse {
    fn from(record: SessionRecord) -> Self {
        let should_poll = record.should_poll();
        Self {
            record,
            should_poll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            session_id: "s1".into(),
            status: SessionStatus::Scoping,
            kind: SessionKind::Scope,
            repo: RepoSlug::parse("octo/demo").unwrap(),
            issue_number: 1,
            message: Some("Devin is analyzing the issue".into()),
            session_url: None,
            confidence_score: None,
            action_plan: None,
        }
    }

    #[test]
    fn test_check_session_id() {
        assert_eq!(check_session_id(" devin-abc_123 ").unwrap(), "devin-abc_123");
        for bad in ["", "  ", "../admin", "s1/message", "s1?x=1", "s 1"] {
            assert!(
                matches!(check_session_id(bad), Err(DispatchError::Validation(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_repo_slug_accepts_owner_name() {
        let slug = RepoSlug::parse(" octo/demo.git ").unwrap();
        assert_eq!(slug.as_str(), "octo/demo");
        assert_eq!(slug.github_url(), "https://github.com/octo/demo");
    }

    #[test]
    fn test_repo_slug_rejects_malformed() {
        for raw in ["", "octo", "octo/", "/demo", "a/b/c", "octo/de mo", "octo/demo?x=1"] {
            let err = RepoSlug::parse(raw).unwrap_err();
            assert!(
                matches!(err, DispatchError::Validation(_)),
                "expected validation error for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_repo_slug_deserialize_validates() {
        let ok: RepoSlug = serde_json::from_str(r#""octo/demo""#).unwrap();
        assert_eq!(ok.as_str(), "octo/demo");
        assert!(serde_json::from_str::<RepoSlug>(r#""not-a-repo""#).is_err());
    }

    #[test]
    fn test_credential_is_redacted() {
        let cred = Credential::new("ghp_secret");
        assert_eq!(format!("{:?}", cred), "Credential(***)");
        assert_eq!(cred.to_string(), "***");
        assert_eq!(cred.expose(), "ghp_secret");
        assert_eq!(cred.bearer(), "Bearer ghp_secret");
    }

    #[test]
    fn test_credential_require_rejects_blank() {
        let err = Credential::new("  ").require("github_token").unwrap_err();
        assert!(err.to_string().contains("github_token"));
        assert!(Credential::new("k").require("devin_api_key").is_ok());
    }

    #[test]
    fn test_status_round_trips_known_and_unknown() {
        for raw in ["scoping", "implementing", "blocked", "finished", "expired"] {
            let status = SessionStatus::from(raw);
            assert_eq!(String::from(status), raw);
        }
        assert_eq!(
            SessionStatus::from("suspended"),
            SessionStatus::Other("suspended".into())
        );
    }

    #[test]
    fn test_only_scoping_and_implementing_are_active() {
        assert!(SessionStatus::Scoping.is_active());
        assert!(SessionStatus::Implementing.is_active());
        assert!(!SessionStatus::Blocked.is_active());
        assert!(!SessionStatus::Finished.is_active());
        assert!(!SessionStatus::Other("working".into()).is_active());
        assert!(SessionStatus::Finished.is_terminal());
    }

    #[test]
    fn test_kind_active_status() {
        assert_eq!(SessionKind::Scope.active_status(), SessionStatus::Scoping);
        assert_eq!(
            SessionKind::Complete.active_status(),
            SessionStatus::Implementing
        );
        assert_eq!("complete".parse::<SessionKind>().unwrap(), SessionKind::Complete);
        assert!("other".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_session_response_omits_absent_optionals() {
        let json = serde_json::to_value(SessionResponse::from(record())).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["status"], "scoping");
        assert_eq!(json["kind"], "scope");
        assert_eq!(json["repo"], "octo/demo");
        assert_eq!(json["issue_number"], 1);
        assert_eq!(json["should_poll"], true);
        assert!(json.get("confidence_score").is_none());
        assert!(json.get("action_plan").is_none());
    }

    #[test]
    fn test_record_reads_api_response() {
        let json = r#"{
            "session_id": "s1",
            "status": "finished",
            "kind": "scope",
            "repo": "octo/demo",
            "issue_number": 1,
            "confidence_score": 82,
            "action_plan": "1. Fix it",
            "should_poll": false
        }"#;
        let rec: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.status, SessionStatus::Finished);
        assert_eq!(rec.confidence_score, Some(82));
        assert_eq!(rec.action_plan.as_deref(), Some("1. Fix it"));
        assert!(!rec.should_poll());
    }

    #[test]
    fn test_issue_deserializes_github_shape() {
        let json = r#"{
            "number": 42,
            "title": "Bug",
            "body": null,
            "state": "open",
            "html_url": "https://github.com/octo/demo/issues/42",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "labels": [{"id": 7, "name": "bug", "color": "d73a4a", "default": true}],
            "user": {"login": "octocat"}
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.number, 42);
        assert!(issue.body.is_none());
        assert_eq!(
            issue.labels,
            vec![Label {
                name: "bug".into(),
                color: "d73a4a".into()
            }]
        );
    }
}
