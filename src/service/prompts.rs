//! Prompt templates sent to Devin and parsing of its scoping answer.
//!
//! The scoping prompt asks Devin to answer in a fixed shape:
//!
//! ```text
//! CONFIDENCE: 82
//! ACTION PLAN:
//! 1. ...
//! ```
//!
//! which [`parse_confidence_and_plan`] extracts from the session messages.

use regex::Regex;
use std::sync::LazyLock;

use super::models::{Issue, RepoSlug};

static CONFIDENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CONFIDENCE:\s*(\d+)").unwrap());

static ACTION_PLAN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)ACTION PLAN:\s*(.+)").unwrap());

const NO_DESCRIPTION: &str = "No description provided";

/// Message sent to an existing scoping session to move it to implementation.
pub const CONTINUATION_MESSAGE: &str = "Please proceed with implementing the solution based on \
the action plan you provided. Test your changes and create a PR with your implementation.";

pub const SCOPING_STATUS_MESSAGE: &str = "Devin is analyzing the issue";
pub const COMPLETING_STATUS_MESSAGE: &str = "Devin is working on completing the issue";

fn issue_body(issue: &Issue) -> &str {
    match issue.body.as_deref() {
        Some(body) if !body.trim().is_empty() => body,
        _ => NO_DESCRIPTION,
    }
}

/// Prompt for a `scope` session: feasibility analysis only.
pub fn scope_prompt(repo: &RepoSlug, issue: &Issue) -> String {
    format!(
        "Please analyze this GitHub issue and provide:\n\
         1. A confidence score (0-100) indicating how feasible this issue is to complete\n\
         2. A detailed, step-by-step action plan for implementing the solution\n\
         \n\
         Do not modify any code yet.\n\
         \n\
         Issue: {title}\n\
         Description: {body}\n\
         Repository: {repo}\n\
         \n\
         Format your response as:\n\
         CONFIDENCE: [score]\n\
         ACTION PLAN:\n\
         [detailed plan]",
        title = issue.title,
        body = issue_body(issue),
        repo = repo,
    )
}

/// Prompt for a fresh `complete` session: implement and open a PR.
pub fn complete_prompt(repo: &RepoSlug, issue: &Issue) -> String {
    format!(
        "Please complete this GitHub issue by implementing the solution and creating a PR.\n\
         \n\
         Issue: {title}\n\
         Description: {body}\n\
         Repository: {repo}\n\
         \n\
         Please:\n\
         1. Analyze the issue\n\
         2. Implement the solution\n\
         3. Test your changes\n\
         4. Create a PR with your implementation",
        title = issue.title,
        body = issue_body(issue),
        repo = repo,
    )
}

/// Extract the confidence score and action plan from Devin's reply text.
///
/// Scores above 100 are clamped. Either part may be missing independently.
pub fn parse_confidence_and_plan(text: &str) -> (Option<u8>, Option<String>) {
    let confidence = CONFIDENCE_REGEX
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|score| score.min(100) as u8);

    let plan = ACTION_PLAN_REGEX
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|plan| !plan.is_empty());

    (confidence, plan)
}
