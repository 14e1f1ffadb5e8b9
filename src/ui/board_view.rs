//! Plain-terminal rendering of an [`IssueBoard`].

use console::{Alignment, pad_str, style};

use super::icons::{CROSS, LINK, PLAN, status_icon};
use crate::client::IssueBoard;
use crate::service::models::{Issue, SessionResponse};

const TITLE_WIDTH: usize = 48;
const LABELS_WIDTH: usize = 20;

/// Render the issue table: number, title, labels and the session column.
/// An error banner, when present, is printed above the table.
pub fn render_board(board: &IssueBoard) -> String {
    let mut out = String::new();

    if let Some(error) = board.error() {
        out.push_str(&format!("{}{}\n\n", CROSS, style(error).red()));
    }

    if board.issues().is_empty() {
        out.push_str(&format!("No open issues in {}\n", style(board.repo()).bold()));
        return out;
    }

    out.push_str(&format!(
        "{} {} {} {}\n",
        pad_str("#", 6, Alignment::Right, None),
        pad_str("Title", TITLE_WIDTH, Alignment::Left, None),
        pad_str("Labels", LABELS_WIDTH, Alignment::Left, None),
        "Session"
    ));

    for issue in board.issues() {
        out.push_str(&render_row(issue, board.session(issue.number)));
        out.push('\n');
    }
    out
}

fn render_row(issue: &Issue, session: Option<&SessionResponse>) -> String {
    let labels = issue
        .labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let session_col = match session {
        Some(s) => format!(
            "{}{} ({})",
            status_icon(&s.record.status),
            s.record.status,
            s.record.session_id
        ),
        None => style("-").dim().to_string(),
    };

    format!(
        "{} {} {} {}",
        pad_str(&format!("#{}", issue.number), 6, Alignment::Right, None),
        pad_str(&issue.title, TITLE_WIDTH, Alignment::Left, Some("…")),
        pad_str(&labels, LABELS_WIDTH, Alignment::Left, Some("…")),
        session_col
    )
}

/// Render the details of one session, including the scope result.
pub fn render_session(session: &SessionResponse) -> String {
    let record = &session.record;
    let mut lines = vec![format!(
        "{}{} #{} {} [{}] {}",
        status_icon(&record.status),
        style(&record.repo).bold(),
        record.issue_number,
        style(&record.session_id).cyan(),
        record.kind.as_str(),
        style(&record.status).yellow()
    )];

    if let Some(message) = &record.message {
        lines.push(format!("   {}", message));
    }
    if let Some(score) = record.confidence_score {
        lines.push(format!("   Confidence: {}", style(format!("{}/100", score)).bold()));
    }
    if let Some(plan) = &record.action_plan {
        lines.push(format!("   {}Action plan:", PLAN));
        for line in plan.lines() {
            lines.push(format!("     {}", line));
        }
    }
    if let Some(url) = &record.session_url {
        lines.push(format!("   {}{}", LINK, style(url).underlined()));
    }

    lines.join("\n")
}
