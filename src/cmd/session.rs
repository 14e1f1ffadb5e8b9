//! Session commands: `issue-pilot scope`, `complete` and `watch`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use issue_pilot::client::{IssueBoard, PollOutcome, SessionPoller};
use issue_pilot::service::models::{
    RepoSlug, SessionKind, SessionRecord, SessionResponse, SessionStatus,
};
use issue_pilot::ui::{WatchUI, render_session};
use issue_pilot::ui::icons::{CHECK, SPARKLE};

use super::ClientContext;

pub async fn cmd_scope(ctx: &ClientContext, repo: RepoSlug, issue: u64, no_watch: bool) -> Result<()> {
    let token = ctx.github_token()?;
    let key = ctx.devin_api_key()?;

    let mut board = IssueBoard::new(repo);
    let session = board
        .scope(ctx.backend.as_ref(), issue, token, key)
        .await
        .ok_or_else(|| banner_error(&board))?;

    report_started(&session);
    if no_watch {
        return Ok(());
    }
    watch_board(ctx, board, issue).await
}

pub async fn cmd_complete(
    ctx: &ClientContext,
    repo: RepoSlug,
    issue: u64,
    session_id: Option<String>,
    no_watch: bool,
) -> Result<()> {
    let token = ctx.github_token()?;
    let key = ctx.devin_api_key()?;

    let mut board = IssueBoard::new(repo);
    let session = board
        .complete(ctx.backend.as_ref(), issue, token, key, session_id)
        .await
        .ok_or_else(|| banner_error(&board))?;

    report_started(&session);
    if no_watch {
        return Ok(());
    }
    watch_board(ctx, board, issue).await
}

/// Poll a session that was started earlier (possibly by another process).
pub async fn cmd_watch(
    ctx: &ClientContext,
    repo: RepoSlug,
    issue: u64,
    session_id: String,
    kind: SessionKind,
) -> Result<()> {
    ctx.devin_api_key()?;

    let mut board = IssueBoard::new(repo.clone());
    board.track(SessionResponse::from(SessionRecord {
        session_id,
        status: kind.active_status(),
        kind,
        repo,
        issue_number: issue,
        message: None,
        session_url: None,
        confidence_score: None,
        action_plan: None,
    }));
    watch_board(ctx, board, issue).await
}

fn banner_error(board: &IssueBoard) -> anyhow::Error {
    anyhow!("{}", board.error().unwrap_or("Request failed"))
}

fn report_started(session: &SessionResponse) {
    info!(
        repo = %session.record.repo,
        issue_number = session.record.issue_number,
        session_id = %session.record.session_id,
        kind = session.record.kind.as_str(),
        "session started"
    );
    println!("{}{}", SPARKLE, render_session(session));
}

/// Poll until the issue's session leaves its active status or Ctrl+C.
async fn watch_board(ctx: &ClientContext, board: IssueBoard, issue: u64) -> Result<()> {
    let board = Arc::new(Mutex::new(board));
    let (_key_tx, key_rx) = watch::channel(ctx.devin_api_key.clone());
    let poller = SessionPoller::new(
        Arc::clone(&ctx.backend),
        Arc::clone(&board),
        key_rx,
        ctx.poll_interval,
    )
    .stop_when_idle(true);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let ui = WatchUI::new(&format!("#{}", issue));
    let mut handle = tokio::spawn(poller.run(cancel.clone()));
    let mut redraw = tokio::time::interval(Duration::from_millis(250));
    let mut shown_error: Option<String> = None;

    let outcome = loop {
        tokio::select! {
            result = &mut handle => break result.context("Poller task failed")?,
            _ = redraw.tick() => {
                let board = board.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(session) = board.session(issue) {
                    ui.update(session);
                }
                let error = board.error().map(str::to_string);
                if error.is_some() && error != shown_error {
                    ui.banner(error.as_deref().unwrap_or_default());
                }
                shown_error = error;
            }
        }
    };

    let board = board.lock().unwrap_or_else(PoisonError::into_inner);
    let last = board.session(issue);
    ui.finish(last);

    match (outcome, last) {
        (PollOutcome::Cancelled, _) => println!("Stopped watching; the session keeps running."),
        (PollOutcome::Idle, Some(session)) if session.record.status.is_terminal() => {
            println!("{}Session {} finished.", CHECK, session.record.session_id)
        }
        (PollOutcome::Idle, Some(session)) if session.record.status == SessionStatus::Blocked => {
            println!("Devin is waiting for input on this session.")
        }
        _ => {}
    }
    Ok(())
}
