//! Interactive issue board: `issue-pilot board`.
//!
//! One [`IssueBoard`] lives for the whole run, so the scope and complete
//! actions see the sessions the poller keeps refreshing. Commands are read
//! line by line from stdin.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use issue_pilot::client::{IssueBoard, SessionPoller, SharedBoard};
use issue_pilot::service::models::{Credential, RepoSlug, SessionResponse};
use issue_pilot::ui::icons::{CROSS, SPARKLE};
use issue_pilot::ui::{render_board, render_session};

use super::ClientContext;

const HELP: &str =
    "Commands: list, reload, scope <n>, complete <n> [session-id], show <n>, help, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum BoardCommand {
    List,
    Reload,
    Scope(u64),
    Complete {
        issue: u64,
        session_id: Option<String>,
    },
    Show(u64),
    Help,
    Quit,
}

impl FromStr for BoardCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Self::List);
        };
        let issue = |word: Option<&str>| -> Result<u64, String> {
            let word = word.ok_or_else(|| format!("'{}' needs an issue number", verb))?;
            word.trim_start_matches('#')
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Not an issue number: '{}'", word))
        };

        let command = match verb {
            "list" | "ls" => Self::List,
            "reload" | "r" => Self::Reload,
            "scope" => Self::Scope(issue(words.next())?),
            "complete" => Self::Complete {
                issue: issue(words.next())?,
                session_id: words.next().map(str::to_string),
            },
            "show" => Self::Show(issue(words.next())?),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("Unknown command '{}'. {}", other, HELP)),
        };
        if words.next().is_some() {
            return Err(format!("Too many arguments for '{}'", verb));
        }
        Ok(command)
    }
}

fn lock(board: &SharedBoard) -> MutexGuard<'_, IssueBoard> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

pub async fn cmd_board(ctx: &ClientContext, repo: RepoSlug) -> Result<()> {
    let token = ctx.github_token()?.clone();
    let board: SharedBoard = Arc::new(Mutex::new(IssueBoard::new(repo)));

    reload(ctx, &board, &token).await;

    let (_key_tx, key_rx) = watch::channel(ctx.devin_api_key.clone());
    let poller = SessionPoller::new(
        Arc::clone(&ctx.backend),
        Arc::clone(&board),
        key_rx,
        ctx.poll_interval,
    );
    let cancel = CancellationToken::new();
    let poller = tokio::spawn(poller.run(cancel.clone()));

    println!("{}", style(HELP).dim());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.parse::<BoardCommand>() {
            Ok(BoardCommand::Quit) => break,
            Ok(command) => run(ctx, &board, &token, command).await,
            Err(e) => println!("{}{}", CROSS, e),
        }
    }

    cancel.cancel();
    poller.await.context("Poller task failed")?;
    debug!("board closed");
    Ok(())
}

async fn run(ctx: &ClientContext, board: &SharedBoard, token: &Credential, command: BoardCommand) {
    match command {
        BoardCommand::List => print!("{}", render_board(&lock(board))),
        BoardCommand::Reload => reload(ctx, board, token).await,
        BoardCommand::Scope(issue) => {
            let Some(key) = devin_key(ctx, board) else { return };
            let allowed = lock(board).begin_scope(issue);
            if !allowed {
                print_banner(board);
                return;
            }
            let repo = lock(board).repo().clone();
            let result = ctx.backend.scope(&repo, issue, token, key).await;
            let accepted = lock(board).accept(result, "scope", issue);
            report(board, accepted);
        }
        BoardCommand::Complete { issue, session_id } => {
            let Some(key) = devin_key(ctx, board) else { return };
            let (repo, session_id) = {
                let board = lock(board);
                (board.repo().clone(), board.resolve_continuation(issue, session_id))
            };
            let result = ctx
                .backend
                .complete(&repo, issue, token, key, session_id.as_deref())
                .await;
            let accepted = lock(board).accept(result, "complete", issue);
            report(board, accepted);
        }
        BoardCommand::Show(issue) => match lock(board).session(issue) {
            Some(session) => println!("{}", render_session(session)),
            None => println!("Issue #{} has no session", issue),
        },
        BoardCommand::Help => println!("{}", HELP),
        BoardCommand::Quit => {}
    }
}

async fn reload(ctx: &ClientContext, board: &SharedBoard, token: &Credential) {
    let repo = lock(board).repo().clone();
    let result = ctx.backend.list_issues(&repo, token).await;
    let mut board = lock(board);
    board.apply_issues(result);
    print!("{}", render_board(&board));
}

fn devin_key<'a>(ctx: &'a ClientContext, board: &SharedBoard) -> Option<&'a Credential> {
    if ctx.devin_api_key.is_none() {
        lock(board).report("A Devin API key is required: pass --devin-api-key or set DEVIN_API_KEY");
        print_banner(board);
    }
    ctx.devin_api_key.as_ref()
}

fn report(board: &SharedBoard, accepted: Option<SessionResponse>) {
    match accepted {
        Some(session) => println!("{}{}", SPARKLE, render_session(&session)),
        None => print_banner(board),
    }
}

fn print_banner(board: &SharedBoard) {
    if let Some(error) = lock(board).error() {
        println!("{}{}", CROSS, style(error).red());
    }
}
