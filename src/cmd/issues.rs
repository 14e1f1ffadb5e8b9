//! Issue table command: `issue-pilot issues`.

use anyhow::{Result, anyhow};

use issue_pilot::client::IssueBoard;
use issue_pilot::service::models::RepoSlug;
use issue_pilot::ui::render_board;

use super::ClientContext;

pub async fn cmd_issues(ctx: &ClientContext, repo: RepoSlug) -> Result<()> {
    let token = ctx.github_token()?;
    let mut board = IssueBoard::new(repo);

    if !board.load_issues(ctx.backend.as_ref(), token).await {
        return Err(anyhow!(
            "{}",
            board.error().unwrap_or("Failed to load issues")
        ));
    }

    print!("{}", render_board(&board));
    Ok(())
}
