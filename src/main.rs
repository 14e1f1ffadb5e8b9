use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use issue_pilot::config::PilotConfig;
use issue_pilot::service::models::{RepoSlug, SessionKind};
use issue_pilot::telemetry::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "issue-pilot")]
#[command(version, about = "Scope and implement GitHub issues with Devin sessions")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format (text or json)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Path to the config file. Defaults to .issue-pilot/config.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL used by the client commands. Overrides client.server_url.
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    #[arg(long, env = "DEVIN_API_KEY", hide_env_values = true, global = true)]
    pub devin_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the backend HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Dev mode: listen on all interfaces
        #[arg(long)]
        dev: bool,
    },
    /// List the open issues of a repository
    Issues {
        /// Repository in owner/name form
        #[arg(short, long)]
        repo: RepoSlug,
    },
    /// Interactive board: scope and complete issues while their sessions are polled
    Board {
        #[arg(short, long)]
        repo: RepoSlug,
    },
    /// Ask Devin to scope an issue and report a confidence score and plan
    Scope {
        #[arg(short, long)]
        repo: RepoSlug,

        #[arg(short, long)]
        issue: u64,

        /// Return after starting the session instead of polling it
        #[arg(long)]
        no_watch: bool,
    },
    /// Ask Devin to implement an issue and open a pull request
    Complete {
        #[arg(short, long)]
        repo: RepoSlug,

        #[arg(short, long)]
        issue: u64,

        /// Continue this (scope) session instead of starting a new one
        #[arg(long)]
        session_id: Option<String>,

        #[arg(long)]
        no_watch: bool,
    },
    /// Poll an existing session until it stops
    Watch {
        #[arg(short, long)]
        repo: RepoSlug,

        #[arg(short, long)]
        issue: u64,

        #[arg(long)]
        session_id: String,

        /// Workflow that started the session: scope or complete
        #[arg(long, default_value = "scope")]
        kind: SessionKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose, cli.log_format)?;

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let mut config = PilotConfig::load_or_default(cli.config.as_deref(), &cwd)?;
    config.apply_process_env()?;
    if let Some(url) = &cli.server_url {
        config.client.server_url = url.clone();
    }
    for warning in config.validate() {
        warn!("config: {}", warning);
    }

    let client = || {
        cmd::ClientContext::new(&config, cli.github_token.clone(), cli.devin_api_key.clone())
    };

    match &cli.command {
        Commands::Serve { host, port, dev } => {
            cmd::cmd_serve(&config, host.clone(), *port, *dev).await?
        }
        Commands::Issues { repo } => cmd::cmd_issues(&client()?, repo.clone()).await?,
        Commands::Board { repo } => cmd::cmd_board(&client()?, repo.clone()).await?,
        Commands::Scope {
            repo,
            issue,
            no_watch,
        } => cmd::cmd_scope(&client()?, repo.clone(), *issue, *no_watch).await?,
        Commands::Complete {
            repo,
            issue,
            session_id,
            no_watch,
        } => {
            cmd::cmd_complete(&client()?, repo.clone(), *issue, session_id.clone(), *no_watch)
                .await?
        }
        Commands::Watch {
            repo,
            issue,
            session_id,
            kind,
        } => cmd::cmd_watch(&client()?, repo.clone(), *issue, session_id.clone(), *kind).await?,
    }

    Ok(())
}
