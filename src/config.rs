//! Layered configuration for issue-pilot.
//!
//! Values are resolved in this order, later layers winning:
//! built-in defaults → `.issue-pilot/config.toml` (or `--config`) →
//! `ISSUE_PILOT_*` environment variables → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! dev_mode = false
//! cors_permissive = true
//!
//! [upstream]
//! github_api_url = "https://api.github.com"
//! devin_api_url = "https://api.devin.ai"
//! devin_app_url = "https://app.devin.ai"
//! http_timeout_secs = 30
//!
//! [client]
//! server_url = "http://127.0.0.1:8000"
//! poll_interval_secs = 10
//! ```
//!
//! Credentials are never read from this file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::service::devin::{DEFAULT_DEVIN_API_URL, DEFAULT_DEVIN_APP_URL};
use crate::service::github::DEFAULT_GITHUB_API_URL;

pub const CONFIG_DIR: &str = ".issue-pilot";
pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "ISSUE_PILOT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            dev_mode: false,
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub github_api_url: String,
    pub devin_api_url: String,
    pub devin_app_url: String,
    pub http_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            devin_api_url: DEFAULT_DEVIN_API_URL.to_string(),
            devin_app_url: DEFAULT_DEVIN_APP_URL.to_string(),
            http_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub server_url: String,
    pub poll_interval_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_secs: 10,
        }
    }
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub client: ClientSection,
}

impl PilotConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load `path` when given (it must exist), otherwise the default
    /// location under `base_dir`, falling back to defaults when absent.
    pub fn load_or_default(path: Option<&Path>, base_dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path(base_dir);
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Overlay `ISSUE_PILOT_*` variables from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay environment values obtained through `lookup`. Blank values
    /// are ignored; unparsable numbers are an error naming the variable.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(url) = var("GITHUB_API_URL") {
            self.upstream.github_api_url = url;
        }
        if let Some(url) = var("DEVIN_API_URL") {
            self.upstream.devin_api_url = url;
        }
        if let Some(url) = var("DEVIN_APP_URL") {
            self.upstream.devin_app_url = url;
        }
        if let Some(secs) = var("HTTP_TIMEOUT_SECS") {
            self.upstream.http_timeout_secs = parse_number("HTTP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(url) = var("SERVER_URL") {
            self.client.server_url = url;
        }
        if let Some(secs) = var("POLL_INTERVAL_SECS") {
            self.client.poll_interval_secs = parse_number("POLL_INTERVAL_SECS", &secs)?;
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.http_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.client.poll_interval_secs.max(1))
    }

    /// Check the configuration for obvious problems.
    /// Returns a list of warnings (empty when valid).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, url) in [
            ("upstream.github_api_url", &self.upstream.github_api_url),
            ("upstream.devin_api_url", &self.upstream.devin_api_url),
            ("upstream.devin_app_url", &self.upstream.devin_app_url),
            ("client.server_url", &self.client.server_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("{} should be an http(s) URL, got '{}'", name, url));
            }
        }
        if self.upstream.http_timeout_secs == 0 {
            warnings.push("upstream.http_timeout_secs is 0, using 1".to_string());
        }
        if self.client.poll_interval_secs == 0 {
            warnings.push("client.poll_interval_secs is 0, using 1".to_string());
        }

        warnings
    }
}

pub fn default_config_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{}{} must be a number, got '{}'", ENV_PREFIX, name, value))
}
