//! Shared state for the client-side commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};

use issue_pilot::client::{BackendApi, BackendClient};
use issue_pilot::config::PilotConfig;
use issue_pilot::service::models::Credential;

pub struct ClientContext {
    pub backend: Arc<dyn BackendApi>,
    pub github_token: Option<Credential>,
    pub devin_api_key: Option<Credential>,
    pub poll_interval: Duration,
}

impl ClientContext {
    pub fn new(
        config: &PilotConfig,
        github_token: Option<String>,
        devin_api_key: Option<String>,
    ) -> Result<Self> {
        let backend = BackendClient::new(&config.client.server_url, config.http_timeout())?;
        Ok(Self {
            backend: Arc::new(backend),
            github_token: github_token.map(Credential::new).filter(|c| !c.is_blank()),
            devin_api_key: devin_api_key.map(Credential::new).filter(|c| !c.is_blank()),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn github_token(&self) -> Result<&Credential> {
        match &self.github_token {
            Some(token) => Ok(token),
            None => bail!("A GitHub token is required: pass --github-token or set GITHUB_TOKEN"),
        }
    }

    pub fn devin_api_key(&self) -> Result<&Credential> {
        match &self.devin_api_key {
            Some(key) => Ok(key),
            None => bail!("A Devin API key is required: pass --devin-api-key or set DEVIN_API_KEY"),
        }
    }
}
