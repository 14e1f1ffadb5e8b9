//! Backend server command: `issue-pilot serve`.

use anyhow::Result;

use issue_pilot::config::PilotConfig;
use issue_pilot::service::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    config: &PilotConfig,
    host: Option<String>,
    port: Option<u16>,
    dev: bool,
) -> Result<()> {
    let mut server = ServerConfig::from(config);
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }
    if dev {
        server.dev_mode = true;
    }

    start_server(server).await
}
