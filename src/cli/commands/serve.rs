use anyhow::{Context, Result};
use tokio::net::TcpListener;

use super::Command;
use crate::app::{build_state, build_store};
use crate::config::CheckinConfig;
use crate::http;

/// Run the check-in web server until interrupted.
pub struct ServeCommand {
    config: CheckinConfig,
    port: Option<u16>,
    memory: bool,
}

impl ServeCommand {
    pub fn new(config: CheckinConfig, port: Option<u16>, memory: bool) -> Self {
        Self {
            config,
            port,
            memory,
        }
    }

    fn address(&self) -> String {
        let port = self.port.unwrap_or(self.config.server.port);
        format!("{}:{}", self.config.server.host, port)
    }
}

impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let store = build_store(&self.config, self.memory)?;
        let state = build_state(&self.config, store)?;

        let address = self.address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;

        http::serve(listener, state).await
    }
}
