use anyhow::Result;

use super::Command;
use crate::config::CheckinConfig;

/// Print the effective configuration with secrets redacted.
pub struct ConfigShowCommand {
    config: CheckinConfig,
}

impl ConfigShowCommand {
    pub fn new(config: CheckinConfig) -> Self {
        Self { config }
    }
}

impl Command for ConfigShowCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", self.config.to_redacted_toml()?);
        Ok(())
    }
}
