use anyhow::Result;

use crate::config::CheckinConfig;

pub mod config;
pub mod doctor;
pub mod serve;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Read `.env` and the layered configuration.
pub fn load_config() -> Result<CheckinConfig> {
    CheckinConfig::load_env_file()?;
    CheckinConfig::load()
}
