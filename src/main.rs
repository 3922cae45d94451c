use anyhow::Result;
use clap::Parser;

use checkin_desk::cli::commands::config::ConfigShowCommand;
use checkin_desk::cli::commands::doctor::DoctorCommand;
use checkin_desk::cli::commands::serve::ServeCommand;
use checkin_desk::cli::commands::{load_config, Command};
use checkin_desk::cli::{Cli, Commands, ConfigAction};
use checkin_desk::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        // Default behavior: no subcommand serves from the configured store
        None => {
            init_telemetry(&config.observability)?;
            tokio::runtime::Runtime::new()?
                .block_on(async { ServeCommand::new(config, None, false).execute().await })
        }
        Some(Commands::Serve { port, memory }) => {
            init_telemetry(&config.observability)?;
            tokio::runtime::Runtime::new()?
                .block_on(async { ServeCommand::new(config, port, memory).execute().await })
        }
        Some(Commands::Doctor { format }) => tokio::runtime::Runtime::new()?
            .block_on(async { DoctorCommand::new(config, format).execute().await }),
        Some(Commands::Config {
            action: ConfigAction::Show,
        }) => tokio::runtime::Runtime::new()?
            .block_on(async { ConfigShowCommand::new(config).execute().await }),
    }
}
