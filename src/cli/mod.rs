use clap::{Parser, Subcommand, ValueEnum};

pub mod commands;

#[derive(Parser)]
#[command(name = "checkin-desk")]
#[command(version)]
#[command(about = "Event check-in desk backed by a Google spreadsheet")]
#[command(long_about = "Checkin Desk looks visitors up by document number, registers newcomers, \
                       lets them scan their code with the browser camera and records exactly one \
                       registration per document and per code. Run without a subcommand to serve.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the check-in web server (default)
    Serve {
        /// Port to listen on, overriding configuration
        #[arg(long, short = 'p', help = "Listen port (overrides server.port)")]
        port: Option<u16>,
        /// Use an empty in-memory registry instead of the spreadsheet
        #[arg(long, help = "Serve from an in-memory registry, nothing is persisted")]
        memory: bool,
    },
    /// Check registry connectivity and report duplicate registrations
    Doctor {
        /// Output format
        #[arg(long, value_enum, default_value = "text", help = "Report format")]
        format: DoctorFormat,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DoctorFormat {
    Text,
    Json,
}
