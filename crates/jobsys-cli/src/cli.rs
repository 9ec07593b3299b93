//! CLI argument parsing

use crate::commands::{self, RunArgs, SettingsArgs};
use crate::logging::LogFormat;
use clap::{Parser, Subcommand};

/// jobsys - Run job workers against a storage
#[derive(Parser, Debug)]
#[command(name = "jobsys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a client until its lifetime or memory limit is reached
    Run(RunArgs),

    /// Print the effective client configuration
    Config(SettingsArgs),
}

impl Cli {
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Execute the CLI command and return the process exit code
    pub async fn execute(self) -> anyhow::Result<i32> {
        match self.command {
            Commands::Run(args) => commands::run(args).await,
            Commands::Config(args) => commands::show_config(args).map(|()| 0),
        }
    }
}
