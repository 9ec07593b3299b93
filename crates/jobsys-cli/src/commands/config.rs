//! Configuration flags and the `config` command

use crate::settings::{self, Overrides};
use anyhow::{Context, Result};
use clap::Args;
use jobsys::ClientConfig;
use std::path::PathBuf;

/// Flags shared by every command that builds a client configuration
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Microseconds to wait between two polls
    #[arg(long, value_name = "MICROS")]
    pub interval: Option<u64>,

    /// Seconds after which the client stops
    #[arg(long, value_name = "SECS")]
    pub lifetime: Option<u64>,

    /// Stop once the process uses this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_memory: Option<u64>,
}

impl SettingsArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            interval: self.interval,
            lifetime: self.lifetime,
            maximum_memory_usage: self.max_memory,
        }
    }

    /// File, then environment, then these flags
    pub fn resolve(&self) -> Result<ClientConfig> {
        let env = Overrides::from_env()?;
        settings::resolve(self.config.as_deref(), &env, &self.overrides())
    }
}

/// Print the effective configuration as TOML
pub fn show_config(args: SettingsArgs) -> Result<()> {
    let config = args.resolve()?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
