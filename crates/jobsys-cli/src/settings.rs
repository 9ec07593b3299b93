//! Layered client configuration.
//!
//! Values are resolved in order, later layers winning:
//! 1. the TOML file given with `--config`, or the built-in defaults
//! 2. `JOBSYS_*` environment variables (a `.env` file is loaded first)
//! 3. command line flags

use anyhow::{Context, Result};
use jobsys::ClientConfig;
use serde::Deserialize;
use std::path::Path;

pub const ENV_PREFIX: &str = "JOBSYS_";

/// Scalar settings that may be overridden from the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Overrides {
    /// Microseconds between two polls
    pub interval: Option<u64>,
    /// Seconds before the client stops
    pub lifetime: Option<u64>,
    pub maximum_memory_usage: Option<u64>,
}

impl Overrides {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .with_context(|| format!("invalid {}* environment variable", ENV_PREFIX))
    }

    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(lifetime) = self.lifetime {
            config.lifetime = lifetime;
        }
        if let Some(bytes) = self.maximum_memory_usage {
            config.maximum_memory_usage = Some(bytes);
        }
    }
}

pub fn load_file(path: &Path) -> Result<ClientConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Resolve the configuration from an optional file and the override layers.
pub fn resolve(
    path: Option<&Path>,
    env: &Overrides,
    flags: &Overrides,
) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ClientConfig::default(),
    };

    env.apply(&mut config);
    flags.apply(&mut config);

    tracing::debug!(?config, "Configuration resolved");
    Ok(config)
}
