//! CLI commands

mod config;
mod run;

pub use config::{show_config, SettingsArgs};
pub use run::{run, RunArgs};
