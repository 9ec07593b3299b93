//! Run command

use super::SettingsArgs;
use crate::{jobs, workers};
use anyhow::Result;
use clap::Args;
use jobsys::{Client, InMemoryStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// JSON file with an array of jobs to enqueue before starting
    #[arg(short, long, value_name = "FILE")]
    pub jobs: Option<PathBuf>,
}

/// Run a client over an in-memory storage with the built-in workers
pub async fn run(args: RunArgs) -> Result<i32> {
    let config = args.settings.resolve()?;

    let storage = InMemoryStorage::new();
    if let Some(path) = &args.jobs {
        let seeded = jobs::load(path)?;
        let count = seeded.len();
        for job in seeded {
            storage.add_job(job).await?;
        }
        tracing::info!(count, file = %path.display(), "Jobs enqueued");
    }

    let client = Client::new(
        config.into_options(),
        Arc::new(storage.clone()),
        Arc::new(workers::registry()),
    );
    let code = client.run().await;

    let failed = storage.failed_jobs()?.len();
    if failed > 0 {
        tracing::warn!(failed, "Some jobs failed");
    }
    Ok(code)
}
