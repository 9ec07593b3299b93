//! Loading jobs to enqueue from a JSON file.
//!
//! The file holds an array of jobs:
//!
//! ```json
//! [
//!   {"worker_name": "log", "worker_params": {"message": "hello"}},
//!   {"worker_name": "sleep", "worker_params": {"seconds": 0.5}, "priority": 2}
//! ]
//! ```

use anyhow::{Context, Result};
use jobsys::Job;
use std::path::Path;

pub fn load(path: &Path) -> Result<Vec<Job>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid jobs file {}", path.display()))
}

fn parse(raw: &str) -> Result<Vec<Job>> {
    Ok(serde_json::from_str(raw)?)
}
