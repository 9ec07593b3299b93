//! Built-in workers available to jobs run from the command line.

use async_trait::async_trait;
use jobsys::{Context, JobError, Result, TypedWorker, WorkerMap};
use serde::Deserialize;
use std::time::Duration;

/// Logs a message.
pub struct Log;

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub message: String,
}

#[async_trait]
impl TypedWorker for Log {
    const NAME: &'static str = "log";
    type Params = LogParams;

    async fn execute(&self, _ctx: &mut Context, params: LogParams) -> Result<()> {
        tracing::info!(message = %params.message, "log");
        Ok(())
    }
}

/// Sleeps, optionally extending the job's lease before it does.
pub struct Sleep;

#[derive(Debug, Deserialize)]
pub struct SleepParams {
    pub seconds: f64,
    #[serde(default)]
    pub ping: bool,
}

#[async_trait]
impl TypedWorker for Sleep {
    const NAME: &'static str = "sleep";
    type Params = SleepParams;

    async fn execute(&self, ctx: &mut Context, params: SleepParams) -> Result<()> {
        let duration = Duration::try_from_secs_f64(params.seconds)
            .map_err(|e| JobError::Worker(format!("invalid duration: {}", e)))?;

        if params.ping {
            ctx.ping_job().await?;
        }
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

/// Always fails. With `retry` set the failure is recoverable and the job is
/// rescheduled.
pub struct Fail;

#[derive(Debug, Deserialize)]
pub struct FailParams {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub retry: bool,
}

#[async_trait]
impl TypedWorker for Fail {
    const NAME: &'static str = "fail";
    type Params = FailParams;

    async fn execute(&self, _ctx: &mut Context, params: FailParams) -> Result<()> {
        let message = params.message.unwrap_or_else(|| "job failed".to_string());
        if params.retry {
            Err(JobError::recoverable(message))
        } else {
            Err(JobError::Worker(message))
        }
    }
}

pub fn registry() -> WorkerMap {
    let mut workers = WorkerMap::new();
    workers
        .register_typed(Log)
        .register_typed(Sleep)
        .register_typed(Fail);
    workers
}
