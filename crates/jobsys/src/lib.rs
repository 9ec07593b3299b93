//! A small job system client
//!
//! A [`Client`] polls a pluggable [`Storage`] for jobs, runs each one with the
//! [`Worker`] registered under the job's worker name, and then deletes,
//! reschedules or fails the job depending on the outcome.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use jobsys::{Client, ClientOptions, Context, InMemoryStorage, Job, Params, Result, Storage, Worker, WorkerMap};
//! use std::sync::Arc;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Worker for Hello {
//!     async fn run(&self, ctx: &mut Context) -> Result<()> {
//!         tracing::info!(params = ?ctx.params(), "hello");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = InMemoryStorage::new();
//!     storage.add_job(Job::new("hello", Params::new())).await.unwrap();
//!
//!     let mut workers = WorkerMap::new();
//!     workers.register("hello", Hello);
//!
//!     let client = Client::new(ClientOptions::default(), Arc::new(storage), Arc::new(workers));
//!     std::process::exit(client.run().await);
//! }
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod job;
pub mod memory;
pub mod options;
pub mod storage;
pub mod strategy;
pub mod worker;

pub use client::{Client, ExceptionListener};
pub use context::Context;
pub use error::{JobError, Result};
pub use job::{Job, Params, Stats};
pub use memory::{MemoryProbe, ProcessMemory};
pub use options::{ClientConfig, ClientOptions, RescheduleConfig};
pub use storage::{
    BeanstalkConnection, BeanstalkStorage, InMemoryStorage, NullStorage, SharedStoredJob, Storage,
    StoredJob,
};
pub use strategy::{Fixed, Linear, RescheduleStrategy};
pub use worker::{TypedWorker, Worker, WorkerMap, WorkerRegistry};
