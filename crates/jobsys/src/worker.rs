use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// User code that performs the work of a job.
///
/// Returning [`JobError::Recoverable`](crate::JobError::Recoverable)
/// reschedules the job; any other error marks it as failed.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn run(&self, ctx: &mut Context) -> Result<()>;
}

/// A worker with a fixed name and typed parameters
#[async_trait]
pub trait TypedWorker: Send + Sync + 'static {
    /// The worker name jobs refer to
    const NAME: &'static str;

    /// The parameters required by the worker
    type Params: DeserializeOwned + Send;

    async fn execute(&self, ctx: &mut Context, params: Self::Params) -> Result<()>;
}

#[async_trait]
impl<W: TypedWorker> Worker for W {
    async fn run(&self, ctx: &mut Context) -> Result<()> {
        let params: W::Params =
            serde_json::from_value(serde_json::Value::Object(ctx.params().clone()))?;
        self.execute(ctx, params).await
    }
}

/// Resolves workers by name.
pub trait WorkerRegistry: Send + Sync {
    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Option<Arc<dyn Worker>>;
}

/// The default registry: a plain name to worker map built at startup.
#[derive(Clone, Default)]
pub struct WorkerMap {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker under `name`, replacing any previous one.
    pub fn register<W: Worker + 'static>(
        &mut self,
        name: impl Into<String>,
        worker: W,
    ) -> &mut Self {
        self.workers.insert(name.into(), Arc::new(worker));
        self
    }

    /// Registers a typed worker under its own name.
    pub fn register_typed<W: TypedWorker>(&mut self, worker: W) -> &mut Self {
        self.register(W::NAME, worker)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl WorkerRegistry for WorkerMap {
    fn has(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(name).cloned()
    }
}

impl std::fmt::Debug for WorkerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.workers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::storage::{InMemoryStorage, Storage};
    use crate::JobError;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    #[derive(Default)]
    struct Greeter {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TypedWorker for Greeter {
        const NAME: &'static str = "greeter";
        type Params = Greeting;

        async fn execute(&self, _ctx: &mut Context, params: Greeting) -> Result<()> {
            self.seen.lock().unwrap().push(params.name);
            Ok(())
        }
    }

    struct Noop;

    #[async_trait]
    impl Worker for Noop {
        async fn run(&self, _ctx: &mut Context) -> Result<()> {
            Ok(())
        }
    }

    async fn context(params: serde_json::Value) -> Context {
        let storage = InMemoryStorage::new();
        let job = Job::new("greeter", params.as_object().cloned().unwrap_or_default());
        storage.add_job(job.clone()).await.unwrap();
        let stored = storage.retrieve_job().await.unwrap().unwrap();
        Context::new(Arc::new(storage), stored, &job)
    }

    #[test]
    fn test_registry_lookup() {
        let mut workers = WorkerMap::new();
        workers.register("noop", Noop).register_typed(Greeter::default());

        assert!(workers.has("noop"));
        assert!(workers.has("greeter"));
        assert!(!workers.has("missing"));
        assert!(workers.get("missing").is_none());
        assert_eq!(workers.len(), 2);

        let mut names: Vec<&str> = workers.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["greeter", "noop"]);
    }

    #[tokio::test]
    async fn test_typed_worker_decodes_params() {
        let greeter = Greeter::default();
        let mut ctx = context(serde_json::json!({"name": "Ada"})).await;

        greeter.run(&mut ctx).await.unwrap();

        assert_eq!(*greeter.seen.lock().unwrap(), vec!["Ada".to_string()]);
    }

    #[tokio::test]
    async fn test_typed_worker_rejects_bad_params() {
        let greeter = Greeter::default();
        let mut ctx = context(serde_json::json!({"nom": "Ada"})).await;

        let err = greeter.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, JobError::Serialization(_)));
        assert!(greeter.seen.lock().unwrap().is_empty());
    }
}
