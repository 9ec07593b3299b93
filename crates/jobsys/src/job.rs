use serde::{Deserialize, Serialize};

/// Parameters passed to a worker, in insertion order.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Backend specific statistics of a stored job.
pub type Stats = serde_json::Map<String, serde_json::Value>;

/// A description of work to perform by a named worker.
///
/// The higher the priority, the earlier the job is executed. Delay and time
/// to run are expressed in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    worker_name: String,
    #[serde(default)]
    worker_params: Params,
    #[serde(default)]
    queue_name: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    delay: Option<u32>,
    #[serde(default)]
    time_to_run: Option<u32>,
}

impl Job {
    pub fn new(worker_name: impl Into<String>, worker_params: Params) -> Self {
        Self {
            worker_name: worker_name.into(),
            worker_params,
            queue_name: None,
            priority: 0,
            delay: None,
            time_to_run: None,
        }
    }

    /// Builds a job from any serializable value whose JSON form is an object.
    pub fn from_params<T: Serialize>(
        worker_name: impl Into<String>,
        params: &T,
    ) -> crate::Result<Self> {
        match serde_json::to_value(params)? {
            serde_json::Value::Object(map) => Ok(Self::new(worker_name, map)),
            other => Err(crate::JobError::InvalidPayload(format!(
                "Worker parameters must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with_queue(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = Some(queue_name.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_time_to_run(mut self, time_to_run: u32) -> Self {
        self.time_to_run = Some(time_to_run);
        self
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    pub fn worker_params(&self) -> &Params {
        &self.worker_params
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn delay(&self) -> Option<u32> {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Option<u32>) {
        self.delay = delay;
    }

    pub fn time_to_run(&self) -> Option<u32> {
        self.time_to_run
    }

    pub fn set_time_to_run(&mut self, time_to_run: Option<u32>) {
        self.time_to_run = time_to_run;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("mailer", params(json!({"to": "a@b.c"})));

        assert_eq!(job.worker_name(), "mailer");
        assert_eq!(job.worker_params()["to"], "a@b.c");
        assert_eq!(job.queue_name(), None);
        assert_eq!(job.priority(), 0);
        assert_eq!(job.delay(), None);
        assert_eq!(job.time_to_run(), None);
    }

    #[test]
    fn test_builder_and_setters() {
        let mut job = Job::new("mailer", Params::new())
            .with_queue("mail")
            .with_priority(10)
            .with_delay(5)
            .with_time_to_run(120);

        assert_eq!(job.queue_name(), Some("mail"));
        assert_eq!(job.priority(), 10);
        assert_eq!(job.delay(), Some(5));
        assert_eq!(job.time_to_run(), Some(120));

        job.set_priority(-3);
        job.set_delay(None);
        job.set_time_to_run(Some(1));
        assert_eq!(job.priority(), -3);
        assert_eq!(job.delay(), None);
        assert_eq!(job.time_to_run(), Some(1));
    }

    #[test]
    fn test_params_keep_insertion_order() {
        let mut map = Params::new();
        map.insert("zeta".into(), json!(1));
        map.insert("alpha".into(), json!(2));
        let job = Job::new("w", map);

        let keys: Vec<&String> = job.worker_params().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_from_params() {
        #[derive(Serialize)]
        struct Email {
            to: String,
        }

        let job = Job::from_params("mailer", &Email { to: "x@y.z".into() }).unwrap();
        assert_eq!(job.worker_params()["to"], "x@y.z");

        let err = Job::from_params("mailer", &42).unwrap_err();
        assert!(matches!(err, crate::JobError::InvalidPayload(_)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let job: Job = serde_json::from_value(json!({"worker_name": "cleanup"})).unwrap();
        assert_eq!(job.worker_name(), "cleanup");
        assert!(job.worker_params().is_empty());
        assert_eq!(job.priority(), 0);
    }
}
