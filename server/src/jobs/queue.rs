use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("queue {0} is no longer accepting jobs")]
    Closed(String),
    #[error("unknown job name: {0}")]
    UnknownJob(String),
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("job failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

/// The view of a job handed to a processor for one attempt.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub data: Value,
    /// Attempts made before this one.
    pub attempts_made: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub queue: String,
    pub name: String,
    pub data: Value,
    pub state: JobState,
    pub attempts_made: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &Job) -> Result<Value, JobError>;
}

/// Finished records kept per queue when no other limit is given.
pub const DEFAULT_RETAINED_JOBS: usize = 1000;

struct Shared {
    name: String,
    max_attempts: u32,
    retain_finished: usize,
    jobs: DashMap<Uuid, JobRecord>,
    finished: Mutex<VecDeque<Uuid>>,
}

impl Shared {
    fn update<F: FnOnce(&mut JobRecord)>(&self, id: Uuid, f: F) {
        if let Some(mut entry) = self.jobs.get_mut(&id) {
            f(entry.value_mut());
        }
    }

    /// Note `id` as finished and drop the oldest finished records beyond
    /// `retain_finished`. Waiting and active jobs are never pruned.
    fn retire(&self, id: Uuid) {
        let mut finished = self.finished.lock();
        finished.push_back(id);
        while finished.len() > self.retain_finished {
            if let Some(oldest) = finished.pop_front() {
                self.jobs.remove(&oldest);
                tracing::debug!(queue = %self.name, job_id = %oldest, "Pruned finished job");
            }
        }
    }
}

/// Producer handle for a named queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<Shared>,
    sender: mpsc::UnboundedSender<Uuid>,
}

impl JobQueue {
    /// Create a queue and the worker that drains it.
    pub fn new(
        name: impl Into<String>,
        max_attempts: u32,
        processor: Arc<dyn JobProcessor>,
    ) -> (Self, Worker) {
        Self::with_retention(name, max_attempts, DEFAULT_RETAINED_JOBS, processor)
    }

    /// Like [`JobQueue::new`], keeping at most `retain_finished` completed or
    /// failed records (at least one).
    pub fn with_retention(
        name: impl Into<String>,
        max_attempts: u32,
        retain_finished: usize,
        processor: Arc<dyn JobProcessor>,
    ) -> (Self, Worker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            name: name.into(),
            max_attempts: max_attempts.max(1),
            retain_finished: retain_finished.max(1),
            jobs: DashMap::new(),
            finished: Mutex::new(VecDeque::new()),
        });
        let worker = Worker {
            shared: shared.clone(),
            receiver,
            processor,
        };
        (Self { shared, sender }, worker)
    }

    pub fn add(&self, name: impl Into<String>, data: Value) -> Result<Uuid, JobError> {
        let id = Uuid::new_v4();
        let record = JobRecord {
            id,
            queue: self.shared.name.clone(),
            name: name.into(),
            data,
            state: JobState::Waiting,
            attempts_made: 0,
            max_attempts: self.shared.max_attempts,
            return_value: None,
            failed_reason: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        tracing::debug!(queue = %self.shared.name, job_id = %id, job = %record.name, "Job added");
        self.shared.jobs.insert(id, record);

        if self.sender.send(id).is_err() {
            self.shared.jobs.remove(&id);
            return Err(JobError::Closed(self.shared.name.clone()));
        }
        Ok(id)
    }

    pub fn job(&self, id: Uuid) -> Option<JobRecord> {
        self.shared.jobs.get(&id).map(|entry| entry.value().clone())
    }
}

/// Single consumer for a [`JobQueue`]; processes one job at a time.
pub struct Worker {
    shared: Arc<Shared>,
    receiver: mpsc::UnboundedReceiver<Uuid>,
    processor: Arc<dyn JobProcessor>,
}

impl Worker {
    /// Run until every queue handle has been dropped.
    pub async fn run(mut self) {
        tracing::info!(queue = %self.shared.name, "Worker started");
        while self.process_next().await.is_some() {}
        tracing::info!(queue = %self.shared.name, "Worker stopped");
    }

    /// Wait for the next job and drive it to completion or final failure.
    /// Returns `None` once the queue is closed and drained.
    pub async fn process_next(&mut self) -> Option<JobRecord> {
        let id = self.receiver.recv().await?;
        self.handle(id).await;
        let record = self.shared.jobs.get(&id).map(|entry| entry.value().clone());
        if record.is_some() {
            self.shared.retire(id);
        }
        record
    }

    async fn handle(&self, id: Uuid) {
        loop {
            let Some(job) = self.start_attempt(id) else {
                return;
            };
            let attempt = job.attempts_made + 1;

            match self.processor.process(&job).await {
                Ok(value) => {
                    tracing::info!(queue = %self.shared.name, job_id = %id, attempt, "Job completed");
                    self.shared.update(id, |record| {
                        record.attempts_made = attempt;
                        record.state = JobState::Completed;
                        record.return_value = Some(value);
                        record.failed_reason = None;
                        record.finished_at = Some(Utc::now());
                    });
                    return;
                }
                Err(err) if attempt < self.shared.max_attempts => {
                    tracing::warn!(
                        queue = %self.shared.name,
                        job_id = %id,
                        attempt,
                        max_attempts = self.shared.max_attempts,
                        error = %err,
                        "Job attempt failed, retrying"
                    );
                    self.shared.update(id, |record| {
                        record.attempts_made = attempt;
                        record.state = JobState::Waiting;
                        record.failed_reason = Some(err.to_string());
                    });
                }
                Err(err) => {
                    tracing::error!(
                        queue = %self.shared.name,
                        job_id = %id,
                        attempt,
                        error = %err,
                        "Job failed after final attempt"
                    );
                    self.shared.update(id, |record| {
                        record.attempts_made = attempt;
                        record.state = JobState::Failed;
                        record.failed_reason = Some(err.to_string());
                        record.finished_at = Some(Utc::now());
                    });
                    return;
                }
            }
        }
    }

    fn start_attempt(&self, id: Uuid) -> Option<Job> {
        let mut entry = self.shared.jobs.get_mut(&id)?;
        let record = entry.value_mut();
        record.state = JobState::Active;
        Some(Job {
            id,
            name: record.name.clone(),
            data: record.data.clone(),
            attempts_made: record.attempts_made,
        })
    }
}
