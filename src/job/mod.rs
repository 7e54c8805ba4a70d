//! Job controller: runs in the background with pollable progress
//!
//! Each run gets its own [`RunState`] behind a lock that only the run's
//! driving task writes. Callers poll [`JobController::status`] or block on
//! [`JobController::wait`]; completion sinks fire before the state is sealed.

pub mod sinks;

pub use sinks::{CompletionSink, HistoryIndexEntry, HistoryRecord, JsonHistorySink};

use crate::error::Result;
use crate::logging::RunLogger;
use crate::models::{Config, ProbeResult, ResultEnvelope, TargetSet};
use crate::probes::ProbeSuite;
use crate::runner::StepRunner;
use crate::types::{Category, ExecutionMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// Identifier of one run, `job-<uuid>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(format!("job-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Mutable progress of one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub job_id: JobId,
    /// Fixed before the first probe runs
    pub total_steps: usize,
    pub completed_steps: usize,
    pub results: ResultEnvelope,
    pub done: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(job_id: JobId, total_steps: usize, meta: Option<serde_json::Value>) -> Self {
        Self {
            job_id,
            total_steps,
            completed_steps: 0,
            results: ResultEnvelope::new(meta),
            done: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, category: Category, result: ProbeResult) {
        self.results.push(category, result);
        self.completed_steps += 1;
    }

    pub fn seal(&mut self) {
        self.done = true;
        self.finished_at = Some(Utc::now());
    }

    /// Whole percent, 0..=100
    pub fn progress(&self) -> u8 {
        let percent = self.completed_steps * 100 / self.total_steps.max(1);
        percent.min(100) as u8
    }

    pub fn snapshot(&self) -> JobStatus {
        JobStatus {
            job_id: self.job_id.clone(),
            progress: self.progress(),
            done: self.done,
            completed_steps: self.completed_steps,
            total_steps: self.total_steps,
            results: self.results.clone(),
        }
    }
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub progress: u8,
    pub done: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub results: ResultEnvelope,
}

struct JobEntry {
    state: Arc<RwLock<RunState>>,
    done: watch::Receiver<bool>,
}

pub struct JobController {
    probes: Arc<dyn ProbeSuite>,
    mode: ExecutionMode,
    sinks: Vec<Arc<dyn CompletionSink>>,
    logger: Arc<RunLogger>,
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobController {
    pub fn new(probes: Arc<dyn ProbeSuite>, config: &Config) -> Self {
        Self {
            probes,
            mode: config.execution_mode(),
            sinks: Vec::new(),
            logger: Arc::new(RunLogger::new(config)),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn CompletionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Validate `targets` and start a run on its own task
    pub async fn start(&self, targets: TargetSet, meta: Option<serde_json::Value>) -> Result<JobId> {
        let mut runner = StepRunner::new(targets, Arc::clone(&self.probes))?.with_mode(self.mode);
        let job_id = JobId::new();
        let total_steps = runner.total_steps();
        let state = Arc::new(RwLock::new(RunState::new(job_id.clone(), total_steps, meta)));
        let (done_tx, done_rx) = watch::channel(false);

        self.jobs.write().await.insert(
            job_id.clone(),
            JobEntry {
                state: Arc::clone(&state),
                done: done_rx,
            },
        );

        let sinks = self.sinks.clone();
        let logger = Arc::clone(&self.logger);
        let id = job_id.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let correlation_id = logger.run_started(id.as_str(), total_steps).await;

            while let Some((category, result)) = runner.next_step().await {
                let completed = {
                    let mut state = state.write().await;
                    state.record(category, result.clone());
                    state.completed_steps
                };
                logger
                    .step_completed(&correlation_id, completed, total_steps, category, &result)
                    .await;
            }

            let envelope = state.read().await.results.clone();
            logger
                .run_finished(&correlation_id, id.as_str(), &envelope.summary(), started.elapsed())
                .await;

            // History lands before `done` becomes observable
            for sink in &sinks {
                if let Err(e) = sink.complete(&id, &envelope).await {
                    logger.sink_failed(&correlation_id, sink.name(), &e).await;
                }
            }

            state.write().await.seal();
            let _ = done_tx.send(true);
        });

        Ok(job_id)
    }

    pub async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        let state = {
            let jobs = self.jobs.read().await;
            Arc::clone(&jobs.get(job_id)?.state)
        };
        let snapshot = state.read().await.snapshot();
        Some(snapshot)
    }

    /// Block until the run is sealed and its sinks have run
    pub async fn wait(&self, job_id: &JobId) -> Option<JobStatus> {
        let mut done = {
            let jobs = self.jobs.read().await;
            jobs.get(job_id)?.done.clone()
        };
        // An error means the task is gone; report whatever state it left
        let _ = done.wait_for(|finished| *finished).await;
        self.status(job_id).await
    }

    /// Forget a run; a still-running task finishes unobserved
    pub async fn remove(&self, job_id: &JobId) -> bool {
        self.jobs.write().await.remove(job_id).is_some()
    }

    pub async fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
