//! In-memory job registry
//!
//! The registry is the single source of truth for job state. It is shared by the
//! submission path (create), the job task (single writer of progress and outcome),
//! progress streams (readers), delivery (claim and remove) and the reaper.
//!
//! Locks are plain `std::sync::RwLock`s. Every critical section is a map lookup plus a
//! field copy and none is held across an `.await`, so the retriever's synchronous
//! progress callback can write into the registry directly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;

use crate::error::{Error, Result, ValidationError};
use crate::types::{Job, JobId, JobState, ProgressSnapshot, ResultLocation, VideoItem};

/// Outcome of [`JobRegistry::claim_delivery`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryClaim {
    /// The caller now owns delivery of this result
    Claimed(ResultLocation),
    /// No job with that id
    NotFound,
    /// The job has not completed (still running, or failed)
    NotReady,
    /// Another request is already delivering the result
    InProgress,
}

struct Entry {
    job: Job,
    finished: Option<Instant>,
    delivering: bool,
    notify: watch::Sender<JobState>,
}

impl Entry {
    fn set_state(&mut self, state: JobState) {
        self.job.state = state;
        self.notify.send_replace(state);
    }
}

/// Concurrent map of job id to job state
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Entry>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyBatch`] when `items` is empty, [`Error::DuplicateJob`] when
    /// the id is already registered.
    pub fn create(&self, id: JobId, items: Vec<VideoItem>) -> Result<()> {
        if items.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&id) {
            return Err(Error::DuplicateJob(id));
        }

        let (notify, _) = watch::channel(JobState::Pending);
        jobs.insert(
            id,
            Entry {
                job: Job::new(id, items),
                finished: None,
                delivering: false,
                notify,
            },
        );
        Ok(())
    }

    /// Point-in-time copy of a job
    pub fn get(&self, id: JobId) -> Option<Job> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&id).map(|entry| entry.job.clone())
    }

    /// Replace the job's progress; ignored for absent or terminal jobs
    pub fn apply_progress(&self, id: JobId, snapshot: ProgressSnapshot) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(&id) {
            Some(entry) if !entry.job.is_terminal() => {
                entry.job.progress = Some(snapshot);
                true
            }
            _ => false,
        }
    }

    /// Move a pending job to running
    pub fn mark_running(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(&id) {
            Some(entry) if entry.job.state == JobState::Pending => {
                entry.set_state(JobState::Running);
                true
            }
            _ => false,
        }
    }

    /// Record the job's deliverable. Refused if the job is already terminal.
    pub fn mark_completed(&self, id: JobId, result: ResultLocation) -> bool {
        self.finish(id, JobState::Completed, |job| job.result = Some(result))
    }

    /// Record the job's failure. Refused if the job is already terminal.
    pub fn mark_failed(&self, id: JobId, message: impl Into<String>) -> bool {
        let message = message.into();
        self.finish(id, JobState::Failed, |job| job.error = Some(message))
    }

    fn finish(&self, id: JobId, state: JobState, apply: impl FnOnce(&mut Job)) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = jobs.get_mut(&id) else {
            return false;
        };

        if entry.job.is_terminal() {
            tracing::warn!(
                job_id = %id,
                current = ?entry.job.state,
                requested = ?state,
                "refusing second terminal transition"
            );
            return false;
        }

        apply(&mut entry.job);
        entry.job.finished_at = Some(Utc::now());
        entry.finished = Some(Instant::now());
        entry.set_state(state);
        true
    }

    /// Remove a job, returning its final state
    pub fn remove(&self, id: JobId) -> Option<Job> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.remove(&id).map(|entry| entry.job)
    }

    /// Receiver notified on every state transition of the job
    ///
    /// The sender is dropped with the entry, so a receiver observes removal as a closed
    /// channel.
    pub fn subscribe(&self, id: JobId) -> Option<watch::Receiver<JobState>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&id).map(|entry| entry.notify.subscribe())
    }

    /// Take exclusive ownership of delivering a completed job's result
    pub fn claim_delivery(&self, id: JobId) -> DeliveryClaim {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = jobs.get_mut(&id) else {
            return DeliveryClaim::NotFound;
        };

        let Some(result) = entry.job.result.clone() else {
            return DeliveryClaim::NotReady;
        };

        if entry.delivering {
            return DeliveryClaim::InProgress;
        }

        entry.delivering = true;
        DeliveryClaim::Claimed(result)
    }

    /// Give up a claim without delivering (e.g., the file was missing)
    pub fn release_delivery(&self, id: JobId) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = jobs.get_mut(&id) {
            entry.delivering = false;
        }
    }

    /// Remove and return terminal jobs finished at least `ttl` ago and not being delivered
    ///
    /// Selection and removal happen under one write lock, so a delivery cannot claim a
    /// job between the two.
    pub fn take_expired(&self, ttl: Duration) -> Vec<Job> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let ids: Vec<JobId> = jobs
            .iter()
            .filter(|(_, entry)| Self::is_expired(entry, ttl))
            .map(|(id, _)| *id)
            .collect();
        ids.iter()
            .filter_map(|id| jobs.remove(id))
            .map(|entry| entry.job)
            .collect()
    }

    fn is_expired(entry: &Entry, ttl: Duration) -> bool {
        !entry.delivering && entry.finished.is_some_and(|at| at.elapsed() >= ttl)
    }

    /// Number of jobs that have not reached a terminal state
    pub fn active_count(&self) -> usize {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.values().filter(|entry| !entry.job.is_terminal()).count()
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no jobs are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
