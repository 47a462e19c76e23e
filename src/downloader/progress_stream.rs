//! Live job snapshots for streaming clients.
//!
//! A stream emits the job's snapshot immediately, then again whenever the job changes
//! state or the poll interval elapses, whichever comes first. It ends after emitting a
//! completed or failed snapshot, or as soon as the job is no longer registered.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::watch;

use crate::registry::JobRegistry;
use crate::types::{JobId, JobSnapshot, JobState};

use super::TubeDownloader;

struct StreamState {
    id: JobId,
    registry: Arc<JobRegistry>,
    changes: Option<watch::Receiver<JobState>>,
    poll_interval: Duration,
    started: bool,
    finished: bool,
}

impl StreamState {
    /// Wait for a state transition or the poll interval
    async fn tick(&mut self) {
        match self.changes.as_mut() {
            Some(changes) => {
                tokio::select! {
                    changed = changes.changed() => {
                        // Sender gone means the job was removed; the next read ends the stream
                        if changed.is_err() {
                            self.changes = None;
                        }
                    }
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
            None => tokio::time::sleep(self.poll_interval).await,
        }
    }
}

impl TubeDownloader {
    /// Stream of snapshots for a job
    ///
    /// An unknown id yields an empty stream.
    pub fn progress_stream(&self, id: JobId) -> impl Stream<Item = JobSnapshot> + Send + use<> {
        let state = StreamState {
            id,
            registry: Arc::clone(&self.registry),
            changes: self.registry.subscribe(id),
            poll_interval: self.config.jobs.poll_interval,
            started: false,
            finished: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            if state.started {
                state.tick().await;
            }
            state.started = true;

            let job = state.registry.get(state.id)?;
            let snapshot = JobSnapshot::from(&job);
            state.finished = snapshot.is_final();
            Some((snapshot, state))
        })
    }
}
