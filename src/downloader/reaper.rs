//! Reaper for finished jobs nobody collected.

use super::TubeDownloader;
use super::delivery::remove_result_dir;

impl TubeDownloader {
    /// Start the reaper background task
    ///
    /// Every `reap_interval` it removes terminal jobs that finished more than `job_ttl`
    /// ago, together with their result directories. Pending, running and currently
    /// delivering jobs are left alone. The task stops on shutdown.
    pub(crate) fn start_reaper(&self) {
        let downloader = self.clone();
        let token = self.runtime.shutdown_token.clone();
        let interval = self.config.jobs.reap_interval;

        self.runtime.tracker.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        downloader.reap_expired().await;
                    }
                }
            }
        });
    }

    /// Remove expired jobs now, returning how many were removed
    pub async fn reap_expired(&self) -> usize {
        let expired = self.registry.take_expired(self.config.jobs.job_ttl);

        for job in &expired {
            let dir = self
                .config
                .storage
                .result_root
                .join(job.id.result_dir_name());
            remove_result_dir(job.id, &dir).await;
            tracing::info!(job_id = %job.id, state = ?job.state, "Reaped expired job");
        }

        expired.len()
    }
}
