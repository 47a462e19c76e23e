//! Shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::Result;

use super::TubeDownloader;

/// How long shutdown waits for running jobs
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl TubeDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops the reaper
    /// 3. Waits for active jobs to finish with a timeout (30 seconds)
    ///
    /// Jobs cannot be cancelled, so a job still running after the timeout keeps running
    /// until the runtime itself stops.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.runtime.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Stop background services
        self.runtime.shutdown_token.cancel();
        self.runtime.tracker.close();

        // 3. Wait for active jobs
        let active_count = self.registry.active_count();
        tracing::debug!(active_count, "Waiting for active jobs to complete");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.runtime.tracker.wait()).await {
            Ok(()) => tracing::info!("All active jobs completed"),
            Err(_) => tracing::warn!(
                active_count = self.registry.active_count(),
                "Timeout waiting for jobs to complete, proceeding with shutdown"
            ),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.runtime.accepting_new.load(Ordering::SeqCst)
    }
}
