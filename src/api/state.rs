//! Application state for the API server

use crate::TubeDownloader;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request.
#[derive(Clone)]
pub struct AppState {
    /// The engine handling submissions, streams and deliveries
    pub downloader: Arc<TubeDownloader>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<TubeDownloader>) -> Self {
        Self { downloader }
    }
}
