//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Job submission and snapshots
//! - [`progress`] - Live progress over server-sent events
//! - [`delivery`] - One-shot result download
//! - [`system`] - Health and OpenAPI

use crate::types::JobId;

mod delivery;
mod jobs;
mod progress;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use delivery::*;
pub use jobs::*;
pub use progress::*;
pub use system::*;

/// Parse a path segment as a job id; malformed ids name no job
fn parse_job_id(raw: &str) -> Option<JobId> {
    raw.parse().ok()
}
