//! Job task execution -- one task per job, from retrieval to deliverable.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state and the staging directory guard
//! - [`orchestration`] - Top-level job lifecycle
//! - [`assembly`] - Artifact discovery, archiving, and moving into the result directory

mod assembly;
mod context;
mod orchestration;


pub(crate) use context::JobTaskContext;
pub(crate) use orchestration::run_job_task;
