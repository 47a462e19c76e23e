//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the tube-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the tube-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tube-dl REST API",
        version = "0.1.0",
        description = "Submit batches of video URLs, follow their progress over server-sent events, and download the result once",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_download,
        crate::api::routes::get_job,

        // Progress
        crate::api::routes::progress_events,

        // Delivery
        crate::api::routes::download_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobState,
        crate::types::VideoItem,
        crate::types::ProgressSnapshot,
        crate::types::ResultLocation,
        crate::types::JobSnapshot,
        crate::types::SubmitRequest,
        crate::types::SubmitResponse,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StorageConfig,
        crate::config::JobConfig,
        crate::config::RetrievalConfig,
        crate::config::NetworkConfig,
        crate::config::ApiConfig,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Job submission and snapshots"),
        (name = "progress", description = "Live job progress over server-sent events"),
        (name = "delivery", description = "One-shot result download"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
