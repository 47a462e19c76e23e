//! REST API server example
//!
//! Runs tube-dl with the HTTP API on the configured bind address (port 5000 by default).
//! Pass a JSON config file as the first argument to override the defaults.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:5000/swagger-ui
//! - Submit a batch via POST http://localhost:5000/api/download
//! - Follow a job via GET http://localhost:5000/api/progress/{job_id}
//! - Fetch the result via the `download_url` of the final progress event

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tube_dl::api::start_api_server;
use tube_dl::{Config, TubeDownloader, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tube_dl=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str::<Config>(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    let address = config.server.api.bind_address;

    let downloader = TubeDownloader::new(config).await?;
    let config_arc = downloader.get_config();

    println!("Starting tube-dl REST API server on http://{address}");
    println!("Swagger UI: http://{address}/swagger-ui");
    println!();
    println!("Example commands:");
    println!("  curl -X POST http://{address}/api/download \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"videoUrls\": \"https://youtu.be/dQw4w9WgXcQ\"}}'");
    println!();
    println!("  curl -N http://{address}/api/progress/<job_id>");

    let server = tokio::spawn(start_api_server(Arc::new(downloader.clone()), config_arc));

    // Jobs already running finish before the process exits
    run_with_shutdown(downloader).await?;
    server.abort();

    Ok(())
}
