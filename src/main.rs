//! Picture frame worker entry point
//!
//! Runs the image pipeline on a fixed interval. Per-invocation errors are
//! logged and swallowed so the next tick is unaffected; ctrl-c triggers a
//! graceful shutdown between invocations.
//!
//! Environment variables:
//! - CONFIG_STORE_ENDPOINT: remote configuration store base URL (required)
//! - CONFIG_STORE_TOKEN: bearer token for the store and vault (required)
//! - IMAGE_API_ENDPOINT: generation API base URL (default: https://api.openai.com)
//! - S3_ENDPOINT: custom object storage endpoint (optional)
//! - TICK_INTERVAL_SECS: seconds between invocations (default: 60)
//! - EMAIL_POLL_INTERVAL_MS: delay between send-status polls (default: 1000)
//! - EMAIL_POLL_MAX_ATTEMPTS: poll budget per send (default: 30)

use std::time::Duration;

use picture_frame_service::config::Settings;
use picture_frame_service::pipeline::Pipeline;
use picture_frame_service::services::storage::StorageUploader;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "picture_frame_service=info"
                        .parse()
                        .expect("valid directive"),
                ),
        )
        .init();

    info!("Starting picture frame worker");

    dotenvy::dotenv().ok();
    let settings = Settings::from_env().map_err(|e| format!("{e}"))?;
    info!(
        config_store = %settings.config_store_endpoint,
        tick_interval_secs = settings.tick_interval_secs,
        "Configuration loaded"
    );

    let uploader = StorageUploader::from_env(&settings).await;
    let pipeline = Pipeline::new(&settings, uploader);

    // Graceful shutdown on SIGINT
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Invocations are awaited inside the tick loop, so a slow run delays the
    // next tick rather than overlapping it.
    let mut interval = tokio::time::interval(Duration::from_secs(settings.tick_interval_secs));
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                info!("picture frame run starting");
                match pipeline.run_invocation().await {
                    Ok(()) => info!("picture frame run done"),
                    Err(e) => error!(error = %e, "picture frame run failed"),
                }
            }
        }
    }

    info!("Picture frame worker stopped");
    Ok(())
}
