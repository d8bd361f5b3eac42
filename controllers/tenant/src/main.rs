//! Tenant Controller
//!
//! Keeps every namespace owned by a Tenant converged to the Tenant spec:
//! - namespace annotations and labels (node selector, allowed ingress classes,
//!   storage classes and registries, additional metadata)
//! - one LimitRange per `spec.limitRanges.items` entry, pruned when removed
//! - the Tenant status: sorted namespace membership and its size

mod backoff;
mod config;
mod controller;
mod error;
mod events;
mod reconciler;
mod retry;
mod upsert;
mod watcher;
#[cfg(test)]
mod test_utils;

use config::Settings;
use controller::Controller;
use error::ControllerError;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("Crypto provider already installed; proceeding");
    }

    info!("Starting Tenant Controller");

    let settings = Settings::from_env()?;
    info!("Configuration:");
    info!("  Resync interval: {:?}", settings.resync_interval);
    info!("  Concurrency: {}", settings.concurrency);
    info!("  Conflict retry: {} attempts, max delay {:?}", settings.retry.steps, settings.retry.max_delay);
    info!("  Event reporter: {}", settings.reporter);

    let controller = Controller::new(settings).await?;
    controller.run().await?;

    Ok(())
}
