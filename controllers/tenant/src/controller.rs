//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, object store and event recorder into a `Reconciler` and runs the
//! Tenant watcher.

use std::sync::Arc;

use cluster_store::KubeClusterStore;
use crds::validate_label_keys;
use kube::Client;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Settings;
use crate::error::ControllerError;
use crate::events::KubeEventPublisher;
use crate::reconciler::Reconciler;
use crate::watcher::watch_tenants;

/// Main controller for Tenant resources.
pub struct Controller {
    tenant_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts watching.
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        info!("Initializing Tenant Controller");

        validate_label_keys()?;

        let client = Client::try_default().await?;

        let reconciler = Reconciler::new(
            Arc::new(KubeClusterStore::new(client.clone())),
            Arc::new(KubeEventPublisher::new(
                client.clone(),
                settings.reporter.clone(),
                settings.instance.clone(),
            )),
            settings.retry.clone(),
        );

        let tenant_watcher = tokio::spawn(async move { watch_tenants(client, reconciler, &settings).await });

        Ok(Self { tenant_watcher })
    }

    /// Runs until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Tenant Controller running");

        self.tenant_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Tenant watcher panicked: {e}")))??;

        info!("Tenant Controller stopped");
        Ok(())
    }
}
