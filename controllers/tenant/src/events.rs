//! Kubernetes Events for sync outcomes.
//!
//! Publishing is fire-and-forget: a failure to record is logged and never
//! turns a successful sync into a failed one.

use async_trait::async_trait;
use crds::Tenant;
use kube::Client;
use kube::Resource;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

use crate::error::ControllerError;
use crate::upsert::OperationResult;

/// Reason used for every failed sync event
pub const REASON_ERROR: &str = "Error";

/// Records the outcome of one upsert against a tenant, scoped to a namespace
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        tenant: &Tenant,
        namespace: &str,
        message: &str,
        outcome: &Result<OperationResult, ControllerError>,
    );
}

/// Publishes events through the cluster's events API
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    pub fn new(client: Client, controller: impl Into<String>, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: controller.into(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        tenant: &Tenant,
        namespace: &str,
        message: &str,
        outcome: &Result<OperationResult, ControllerError>,
    ) {
        let event = build_event(namespace, message, outcome);
        if let Err(e) = self.recorder.publish(&event, &tenant.object_ref(&())).await {
            warn!(
                "Failed to publish event for Tenant {}: {}",
                tenant.metadata.name.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}

/// Normal event with the operation result as reason, or a Warning carrying the error
pub(crate) fn build_event(
    namespace: &str,
    message: &str,
    outcome: &Result<OperationResult, ControllerError>,
) -> Event {
    match outcome {
        Ok(result) => Event {
            type_: EventType::Normal,
            reason: reason(*result).to_string(),
            note: Some(format!("{message} in Namespace {namespace}: {result}")),
            action: message.to_string(),
            secondary: None,
        },
        Err(e) => Event {
            type_: EventType::Warning,
            reason: REASON_ERROR.to_string(),
            note: Some(format!("{message} in Namespace {namespace} failed: {e}")),
            action: message.to_string(),
            secondary: None,
        },
    }
}

fn reason(result: OperationResult) -> &'static str {
    match result {
        OperationResult::Created => "Created",
        OperationResult::Updated => "Updated",
        OperationResult::Unchanged => "Unchanged",
    }
}
