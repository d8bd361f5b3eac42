//! Controller settings, read once from the environment at startup.

use std::time::Duration;

use envconfig::Envconfig;

use crate::error::ControllerError;
use crate::retry::RetryPolicy;

/// Raw environment, before validation
#[derive(Envconfig, Clone, Debug)]
pub struct EnvSettings {
    /// Seconds between resyncs of a healthy tenant
    #[envconfig(from = "TENANT_RESYNC_SECONDS", default = "300")]
    pub resync_seconds: u64,

    /// Maximum tenants reconciled at once
    #[envconfig(from = "TENANT_RECONCILE_CONCURRENCY", default = "3")]
    pub concurrency: u16,

    /// Attempts per conflicting write, including the first
    #[envconfig(from = "CONFLICT_RETRY_STEPS", default = "4")]
    pub retry_steps: u32,

    /// Upper bound on a single conflict retry delay
    #[envconfig(from = "CONFLICT_RETRY_MAX_DELAY_MS", default = "1000")]
    pub retry_max_delay_ms: u64,

    /// Controller name reported on events
    #[envconfig(from = "EVENT_REPORTER", default = "tenant-controller")]
    pub reporter: String,

    /// Instance name reported on events (the pod name in-cluster)
    #[envconfig(from = "POD_NAME")]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub resync_interval: Duration,
    pub concurrency: u16,
    pub retry: RetryPolicy,
    pub reporter: String,
    pub instance: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(300),
            concurrency: 3,
            retry: RetryPolicy::default(),
            reporter: "tenant-controller".to_string(),
            instance: None,
        }
    }
}

impl Settings {
    /// Load and validate settings from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        let env = EnvSettings::init_from_env()
            .map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;
        Self::try_from(env)
    }
}

impl TryFrom<EnvSettings> for Settings {
    type Error = ControllerError;

    fn try_from(env: EnvSettings) -> Result<Self, Self::Error> {
        if env.resync_seconds == 0 {
            return Err(ControllerError::InvalidConfig("TENANT_RESYNC_SECONDS must be positive".to_string()));
        }
        if env.concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "TENANT_RECONCILE_CONCURRENCY must be positive".to_string(),
            ));
        }
        if env.retry_steps == 0 {
            return Err(ControllerError::InvalidConfig("CONFLICT_RETRY_STEPS must be at least 1".to_string()));
        }

        let defaults = Self::default();
        Ok(Self {
            resync_interval: Duration::from_secs(env.resync_seconds),
            concurrency: env.concurrency,
            retry: RetryPolicy {
                steps: env.retry_steps,
                max_delay: Duration::from_millis(env.retry_max_delay_ms),
                ..defaults.retry
            },
            reporter: Some(env.reporter)
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.reporter),
            instance: env.instance.filter(|v| !v.is_empty()),
        })
    }
}
