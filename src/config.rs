//! # Job Configuration
//!
//! Job-level settings loaded from environment variables.
//!
//! All settings have sensible defaults and can be overridden via environment
//! variables (populated from a ConfigMap or the scheduler's task definition).
//! CLI flags in `main` take precedence over the environment.

use crate::constants::{
    DEFAULT_KEY_VAULT_DNS_SUFFIX, DEFAULT_LRO_MAX_POLLS, DEFAULT_LRO_POLL_INTERVAL_SECS,
    DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_METRICS_PORT, DEFAULT_SCHEDULE,
};
use crate::provider::azure::{PollSettings, VaultEndpoint};
use anyhow::{bail, Result};
use std::time::Duration;

/// Azure authentication method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureAuthConfig {
    /// Workload Identity with an explicit client ID (`AZURE_CLIENT_ID`)
    WorkloadIdentity { client_id: String },
    /// Managed Identity of the host (default)
    ManagedIdentity,
    /// Dummy token for Pact mock servers
    Mock,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Job-level configuration
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Cron expression for scheduled runs (6-field with seconds, or 5-field)
    pub schedule: String,
    /// Run once immediately when the scheduler starts
    pub run_on_startup: bool,
    /// Report stale endpoints without updating them
    pub dry_run: bool,
    /// Subscription whose Front Doors are synchronized
    pub subscription_id: Option<String>,
    /// Azure authentication method
    pub auth: AzureAuthConfig,
    /// Azure Resource Manager endpoint
    pub management_endpoint: String,
    /// Key Vault URL scheme
    pub key_vault_endpoint: VaultEndpoint,
    /// PACT_MODE: route all API calls to mock servers
    pub pact_mode: bool,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Enable the metrics and probe server
    pub enable_metrics: bool,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Delay between enableHttps polls without Retry-After (seconds)
    pub lro_poll_interval_secs: u64,
    /// Maximum enableHttps polls before timing out
    pub lro_max_polls: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_string(),
            run_on_startup: false,
            dry_run: false,
            subscription_id: None,
            auth: AzureAuthConfig::ManagedIdentity,
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            key_vault_endpoint: VaultEndpoint::DnsSuffix(DEFAULT_KEY_VAULT_DNS_SUFFIX.to_string()),
            pact_mode: false,
            metrics_port: DEFAULT_METRICS_PORT,
            enable_metrics: true,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Text,
            lro_poll_interval_secs: DEFAULT_LRO_POLL_INTERVAL_SECS,
            lro_max_polls: DEFAULT_LRO_MAX_POLLS,
        }
    }
}

impl JobConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };
        let pact_mode = env.get("PACT_MODE").is_some();

        let auth = if pact_mode {
            AzureAuthConfig::Mock
        } else {
            match env.get("AZURE_CLIENT_ID") {
                Some(client_id) => AzureAuthConfig::WorkloadIdentity { client_id },
                None => AzureAuthConfig::ManagedIdentity,
            }
        };

        let management_endpoint = if pact_mode {
            env.get("FRONT_DOOR_ENDPOINT")
        } else {
            env.get("MANAGEMENT_ENDPOINT")
        }
        .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string());

        let key_vault_endpoint = match env.get("AZURE_KEY_VAULT_ENDPOINT").filter(|_| pact_mode) {
            Some(endpoint) => VaultEndpoint::Fixed(endpoint),
            None => VaultEndpoint::DnsSuffix(env.string(
                "KEY_VAULT_DNS_SUFFIX",
                DEFAULT_KEY_VAULT_DNS_SUFFIX,
            )),
        };

        let log_format = match env.string("LOG_FORMAT", "text").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            schedule: env.string("SCHEDULE", DEFAULT_SCHEDULE),
            run_on_startup: env.bool("RUN_ON_STARTUP", false),
            dry_run: env.bool("DRY_RUN", false),
            subscription_id: env.get("AZURE_SUBSCRIPTION_ID"),
            auth,
            management_endpoint,
            key_vault_endpoint,
            pact_mode,
            metrics_port: env.parsed("METRICS_PORT", DEFAULT_METRICS_PORT),
            enable_metrics: env.bool("ENABLE_METRICS", true),
            log_level: env.string("LOG_LEVEL", "INFO"),
            log_format,
            lro_poll_interval_secs: env
                .parsed("LRO_POLL_INTERVAL_SECS", DEFAULT_LRO_POLL_INTERVAL_SECS),
            lro_max_polls: env.parsed("LRO_MAX_POLLS", DEFAULT_LRO_MAX_POLLS),
        }
    }

    /// Long-running operation polling limits
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.lro_poll_interval_secs),
            max_polls: self.lro_max_polls,
        }
    }

    /// Subscription ID, required before any Azure client is built
    ///
    /// # Errors
    /// Returns an error if `AZURE_SUBSCRIPTION_ID` is not set
    pub fn require_subscription_id(&self) -> Result<&str> {
        match self.subscription_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => bail!("AZURE_SUBSCRIPTION_ID must be set to the subscription that owns the Front Doors"),
        }
    }

    /// Reject endpoint combinations that would send mock traffic to Azure
    ///
    /// # Errors
    /// Returns an error if PACT_MODE points at production Azure endpoints
    pub fn validate(&self) -> Result<()> {
        if !self.pact_mode {
            return Ok(());
        }

        if self.management_endpoint.contains("management.azure.com") {
            bail!(
                "PACT_MODE enabled but Front Door endpoint '{}' points to production Azure. \
                Set FRONT_DOOR_ENDPOINT to a mock server.",
                self.management_endpoint
            );
        }

        match &self.key_vault_endpoint {
            VaultEndpoint::Fixed(endpoint) if !endpoint.contains("vault.azure.net") => Ok(()),
            VaultEndpoint::Fixed(endpoint) => bail!(
                "PACT_MODE enabled but Key Vault endpoint '{endpoint}' points to production Azure."
            ),
            VaultEndpoint::DnsSuffix(_) => bail!(
                "PACT_MODE enabled but Azure Key Vault endpoint not configured. \
                Set AZURE_KEY_VAULT_ENDPOINT environment variable."
            ),
        }
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    /// Read variable as string or return default
    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Read variable or return default value when missing or unparsable
    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Read variable as boolean or return default
    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|v| {
                let v_lower = v.to_lowercase();
                v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
            })
            .unwrap_or(default)
    }
}
