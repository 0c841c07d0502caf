//! # Constants
//!
//! Shared constants used throughout the job.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default cron schedule: every day at midnight UTC (sec min hour dom month dow)
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * *";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Azure Resource Manager endpoint for the public cloud
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// DNS suffix appended to vault names to build Key Vault URLs
pub const DEFAULT_KEY_VAULT_DNS_SUFFIX: &str = "vault.azure.net";

/// Front Door management API version
pub const FRONT_DOOR_API_VERSION: &str = "2020-05-01";

/// Key Vault data-plane API version
pub const KEY_VAULT_API_VERSION: &str = "7.4";

/// Key Vault token scope when vaults are not addressed by DNS suffix
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Certificate source value marking a Key Vault backed HTTPS configuration
pub const KEY_VAULT_CERTIFICATE_SOURCE: &str = "AzureKeyVault";

/// Certificate source value for Front Door managed certificates
pub const FRONT_DOOR_CERTIFICATE_SOURCE: &str = "FrontDoor";

/// Default delay between long-running operation polls when no `Retry-After` is sent (seconds)
pub const DEFAULT_LRO_POLL_INTERVAL_SECS: u64 = 10;

/// Default maximum number of long-running operation polls before giving up
pub const DEFAULT_LRO_MAX_POLLS: u32 = 60;

/// Non-empty `/`-segment holding the resource group name in an ARM resource id
pub const RESOURCE_GROUP_SEGMENT: usize = 3;

/// Non-empty `/`-segment holding the vault name in a Key Vault resource id
pub const VAULT_NAME_SEGMENT: usize = 7;
