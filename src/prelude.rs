//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use frontdoor_cert_sync::prelude::*;
//! ```
//!
//! This brings into scope:
//! - The sync job and its report
//! - Provider traits (CertificateVault, FrontDoorManager)
//! - Front Door resource types
//! - Config and error types

// Job - the single entry point
pub use crate::sync::{CertificateSyncJob, SyncReport};

// Provider traits - needed for implementing providers
pub use crate::provider::{CertificateVault, FrontDoorManager};

// Resource model
pub use crate::model::{
    CertificateSource, CertificateVersion, CustomHttpsConfiguration, FrontDoor, FrontendEndpoint,
    KeyVaultCertificateSourceParameters,
};

// Config types
pub use crate::config::{AzureAuthConfig, JobConfig, LogFormat};

// Common error types
pub use crate::error::{EndpointFailure, SyncError};

// Azure implementations
pub use crate::provider::azure::{FrontDoorClient, KeyVaultCertificates};

// Scheduling
pub use crate::scheduler::CronSchedule;
