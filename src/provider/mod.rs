//! # Provider Modules
//!
//! Seams to the two cloud APIs the sync job talks to.
//!
//! - `CertificateVault` looks up the latest certificate version in a vault
//! - `FrontDoorManager` lists Front Doors and their endpoints and updates HTTPS settings
//!
//! The job only sees these traits, so tests substitute in-memory fakes and
//! production wires the Azure REST clients from [`azure`].

use crate::model::{CertificateVersion, CustomHttpsConfiguration, FrontDoor, FrontendEndpoint};
use anyhow::Result;
use async_trait::async_trait;

/// Provider trait for certificate vaults
#[async_trait]
pub trait CertificateVault: Send + Sync {
    /// Get the version identifier of the latest version of a certificate
    async fn latest_certificate_version(
        &self,
        vault_name: &str,
        certificate_name: &str,
    ) -> Result<CertificateVersion>;
}

/// Provider trait for the Front Door management API
#[async_trait]
pub trait FrontDoorManager: Send + Sync {
    /// List every Front Door visible to the job, all pages drained
    async fn list_front_doors(&self) -> Result<Vec<FrontDoor>>;

    /// List every frontend endpoint of a Front Door, all pages drained
    async fn list_frontend_endpoints(
        &self,
        resource_group: &str,
        front_door: &str,
    ) -> Result<Vec<FrontendEndpoint>>;

    /// Apply an HTTPS configuration to a frontend endpoint
    /// Returns once the service reports the change as complete
    async fn enable_https(
        &self,
        resource_group: &str,
        front_door: &str,
        endpoint: &str,
        configuration: &CustomHttpsConfiguration,
    ) -> Result<()>;
}

// Common utilities shared across providers
pub mod common;

// Provider implementations
pub mod azure;
