//! # Azure Providers
//!
//! REST clients for the Azure APIs behind the provider traits.
//!
//! - `auth`: token credentials (Workload Identity, Managed Identity, Pact mock)
//! - `key_vault`: Key Vault certificates, implements `CertificateVault`
//! - `front_door`: Front Door management (ARM), implements `FrontDoorManager`

pub mod auth;
pub mod front_door;
pub mod key_vault;

// Re-export for convenience
pub use auth::{build_credential, MockTokenCredential};
pub use front_door::{FrontDoorClient, PollSettings};
pub use key_vault::{KeyVaultCertificates, VaultEndpoint};
