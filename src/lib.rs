//! Front Door Certificate Sync Library
//!
//! Keeps Azure Front Door HTTPS certificate references pointed at the latest
//! certificate versions in Azure Key Vault.
//!
//! ## Quick Start
//!
//! ```rust
//! use frontdoor_cert_sync::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

// Re-export modules so they can be tested
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod resource_id;
pub mod runtime;
pub mod scheduler;
pub mod server;
pub mod sync;
