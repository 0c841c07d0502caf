//! # Errors
//!
//! Classified failures of a sync run. Provider seams return `anyhow::Result`
//! and wrap these so callers can `downcast_ref::<SyncError>()` when they need
//! to tell the cases apart.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("malformed resource id '{id}': segment {index} requested but only {segments} segments present")]
    MalformedResourceId {
        id: String,
        index: usize,
        segments: usize,
    },

    #[error("malformed certificate identifier '{id}': expected .../certificates/<name>/<version>")]
    MalformedCertificateId { id: String },

    #[error("frontend endpoint {endpoint} is sourced from Key Vault but carries no vault parameters")]
    MissingVaultParameters { endpoint: String },

    #[error("{service} API error (HTTP {status}, code {code}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("long-running operation {operation} finished with status {status}: {message}")]
    OperationFailed {
        operation: String,
        status: String,
        message: String,
    },

    #[error("long-running operation {operation} did not finish after {polls} polls")]
    OperationTimedOut { operation: String, polls: u32 },

    #[error("{} of {dispatched} certificate updates failed: {}", .failures.len(), summarize(.failures))]
    UpdatesFailed {
        dispatched: usize,
        failures: Vec<EndpointFailure>,
    },
}

/// A certificate update that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub front_door: String,
    pub endpoint: String,
    pub message: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.front_door, self.endpoint, self.message)
    }
}

fn summarize(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
