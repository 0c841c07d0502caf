//! # Common Provider Utilities
//!
//! Shared utilities used by the provider implementations: operation
//! tracking (span fields plus metrics) and Azure error body parsing.

use crate::error::SyncError;
use crate::observability::metrics;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::Span;

/// Azure error response wrapper
///
/// Both Resource Manager and the Key Vault data plane return errors as
/// `{"error": {"code": "...", "message": "..."}}`.
///
/// API Reference: https://learn.microsoft.com/en-us/azure/azure-resource-manager/templates/common-deployment-errors
#[derive(Debug, Deserialize)]
struct AzureErrorResponse {
    error: AzureErrorBody,
}

#[derive(Debug, Deserialize)]
struct AzureErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Build a [`SyncError::Api`] from a non-success status and its body
///
/// Bodies that are not Azure error JSON are carried over as the message.
pub fn api_error(service: &'static str, status: reqwest::StatusCode, body: &str) -> SyncError {
    let (code, message) = match serde_json::from_str::<AzureErrorResponse>(body) {
        Ok(parsed) => (
            parsed.error.code.unwrap_or_else(|| "Unknown".to_string()),
            parsed.error.message.unwrap_or_default(),
        ),
        Err(_) => ("Unknown".to_string(), body.to_string()),
    };

    SyncError::Api {
        service,
        status: status.as_u16(),
        code,
        message,
    }
}

/// Delay requested by the service through `Retry-After` (delta-seconds form)
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Helper struct for tracking operation state
///
/// Records `operation.success`, `operation.duration_ms` and `error.message`
/// on the span and feeds the provider metrics.
#[derive(Debug)]
pub struct OperationTracker {
    provider: &'static str,
    operation: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTracker {
    pub fn new(provider: &'static str, operation: &'static str, span: Span) -> Self {
        Self {
            provider,
            operation,
            start: Instant::now(),
            span,
        }
    }

    pub fn record_success(&self) {
        let elapsed = self.start.elapsed();
        self.span.record("operation.success", true);
        self.span
            .record("operation.duration_ms", duration_ms(elapsed));
        metrics::record_provider_operation(self.provider, self.operation, elapsed.as_secs_f64());
    }

    pub fn record_error(&self, error_message: &str) {
        let elapsed = self.start.elapsed();
        self.span.record("operation.success", false);
        self.span.record("error.message", error_message);
        self.span
            .record("operation.duration_ms", duration_ms(elapsed));
        metrics::increment_provider_operation_errors(self.provider, self.operation);
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Operation durations never approach u64::MAX milliseconds"
)]
fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
