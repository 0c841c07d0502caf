//! # Azure Authentication
//!
//! Builds the `TokenCredential` shared by the Key Vault and Front Door
//! clients, and fetches bearer tokens from it.

use crate::config::AzureAuthConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{ManagedIdentityCredential, WorkloadIdentityCredential};
use std::sync::Arc;
use tracing::{debug, info};

/// Mock TokenCredential for Pact testing
/// Returns a dummy token without attempting real Azure authentication
#[derive(Debug)]
pub struct MockTokenCredential;

#[async_trait]
impl TokenCredential for MockTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(AccessToken::new(
            Secret::new("test-token".to_string()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

/// Create the credential for the configured authentication method
///
/// # Errors
/// Returns an error if the Azure identity credential cannot be constructed
pub fn build_credential(auth: &AzureAuthConfig) -> Result<Arc<dyn TokenCredential>> {
    let credential: Arc<dyn TokenCredential> = match auth {
        AzureAuthConfig::Mock => {
            debug!("Pact mode: using mock Azure credential");
            Arc::new(MockTokenCredential)
        }
        AzureAuthConfig::WorkloadIdentity { client_id } => {
            info!(
                "Using Azure Workload Identity authentication with client ID: {}",
                client_id
            );
            let options = azure_identity::WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .context("Failed to create WorkloadIdentityCredential")?
        }
        AzureAuthConfig::ManagedIdentity => {
            info!("No workload identity configured, using Managed Identity");
            ManagedIdentityCredential::new(None)
                .context("Failed to create ManagedIdentityCredential")?
        }
    };

    Ok(credential)
}

/// `.default` scope for a resource URI such as `https://management.azure.com`
#[must_use]
pub fn token_scope(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

/// Fetch a bearer token for `scope`
///
/// # Errors
/// Returns an error if the credential cannot issue a token
pub async fn bearer_token(credential: &Arc<dyn TokenCredential>, scope: &str) -> Result<String> {
    let options = Some(TokenRequestOptions::default());
    let token = credential
        .get_token(&[scope], options)
        .await
        .with_context(|| format!("Failed to get Azure access token for scope {scope}"))?;
    Ok(format!("Bearer {}", token.token.secret()))
}
