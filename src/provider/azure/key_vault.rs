//! # Azure Key Vault Certificates Client
//!
//! Looks up the latest version of a Key Vault certificate through the REST
//! API: `GET {vault}/certificates/{name}?api-version=7.4`.
//!
//! The version is the last path segment of the returned certificate `id`
//! (`https://{vault}.vault.azure.net/certificates/{name}/{version}`). A
//! certificate and its backing secret share name and version, which is what
//! Front Door references.
//!
//! References:
//! - [Get Certificate](https://learn.microsoft.com/en-us/rest/api/keyvault/certificates/get-certificate/get-certificate)

use crate::constants::{KEY_VAULT_API_VERSION, KEY_VAULT_SCOPE};
use crate::error::SyncError;
use crate::model::CertificateVersion;
use crate::provider::azure::auth::{bearer_token, token_scope};
use crate::provider::common::{api_error, OperationTracker};
use crate::provider::CertificateVault;
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, field, Instrument};

const PROVIDER: &str = "azure_key_vault";

/// How vault names map to data-plane URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEndpoint {
    /// `https://{vault}.{suffix}/`
    DnsSuffix(String),
    /// Every vault served from one URL (Pact mock server)
    Fixed(String),
}

impl VaultEndpoint {
    #[must_use]
    pub fn vault_url(&self, vault_name: &str) -> String {
        match self {
            Self::DnsSuffix(suffix) => format!("https://{vault_name}.{suffix}/"),
            Self::Fixed(url) if url.ends_with('/') => url.clone(),
            Self::Fixed(url) => format!("{url}/"),
        }
    }

    /// Token scope for the vaults behind this endpoint
    ///
    /// A fixed URL only serves the mock server, which ignores the audience.
    #[must_use]
    pub fn token_scope(&self) -> String {
        match self {
            Self::DnsSuffix(suffix) => token_scope(&format!("https://{suffix}")),
            Self::Fixed(_) => KEY_VAULT_SCOPE.to_string(),
        }
    }
}

/// Certificate bundle returned by Get Certificate
///
/// Only the identifier is needed; `kid`, `sid`, `cer` and the policy are ignored.
#[derive(Debug, Deserialize)]
struct CertificateBundle {
    id: String,
}

/// Key Vault certificates client for any number of vaults
pub struct KeyVaultCertificates {
    http_client: Client,
    credential: Arc<dyn TokenCredential>,
    endpoint: VaultEndpoint,
}

impl std::fmt::Debug for KeyVaultCertificates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultCertificates")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl KeyVaultCertificates {
    /// Create a new Key Vault certificates client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(credential: Arc<dyn TokenCredential>, endpoint: VaultEndpoint) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            credential,
            endpoint,
        })
    }
}

/// Extract the version from `.../certificates/{name}/{version}`
///
/// # Errors
/// Returns [`SyncError::MalformedCertificateId`] when the identifier has no version segment
pub fn version_from_certificate_id(id: &str) -> Result<CertificateVersion, SyncError> {
    let malformed = || SyncError::MalformedCertificateId { id: id.to_string() };
    let url = Url::parse(id).ok().ok_or_else(malformed)?;
    let segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(malformed)?
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        ["certificates", _name, version] => Ok(CertificateVersion::new(*version)),
        _ => Err(malformed()),
    }
}

#[async_trait]
impl CertificateVault for KeyVaultCertificates {
    async fn latest_certificate_version(
        &self,
        vault_name: &str,
        certificate_name: &str,
    ) -> Result<CertificateVersion> {
        let span = tracing::debug_span!(
            "azure.keyvault.certificate.get",
            vault.name = vault_name,
            certificate.name = certificate_name,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
            error.message = field::Empty,
        );
        let tracker = OperationTracker::new(PROVIDER, "get_certificate", span.clone());

        async move {
            let result = async {
                let url = format!(
                    "{}certificates/{}",
                    self.endpoint.vault_url(vault_name),
                    certificate_name
                );
                let token = bearer_token(&self.credential, &self.endpoint.token_scope()).await?;

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api-version", KEY_VAULT_API_VERSION)])
                    .header("Authorization", token)
                    .send()
                    .await
                    .context("Failed to send Key Vault request")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(api_error("Key Vault", status, &body).into());
                }

                let bundle: CertificateBundle = response
                    .json()
                    .await
                    .context("Failed to parse Key Vault certificate response")?;
                Ok::<CertificateVersion, anyhow::Error>(version_from_certificate_id(&bundle.id)?)
            }
            .await;

            match result {
                Ok(version) => {
                    debug!(
                        vault_name = vault_name,
                        certificate_name = certificate_name,
                        version = %version,
                        "Latest certificate version resolved"
                    );
                    tracker.record_success();
                    Ok(version)
                }
                Err(e) => {
                    tracker.record_error(&format!("{e:#}"));
                    Err(e.context(format!(
                        "Failed to get certificate {certificate_name} from vault {vault_name}"
                    )))
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics;
    use crate::provider::azure::MockTokenCredential;

    #[test]
    fn test_vault_url_from_dns_suffix() {
        let endpoint = VaultEndpoint::DnsSuffix("vault.azure.net".to_string());
        assert_eq!(
            endpoint.vault_url("contoso-kv"),
            "https://contoso-kv.vault.azure.net/"
        );

        let sovereign = VaultEndpoint::DnsSuffix("vault.usgovcloudapi.net".to_string());
        assert_eq!(
            sovereign.vault_url("gov-kv"),
            "https://gov-kv.vault.usgovcloudapi.net/"
        );
    }

    #[test]
    fn test_token_scope_follows_dns_suffix() {
        let public = VaultEndpoint::DnsSuffix("vault.azure.net".to_string());
        assert_eq!(public.token_scope(), "https://vault.azure.net/.default");

        let sovereign = VaultEndpoint::DnsSuffix("vault.usgovcloudapi.net".to_string());
        assert_eq!(
            sovereign.token_scope(),
            "https://vault.usgovcloudapi.net/.default"
        );

        let fixed = VaultEndpoint::Fixed("http://127.0.0.1:1234".to_string());
        assert_eq!(fixed.token_scope(), KEY_VAULT_SCOPE);
    }

    #[tokio::test]
    async fn test_unreachable_vault_records_operation_error() {
        let client = KeyVaultCertificates::new(
            Arc::new(MockTokenCredential),
            VaultEndpoint::Fixed("http://127.0.0.1:1".to_string()),
        )
        .unwrap();
        let before = metrics::provider_operation_errors(PROVIDER, "get_certificate");

        let error = client
            .latest_certificate_version("contoso-kv", "www-cert")
            .await
            .expect_err("Connection to a closed port should fail");

        assert!(format!("{error:#}").contains("www-cert"));
        assert!(metrics::provider_operation_errors(PROVIDER, "get_certificate") > before);
    }

    #[test]
    fn test_fixed_vault_url_ignores_vault_name() {
        let endpoint = VaultEndpoint::Fixed("http://127.0.0.1:1234".to_string());
        assert_eq!(endpoint.vault_url("any"), "http://127.0.0.1:1234/");

        let endpoint = VaultEndpoint::Fixed("http://127.0.0.1:1234/".to_string());
        assert_eq!(endpoint.vault_url("any"), "http://127.0.0.1:1234/");
    }

    #[test]
    fn test_version_from_certificate_id() {
        let version = version_from_certificate_id(
            "https://contoso-kv.vault.azure.net/certificates/www-cert/5f3f0a1b2c3d4e5f",
        )
        .unwrap();
        assert_eq!(version.as_str(), "5f3f0a1b2c3d4e5f");
    }

    #[test]
    fn test_version_from_certificate_id_without_version_fails() {
        for id in [
            "https://contoso-kv.vault.azure.net/certificates/www-cert",
            "https://contoso-kv.vault.azure.net/secrets/www-cert/abc",
            "not a url",
        ] {
            assert!(
                matches!(
                    version_from_certificate_id(id),
                    Err(SyncError::MalformedCertificateId { .. })
                ),
                "{id} should be rejected"
            );
        }
    }
}
