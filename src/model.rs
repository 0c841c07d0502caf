//! # Front Door Resource Model
//!
//! Serde mappings of the Front Door management API resources the job reads
//! and writes back. Nothing here is persisted; every run re-fetches.
//!
//! Unknown fields of [`CustomHttpsConfiguration`] are kept in `extra` so an
//! `enableHttps` call sends back exactly what was read, plus the new version.
//!
//! API Reference: https://learn.microsoft.com/en-us/rest/api/frontdoorservice/frontdoor/frontend-endpoints

use crate::constants::{FRONT_DOOR_CERTIFICATE_SOURCE, KEY_VAULT_CERTIFICATE_SOURCE};
use crate::error::SyncError;
use crate::resource_id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Front Door profile (the edge service)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FrontDoor {
    /// Full ARM resource id
    pub id: String,
    pub name: String,
}

impl FrontDoor {
    /// Resource group the Front Door lives in, taken from its resource id
    ///
    /// # Errors
    /// Returns [`SyncError::MalformedResourceId`] when the id is not resource-group scoped.
    pub fn resource_group_name(&self) -> Result<&str, SyncError> {
        resource_id::resource_group_name(&self.id)
    }
}

/// A frontend endpoint (custom or default host) of a Front Door
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FrontendEndpoint {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: FrontendEndpointProperties,
}

impl FrontendEndpoint {
    /// HTTPS configuration, if the endpoint has HTTPS enabled
    #[must_use]
    pub fn https_configuration(&self) -> Option<&CustomHttpsConfiguration> {
        self.properties.custom_https_configuration.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendEndpointProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_https_provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_https_configuration: Option<CustomHttpsConfiguration>,
}

/// HTTPS settings of a frontend endpoint, also the `enableHttps` request body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomHttpsConfiguration {
    pub certificate_source: CertificateSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault_certificate_source_parameters: Option<KeyVaultCertificateSourceParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_door_certificate_source_parameters: Option<FrontDoorCertificateSourceParameters>,
    /// Fields this crate does not model, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CustomHttpsConfiguration {
    #[must_use]
    pub fn is_key_vault_sourced(&self) -> bool {
        self.certificate_source == CertificateSource::AzureKeyVault
    }

    /// Key Vault parameters of a vault-backed configuration
    ///
    /// Returns `None` for configurations sourced elsewhere.
    #[must_use]
    pub fn key_vault_source(&self) -> Option<&KeyVaultCertificateSourceParameters> {
        if self.is_key_vault_sourced() {
            self.key_vault_certificate_source_parameters.as_ref()
        } else {
            None
        }
    }

    /// Copy of this configuration pointing at `version`; every other field is unchanged
    #[must_use]
    pub fn with_secret_version(&self, version: &CertificateVersion) -> Self {
        let mut updated = self.clone();
        if let Some(parameters) = updated.key_vault_certificate_source_parameters.as_mut() {
            parameters.secret_version = Some(version.as_str().to_string());
        }
        updated
    }
}

/// Where an endpoint's certificate comes from
///
/// Values other than the two known sources are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum CertificateSource {
    AzureKeyVault,
    FrontDoor,
    Other(String),
}

impl From<String> for CertificateSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            KEY_VAULT_CERTIFICATE_SOURCE => Self::AzureKeyVault,
            FRONT_DOOR_CERTIFICATE_SOURCE => Self::FrontDoor,
            _ => Self::Other(value),
        }
    }
}

impl From<CertificateSource> for String {
    fn from(value: CertificateSource) -> Self {
        match value {
            CertificateSource::AzureKeyVault => KEY_VAULT_CERTIFICATE_SOURCE.to_string(),
            CertificateSource::FrontDoor => FRONT_DOOR_CERTIFICATE_SOURCE.to_string(),
            CertificateSource::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultCertificateSourceParameters {
    pub vault: VaultReference,
    pub secret_name: String,
    /// Pinned version; `None` when the endpoint was configured without one
    #[serde(default)]
    pub secret_version: Option<String>,
}

impl KeyVaultCertificateSourceParameters {
    /// Whether the pinned version differs from `latest`
    ///
    /// Plain string inequality, no version ordering is implied. An unpinned
    /// endpoint is always stale.
    #[must_use]
    pub fn is_stale(&self, latest: &CertificateVersion) -> bool {
        self.secret_version.as_deref() != Some(latest.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VaultReference {
    /// ARM resource id of the Key Vault
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontDoorCertificateSourceParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_type: Option<String>,
}

/// Opaque certificate version identifier returned by Key Vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateVersion(String);

impl CertificateVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of an ARM list response
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}
