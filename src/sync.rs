//! # Certificate Sync Job
//!
//! One invocation walks every Front Door and frontend endpoint, compares the
//! certificate version each Key Vault-backed endpoint pins against the
//! vault's latest version, and re-points stale endpoints at the new version.
//!
//! ## Flow
//!
//! 1. List Front Doors, then the frontend endpoints of each (sequential)
//! 2. Skip endpoints whose certificate does not come from Key Vault
//! 3. Look up the latest certificate version in the endpoint's vault
//! 4. For stale endpoints, spawn an `enableHttps` update immediately
//! 5. Join every spawned update before returning
//!
//! Listing and vault failures abort the scan. Updates that were already
//! spawned are still joined; the scan error is reported afterwards. Update
//! failures never stop other updates and are reported together as
//! [`SyncError::UpdatesFailed`].

use crate::error::{EndpointFailure, SyncError};
use crate::model::{CertificateVersion, CustomHttpsConfiguration, FrontDoor, FrontendEndpoint};
use crate::observability::metrics;
use crate::provider::{CertificateVault, FrontDoorManager};
use crate::resource_id;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Counts gathered by one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Front Doors enumerated
    pub front_doors: usize,
    /// Frontend endpoints enumerated
    pub endpoints: usize,
    /// Endpoints without a Key Vault certificate
    pub skipped: usize,
    /// Key Vault endpoints already on the latest version
    pub up_to_date: usize,
    /// Key Vault endpoints pinned to an older version
    pub stale: usize,
    /// Updates that completed
    pub updated: usize,
    /// Stale endpoints were only reported
    pub dry_run: bool,
}

/// Endpoint an update was dispatched for
#[derive(Debug, Clone, PartialEq, Eq)]
struct UpdateTarget {
    resource_group: String,
    front_door: String,
    endpoint: String,
    version: CertificateVersion,
}

impl UpdateTarget {
    fn failure(&self, message: String) -> EndpointFailure {
        EndpointFailure {
            front_door: self.front_door.clone(),
            endpoint: self.endpoint.clone(),
            message,
        }
    }
}

type UpdateResult = (UpdateTarget, Result<()>);

/// Synchronizes Front Door HTTPS certificates with Key Vault
pub struct CertificateSyncJob {
    vault: Arc<dyn CertificateVault>,
    front_door: Arc<dyn FrontDoorManager>,
    dry_run: bool,
}

impl std::fmt::Debug for CertificateSyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateSyncJob")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl CertificateSyncJob {
    pub fn new(vault: Arc<dyn CertificateVault>, front_door: Arc<dyn FrontDoorManager>) -> Self {
        Self {
            vault,
            front_door,
            dry_run: false,
        }
    }

    /// Report stale endpoints without updating them
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one enumerate, compare and update pass
    ///
    /// Returns after every dispatched update has completed.
    ///
    /// # Errors
    /// - Listing or vault lookup failures (scan aborted)
    /// - [`SyncError::MalformedResourceId`] for ids too short to parse
    /// - [`SyncError::UpdatesFailed`] when at least one update failed
    ///
    /// A scan error takes precedence: failures of updates dispatched before
    /// the scan aborted are only logged and counted in the metrics.
    pub async fn run(&self) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("certificate_sync.run", run.id = %run_id, dry_run = self.dry_run);

        async move {
            info!("Starting certificate sync run");

            let mut report = SyncReport {
                dry_run: self.dry_run,
                ..SyncReport::default()
            };
            let mut updates = JoinSet::new();
            let mut dispatched = Vec::new();

            let scan = self.scan(&mut report, &mut updates, &mut dispatched).await;
            if let Err(e) = &scan {
                if !dispatched.is_empty() {
                    warn!(
                        "Scan aborted with {} update(s) in flight, waiting for them: {:#}",
                        dispatched.len(),
                        e
                    );
                }
            }

            let failures = join_updates(&mut updates, dispatched, &mut report).await;
            scan?;

            if !failures.is_empty() {
                return Err(SyncError::UpdatesFailed {
                    dispatched: report.updated + failures.len(),
                    failures,
                }
                .into());
            }

            info!(
                front_doors = report.front_doors,
                endpoints = report.endpoints,
                skipped = report.skipped,
                up_to_date = report.up_to_date,
                stale = report.stale,
                updated = report.updated,
                "Certificate sync run complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn scan(
        &self,
        report: &mut SyncReport,
        updates: &mut JoinSet<UpdateResult>,
        dispatched: &mut Vec<UpdateTarget>,
    ) -> Result<()> {
        let front_doors = self
            .front_door
            .list_front_doors()
            .await
            .context("Failed to list Front Doors")?;

        for front_door in &front_doors {
            info!("Front Door: {}", front_door.name);
            report.front_doors += 1;

            let resource_group = front_door.resource_group_name()?;
            let endpoints = self
                .front_door
                .list_frontend_endpoints(resource_group, &front_door.name)
                .await
                .with_context(|| {
                    format!("Failed to list frontend endpoints of Front Door {}", front_door.name)
                })?;

            for endpoint in &endpoints {
                if let Some((target, configuration)) = self
                    .check_endpoint(front_door, resource_group, endpoint, report)
                    .await?
                {
                    if self.dry_run {
                        info!(
                            "Dry run: not updating {}/{} to version {}",
                            target.front_door, target.endpoint, target.version
                        );
                        continue;
                    }
                    self.dispatch_update(target, configuration, updates, dispatched);
                }
            }
        }

        Ok(())
    }

    /// Compare one endpoint against its vault
    ///
    /// Returns the update target and the configuration to send when the
    /// endpoint is stale.
    async fn check_endpoint(
        &self,
        front_door: &FrontDoor,
        resource_group: &str,
        endpoint: &FrontendEndpoint,
        report: &mut SyncReport,
    ) -> Result<Option<(UpdateTarget, CustomHttpsConfiguration)>> {
        info!("Frontend Endpoint: {}", endpoint.name);
        report.endpoints += 1;
        metrics::increment_endpoints_scanned();

        let Some(https) = endpoint
            .https_configuration()
            .filter(|https| https.is_key_vault_sourced())
        else {
            debug!(
                "Skipping {}/{}: certificate not sourced from Key Vault",
                front_door.name, endpoint.name
            );
            report.skipped += 1;
            metrics::increment_endpoints_skipped();
            return Ok(None);
        };

        let source = https
            .key_vault_source()
            .ok_or_else(|| SyncError::MissingVaultParameters {
                endpoint: format!("{}/{}", front_door.name, endpoint.name),
            })?;
        let vault_name = resource_id::vault_name(&source.vault.id)?;

        info!("Vault Name: {}", vault_name);
        info!("Secret Name: {}", source.secret_name);
        info!(
            "Secret Version: {}",
            source.secret_version.as_deref().unwrap_or("<unpinned>")
        );

        let latest = self
            .vault
            .latest_certificate_version(vault_name, &source.secret_name)
            .await
            .with_context(|| {
                format!(
                    "Failed to get latest version of certificate {} from vault {}",
                    source.secret_name, vault_name
                )
            })?;

        if !source.is_stale(&latest) {
            report.up_to_date += 1;
            metrics::increment_endpoints_up_to_date();
            return Ok(None);
        }

        info!("Target Secret Version: {}", latest);
        report.stale += 1;

        let configuration = https.with_secret_version(&latest);
        let target = UpdateTarget {
            resource_group: resource_group.to_string(),
            front_door: front_door.name.clone(),
            endpoint: endpoint.name.clone(),
            version: latest,
        };
        Ok(Some((target, configuration)))
    }

    fn dispatch_update(
        &self,
        target: UpdateTarget,
        configuration: CustomHttpsConfiguration,
        updates: &mut JoinSet<UpdateResult>,
        dispatched: &mut Vec<UpdateTarget>,
    ) {
        let manager = Arc::clone(&self.front_door);
        let span = info_span!(
            "certificate_sync.update",
            front_door = %target.front_door,
            endpoint = %target.endpoint,
            version = %target.version,
        );

        dispatched.push(target.clone());
        updates.spawn(
            async move {
                let result = manager
                    .enable_https(
                        &target.resource_group,
                        &target.front_door,
                        &target.endpoint,
                        &configuration,
                    )
                    .await;
                (target, result)
            }
            .instrument(span),
        );
    }
}

/// Wait for every spawned update and collect the failures
async fn join_updates(
    updates: &mut JoinSet<UpdateResult>,
    mut pending: Vec<UpdateTarget>,
    report: &mut SyncReport,
) -> Vec<EndpointFailure> {
    let mut failures = Vec::new();
    let mut task_errors = Vec::new();

    while let Some(joined) = updates.join_next().await {
        match joined {
            Ok((target, result)) => {
                pending.retain(|p| p != &target);
                match result {
                    Ok(()) => {
                        info!(
                            "Updated {}/{} to certificate version {}",
                            target.front_door, target.endpoint, target.version
                        );
                        report.updated += 1;
                        metrics::increment_certificate_updates("updated");
                    }
                    Err(e) => {
                        error!(
                            "Failed to update {}/{} to certificate version {}: {:#}",
                            target.front_door, target.endpoint, target.version, e
                        );
                        metrics::increment_certificate_updates("failed");
                        failures.push(target.failure(format!("{e:#}")));
                    }
                }
            }
            Err(join_error) => {
                error!("Certificate update task did not complete: {}", join_error);
                task_errors.push(join_error.to_string());
            }
        }
    }

    // Targets never reported back belong to tasks that panicked
    for target in pending {
        metrics::increment_certificate_updates("failed");
        let message = if task_errors.is_empty() {
            "update task did not complete".to_string()
        } else {
            format!("update task did not complete: {}", task_errors.join("; "))
        };
        failures.push(target.failure(message));
    }

    failures
}
