//! Certificate sync job tests
//!
//! Drive `CertificateSyncJob` with in-memory providers that record every call.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use frontdoor_cert_sync::error::SyncError;
use frontdoor_cert_sync::model::{
    CertificateVersion, CustomHttpsConfiguration, FrontDoor, FrontendEndpoint,
};
use frontdoor_cert_sync::provider::{CertificateVault, FrontDoorManager};
use frontdoor_cert_sync::sync::CertificateSyncJob;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::timeout;

const VAULT_ID: &str =
    "/subscriptions/sub/resourceGroups/certs-rg/providers/Microsoft.KeyVault/vaults/contoso-kv";

#[derive(Default)]
struct FakeVault {
    versions: HashMap<(String, String), String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeVault {
    fn with_version(mut self, vault: &str, certificate: &str, version: &str) -> Self {
        self.versions.insert(
            (vault.to_string(), certificate.to_string()),
            version.to_string(),
        );
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateVault for FakeVault {
    async fn latest_certificate_version(
        &self,
        vault_name: &str,
        certificate_name: &str,
    ) -> Result<CertificateVersion> {
        self.calls
            .lock()
            .unwrap()
            .push((vault_name.to_string(), certificate_name.to_string()));
        self.versions
            .get(&(vault_name.to_string(), certificate_name.to_string()))
            .map(CertificateVersion::new)
            .ok_or_else(|| anyhow!("certificate {certificate_name} not found in {vault_name}"))
    }
}

#[derive(Debug, Clone)]
struct UpdateCall {
    resource_group: String,
    front_door: String,
    endpoint: String,
    configuration: CustomHttpsConfiguration,
}

#[derive(Default)]
struct FakeFrontDoor {
    front_doors: Vec<FrontDoor>,
    endpoints: HashMap<String, Vec<FrontendEndpoint>>,
    failing_endpoints: Vec<String>,
    fail_listing_of: Option<String>,
    rendezvous: Option<Arc<Barrier>>,
    updates: Mutex<Vec<UpdateCall>>,
}

impl FakeFrontDoor {
    fn with_front_door(mut self, name: &str, endpoints: Vec<FrontendEndpoint>) -> Self {
        self.front_doors.push(FrontDoor {
            id: format!(
                "/subscriptions/sub/resourceGroups/edge-rg/providers/Microsoft.Network/frontDoors/{name}"
            ),
            name: name.to_string(),
        });
        self.endpoints.insert(name.to_string(), endpoints);
        self
    }

    fn failing_update(mut self, endpoint: &str) -> Self {
        self.failing_endpoints.push(endpoint.to_string());
        self
    }

    /// Every update waits until `parties` updates are in flight
    fn meeting_updates(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(parties)));
        self
    }

    fn failing_listing(mut self, front_door: &str) -> Self {
        self.fail_listing_of = Some(front_door.to_string());
        self
    }

    fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrontDoorManager for FakeFrontDoor {
    async fn list_front_doors(&self) -> Result<Vec<FrontDoor>> {
        Ok(self.front_doors.clone())
    }

    async fn list_frontend_endpoints(
        &self,
        resource_group: &str,
        front_door: &str,
    ) -> Result<Vec<FrontendEndpoint>> {
        assert_eq!(resource_group, "edge-rg");
        if self.fail_listing_of.as_deref() == Some(front_door) {
            return Err(anyhow!("listing of {front_door} failed"));
        }
        Ok(self.endpoints.get(front_door).cloned().unwrap_or_default())
    }

    async fn enable_https(
        &self,
        resource_group: &str,
        front_door: &str,
        endpoint: &str,
        configuration: &CustomHttpsConfiguration,
    ) -> Result<()> {
        self.updates.lock().unwrap().push(UpdateCall {
            resource_group: resource_group.to_string(),
            front_door: front_door.to_string(),
            endpoint: endpoint.to_string(),
            configuration: configuration.clone(),
        });
        if let Some(barrier) = &self.rendezvous {
            timeout(Duration::from_secs(5), barrier.wait())
                .await
                .map_err(|_| anyhow!("update of {endpoint} ran alone"))?;
        }
        if self.failing_endpoints.iter().any(|e| e == endpoint) {
            return Err(anyhow!("enableHttps rejected for {endpoint}"));
        }
        Ok(())
    }
}

fn vault_endpoint(name: &str, secret_name: &str, secret_version: &str) -> FrontendEndpoint {
    vault_endpoint_with_vault_id(name, secret_name, secret_version, VAULT_ID)
}

fn vault_endpoint_with_vault_id(
    name: &str,
    secret_name: &str,
    secret_version: &str,
    vault_id: &str,
) -> FrontendEndpoint {
    serde_json::from_value(json!({
        "name": name,
        "properties": {
            "hostName": format!("{name}.contoso.com"),
            "customHttpsConfiguration": {
                "certificateSource": "AzureKeyVault",
                "protocolType": "ServerNameIndication",
                "minimumTlsVersion": "1.2",
                "keyVaultCertificateSourceParameters": {
                    "vault": {"id": vault_id},
                    "secretName": secret_name,
                    "secretVersion": secret_version
                }
            }
        }
    }))
    .unwrap()
}

fn managed_endpoint(name: &str) -> FrontendEndpoint {
    serde_json::from_value(json!({
        "name": name,
        "properties": {
            "hostName": format!("{name}.contoso.com"),
            "customHttpsConfiguration": {
                "certificateSource": "FrontDoor",
                "protocolType": "ServerNameIndication",
                "frontDoorCertificateSourceParameters": {"certificateType": "Dedicated"}
            }
        }
    }))
    .unwrap()
}

fn plain_endpoint(name: &str) -> FrontendEndpoint {
    serde_json::from_value(json!({
        "name": name,
        "properties": {"hostName": format!("{name}.azurefd.net")}
    }))
    .unwrap()
}

fn job(vault: &Arc<FakeVault>, front_door: &Arc<FakeFrontDoor>) -> CertificateSyncJob {
    CertificateSyncJob::new(vault.clone(), front_door.clone())
}

#[tokio::test]
async fn test_stale_vault_endpoint_is_updated_and_managed_endpoint_ignored() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let front_door = Arc::new(FakeFrontDoor::default().with_front_door(
        "contoso",
        vec![vault_endpoint("www", "www-cert", "v1"), managed_endpoint("api")],
    ));

    let report = job(&vault, &front_door).run().await.unwrap();

    assert_eq!(
        vault.calls(),
        vec![("contoso-kv".to_string(), "www-cert".to_string())]
    );

    let updates = front_door.updates();
    assert_eq!(updates.len(), 1);
    let update = &updates[0];
    assert_eq!(update.resource_group, "edge-rg");
    assert_eq!(update.front_door, "contoso");
    assert_eq!(update.endpoint, "www");

    let params = update
        .configuration
        .key_vault_certificate_source_parameters
        .as_ref()
        .unwrap();
    assert_eq!(params.secret_version.as_deref(), Some("v2"));
    assert_eq!(params.secret_name, "www-cert");
    assert_eq!(params.vault.id, VAULT_ID);
    assert_eq!(update.configuration.protocol_type.as_deref(), Some("ServerNameIndication"));
    assert_eq!(update.configuration.minimum_tls_version.as_deref(), Some("1.2"));

    assert_eq!(report.front_doors, 1);
    assert_eq!(report.endpoints, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.stale, 1);
    assert_eq!(report.updated, 1);
}

#[tokio::test]
async fn test_update_changes_only_the_secret_version() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let original = vault_endpoint("www", "www-cert", "v1");
    let front_door =
        Arc::new(FakeFrontDoor::default().with_front_door("contoso", vec![original.clone()]));

    job(&vault, &front_door).run().await.unwrap();

    let sent = serde_json::to_value(&front_door.updates()[0].configuration).unwrap();
    let mut expected = serde_json::to_value(original.https_configuration().unwrap()).unwrap();
    expected["keyVaultCertificateSourceParameters"]["secretVersion"] = json!("v2");
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn test_equal_versions_do_not_update() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v3"));
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v3")]),
    );

    let report = job(&vault, &front_door).run().await.unwrap();

    assert_eq!(vault.calls().len(), 1);
    assert!(front_door.updates().is_empty());
    assert_eq!(report.up_to_date, 1);
    assert_eq!(report.updated, 0);
}

#[tokio::test]
async fn test_non_vault_endpoints_never_reach_the_vault() {
    let vault = Arc::new(FakeVault::default());
    let front_door = Arc::new(FakeFrontDoor::default().with_front_door(
        "contoso",
        vec![managed_endpoint("api"), plain_endpoint("contoso-azurefd-net")],
    ));

    let report = job(&vault, &front_door).run().await.unwrap();

    assert!(vault.calls().is_empty());
    assert!(front_door.updates().is_empty());
    assert_eq!(report.skipped, 2);
}

#[tokio::test]
async fn test_one_failed_update_fails_the_run_after_both_are_dispatched() {
    let vault = Arc::new(
        FakeVault::default()
            .with_version("contoso-kv", "www-cert", "v2")
            .with_version("contoso-kv", "shop-cert", "s2"),
    );
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door(
                "contoso",
                vec![
                    vault_endpoint("www", "www-cert", "v1"),
                    vault_endpoint("shop", "shop-cert", "s1"),
                ],
            )
            .failing_update("shop"),
    );

    let error = job(&vault, &front_door).run().await.unwrap_err();

    let mut dispatched: Vec<String> = front_door
        .updates()
        .into_iter()
        .map(|u| u.endpoint)
        .collect();
    dispatched.sort();
    assert_eq!(dispatched, vec!["shop".to_string(), "www".to_string()]);

    match error.downcast_ref::<SyncError>() {
        Some(SyncError::UpdatesFailed {
            dispatched,
            failures,
        }) => {
            assert_eq!(*dispatched, 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].front_door, "contoso");
            assert_eq!(failures[0].endpoint, "shop");
            assert!(failures[0].message.contains("enableHttps rejected"));
        }
        other => panic!("Expected UpdatesFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stale_endpoints_update_concurrently() {
    let vault = Arc::new(
        FakeVault::default()
            .with_version("contoso-kv", "www-cert", "v2")
            .with_version("contoso-kv", "shop-cert", "v8"),
    );
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door(
                "contoso",
                vec![
                    vault_endpoint("www", "www-cert", "v1"),
                    vault_endpoint("shop", "shop-cert", "v7"),
                ],
            )
            .meeting_updates(2),
    );

    let report = job(&vault, &front_door).run().await.unwrap();

    assert_eq!(report.stale, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(front_door.updates().len(), 2);
}

#[tokio::test]
async fn test_short_vault_id_fails_deterministically() {
    let vault = Arc::new(FakeVault::default());
    let front_door = Arc::new(FakeFrontDoor::default().with_front_door(
        "contoso",
        vec![vault_endpoint_with_vault_id(
            "www",
            "www-cert",
            "v1",
            "/subscriptions/sub/resourceGroups/certs-rg",
        )],
    ));

    for _ in 0..2 {
        let error = job(&vault, &front_door).run().await.unwrap_err();
        match error.downcast_ref::<SyncError>() {
            Some(SyncError::MalformedResourceId { index, segments, .. }) => {
                assert_eq!(*index, 7);
                assert_eq!(*segments, 4);
            }
            other => panic!("Expected MalformedResourceId, got {other:?}"),
        }
    }

    assert!(vault.calls().is_empty());
    assert!(front_door.updates().is_empty());
}

#[tokio::test]
async fn test_vault_lookup_failure_aborts_scan() {
    let vault = Arc::new(FakeVault::default());
    let front_door = Arc::new(FakeFrontDoor::default().with_front_door(
        "contoso",
        vec![
            vault_endpoint("www", "missing-cert", "v1"),
            vault_endpoint("shop", "shop-cert", "s1"),
        ],
    ));

    let error = job(&vault, &front_door).run().await.unwrap_err();

    assert!(format!("{error:#}").contains("missing-cert"));
    assert_eq!(vault.calls().len(), 1);
    assert!(front_door.updates().is_empty());
}

#[tokio::test]
async fn test_scan_failure_still_joins_dispatched_updates() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v1")])
            .with_front_door("fabrikam", vec![])
            .failing_listing("fabrikam"),
    );

    let error = job(&vault, &front_door).run().await.unwrap_err();

    assert!(format!("{error:#}").contains("fabrikam"));
    let updates = front_door.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].endpoint, "www");
}

#[tokio::test]
async fn test_unpinned_version_is_treated_as_stale() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let endpoint: FrontendEndpoint = serde_json::from_value(json!({
        "name": "www",
        "properties": {
            "customHttpsConfiguration": {
                "certificateSource": "AzureKeyVault",
                "keyVaultCertificateSourceParameters": {
                    "vault": {"id": VAULT_ID},
                    "secretName": "www-cert"
                }
            }
        }
    }))
    .unwrap();
    let front_door =
        Arc::new(FakeFrontDoor::default().with_front_door("contoso", vec![endpoint]));

    job(&vault, &front_door).run().await.unwrap();

    let updates = front_door.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0]
            .configuration
            .key_vault_certificate_source_parameters
            .as_ref()
            .unwrap()
            .secret_version
            .as_deref(),
        Some("v2")
    );
}

#[tokio::test]
async fn test_vault_sourced_endpoint_without_parameters_is_an_error() {
    let vault = Arc::new(FakeVault::default());
    let endpoint: FrontendEndpoint = serde_json::from_value(json!({
        "name": "www",
        "properties": {
            "customHttpsConfiguration": {"certificateSource": "AzureKeyVault"}
        }
    }))
    .unwrap();
    let front_door =
        Arc::new(FakeFrontDoor::default().with_front_door("contoso", vec![endpoint]));

    let error = job(&vault, &front_door).run().await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<SyncError>(),
        Some(SyncError::MissingVaultParameters { endpoint }) if endpoint == "contoso/www"
    ));
}

#[tokio::test]
async fn test_dry_run_reports_without_updating() {
    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v1")]),
    );

    let report = job(&vault, &front_door)
        .with_dry_run(true)
        .run()
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.stale, 1);
    assert_eq!(report.updated, 0);
    assert!(front_door.updates().is_empty());
}

#[tokio::test]
async fn test_endpoints_across_front_doors_resolve_their_own_vaults() {
    let other_vault_id =
        "/subscriptions/sub/resourceGroups/certs-rg/providers/Microsoft.KeyVault/vaults/fabrikam-kv";
    let vault = Arc::new(
        FakeVault::default()
            .with_version("contoso-kv", "www-cert", "v1")
            .with_version("fabrikam-kv", "www-cert", "f2"),
    );
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v1")])
            .with_front_door(
                "fabrikam",
                vec![vault_endpoint_with_vault_id("www", "www-cert", "f1", other_vault_id)],
            ),
    );

    let report = job(&vault, &front_door).run().await.unwrap();

    assert_eq!(report.front_doors, 2);
    assert_eq!(report.up_to_date, 1);
    let updates = front_door.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].front_door, "fabrikam");
}

#[tokio::test]
async fn test_scheduler_runs_on_startup_then_stops_on_shutdown() {
    use frontdoor_cert_sync::scheduler::{run_scheduled, CronSchedule};

    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v1")]),
    );
    let schedule = CronSchedule::parse("0 0 0 * * *").unwrap();

    run_scheduled(&job(&vault, &front_door), &schedule, true, async {}).await;

    assert_eq!(front_door.updates().len(), 1);
}

#[tokio::test]
async fn test_scheduler_without_startup_run_does_nothing_before_first_tick() {
    use frontdoor_cert_sync::scheduler::{run_scheduled, CronSchedule};

    let vault = Arc::new(FakeVault::default().with_version("contoso-kv", "www-cert", "v2"));
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "www-cert", "v1")]),
    );
    let schedule = CronSchedule::parse("0 0 0 * * *").unwrap();

    run_scheduled(&job(&vault, &front_door), &schedule, false, async {}).await;

    assert!(vault.calls().is_empty());
    assert!(front_door.updates().is_empty());
}

#[tokio::test]
async fn test_run_once_propagates_job_failure() {
    use frontdoor_cert_sync::scheduler::run_once;

    let vault = Arc::new(FakeVault::default());
    let front_door = Arc::new(
        FakeFrontDoor::default()
            .with_front_door("contoso", vec![vault_endpoint("www", "missing-cert", "v1")]),
    );

    assert!(run_once(&job(&vault, &front_door)).await.is_err());
}
