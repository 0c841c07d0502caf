//! # Azure Front Door Management Client
//!
//! Native REST implementation of the Front Door calls the job needs, against
//! Azure Resource Manager (`api-version=2020-05-01`):
//!
//! - `GET /subscriptions/{sub}/providers/Microsoft.Network/frontDoors`
//! - `GET .../frontDoors/{name}/frontendEndpoints`
//! - `POST .../frontendEndpoints/{endpoint}/enableHttps`
//!
//! List calls follow `nextLink` until exhausted. `enableHttps` is a
//! long-running operation: a `202 Accepted` is polled through the
//! `Azure-AsyncOperation` (preferred) or `Location` header until it reaches a
//! terminal state. Relative links resolve against the management endpoint.
//!
//! References:
//! - [Front Doors - List](https://learn.microsoft.com/en-us/rest/api/frontdoorservice/frontdoor/front-doors/list)
//! - [Frontend Endpoints - Enable Https](https://learn.microsoft.com/en-us/rest/api/frontdoorservice/frontdoor/frontend-endpoints/enable-https)
//! - [Async operations](https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/async-operations)

use crate::constants::FRONT_DOOR_API_VERSION;
use crate::error::SyncError;
use crate::model::{CustomHttpsConfiguration, FrontDoor, FrontendEndpoint, Page};
use crate::provider::azure::auth::{bearer_token, token_scope};
use crate::provider::common::{api_error, retry_after, OperationTracker};
use crate::provider::FrontDoorManager;
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, field, info, info_span, Instrument};

const PROVIDER: &str = "azure_front_door";
const SERVICE: &str = "Front Door";
const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Long-running operation polling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between polls when the service sends no `Retry-After`
    pub interval: Duration,
    /// Polls before the operation is reported as timed out
    pub max_polls: u32,
}

/// Body of an `Azure-AsyncOperation` status resource
#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// How completion of an accepted operation is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Monitor {
    /// Status resource with a `status` field
    AsyncOperation,
    /// `202` while running, any other success once done
    Location,
}

/// Front Door management client for one subscription
pub struct FrontDoorClient {
    http_client: Client,
    credential: Arc<dyn TokenCredential>,
    management_endpoint: Url,
    token_scope: String,
    subscription_id: String,
    poll: PollSettings,
}

impl std::fmt::Debug for FrontDoorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontDoorClient")
            .field("management_endpoint", &self.management_endpoint.as_str())
            .field("subscription_id", &self.subscription_id)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl FrontDoorClient {
    /// Create a new Front Door management client
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL or the HTTP client cannot be built
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        management_endpoint: &str,
        subscription_id: impl Into<String>,
        poll: PollSettings,
    ) -> Result<Self> {
        // A trailing slash keeps relative joins below the configured base path
        let base = if management_endpoint.ends_with('/') {
            management_endpoint.to_string()
        } else {
            format!("{management_endpoint}/")
        };
        let management_endpoint = Url::parse(&base)
            .with_context(|| format!("Invalid management endpoint: {management_endpoint}"))?;

        let token_scope = token_scope(management_endpoint.as_str());

        let http_client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            credential,
            management_endpoint,
            token_scope,
            subscription_id: subscription_id.into(),
            poll,
        })
    }

    fn front_doors_path(&self) -> String {
        format!(
            "subscriptions/{}/providers/Microsoft.Network/frontDoors",
            self.subscription_id
        )
    }

    fn front_door_path(&self, resource_group: &str, front_door: &str) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/frontDoors/{}",
            self.subscription_id, resource_group, front_door
        )
    }

    /// Resolve a path or link against the management endpoint
    fn resolve(&self, link: &str) -> Result<Url> {
        self.management_endpoint
            .join(link)
            .with_context(|| format!("Invalid Front Door link: {link}"))
    }

    /// Resolve `path` and add the api-version query parameter
    fn api_url(&self, path: &str) -> Result<Url> {
        let mut url = self.resolve(path)?;
        url.query_pairs_mut()
            .append_pair("api-version", FRONT_DOOR_API_VERSION);
        Ok(url)
    }

    async fn authorization(&self) -> Result<String> {
        bearer_token(&self.credential, &self.token_scope).await
    }

    /// GET `url` and read every page, following `nextLink`
    async fn list_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0_u32;

        while let Some(url) = next.take() {
            let token = self.authorization().await?;
            let response = self
                .http_client
                .get(url.clone())
                .header("Authorization", token)
                .send()
                .await
                .with_context(|| format!("Failed to list {url}"))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(api_error(SERVICE, status, &body).into());
            }

            let page: Page<T> = response
                .json()
                .await
                .context("Failed to parse Front Door list response")?;
            pages += 1;
            items.extend(page.value);
            next = match page.next_link.as_deref() {
                Some(link) if !link.is_empty() => Some(self.resolve(link)?),
                _ => None,
            };
        }

        debug!("Listed {} items across {} pages", items.len(), pages);
        Ok(items)
    }

    /// Wait until an accepted operation reaches a terminal state
    async fn wait_for_completion(
        &self,
        operation: &str,
        monitor: Monitor,
        link: &str,
        initial_delay: Option<Duration>,
    ) -> Result<()> {
        let url = self.resolve(link)?;
        let mut delay = initial_delay.unwrap_or(self.poll.interval);

        for attempt in 1..=self.poll.max_polls {
            tokio::time::sleep(delay).await;

            let token = self.authorization().await?;
            let response = self
                .http_client
                .get(url.clone())
                .header("Authorization", token)
                .send()
                .await
                .with_context(|| format!("Failed to poll {operation}"))?;

            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.poll.interval);

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(api_error(SERVICE, status, &body).into());
            }

            match monitor {
                Monitor::Location if status == StatusCode::ACCEPTED => {
                    debug!("{} still running (poll {})", operation, attempt);
                }
                Monitor::Location => return Ok(()),
                Monitor::AsyncOperation => {
                    let body: OperationStatus = response
                        .json()
                        .await
                        .context("Failed to parse async operation status")?;
                    match body.status.as_str() {
                        "Succeeded" => return Ok(()),
                        "Failed" | "Canceled" | "Cancelled" => {
                            let error = body.error.unwrap_or(OperationError {
                                code: None,
                                message: None,
                            });
                            let message = match (error.code, error.message) {
                                (Some(code), Some(message)) => format!("{code}: {message}"),
                                (Some(code), None) => code,
                                (None, Some(message)) => message,
                                (None, None) => String::new(),
                            };
                            return Err(SyncError::OperationFailed {
                                operation: operation.to_string(),
                                status: body.status,
                                message,
                            }
                            .into());
                        }
                        other => debug!("{} status {} (poll {})", operation, other, attempt),
                    }
                }
            }
        }

        Err(SyncError::OperationTimedOut {
            operation: operation.to_string(),
            polls: self.poll.max_polls,
        }
        .into())
    }
}

/// Pick the link that reports completion of an accepted operation
fn monitor_link(headers: &HeaderMap) -> Option<(Monitor, String)> {
    header_str(headers, AZURE_ASYNC_OPERATION)
        .map(|link| (Monitor::AsyncOperation, link))
        .or_else(|| header_str(headers, LOCATION.as_str()).map(|link| (Monitor::Location, link)))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl FrontDoorManager for FrontDoorClient {
    async fn list_front_doors(&self) -> Result<Vec<FrontDoor>> {
        let span = info_span!(
            "azure.frontdoor.list",
            subscription.id = %self.subscription_id,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
            error.message = field::Empty,
        );
        let tracker = OperationTracker::new(PROVIDER, "list_front_doors", span.clone());

        async move {
            let url = self.api_url(&self.front_doors_path())?;
            match self.list_all(url).await {
                Ok(front_doors) => {
                    tracker.record_success();
                    Ok(front_doors)
                }
                Err(e) => {
                    tracker.record_error(&format!("{e:#}"));
                    Err(e.context("Failed to list Front Doors"))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn list_frontend_endpoints(
        &self,
        resource_group: &str,
        front_door: &str,
    ) -> Result<Vec<FrontendEndpoint>> {
        let span = info_span!(
            "azure.frontdoor.frontend_endpoints.list",
            resource_group = resource_group,
            front_door = front_door,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
            error.message = field::Empty,
        );
        let tracker = OperationTracker::new(PROVIDER, "list_frontend_endpoints", span.clone());

        async move {
            let path = format!(
                "{}/frontendEndpoints",
                self.front_door_path(resource_group, front_door)
            );
            let url = self.api_url(&path)?;
            match self.list_all(url).await {
                Ok(endpoints) => {
                    tracker.record_success();
                    Ok(endpoints)
                }
                Err(e) => {
                    tracker.record_error(&format!("{e:#}"));
                    Err(e.context(format!(
                        "Failed to list frontend endpoints of Front Door {front_door}"
                    )))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn enable_https(
        &self,
        resource_group: &str,
        front_door: &str,
        endpoint: &str,
        configuration: &CustomHttpsConfiguration,
    ) -> Result<()> {
        let span = info_span!(
            "azure.frontdoor.frontend_endpoint.enable_https",
            resource_group = resource_group,
            front_door = front_door,
            endpoint = endpoint,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
            error.message = field::Empty,
        );
        let tracker = OperationTracker::new(PROVIDER, "enable_https", span.clone());
        let operation = format!("enableHttps {front_door}/{endpoint}");

        async move {
            let result = async {
                let path = format!(
                    "{}/frontendEndpoints/{}/enableHttps",
                    self.front_door_path(resource_group, front_door),
                    endpoint
                );
                let url = self.api_url(&path)?;
                let token = self.authorization().await?;

                let response = self
                    .http_client
                    .post(url)
                    .header("Authorization", token)
                    .json(configuration)
                    .send()
                    .await
                    .with_context(|| format!("Failed to submit {operation}"))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(api_error(SERVICE, status, &body).into());
                }

                if status == StatusCode::ACCEPTED {
                    let monitor = monitor_link(response.headers());
                    let initial_delay = retry_after(response.headers());
                    drop(response);

                    if let Some((monitor, link)) = monitor {
                        info!("{} accepted, waiting for completion", operation);
                        self.wait_for_completion(&operation, monitor, &link, initial_delay)
                            .await?;
                    } else {
                        debug!("{} accepted without a monitor link, treating as complete", operation);
                    }
                }
                Ok::<(), anyhow::Error>(())
            }
            .await;

            match result {
                Ok(()) => {
                    tracker.record_success();
                    Ok(())
                }
                Err(e) => {
                    tracker.record_error(&format!("{e:#}"));
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
