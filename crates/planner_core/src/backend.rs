use std::{future::Future, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{InventoryVerdict, LocationStock, SourcingRequest},
    protocol::{
        CheckInventoryRequest, CheckInventoryResponse, GeneratePlanRequest, PartLocationsQuery,
        PartLocationsResponse, SourcingAck, CHECK_INVENTORY_ROUTE, GENERATE_PLAN_ROUTE,
        PART_LOCATIONS_ROUTE, SOURCING_REQUESTS_ROUTE,
    },
};
use tracing::{debug, warn};

use crate::{config::ClientSettings, error::BackendError};

/// The four network collaborators the planner depends on.
#[async_trait]
pub trait PlanningBackend: Send + Sync {
    /// Raw plan reply; validation happens in [`crate::plan::parse_plan`].
    async fn generate_plan(&self, prompt_text: &str) -> Result<Value, BackendError>;
    async fn check_inventory(
        &self,
        request: &CheckInventoryRequest,
    ) -> Result<Vec<InventoryVerdict>, BackendError>;
    async fn locate_part(&self, part_number: &str) -> Result<Vec<LocationStock>, BackendError>;
    async fn submit_sourcing_request(
        &self,
        request: &SourcingRequest,
    ) -> Result<SourcingAck, BackendError>;
}

/// Timeout and retry rules applied to every collaborator call.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Attempts for idempotent reads. Plan generation and submissions run once.
    pub read_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            read_attempts: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    pub async fn once<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T, BackendError>
    where
        Fut: Future<Output = Result<T, BackendError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    pub async fn read<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let attempts = self.read_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.once(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < attempts => {
                    warn!(operation, attempt, %error, "collaborator call failed; retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

pub struct HttpPlanningBackend {
    http: Client,
    server_url: String,
}

impl HttpPlanningBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            server_url: settings.server_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.server_url)
    }
}

#[async_trait]
impl PlanningBackend for HttpPlanningBackend {
    async fn generate_plan(&self, prompt_text: &str) -> Result<Value, BackendError> {
        let response = self
            .http
            .post(self.url(GENERATE_PLAN_ROUTE))
            .json(&GeneratePlanRequest {
                prompt_text: prompt_text.to_string(),
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn check_inventory(
        &self,
        request: &CheckInventoryRequest,
    ) -> Result<Vec<InventoryVerdict>, BackendError> {
        let response = self
            .http
            .post(self.url(CHECK_INVENTORY_ROUTE))
            .json(request)
            .send()
            .await?;
        let body: CheckInventoryResponse = read_json(response).await?;
        Ok(body.inventory)
    }

    async fn locate_part(&self, part_number: &str) -> Result<Vec<LocationStock>, BackendError> {
        let response = self
            .http
            .get(self.url(PART_LOCATIONS_ROUTE))
            .query(&PartLocationsQuery {
                part_id: part_number.to_string(),
            })
            .send()
            .await?;

        // The lookup service answers "nowhere" with 404 and an empty list.
        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await?;
            return match serde_json::from_str::<PartLocationsResponse>(&body) {
                Ok(parsed) => {
                    debug!(part_number, "location lookup reported no stock");
                    Ok(parsed.locations)
                }
                Err(_) => Err(BackendError::Status { status: 404, body }),
            };
        }

        let body: PartLocationsResponse = read_json(response).await?;
        Ok(body.locations)
    }

    async fn submit_sourcing_request(
        &self,
        request: &SourcingRequest,
    ) -> Result<SourcingAck, BackendError> {
        let response = self
            .http
            .post(self.url(SOURCING_REQUESTS_ROUTE))
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
