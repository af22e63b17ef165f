//! In-memory collaborator used by the workflow tests.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{InventoryVerdict, LocationStock, SourcingRequest, StockStatus},
    protocol::{CheckInventoryRequest, SourcingAck, SourcingStatus},
};

use crate::{backend::PlanningBackend, error::BackendError};

type Reply<T> = Mutex<Option<Result<T, BackendError>>>;

#[derive(Default)]
pub(crate) struct FakeBackend {
    plan: Reply<Value>,
    inventory: Reply<Vec<InventoryVerdict>>,
    locations: Reply<Vec<LocationStock>>,
    ack: Reply<SourcingAck>,
    delay: Option<Duration>,
    /// Number of leading inventory calls that fail with a transport error.
    flaky_inventory_calls: Mutex<u32>,
    calls: Mutex<Vec<&'static str>>,
    pub(crate) inventory_requests: Mutex<Vec<CheckInventoryRequest>>,
    pub(crate) located_parts: Mutex<Vec<String>>,
    pub(crate) submitted: Mutex<Vec<SourcingRequest>>,
}

impl FakeBackend {
    pub(crate) fn with_plan(self, plan: Value) -> Self {
        *self.plan.lock().expect("lock") = Some(Ok(plan));
        self
    }

    pub(crate) fn with_plan_error(self, error: BackendError) -> Self {
        *self.plan.lock().expect("lock") = Some(Err(error));
        self
    }

    pub(crate) fn with_inventory(self, verdicts: Vec<InventoryVerdict>) -> Self {
        *self.inventory.lock().expect("lock") = Some(Ok(verdicts));
        self
    }

    pub(crate) fn with_inventory_error(self, error: BackendError) -> Self {
        *self.inventory.lock().expect("lock") = Some(Err(error));
        self
    }

    pub(crate) fn with_flaky_inventory(self, failures: u32) -> Self {
        *self.flaky_inventory_calls.lock().expect("lock") = failures;
        self
    }

    pub(crate) fn with_locations(self, locations: Vec<LocationStock>) -> Self {
        *self.locations.lock().expect("lock") = Some(Ok(locations));
        self
    }

    pub(crate) fn with_locations_error(self, error: BackendError) -> Self {
        *self.locations.lock().expect("lock") = Some(Err(error));
        self
    }

    pub(crate) fn with_ack(self) -> Self {
        *self.ack.lock().expect("lock") = Some(Ok(SourcingAck {
            request_id: uuid::Uuid::new_v4(),
            status: SourcingStatus::Accepted,
            submitted_at: chrono::Utc::now(),
        }));
        self
    }

    pub(crate) fn with_ack_error(self, error: BackendError) -> Self {
        *self.ack.lock().expect("lock") = Some(Err(error));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }

    async fn record<T: Clone + Send>(
        &self,
        operation: &'static str,
        reply: &Reply<T>,
    ) -> Result<T, BackendError> {
        self.calls.lock().expect("lock").push(operation);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| {
                Err(BackendError::Transport(format!(
                    "{operation} not configured"
                )))
            })
    }
}

#[async_trait]
impl PlanningBackend for FakeBackend {
    async fn generate_plan(&self, _prompt_text: &str) -> Result<Value, BackendError> {
        self.record("generate_plan", &self.plan).await
    }

    async fn check_inventory(
        &self,
        request: &CheckInventoryRequest,
    ) -> Result<Vec<InventoryVerdict>, BackendError> {
        self.inventory_requests
            .lock()
            .expect("lock")
            .push(request.clone());
        {
            let mut flaky = self.flaky_inventory_calls.lock().expect("lock");
            if *flaky > 0 {
                *flaky -= 1;
                self.calls.lock().expect("lock").push("check_inventory");
                return Err(BackendError::Transport("connection reset".into()));
            }
        }
        self.record("check_inventory", &self.inventory).await
    }

    async fn locate_part(&self, part_number: &str) -> Result<Vec<LocationStock>, BackendError> {
        self.located_parts
            .lock()
            .expect("lock")
            .push(part_number.to_string());
        self.record("locate_part", &self.locations).await
    }

    async fn submit_sourcing_request(
        &self,
        request: &SourcingRequest,
    ) -> Result<SourcingAck, BackendError> {
        self.submitted.lock().expect("lock").push(request.clone());
        self.record("submit_sourcing_request", &self.ack).await
    }
}

pub(crate) fn bracket_plan_json() -> Value {
    json!({
        "eBOM_parts": [{ "part_number": "P-100", "name": "Bracket", "quantity": 4 }],
        "mBOM_steps": [{ "step": "Install Bracket P-100", "location": "Station 2" }]
    })
}

pub(crate) fn verdict(
    part_number: &str,
    status: StockStatus,
    quantity_local: u32,
    required_at: &str,
) -> InventoryVerdict {
    InventoryVerdict {
        part_number: part_number.to_string(),
        status,
        quantity_local,
        required_at: required_at.to_string(),
    }
}

pub(crate) fn stock(location: &str, quantity: u32) -> LocationStock {
    LocationStock {
        location: location.to_string(),
        quantity,
    }
}

pub(crate) fn fast_policy() -> crate::backend::CallPolicy {
    crate::backend::CallPolicy {
        timeout: Duration::from_millis(200),
        read_attempts: 2,
        retry_delay: Duration::from_millis(1),
    }
}
