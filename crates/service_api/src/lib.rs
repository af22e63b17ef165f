use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use shared::{
    domain::{InventoryVerdict, LocationStock, SourcingRequest, StockStatus, MAIN_WAREHOUSE},
    error::{ApiError, ErrorCode},
    protocol::{
        CheckInventoryRequest, CheckInventoryResponse, GeneratePlanRequest,
        PartLocationsResponse, SourcingAck, SourcingStatus,
    },
};
use tracing::{info, warn};
use uuid::Uuid;

pub mod inventory;
pub mod prompt;

pub use inventory::{InventoryDb, InventoryLoadError, StockRecord};
pub use prompt::{build_plan_prompt, parse_plan_reply, PlanGenerator};

#[derive(Clone)]
pub struct ApiContext {
    pub inventory: Arc<InventoryDb>,
    pub generator: Option<Arc<dyn PlanGenerator>>,
    /// Locations offered to the generator in addition to the inventory's own.
    pub factory_locations: Vec<String>,
}

impl ApiContext {
    fn known_locations(&self) -> Vec<String> {
        let mut locations = self.factory_locations.clone();
        for location in self
            .inventory
            .locations()
            .into_iter()
            .chain(std::iter::once(MAIN_WAREHOUSE.to_string()))
        {
            if !locations.contains(&location) {
                locations.push(location);
            }
        }
        locations
    }
}

pub async fn generate_plan(ctx: &ApiContext, req: &GeneratePlanRequest) -> Result<Value, ApiError> {
    let request = req.prompt_text.trim();
    if request.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "No prompt_text provided"));
    }
    let generator = ctx
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::new(ErrorCode::Unavailable, "AI model is not configured"))?;

    let prompt = build_plan_prompt(
        request,
        &ctx.inventory.part_numbers(),
        &ctx.known_locations(),
    );
    let raw = generator.generate(&prompt).await.map_err(|e| {
        ApiError::new(
            ErrorCode::Upstream,
            format!("Failed to generate AI plan: {e}"),
        )
    })?;

    parse_plan_reply(&raw).map_err(|e| {
        warn!(error = %e, "plan reply is not valid JSON");
        ApiError::new(ErrorCode::Upstream, format!("Failed to parse AI plan: {e}"))
            .with_raw_response(raw.clone())
    })
}

/// One verdict per requested part, in request order.
pub fn check_inventory(ctx: &ApiContext, req: &CheckInventoryRequest) -> CheckInventoryResponse {
    let inventory = req
        .parts
        .iter()
        .map(|requirement| {
            let part_number = requirement.part_number.clone();
            let required_at = requirement.location.clone();
            if !ctx.inventory.knows_part(&part_number) {
                return InventoryVerdict {
                    part_number,
                    status: StockStatus::UnknownPart,
                    quantity_local: 0,
                    required_at,
                };
            }
            let quantity_local = ctx.inventory.quantity_at(&part_number, &required_at);
            let status = if quantity_local > 0 {
                StockStatus::InStockLocal
            } else {
                StockStatus::OutOfStockLocal
            };
            InventoryVerdict {
                part_number,
                status,
                quantity_local,
                required_at,
            }
        })
        .collect();
    CheckInventoryResponse { inventory }
}

pub fn part_locations(ctx: &ApiContext, part_id: &str) -> Result<PartLocationsResponse, ApiError> {
    let part_id = part_id.trim();
    if part_id.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "part_id is required"));
    }
    let locations = ctx
        .inventory
        .stocked_locations(part_id)
        .into_iter()
        .map(|(location, quantity)| LocationStock { location, quantity })
        .collect();
    Ok(PartLocationsResponse {
        part_number: part_id.to_string(),
        locations,
    })
}

/// Accepts a transfer only when the source holds enough stock. Nothing is
/// reserved or persisted.
pub fn submit_sourcing_request(
    ctx: &ApiContext,
    req: &SourcingRequest,
) -> Result<SourcingAck, ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "quantity must be greater than zero",
        ));
    }
    if req.from_location == req.to_location {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "from_location and to_location must differ",
        ));
    }
    if !ctx.inventory.knows_part(&req.part_number) {
        return Err(ApiError::new(
            ErrorCode::NotFound,
            format!("unknown part {}", req.part_number),
        ));
    }
    let available = ctx
        .inventory
        .quantity_at(&req.part_number, &req.from_location);
    if req.quantity > available {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!(
                "requested {} of {} but only {available} available at {}",
                req.quantity, req.part_number, req.from_location
            ),
        ));
    }

    let ack = SourcingAck {
        request_id: Uuid::new_v4(),
        status: SourcingStatus::Accepted,
        submitted_at: Utc::now(),
    };
    info!(
        request_id = %ack.request_id,
        part_number = %req.part_number,
        from = %req.from_location,
        to = %req.to_location,
        quantity = req.quantity,
        "sourcing request accepted"
    );
    Ok(ack)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
