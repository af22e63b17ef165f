use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{InventoryVerdict, LocationStock};

pub const GENERATE_PLAN_ROUTE: &str = "/api/generate_plan";
pub const CHECK_INVENTORY_ROUTE: &str = "/api/check_inventory";
pub const PART_LOCATIONS_ROUTE: &str = "/api/get_part_locations";
pub const SOURCING_REQUESTS_ROUTE: &str = "/api/sourcing_requests";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePlanRequest {
    pub prompt_text: String,
}

/// A part paired with the location it is needed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartRequirement {
    pub part_number: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInventoryRequest {
    pub parts: Vec<PartRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInventoryResponse {
    #[serde(alias = "inventory_status")]
    pub inventory: Vec<InventoryVerdict>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartLocationsQuery {
    pub part_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartLocationsResponse {
    #[serde(default)]
    pub part_number: String,
    pub locations: Vec<LocationStock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcingStatus {
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcingAck {
    pub request_id: Uuid,
    pub status: SourcingStatus,
    pub submitted_at: DateTime<Utc>,
}
