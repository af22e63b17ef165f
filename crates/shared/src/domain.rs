use serde::{Deserialize, Serialize};

/// Location assigned to a part when no process step mentions it.
pub const MAIN_WAREHOUSE: &str = "Main Warehouse";

/// One eBOM line item. `part_number` is the identity within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_number: String,
    pub name: String,
    pub quantity: u32,
}

/// One mBOM step. The free text may mention a part by name or number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub step: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "eBOM_parts", alias = "parts")]
    pub parts: Vec<Part>,
    #[serde(rename = "mBOM_steps", alias = "steps")]
    pub steps: Vec<ProcessStep>,
}

impl Plan {
    pub fn part(&self, part_number: &str) -> Option<&Part> {
        self.parts
            .iter()
            .find(|part| part.part_number == part_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStockLocal,
    OutOfStockLocal,
    UnknownPart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryVerdict {
    pub part_number: String,
    pub status: StockStatus,
    #[serde(default)]
    pub quantity_local: u32,
    #[serde(default, alias = "location")]
    pub required_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStock {
    pub location: String,
    pub quantity: u32,
}

/// Operator-confirmed transfer intent. Never persisted by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcingRequest {
    pub part_number: String,
    pub quantity: u32,
    pub from_location: String,
    pub to_location: String,
}
