//! Display data handed to whatever front end renders the plan.

use shared::domain::{InventoryVerdict, Part, ProcessStep, StockStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockAnnotation {
    InStock { quantity: u32, location: String },
    OutOfStock { required_at: String },
    /// No verdict, or the inventory service does not know the part.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRow {
    pub part: Part,
    pub verdict: Option<InventoryVerdict>,
}

impl PartRow {
    pub fn annotation(&self) -> StockAnnotation {
        match &self.verdict {
            Some(verdict) => match verdict.status {
                StockStatus::InStockLocal => StockAnnotation::InStock {
                    quantity: verdict.quantity_local,
                    location: verdict.required_at.clone(),
                },
                StockStatus::OutOfStockLocal => StockAnnotation::OutOfStock {
                    required_at: verdict.required_at.clone(),
                },
                StockStatus::UnknownPart => StockAnnotation::Unknown,
            },
            None => StockAnnotation::Unknown,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        matches!(self.annotation(), StockAnnotation::OutOfStock { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanView {
    pub parts: Vec<PartRow>,
    pub steps: Vec<ProcessStep>,
}

impl PlanView {
    pub fn row(&self, part_number: &str) -> Option<&PartRow> {
        self.parts
            .iter()
            .find(|row| row.part.part_number == part_number)
    }

    /// Rows that can open a shortage resolution.
    pub fn shortages(&self) -> impl Iterator<Item = &PartRow> {
        self.parts.iter().filter(|row| row.is_out_of_stock())
    }
}
