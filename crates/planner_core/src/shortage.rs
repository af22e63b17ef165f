//! Sourcing flow for a single out-of-stock part.
//!
//! `Idle -> LocationsLoading -> {LocationsAvailable | NoSupplyFound |
//! LocationsLoadFailed}`, then `LocationsAvailable -> RequestSubmitted` once the
//! operator confirms a source. Failed and empty lookups are terminal: a retry
//! starts a fresh session.

use shared::{
    domain::{LocationStock, SourcingRequest},
    protocol::SourcingAck,
};
use tracing::{info, warn};

use crate::{
    backend::{CallPolicy, PlanningBackend},
    error::WorkflowError,
    view::{PartRow, StockAnnotation},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionView {
    pub part_number: String,
    pub part_name: String,
    pub required_at: String,
    pub deficit: u32,
    pub sources: Vec<LocationStock>,
    pub selected: Option<usize>,
    pub quantity: u32,
}

impl ResolutionView {
    pub fn selected_source(&self) -> Option<&LocationStock> {
        self.selected.and_then(|index| self.sources.get(index))
    }

    /// The submission service rejects these; front ends may warn ahead of time.
    pub fn exceeds_available(&self) -> bool {
        self.selected_source()
            .is_some_and(|source| self.quantity > source.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortageState {
    Idle,
    LocationsLoading,
    LocationsAvailable(ResolutionView),
    NoSupplyFound,
    LocationsLoadFailed(String),
    RequestSubmitted {
        request: SourcingRequest,
        ack: SourcingAck,
    },
}

impl ShortageState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LocationsLoading => "locations_loading",
            Self::LocationsAvailable(_) => "locations_available",
            Self::NoSupplyFound => "no_supply_found",
            Self::LocationsLoadFailed(_) => "locations_load_failed",
            Self::RequestSubmitted { .. } => "request_submitted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShortageSession {
    part_number: String,
    part_name: String,
    required_qty: u32,
    required_at: String,
    state: ShortageState,
}

impl ShortageSession {
    /// Only rows whose verdict is `out_of_stock_local` can be resolved.
    pub fn for_row(row: &PartRow) -> Result<Self, WorkflowError> {
        let StockAnnotation::OutOfStock { required_at } = row.annotation() else {
            return Err(WorkflowError::PartNotShort(row.part.part_number.clone()));
        };
        Ok(Self {
            part_number: row.part.part_number.clone(),
            part_name: row.part.name.clone(),
            required_qty: row.part.quantity,
            required_at,
            state: ShortageState::Idle,
        })
    }

    pub fn part_number(&self) -> &str {
        &self.part_number
    }

    pub fn required_at(&self) -> &str {
        &self.required_at
    }

    pub fn state(&self) -> &ShortageState {
        &self.state
    }

    /// Local stock at an out-of-stock location is zero, so the deficit is the
    /// full required quantity.
    pub fn deficit(&self) -> u32 {
        self.required_qty
    }

    pub async fn load_locations(
        &mut self,
        backend: &dyn PlanningBackend,
        policy: &CallPolicy,
    ) -> Result<(), WorkflowError> {
        if self.state != ShortageState::Idle {
            return Err(WorkflowError::InvalidTransition("load locations"));
        }
        self.state = ShortageState::LocationsLoading;

        let part_number = self.part_number.as_str();
        let result = policy
            .read("locate_part", move || backend.locate_part(part_number))
            .await;

        match result {
            Ok(locations) => {
                let sources: Vec<LocationStock> = locations
                    .into_iter()
                    .filter(|stock| stock.quantity > 0)
                    .collect();
                if sources.is_empty() {
                    info!(part_number = %self.part_number, "no alternate supply found");
                    self.state = ShortageState::NoSupplyFound;
                } else {
                    info!(
                        part_number = %self.part_number,
                        sources = sources.len(),
                        deficit = self.deficit(),
                        "alternate supply located"
                    );
                    self.state = ShortageState::LocationsAvailable(ResolutionView {
                        part_number: self.part_number.clone(),
                        part_name: self.part_name.clone(),
                        required_at: self.required_at.clone(),
                        deficit: self.deficit(),
                        sources,
                        selected: None,
                        quantity: self.deficit(),
                    });
                }
                Ok(())
            }
            Err(source) => {
                warn!(part_number = %self.part_number, error = %source, "location lookup failed");
                self.state = ShortageState::LocationsLoadFailed(source.to_string());
                Err(WorkflowError::LocationLookupFailed {
                    part_number: self.part_number.clone(),
                    source,
                })
            }
        }
    }

    pub fn select_source(&mut self, location: &str) -> Result<(), WorkflowError> {
        let view = self.view_mut("select a source")?;
        let index = view
            .sources
            .iter()
            .position(|source| source.location == location)
            .ok_or_else(|| WorkflowError::UnknownSource(location.to_string()))?;
        view.selected = Some(index);
        Ok(())
    }

    /// No ceiling here: the submission service validates against stock.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), WorkflowError> {
        if quantity == 0 {
            return Err(WorkflowError::InvalidQuantity);
        }
        self.view_mut("change the quantity")?.quantity = quantity;
        Ok(())
    }

    pub fn build_request(&self) -> Result<SourcingRequest, WorkflowError> {
        let ShortageState::LocationsAvailable(view) = &self.state else {
            return Err(WorkflowError::InvalidTransition("submit a request"));
        };
        let source = view
            .selected_source()
            .ok_or(WorkflowError::NoSourceSelected)?;
        if view.quantity == 0 {
            return Err(WorkflowError::InvalidQuantity);
        }
        Ok(SourcingRequest {
            part_number: self.part_number.clone(),
            quantity: view.quantity,
            from_location: source.location.clone(),
            to_location: self.required_at.clone(),
        })
    }

    /// Sent once. On failure the session stays open so the operator can act.
    pub async fn submit(
        &mut self,
        backend: &dyn PlanningBackend,
        policy: &CallPolicy,
    ) -> Result<SourcingAck, WorkflowError> {
        let request = self.build_request()?;
        match policy
            .once("submit_sourcing_request", backend.submit_sourcing_request(&request))
            .await
        {
            Ok(ack) => {
                info!(
                    part_number = %request.part_number,
                    from = %request.from_location,
                    to = %request.to_location,
                    quantity = request.quantity,
                    request_id = %ack.request_id,
                    "sourcing request accepted"
                );
                self.state = ShortageState::RequestSubmitted {
                    request,
                    ack: ack.clone(),
                };
                Ok(ack)
            }
            Err(error) => {
                warn!(part_number = %request.part_number, %error, "sourcing request rejected");
                Err(WorkflowError::SubmissionFailed(error))
            }
        }
    }

    fn view_mut(&mut self, action: &'static str) -> Result<&mut ResolutionView, WorkflowError> {
        match &mut self.state {
            ShortageState::LocationsAvailable(view) => Ok(view),
            _ => Err(WorkflowError::InvalidTransition(action)),
        }
    }
}

#[cfg(test)]
#[path = "tests/shortage_tests.rs"]
mod tests;
