//! Plain-text rendering of the planner's display data.

use std::fmt::Write as _;

use planner_core::{PlanView, ResolutionView, ShortageState, StockAnnotation};
use shared::domain::LocationStock;

pub fn render_plan(view: &PlanView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Parts (eBOM)");
    for row in &view.parts {
        let status = match row.annotation() {
            StockAnnotation::InStock { quantity, location } => {
                format!("in stock: {quantity} at {location}")
            }
            StockAnnotation::OutOfStock { required_at } => {
                format!("OUT OF STOCK at {required_at}")
            }
            StockAnnotation::Unknown => "unknown".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<16} {:<28} x{:<5} {status}",
            row.part.part_number, row.part.name, row.part.quantity
        );
    }
    let _ = writeln!(out, "Process (mBOM)");
    for step in &view.steps {
        let _ = writeln!(out, "  [{}] {}", step.location, step.step);
    }
    out
}

pub fn render_sources(sources: &[LocationStock]) -> String {
    let mut out = String::new();
    for (index, source) in sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {:<20} {} available",
            index + 1,
            source.location,
            source.quantity
        );
    }
    out
}

pub fn render_resolution(view: &ResolutionView) -> String {
    let mut out = format!(
        "{} ({}) needed at {}: deficit {}\n",
        view.part_number, view.part_name, view.required_at, view.deficit
    );
    out.push_str(&render_sources(&view.sources));
    out
}

pub fn render_shortage_state(part_number: &str, state: &ShortageState) -> String {
    match state {
        ShortageState::Idle | ShortageState::LocationsLoading => {
            format!("{part_number}: looking for stock...")
        }
        ShortageState::LocationsAvailable(view) => render_resolution(view),
        ShortageState::NoSupplyFound => {
            format!("{part_number}: no stock available at any location")
        }
        ShortageState::LocationsLoadFailed(reason) => {
            format!("{part_number}: location lookup failed: {reason}")
        }
        ShortageState::RequestSubmitted { request, ack } => format!(
            "{part_number}: request {} accepted, {} from {} to {}",
            ack.request_id, request.quantity, request.from_location, request.to_location
        ),
    }
}
