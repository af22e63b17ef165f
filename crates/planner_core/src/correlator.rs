//! Assigns each part the location of the process step that needs it.
//!
//! The default strategy is a text heuristic: a step "needs" a part when its
//! description mentions the part's name or number. Results are best-effort.

use shared::{
    domain::{Part, Plan, ProcessStep, MAIN_WAREHOUSE},
    protocol::PartRequirement,
};

pub trait CorrelationStrategy: Send + Sync {
    fn match_location(&self, part: &Part, steps: &[ProcessStep]) -> String;
}

/// First step (in plan order) whose text contains the part's name or number,
/// case-sensitively. Falls back to [`MAIN_WAREHOUSE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringCorrelation;

impl CorrelationStrategy for SubstringCorrelation {
    fn match_location(&self, part: &Part, steps: &[ProcessStep]) -> String {
        steps
            .iter()
            .find(|step| mentions(&step.step, part))
            .map(|step| step.location.clone())
            .unwrap_or_else(|| MAIN_WAREHOUSE.to_string())
    }
}

fn mentions(text: &str, part: &Part) -> bool {
    // An empty needle would match every step.
    let contains = |needle: &str| !needle.is_empty() && text.contains(needle);
    contains(&part.name) || contains(&part.part_number)
}

/// One requirement per part, in `plan.parts` order.
pub fn correlate(plan: &Plan, strategy: &dyn CorrelationStrategy) -> Vec<PartRequirement> {
    plan.parts
        .iter()
        .map(|part| PartRequirement {
            part_number: part.part_number.clone(),
            location: strategy.match_location(part, &plan.steps),
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/correlator_tests.rs"]
mod tests;
