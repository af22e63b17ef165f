use std::collections::HashMap;

use shared::{
    domain::{InventoryVerdict, Plan},
    protocol::{CheckInventoryRequest, PartRequirement},
};
use tracing::{debug, info, warn};

use crate::{
    backend::{CallPolicy, PlanningBackend},
    error::BackendError,
    view::{PartRow, PlanView},
};

pub type VerdictMap = HashMap<String, InventoryVerdict>;

/// Issues a single batched inventory check for every requirement.
pub async fn check_inventory(
    backend: &dyn PlanningBackend,
    policy: &CallPolicy,
    requirements: &[PartRequirement],
) -> Result<VerdictMap, BackendError> {
    let request = CheckInventoryRequest {
        parts: requirements.to_vec(),
    };
    let request = &request;
    let verdicts = policy
        .read("check_inventory", move || backend.check_inventory(request))
        .await?;
    info!(
        requested = requirements.len(),
        received = verdicts.len(),
        "inventory check completed"
    );
    Ok(collect_verdicts(requirements, verdicts))
}

/// Keys verdicts by part number. Verdicts for parts that were not requested are
/// dropped and `required_at` is pinned to the correlated location.
pub fn collect_verdicts(
    requirements: &[PartRequirement],
    verdicts: Vec<InventoryVerdict>,
) -> VerdictMap {
    let requested: HashMap<&str, &str> = requirements
        .iter()
        .map(|r| (r.part_number.as_str(), r.location.as_str()))
        .collect();

    let mut map = VerdictMap::with_capacity(verdicts.len());
    for mut verdict in verdicts {
        let Some(location) = requested.get(verdict.part_number.as_str()) else {
            warn!(part_number = %verdict.part_number, "dropping verdict for part not in plan");
            continue;
        };
        if verdict.required_at != *location {
            debug!(
                part_number = %verdict.part_number,
                reported = %verdict.required_at,
                correlated = %location,
                "normalizing verdict location"
            );
            verdict.required_at = location.to_string();
        }
        map.entry(verdict.part_number.clone()).or_insert(verdict);
    }
    map
}

/// Annotates every part with its verdict, if one exists.
pub fn fuse(plan: &Plan, verdicts: &VerdictMap) -> PlanView {
    PlanView {
        parts: plan
            .parts
            .iter()
            .map(|part| PartRow {
                part: part.clone(),
                verdict: verdicts.get(&part.part_number).cloned(),
            })
            .collect(),
        steps: plan.steps.clone(),
    }
}

#[cfg(test)]
#[path = "tests/inventory_tests.rs"]
mod tests;
