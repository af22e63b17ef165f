//! Validation of the plan service's reply into a typed [`Plan`].

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::domain::{Part, Plan, ProcessStep};
use thiserror::Error;

const PART_SECTION_KEYS: [&str; 2] = ["eBOM_parts", "parts"];
const STEP_SECTION_KEYS: [&str; 2] = ["mBOM_steps", "steps"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan reply is not JSON: {0}")]
    NotJson(String),
    #[error("plan is not a JSON object")]
    NotAnObject,
    #[error("plan is missing its `{0}` list")]
    MissingSection(&'static str),
    #[error("plan field `{0}` is not a list")]
    NotASequence(&'static str),
    #[error("{section}[{index}]: {reason}")]
    InvalidEntry {
        section: &'static str,
        index: usize,
        reason: String,
    },
    #[error("part {0} has a zero quantity")]
    ZeroQuantity(String),
    #[error("part number {0} appears more than once")]
    DuplicatePart(String),
}

/// Accepts the generator's JSON verbatim; extra fields are ignored.
pub fn parse_plan(value: Value) -> Result<Plan, PlanError> {
    let Value::Object(object) = value else {
        return Err(PlanError::NotAnObject);
    };

    let parts: Vec<Part> = parse_section(&object, "parts", &PART_SECTION_KEYS)?;
    let steps: Vec<ProcessStep> = parse_section(&object, "steps", &STEP_SECTION_KEYS)?;

    let mut seen = HashSet::new();
    for part in &parts {
        if part.quantity == 0 {
            return Err(PlanError::ZeroQuantity(part.part_number.clone()));
        }
        if !seen.insert(part.part_number.as_str()) {
            return Err(PlanError::DuplicatePart(part.part_number.clone()));
        }
    }

    Ok(Plan { parts, steps })
}

fn parse_section<T: DeserializeOwned>(
    object: &Map<String, Value>,
    section: &'static str,
    keys: &[&str],
) -> Result<Vec<T>, PlanError> {
    let raw = keys
        .iter()
        .find_map(|key| object.get(*key))
        .ok_or(PlanError::MissingSection(section))?;
    let Value::Array(entries) = raw else {
        return Err(PlanError::NotASequence(section));
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry.clone()).map_err(|e| PlanError::InvalidEntry {
                section,
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/plan_tests.rs"]
mod tests;
