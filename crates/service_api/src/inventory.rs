use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quantity of one part held at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub part_number: String,
    #[serde(default)]
    pub name: String,
    pub location: String,
    pub quantity: u32,
}

#[derive(Debug, Error)]
pub enum InventoryLoadError {
    #[error("failed to read inventory file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Either `{ "<category>": [records] }` or a flat list of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryFile {
    Categorized(BTreeMap<String, Vec<StockRecord>>),
    Flat(Vec<StockRecord>),
}

#[derive(Debug, Clone, Default)]
pub struct InventoryDb {
    records: Vec<StockRecord>,
}

impl InventoryDb {
    pub fn new(records: Vec<StockRecord>) -> Self {
        Self { records }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, InventoryLoadError> {
        let records = match serde_json::from_str::<InventoryFile>(raw)? {
            InventoryFile::Categorized(categories) => categories.into_values().flatten().collect(),
            InventoryFile::Flat(records) => records,
        };
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> Result<Self, InventoryLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| InventoryLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn knows_part(&self, part_number: &str) -> bool {
        self.records.iter().any(|r| r.part_number == part_number)
    }

    pub fn quantity_at(&self, part_number: &str, location: &str) -> u32 {
        self.records
            .iter()
            .filter(|r| r.part_number == part_number && r.location == location)
            .map(|r| r.quantity)
            .sum()
    }

    /// Locations holding a positive quantity, in file order.
    pub fn stocked_locations(&self, part_number: &str) -> Vec<(String, u32)> {
        let mut found: Vec<(String, u32)> = Vec::new();
        for record in self
            .records
            .iter()
            .filter(|r| r.part_number == part_number && r.quantity > 0)
        {
            match found.iter_mut().find(|(location, _)| *location == record.location) {
                Some((_, quantity)) => *quantity += record.quantity,
                None => found.push((record.location.clone(), record.quantity)),
            }
        }
        found
    }

    /// Distinct part numbers, sorted.
    pub fn part_numbers(&self) -> Vec<String> {
        let mut numbers: Vec<String> = self.records.iter().map(|r| r.part_number.clone()).collect();
        numbers.sort();
        numbers.dedup();
        numbers
    }

    /// Distinct locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.records.iter().map(|r| r.location.clone()).collect();
        locations.sort();
        locations.dedup();
        locations
    }
}
