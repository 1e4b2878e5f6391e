//! Harvest storage.

use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::PlantType;

/// Quantity-by-type storage of harvested crops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Barn {
    storage: BTreeMap<String, u32>,
}

impl Barn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one harvested unit.
    pub fn add(&mut self, plant: &PlantType) {
        self.add_units(plant, 1);
    }

    /// Store `count` units at once. Saturates rather than wrapping.
    pub fn add_units(&mut self, plant: &PlantType, count: u32) {
        let slot = self.storage.entry(plant.name.clone()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Take `amount` units out. All or nothing: on insufficient stock
    /// nothing changes and `false` is returned.
    pub fn remove(&mut self, plant_name: &str, amount: u32) -> bool {
        match self.storage.get_mut(plant_name) {
            Some(count) if *count >= amount => {
                *count -= amount;
                true
            }
            None if amount == 0 => true,
            _ => {
                debug!(plant = plant_name, amount, "insufficient stock");
                false
            }
        }
    }

    pub fn count(&self, plant_name: &str) -> u32 {
        self.storage.get(plant_name).copied().unwrap_or(0)
    }

    /// Stored quantities in name order, including exhausted entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.storage.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> u64 {
        self.storage.values().map(|&v| u64::from(v)).sum()
    }
}
