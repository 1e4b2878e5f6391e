//! Static reference data: plant types and fertilizers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::{CatalogError, ValidationError, STAGE_COUNT};

/// A plantable crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantType {
    /// Stable numeric identifier.
    pub id: u32,
    /// Display name, unique within a catalog. Barn and stats key on it.
    pub name: String,
    /// Unfertilized time from sowing to ready, in seconds (> 0).
    pub base_grow_secs: f64,
}

/// A purchasable growth accelerator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FertilizerType {
    /// Inventory key, e.g. "basic".
    #[serde(default)]
    pub key: String,
    /// Display name.
    pub name: String,
    /// Scalar applied to the base grow time (> 0, below 1 speeds growth up).
    pub multiplier: f64,
    /// Shop price in coins.
    pub price: u64,
}

impl FertilizerType {
    /// Key used when sowing without fertilizer.
    pub const NONE_KEY: &'static str = "none";

    /// The neutral "no fertilizer" entry: multiplier 1, free.
    pub fn unfertilized() -> Self {
        Self {
            key: Self::NONE_KEY.to_string(),
            name: "No Fertilizer".to_string(),
            multiplier: 1.0,
            price: 0,
        }
    }
}

impl PlantType {
    /// Total grow time with the given fertilizer applied.
    ///
    /// Saturates for values a [`Catalog::validate`] pass would reject.
    pub fn grow_duration(&self, fertilizer: &FertilizerType) -> Duration {
        let secs = self.base_grow_secs * fertilizer.multiplier;
        Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    /// Time between two consecutive growth stages.
    pub fn stage_interval(&self, fertilizer: &FertilizerType) -> Duration {
        self.grow_duration(fertilizer) / u32::from(STAGE_COUNT)
    }
}

/// Immutable plant and fertilizer reference data, passed in at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCatalog")]
pub struct Catalog {
    plants: Vec<PlantType>,
    fertilizers: BTreeMap<String, FertilizerType>,
}

/// On-disk shape; fertilizer keys may be omitted and default to the map key.
#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default)]
    plants: Vec<PlantType>,
    #[serde(default)]
    fertilizers: BTreeMap<String, FertilizerType>,
}

impl From<RawCatalog> for Catalog {
    fn from(raw: RawCatalog) -> Self {
        let mut fertilizers = raw.fertilizers;
        for (key, fert) in fertilizers.iter_mut() {
            if fert.key.is_empty() {
                fert.key = key.clone();
            }
        }
        Self {
            plants: raw.plants,
            fertilizers,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// Build a catalog from parts. Fertilizer keys are taken from the map.
    pub fn new(
        plants: Vec<PlantType>,
        fertilizers: impl IntoIterator<Item = FertilizerType>,
    ) -> Result<Self, ValidationError> {
        let fertilizers = fertilizers
            .into_iter()
            .map(|f| (f.key.clone(), f))
            .collect();
        let catalog = Self {
            plants,
            fertilizers,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The stock crops and fertilizers.
    pub fn builtin() -> Self {
        let plant = |id, name: &str, secs| PlantType {
            id,
            name: name.to_string(),
            base_grow_secs: secs,
        };
        let fert = |key: &str, name: &str, multiplier, price| {
            (
                key.to_string(),
                FertilizerType {
                    key: key.to_string(),
                    name: name.to_string(),
                    multiplier,
                    price,
                },
            )
        };
        Self {
            plants: vec![
                plant(1, "Wheat", 5.0),
                plant(2, "Carrot", 3.0),
                plant(3, "Potato", 8.0),
            ],
            fertilizers: BTreeMap::from([
                fert("basic", "Basic Fertilizer", 0.8, 10),
                fert("super", "Super Fertilizer", 0.5, 20),
            ]),
        }
    }

    /// Parse a catalog from YAML. Map keys fill in missing fertilizer keys.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Check names, uniqueness and numeric ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut names = BTreeSet::new();
        let mut ids = BTreeSet::new();
        for p in &self.plants {
            if p.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if !names.insert(p.name.as_str()) || !ids.insert(p.id) {
                return Err(ValidationError::DuplicatePlant(p.name.clone()));
            }
            if !(p.base_grow_secs.is_finite() && p.base_grow_secs > 0.0) {
                return Err(ValidationError::NonPositiveGrowTime {
                    name: p.name.clone(),
                    secs: p.base_grow_secs,
                });
            }
        }
        for (key, f) in &self.fertilizers {
            if key.trim().is_empty() || f.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if &f.key != key {
                return Err(ValidationError::KeyMismatch {
                    map_key: key.clone(),
                    key: f.key.clone(),
                });
            }
            if !(f.multiplier.is_finite() && f.multiplier > 0.0) {
                return Err(ValidationError::InvalidMultiplier {
                    key: key.clone(),
                    multiplier: f.multiplier,
                });
            }
        }
        let slowest = self
            .fertilizers
            .values()
            .map(|f| f.multiplier)
            .fold(1.0_f64, f64::max);
        for p in &self.plants {
            let secs = p.base_grow_secs * slowest;
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(ValidationError::GrowTimeTooLong {
                    name: p.name.clone(),
                    secs,
                });
            }
        }
        Ok(())
    }

    pub fn plants(&self) -> &[PlantType] {
        &self.plants
    }

    pub fn plant_names(&self) -> Vec<String> {
        self.plants.iter().map(|p| p.name.clone()).collect()
    }

    pub fn fertilizers(&self) -> impl Iterator<Item = &FertilizerType> {
        self.fertilizers.values()
    }

    /// Look up a plant by name.
    pub fn plant(&self, name: &str) -> Result<&PlantType, CatalogError> {
        self.plants
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CatalogError::UnknownPlant(name.to_string()))
    }

    /// Look up a fertilizer by key.
    pub fn fertilizer(&self, key: &str) -> Result<&FertilizerType, CatalogError> {
        self.fertilizers
            .get(key)
            .ok_or_else(|| CatalogError::UnknownFertilizer(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_valid() {
        let c = Catalog::builtin();
        c.validate().unwrap();
        assert_eq!(c.plant_names(), vec!["Wheat", "Carrot", "Potato"]);
        assert_eq!(c.fertilizer("super").unwrap().price, 20);
    }

    #[test]
    fn unknown_lookups_fail_fast() {
        let c = Catalog::builtin();
        assert_eq!(
            c.plant("Tomato").unwrap_err(),
            CatalogError::UnknownPlant("Tomato".into())
        );
        assert!(matches!(
            c.fertilizer("mega"),
            Err(CatalogError::UnknownFertilizer(_))
        ));
    }

    #[test]
    fn stage_interval_is_a_third_of_fertilized_time() {
        let c = Catalog::builtin();
        let wheat = c.plant("Wheat").unwrap();
        let basic = c.fertilizer("basic").unwrap();
        // 5s * 0.8 = 4s, split into three stages
        assert_eq!(wheat.grow_duration(basic), Duration::from_secs(4));
        assert_eq!(wheat.stage_interval(basic), Duration::from_secs(4) / 3);
        let none = FertilizerType::unfertilized();
        assert_eq!(wheat.grow_duration(&none), Duration::from_secs(5));
    }

    #[test]
    fn yaml_fills_fertilizer_keys() {
        let text = r#"
plants:
  - { id: 1, name: Beet, base_grow_secs: 6 }
fertilizers:
  compost: { name: Compost, multiplier: 0.9, price: 4 }
"#;
        let c = Catalog::from_yaml_str(text).unwrap();
        c.validate().unwrap();
        assert_eq!(c.fertilizer("compost").unwrap().key, "compost");
        assert_eq!(c.plant("Beet").unwrap().base_grow_secs, 6.0);
    }

    #[test]
    fn rejects_bad_entries() {
        let dup = vec![
            PlantType { id: 1, name: "A".into(), base_grow_secs: 1.0 },
            PlantType { id: 2, name: "A".into(), base_grow_secs: 1.0 },
        ];
        assert_eq!(
            Catalog::new(dup, []).unwrap_err(),
            ValidationError::DuplicatePlant("A".into())
        );

        let slow = vec![PlantType { id: 1, name: "A".into(), base_grow_secs: 0.0 }];
        assert!(matches!(
            Catalog::new(slow, []),
            Err(ValidationError::NonPositiveGrowTime { .. })
        ));

        let mut bad = FertilizerType::unfertilized();
        bad.multiplier = f64::NAN;
        assert!(matches!(
            Catalog::new(vec![], [bad]),
            Err(ValidationError::InvalidMultiplier { .. })
        ));
    }

    #[test]
    fn rejects_grow_times_beyond_timer_range() {
        let oak = vec![PlantType { id: 1, name: "Oak".into(), base_grow_secs: 1e30 }];
        assert!(matches!(
            Catalog::new(oak, []),
            Err(ValidationError::GrowTimeTooLong { .. })
        ));

        // fits unfertilized, overflows once a slow fertilizer applies
        let yew = vec![PlantType { id: 1, name: "Yew".into(), base_grow_secs: 1e18 }];
        let mut sludge = FertilizerType::unfertilized();
        sludge.key = "sludge".into();
        sludge.multiplier = 100.0;
        assert!(Catalog::new(yew.clone(), []).is_ok());
        assert!(matches!(
            Catalog::new(yew, [sludge]),
            Err(ValidationError::GrowTimeTooLong { .. })
        ));
    }

    #[test]
    fn grow_duration_saturates_instead_of_panicking() {
        let oak = PlantType { id: 1, name: "Oak".into(), base_grow_secs: 1e30 };
        assert_eq!(oak.grow_duration(&FertilizerType::unfertilized()), Duration::MAX);
    }

    #[test]
    fn empty_catalog_is_valid() {
        let c = Catalog::new(vec![], []).unwrap();
        assert!(c.plant_names().is_empty());
    }
}
