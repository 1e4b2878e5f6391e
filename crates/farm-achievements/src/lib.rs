#![deny(warnings)]

//! Achievement tracking for Farmstead.
//!
//! The engine owns a [`AchievementStats`] snapshot and a fixed, ordered list
//! of achievements. Every stat mutation goes through the engine and is
//! followed by an evaluation pass; achievements unlock at most once and never
//! lock again.

mod standard;

pub use standard::standard_achievements;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Flag set when every owned plot was harvested in one sweep.
pub const HARVEST_ALL_FLAG: &str = "harvest_all_flag";

/// Counter statistics tracked by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    PlantsPlanted,
    PlantsHarvested,
    FertilizersUsed,
    PlotsOwned,
    PlantsSold,
    Balance,
}

impl StatKey {
    pub const ALL: [StatKey; 6] = [
        StatKey::PlantsPlanted,
        StatKey::PlantsHarvested,
        StatKey::FertilizersUsed,
        StatKey::PlotsOwned,
        StatKey::PlantsSold,
        StatKey::Balance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatKey::PlantsPlanted => "plants_planted",
            StatKey::PlantsHarvested => "plants_harvested",
            StatKey::FertilizersUsed => "fertilizers_used",
            StatKey::PlotsOwned => "plots_owned",
            StatKey::PlantsSold => "plants_sold",
            StatKey::Balance => "balance",
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown statistic name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown stat key: {0}")]
pub struct StatKeyError(pub String);

impl FromStr for StatKey {
    type Err = StatKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StatKeyError(s.to_string()))
    }
}

/// Cumulative gameplay statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementStats {
    pub plants_planted: u64,
    pub plants_harvested: u64,
    pub fertilizers_used: u64,
    pub plots_owned: u64,
    pub plants_sold: u64,
    /// Mirror of the player's wallet.
    pub balance: u64,
    /// Plantings per crop name.
    #[serde(default)]
    pub plants_per_type: BTreeMap<String, u64>,
    /// Arbitrary boolean conditions, e.g. [`HARVEST_ALL_FLAG`].
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

impl AchievementStats {
    pub fn get(&self, key: StatKey) -> u64 {
        match key {
            StatKey::PlantsPlanted => self.plants_planted,
            StatKey::PlantsHarvested => self.plants_harvested,
            StatKey::FertilizersUsed => self.fertilizers_used,
            StatKey::PlotsOwned => self.plots_owned,
            StatKey::PlantsSold => self.plants_sold,
            StatKey::Balance => self.balance,
        }
    }

    fn counter_mut(&mut self, key: StatKey) -> &mut u64 {
        match key {
            StatKey::PlantsPlanted => &mut self.plants_planted,
            StatKey::PlantsHarvested => &mut self.plants_harvested,
            StatKey::FertilizersUsed => &mut self.fertilizers_used,
            StatKey::PlotsOwned => &mut self.plots_owned,
            StatKey::PlantsSold => &mut self.plants_sold,
            StatKey::Balance => &mut self.balance,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }
}

/// Unlock condition, each carrying its own threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementKind {
    /// A counter reached `threshold`.
    StatAtLeast { stat: StatKey, threshold: u64 },
    /// Some single crop was planted at least `threshold` times.
    SingleTypePlantedAtLeast { threshold: u64 },
    /// Every listed crop was planted at least once. Empty list is satisfied.
    AllTypesPlanted { types: Vec<String> },
    /// A boolean flag is set.
    Flag { key: String },
}

impl AchievementKind {
    /// Pure predicate over a stats snapshot.
    pub fn is_met(&self, stats: &AchievementStats) -> bool {
        match self {
            AchievementKind::StatAtLeast { stat, threshold } => stats.get(*stat) >= *threshold,
            AchievementKind::SingleTypePlantedAtLeast { threshold } => {
                stats.plants_per_type.values().any(|&n| n >= *threshold)
            }
            AchievementKind::AllTypesPlanted { types } => types
                .iter()
                .all(|t| stats.plants_per_type.get(t).copied().unwrap_or(0) >= 1),
            AchievementKind::Flag { key } => stats.flag(key),
        }
    }
}

/// Static description of an achievement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: AchievementKind,
}

/// An achievement and whether it has been earned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Achievement {
    pub def: AchievementDef,
    unlocked: bool,
}

impl Achievement {
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

/// One-time notification for a newly earned achievement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Owns the stats snapshot and evaluates achievements after every change.
#[derive(Clone, Debug)]
pub struct AchievementEngine {
    stats: AchievementStats,
    achievements: Vec<Achievement>,
}

impl AchievementEngine {
    /// Engine over `defs`, evaluated in the given order.
    pub fn new(defs: Vec<AchievementDef>) -> Self {
        Self {
            stats: AchievementStats::default(),
            achievements: defs
                .into_iter()
                .map(|def| Achievement {
                    def,
                    unlocked: false,
                })
                .collect(),
        }
    }

    /// Engine with the stock achievement list.
    pub fn standard(plant_types: &[String], purchasable_plots: u64) -> Self {
        Self::new(standard_achievements(plant_types, purchasable_plots))
    }

    pub fn stats(&self) -> &AchievementStats {
        &self.stats
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    /// Bump a counter (and the per-type tally for plantings), then evaluate.
    pub fn add_stat(
        &mut self,
        key: StatKey,
        amount: u64,
        plant_type: Option<&str>,
    ) -> Vec<UnlockEvent> {
        if key == StatKey::PlantsPlanted {
            if let Some(name) = plant_type {
                let n = self.stats.plants_per_type.entry(name.to_string()).or_insert(0);
                *n = n.saturating_add(amount);
            }
        }
        let counter = self.stats.counter_mut(key);
        *counter = counter.saturating_add(amount);
        self.evaluate()
    }

    /// Overwrite a counter, then evaluate. Unlocks already earned stay
    /// earned if the value drops.
    pub fn set_stat(&mut self, key: StatKey, value: u64) -> Vec<UnlockEvent> {
        *self.stats.counter_mut(key) = value;
        self.evaluate()
    }

    /// Set a boolean stat, then evaluate.
    pub fn set_flag(&mut self, key: &str, value: bool) -> Vec<UnlockEvent> {
        self.stats.flags.insert(key.to_string(), value);
        self.evaluate()
    }

    /// Unlock every locked achievement whose condition now holds, in
    /// declaration order. Already unlocked achievements are skipped.
    pub fn evaluate(&mut self) -> Vec<UnlockEvent> {
        let mut events = Vec::new();
        for ach in self.achievements.iter_mut().filter(|a| !a.unlocked) {
            if ach.def.kind.is_met(&self.stats) {
                ach.unlocked = true;
                info!(id = %ach.def.id, title = %ach.def.title, "achievement unlocked");
                events.push(UnlockEvent {
                    id: ach.def.id.clone(),
                    title: ach.def.title.clone(),
                    description: ach.def.description.clone(),
                });
            }
        }
        events
    }

    /// Unlocked achievements in declaration order.
    pub fn unlocked(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| a.unlocked).collect()
    }

    pub fn unlocked_ids(&self) -> Vec<String> {
        self.unlocked().into_iter().map(|a| a.def.id.clone()).collect()
    }

    /// Load saved stats and unlocks without emitting notifications.
    /// Ids not present in this engine are ignored.
    pub fn restore(&mut self, stats: AchievementStats, unlocked: &[String]) {
        let ids: BTreeSet<&str> = unlocked.iter().map(String::as_str).collect();
        self.stats = stats;
        for ach in &mut self.achievements {
            ach.unlocked = ids.contains(ach.def.id.as_str());
        }
    }
}
