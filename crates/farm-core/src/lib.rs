#![deny(warnings)]

//! Core domain models and invariants for Farmstead.
//!
//! This crate defines the static catalog (plants and fertilizers), the plot
//! growth state machine, and the two stores mutated by gameplay: the barn and
//! the player. Everything here is synchronous and clock-free; timers are
//! driven from `farm-runtime`.

pub mod barn;
pub mod catalog;
pub mod player;
pub mod plot;

pub use barn::Barn;
pub use catalog::{Catalog, FertilizerType, PlantType};
pub use player::Player;
pub use plot::{GrowthPlan, GrowthStep, Plot, PlotOccupied, PlotRefresh, PlotState, Position};

use thiserror::Error;

/// Number of visual growth stages a crop passes through while growing.
pub const STAGE_COUNT: u8 = 3;

/// Lookup failures against the catalog. These point at a programming or
/// configuration mistake rather than a player action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No plant with this name is registered.
    #[error("unknown plant type: {0}")]
    UnknownPlant(String),
    /// No fertilizer with this key is registered.
    #[error("unknown fertilizer: {0}")]
    UnknownFertilizer(String),
}

/// Validation errors for catalog data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Names and keys must not be blank.
    #[error("empty name")]
    EmptyName,
    /// Plant names and ids must be unique.
    #[error("duplicate plant type: {0}")]
    DuplicatePlant(String),
    /// Grow time must be a positive finite number of seconds.
    #[error("grow time for {name} must be > 0, got {secs}")]
    NonPositiveGrowTime { name: String, secs: f64 },
    /// Fertilized grow time does not fit in a timer duration.
    #[error("grow time for {name} is too long: {secs}s")]
    GrowTimeTooLong { name: String, secs: f64 },
    /// Multiplier must be a positive finite number.
    #[error("multiplier for {key} must be > 0, got {multiplier}")]
    InvalidMultiplier { key: String, multiplier: f64 },
    /// A fertilizer entry's embedded key disagrees with its map key.
    #[error("fertilizer registered as {map_key} but declares key {key}")]
    KeyMismatch { map_key: String, key: String },
}

/// Errors raised while rebuilding a plot from saved data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RestoreError {
    /// Stage outside `0..STAGE_COUNT`.
    #[error("stage {0} is out of range")]
    StageOutOfRange(u8),
    /// A non-empty plot was saved without a plant.
    #[error("{0:?} plot has no plant")]
    MissingPlant(PlotState),
    /// Stage interval must be a positive finite number of seconds.
    #[error("invalid stage interval: {0}")]
    InvalidInterval(f64),
}
