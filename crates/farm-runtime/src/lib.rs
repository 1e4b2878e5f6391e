#![deny(warnings)]

//! Session runtime for Farmstead.
//!
//! Owns the farm grid, the player and barn stores, the achievement engine and
//! a virtual clock that drives crop growth. Frontends call into
//! [`FarmSession`] and render the [`FarmEvent`]s it queues.

pub mod clock;
pub mod config;
mod save;
pub mod session;

pub use clock::{Fired, Scheduler, TimerId};
pub use config::{ConfigError, GameConfig};
pub use session::{FarmEvent, FarmSession, PlantOutcome, SessionError};
