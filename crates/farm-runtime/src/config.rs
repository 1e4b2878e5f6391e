//! Game configuration.

use farm_core::{Catalog, ValidationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid catalog: {0}")]
    Catalog(#[from] ValidationError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session parameters plus the catalog they play with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Plots per row.
    pub grid_width: u32,
    /// Number of rows.
    pub grid_height: u32,
    /// Plots owned from the start, taken in row-major order.
    pub starter_plots: u32,
    /// Price of one extra plot.
    pub plot_price: u64,
    pub starting_balance: u64,
    /// Move ready crops straight into the barn.
    pub auto_harvest: bool,
    pub catalog: Catalog,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 5,
            grid_height: 5,
            starter_plots: 9,
            plot_price: 25,
            starting_balance: 50,
            auto_harvest: false,
            catalog: Catalog::builtin(),
        }
    }
}

impl GameConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::Invalid("grid must have at least one plot".into()));
        }
        if u64::from(self.starter_plots) > self.cell_count() {
            return Err(ConfigError::Invalid(format!(
                "starter_plots {} exceeds grid of {} plots",
                self.starter_plots,
                self.cell_count()
            )));
        }
        self.catalog.validate()?;
        Ok(())
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.grid_width) * u64::from(self.grid_height)
    }

    /// Plots that can still be bought after the starter set.
    pub fn purchasable_plots(&self) -> u64 {
        self.cell_count()
            .saturating_sub(u64::from(self.starter_plots))
    }
}
