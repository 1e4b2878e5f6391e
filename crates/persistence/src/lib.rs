#![deny(warnings)]

//! Persistence layer: JSON save snapshots.
//!
//! The snapshot layout (`player`, `barn`, `farm`) is the compatibility
//! contract with existing save files; later additions are optional keys so
//! older files keep loading. A missing file is "no data", never an error.

use chrono::{DateTime, Utc};
use farm_achievements::AchievementStats;
use farm_core::PlotState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// File name used when no explicit save path is given.
pub const DEFAULT_SAVE_FILE: &str = "farm_save.json";

/// Errors while reading or writing a save.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed save: {0}")]
    Json(#[from] serde_json::Error),
    #[error("inconsistent save: {0}")]
    Invalid(String),
}

/// Wallet and fertilizer stock.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSave {
    pub balance: u64,
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
}

/// One plot. `plant_name` and `stage` are present iff the plot is occupied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotSave {
    pub state: PlotState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    /// Seconds between stages of the (fertilized) crop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned: Option<bool>,
}

impl PlotSave {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Achievement progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementsSave {
    pub stats: AchievementStats,
    #[serde(default)]
    pub unlocked: Vec<String>,
}

/// Full game snapshot. `farm` is row-major: `farm[y][x]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub player: PlayerSave,
    #[serde(default)]
    pub barn: BTreeMap<String, u32>,
    #[serde(default)]
    pub farm: Vec<Vec<PlotSave>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<AchievementsSave>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SaveData {
    /// Structural checks that do not need the catalog.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        let width = self.farm.first().map(Vec::len).unwrap_or(0);
        for (y, row) in self.farm.iter().enumerate() {
            if row.len() != width {
                return Err(PersistenceError::Invalid(format!(
                    "row {y} has {} plots, expected {width}",
                    row.len()
                )));
            }
            for (x, plot) in row.iter().enumerate() {
                let occupied = plot.state != PlotState::Empty;
                if occupied && plot.plant_name.is_none() {
                    return Err(PersistenceError::Invalid(format!(
                        "plot ({x},{y}) is {:?} without a plant",
                        plot.state
                    )));
                }
                if let Some(secs) = plot.stage_secs {
                    if !(secs.is_finite() && secs > 0.0) {
                        return Err(PersistenceError::Invalid(format!(
                            "plot ({x},{y}) has stage_secs {secs}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Write a snapshot as pretty JSON (4-space indent), creating parent dirs.
pub fn save_to_path(path: impl AsRef<Path>, data: &SaveData) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    fs::write(path, buf)?;
    info!(path = %path.display(), "game saved");
    Ok(())
}

/// Read a snapshot. `Ok(None)` when the file does not exist.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Option<SaveData>, PersistenceError> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no save file found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let data: SaveData = serde_json::from_str(&text)?;
    data.validate()?;
    Ok(Some(data))
}

/// Like [`load_from_path`], but unreadable or malformed saves are logged and
/// reported as "no data".
pub fn load_or_none(path: impl AsRef<Path>) -> Option<SaveData> {
    let path = path.as_ref();
    match load_from_path(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable save");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> SaveData {
        SaveData {
            player: PlayerSave {
                balance: 60,
                inventory: BTreeMap::from([("basic".to_string(), 1), ("super".to_string(), 0)]),
            },
            barn: BTreeMap::from([("Wheat".to_string(), 2)]),
            farm: vec![vec![
                PlotSave {
                    state: PlotState::Growing,
                    plant_name: Some("Wheat".into()),
                    stage: Some(1),
                    stage_secs: Some(1.5),
                    owned: Some(true),
                },
                PlotSave::empty(),
            ]],
            achievements: None,
            saved_at: None,
        }
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempdir().unwrap();
        let got = load_from_path(dir.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saves").join(DEFAULT_SAVE_FILE);
        let data = sample();
        save_to_path(&path, &data).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"player\""));
        assert!(!text.contains("saved_at"));
        assert_eq!(load_from_path(&path).unwrap(), Some(data));
    }

    #[test]
    fn reads_legacy_layout() {
        let text = r#"{
            "player": {"balance": 40, "inventory": {"basic": 1, "super": 0}},
            "barn": {"Wheat": 3},
            "farm": [[{"state": "empty"}, {"state": "ready", "plant_name": "Wheat", "stage": 2}]]
        }"#;
        let data: SaveData = serde_json::from_str(text).unwrap();
        data.validate().unwrap();
        assert_eq!(data.player.balance, 40);
        assert_eq!(data.farm[0][1].state, PlotState::Ready);
        assert_eq!(data.farm[0][1].owned, None);
        assert!(data.achievements.is_none());
    }

    #[test]
    fn malformed_file_is_an_error_but_load_or_none_swallows_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SAVE_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_from_path(&path), Err(PersistenceError::Json(_))));
        assert!(load_or_none(&path).is_none());
    }

    #[test]
    fn occupied_plot_without_plant_is_invalid() {
        let mut data = sample();
        data.farm[0][1].state = PlotState::Ready;
        assert!(matches!(data.validate(), Err(PersistenceError::Invalid(_))));
    }

    #[test]
    fn ragged_rows_are_invalid() {
        let mut data = sample();
        data.farm.push(vec![PlotSave::empty()]);
        assert!(matches!(data.validate(), Err(PersistenceError::Invalid(_))));
    }
}
