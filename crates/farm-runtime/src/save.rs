//! Snapshot and restore of a [`FarmSession`].

use chrono::Utc;
use farm_core::{FertilizerType, Player, PlotState, RestoreError, STAGE_COUNT};
use persistence::{AchievementsSave, PlayerSave, PlotSave, SaveData};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::session::{FarmSession, SessionError};

impl FarmSession {
    /// Capture the persistent state.
    pub fn snapshot(&self) -> SaveData {
        let width = self.config.grid_width as usize;
        let farm = self
            .cells
            .chunks(width.max(1))
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let plot = &cell.plot;
                        PlotSave {
                            state: plot.state(),
                            plant_name: plot.plant_type().map(|p| p.name.clone()),
                            stage: plot.stage(),
                            stage_secs: plot.stage_interval().map(|d| d.as_secs_f64()),
                            owned: Some(cell.owned),
                        }
                    })
                    .collect()
            })
            .collect();
        SaveData {
            player: PlayerSave {
                balance: self.player.balance(),
                inventory: self.player.inventory().clone(),
            },
            barn: self
                .barn
                .iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            farm,
            achievements: Some(AchievementsSave {
                stats: self.achievements.stats().clone(),
                unlocked: self.achievements.unlocked_ids(),
            }),
            saved_at: Some(Utc::now()),
        }
    }

    /// Replace this session's state with `data`.
    ///
    /// The save is replayed into a fresh session through the normal mutation
    /// entry points; the live session is only replaced if that succeeds.
    /// Growing plots resume from their saved stage.
    pub fn restore(&mut self, data: &SaveData) -> Result<(), SessionError> {
        data.validate()?;
        let mut fresh = FarmSession::new(self.config.clone())?;
        let height = fresh.config.grid_height as usize;
        let width = fresh.config.grid_width as usize;
        if data.farm.len() != height || data.farm.iter().any(|row| row.len() != width) {
            return Err(SessionError::Layout(format!(
                "expected {width}x{height} plots, save has {} rows",
                data.farm.len()
            )));
        }

        let mut player = Player::new(data.player.balance);
        for (key, &count) in &data.player.inventory {
            player.stock_fertilizer(fresh.config.catalog.fertilizer(key)?, count);
        }
        fresh.player = player;

        for (name, &count) in &data.barn {
            let plant = fresh.config.catalog.plant(name)?.clone();
            fresh.barn.add_units(&plant, count);
        }

        for (index, saved) in data.farm.iter().flatten().enumerate() {
            fresh.restore_plot(index, saved)?;
        }

        if let Some(ach) = &data.achievements {
            fresh.achievements.restore(ach.stats.clone(), &ach.unlocked);
        }
        fresh.sync_balance();

        fresh.drain_events();
        for index in 0..fresh.cells.len() {
            fresh.push_refresh(index);
        }
        info!(
            balance = fresh.player.balance(),
            growing = fresh.pending_timers(),
            "game restored"
        );
        *self = fresh;
        Ok(())
    }

    fn restore_plot(&mut self, index: usize, saved: &PlotSave) -> Result<(), SessionError> {
        if let Some(owned) = saved.owned {
            self.cells[index].owned = owned;
        }
        let plant = match &saved.plant_name {
            Some(name) if saved.state != PlotState::Empty => {
                Some(self.config.catalog.plant(name)?.clone())
            }
            _ => None,
        };
        let interval = match (saved.stage_secs, &plant) {
            (_, None) => Duration::ZERO,
            (Some(secs), Some(_)) => Duration::try_from_secs_f64(secs)
                .map_err(|_| RestoreError::InvalidInterval(secs))?,
            (None, Some(p)) => p.stage_interval(&FertilizerType::unfertilized()),
        };
        let stage = saved.stage.unwrap_or(match saved.state {
            PlotState::Ready => STAGE_COUNT - 1,
            _ => 0,
        });
        let plan = self.cells[index]
            .plot
            .restore(saved.state, plant.as_ref(), stage, interval)?;
        if let Some(plan) = plan {
            self.start_growth(index, plan);
        }
        Ok(())
    }

    /// Persist the current state as JSON.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        persistence::save_to_path(path, &self.snapshot())?;
        Ok(())
    }

    /// Load a save file if there is a usable one.
    ///
    /// Returns `false`, leaving the session untouched, when the file is
    /// missing, malformed or does not fit this farm.
    pub fn restore_from_path(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let Some(data) = persistence::load_or_none(path) else {
            return false;
        };
        match self.restore(&data) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unusable save");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{FarmSession, GameConfig};
    use farm_core::{PlotState, Position};
    use persistence::{PlotSave, SaveData};
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn session() -> FarmSession {
        FarmSession::new(GameConfig::default()).unwrap()
    }

    #[test]
    fn snapshot_layout() {
        let mut s = session();
        s.plant(Position::new(1, 0), "Wheat", None).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.farm.len(), 5);
        assert_eq!(snap.farm[0].len(), 5);
        let cell = &snap.farm[0][1];
        assert_eq!(cell.state, PlotState::Growing);
        assert_eq!(cell.plant_name.as_deref(), Some("Wheat"));
        assert_eq!(cell.stage, Some(0));
        assert_eq!(snap.farm[0][0].plant_name, None);
        assert_eq!(snap.player.balance, 50);
        assert_eq!(snap.player.inventory.get("basic"), Some(&0));
    }

    #[test]
    fn save_load_resumes_growth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("farm_save.json");

        let mut s = session();
        s.buy_fertilizer("basic").unwrap();
        s.plant(Position::new(0, 0), "Potato", Some("basic")).unwrap();
        s.plant(Position::new(1, 0), "Carrot", None).unwrap();
        s.advance(Duration::from_secs(3));
        s.harvest(Position::new(1, 0)).unwrap();
        s.save_to_path(&path).unwrap();

        let mut loaded = session();
        assert!(loaded.restore_from_path(&path));
        assert_eq!(loaded.player().balance(), 40);
        assert_eq!(loaded.barn().count("Carrot"), 1);
        assert_eq!(loaded.achievements().stats().plants_planted, 2);
        assert!(loaded
            .achievements()
            .unlocked_ids()
            .contains(&"first_harvest".to_string()));

        let potato = loaded.plot(Position::new(0, 0)).unwrap();
        assert_eq!(potato.state(), PlotState::Growing);
        assert_eq!(potato.stage(), Some(1));
        assert_eq!(loaded.pending_timers(), 1);
        // 8s * 0.8 = 6.4s, two stages of 2.133s left
        loaded.advance(Duration::from_millis(4_300));
        assert_eq!(
            loaded.plot(Position::new(0, 0)).unwrap().state(),
            PlotState::Ready
        );
    }

    #[test]
    fn legacy_save_without_timing_or_ownership() {
        let text = r#"{
            "player": {"balance": 70, "inventory": {"basic": 2, "super": 0}},
            "barn": {"Wheat": 4},
            "farm": [
                [{"state": "ready", "plant_name": "Wheat", "stage": 2}, {"state": "growing", "plant_name": "Carrot", "stage": 0}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}],
                [{"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}],
                [{"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}],
                [{"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}],
                [{"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}, {"state": "empty"}]
            ]
        }"#;
        let data: SaveData = serde_json::from_str(text).unwrap();
        let mut s = session();
        s.restore(&data).unwrap();
        assert_eq!(s.player().fertilizer_count("basic"), 2);
        assert_eq!(s.barn().count("Wheat"), 4);
        assert!(s.is_owned(Position::new(3, 1)));
        assert!(!s.is_owned(Position::new(4, 1)));
        assert!(s.harvest(Position::new(0, 0)).unwrap().is_some());
        // carrot falls back to unfertilized timing: 3s
        s.advance(Duration::from_secs(3));
        assert_eq!(
            s.plot(Position::new(1, 0)).unwrap().state(),
            PlotState::Ready
        );
    }

    #[test]
    fn restore_replaces_pending_growth() {
        let mut s = session();
        s.plant(Position::new(0, 0), "Potato", None).unwrap();
        let empty = session().snapshot();
        s.restore(&empty).unwrap();
        assert_eq!(s.pending_timers(), 0);
        s.advance(Duration::from_secs(10));
        assert_eq!(s.plot(Position::new(0, 0)).unwrap().state(), PlotState::Empty);
    }

    #[test]
    fn bad_saves_leave_session_untouched() {
        let dir = tempdir().unwrap();
        let mut s = session();
        s.plant(Position::new(0, 0), "Wheat", None).unwrap();

        assert!(!s.restore_from_path(dir.path().join("missing.json")));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json at all").unwrap();
        assert!(!s.restore_from_path(&garbage));

        let mut unknown = session().snapshot();
        unknown.barn.insert("Tomato".into(), 1);
        let path = dir.path().join("unknown.json");
        persistence::save_to_path(&path, &unknown).unwrap();
        assert!(!s.restore_from_path(&path));

        let mut small = session().snapshot();
        small.farm.truncate(2);
        assert!(s.restore(&small).is_err());

        assert_eq!(
            s.plot(Position::new(0, 0)).unwrap().state(),
            PlotState::Growing
        );
        assert_eq!(s.pending_timers(), 1);
    }

    #[test]
    fn oversized_stage_timing_is_rejected() {
        let dir = tempdir().unwrap();
        for (i, secs) in [1e300, 1e19].into_iter().enumerate() {
            let mut data = session().snapshot();
            data.farm[0][0] = PlotSave {
                state: PlotState::Growing,
                plant_name: Some("Wheat".into()),
                stage: Some(0),
                stage_secs: Some(secs),
                owned: Some(true),
            };
            let path = dir.path().join(format!("huge_{i}.json"));
            persistence::save_to_path(&path, &data).unwrap();

            let mut s = session();
            assert!(!s.restore_from_path(&path), "stage_secs {secs:e}");
            assert_eq!(s.plot(Position::new(0, 0)).unwrap().state(), PlotState::Empty);
        }
    }

    #[test]
    fn empty_plot_with_stray_fields_restores() {
        let mut data = session().snapshot();
        data.farm[0][0] = PlotSave {
            state: PlotState::Empty,
            plant_name: Some("Wheat".into()),
            stage: Some(3),
            stage_secs: Some(1e300),
            owned: None,
        };
        let mut s = session();
        s.restore(&data).unwrap();
        assert_eq!(s.plot(Position::new(0, 0)).unwrap().state(), PlotState::Empty);
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn restore_mirrors_wallet_into_balance_stat() {
        let mut data = session().snapshot();
        data.player.balance = 500;
        data.achievements = None;
        let mut s = session();
        s.restore(&data).unwrap();
        assert_eq!(s.achievements().stats().balance, 500);
        assert!(s
            .achievements()
            .unlocked_ids()
            .contains(&"golden_hands".to_string()));
    }
}
