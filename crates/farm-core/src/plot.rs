//! Plot growth state machine.
//!
//! A plot cycles `Empty -> Growing -> Ready -> Empty`. Planting returns a
//! [`GrowthPlan`] describing the three timer firings the caller must schedule;
//! each firing is fed back through [`Plot::advance_growth`] together with the
//! generation it was scheduled for. Every plant, harvest and clear bumps the
//! generation, so a firing that outlived its crop is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{FertilizerType, PlantType};
use crate::{RestoreError, STAGE_COUNT};

/// Grid coordinates of a plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Lifecycle state of a plot. Serialized lowercase to match save files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotState {
    #[default]
    Empty,
    Growing,
    Ready,
}

/// Rejection returned when planting into a plot that is not empty.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("plot {position} is occupied ({state:?})")]
pub struct PlotOccupied {
    pub position: Position,
    pub state: PlotState,
}

/// Timing for a freshly planted (or resumed) crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowthPlan {
    /// Generation every firing must carry.
    pub generation: u64,
    /// Full time from the current stage to ready.
    pub remaining: Duration,
    /// Delay between consecutive firings.
    pub stage_interval: Duration,
    /// Firings still needed before the plot is ready.
    pub steps_left: u8,
}

/// Result of one timer firing against a growing plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthStep {
    /// Moved to the given stage; another firing is due one interval later.
    Stage(u8),
    /// Growth finished; the plot is now ready.
    Ready,
}

/// Renderer notification emitted after every plot mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotRefresh {
    pub position: Position,
    pub state: PlotState,
    pub stage: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
struct Occupant {
    plant: PlantType,
    stage: u8,
    stage_interval: Duration,
}

/// One grid cell able to hold a single crop.
#[derive(Clone, Debug, PartialEq)]
pub struct Plot {
    position: Position,
    state: PlotState,
    occupant: Option<Occupant>,
    generation: u64,
}

impl Plot {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            state: PlotState::Empty,
            occupant: None,
            generation: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> PlotState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current stage while occupied.
    pub fn stage(&self) -> Option<u8> {
        self.occupant.as_ref().map(|o| o.stage)
    }

    pub fn plant_type(&self) -> Option<&PlantType> {
        self.occupant.as_ref().map(|o| &o.plant)
    }

    /// Delay between stages for the current crop.
    pub fn stage_interval(&self) -> Option<Duration> {
        self.occupant.as_ref().map(|o| o.stage_interval)
    }

    pub fn refresh(&self) -> PlotRefresh {
        PlotRefresh {
            position: self.position,
            state: self.state,
            stage: self.stage(),
        }
    }

    /// Sow a crop. Fails without mutation unless the plot is empty.
    pub fn plant(
        &mut self,
        plant: &PlantType,
        fertilizer: &FertilizerType,
    ) -> Result<GrowthPlan, PlotOccupied> {
        if self.state != PlotState::Empty {
            debug!(position = %self.position, state = ?self.state, "plant rejected");
            return Err(PlotOccupied {
                position: self.position,
                state: self.state,
            });
        }
        let grow = plant.grow_duration(fertilizer);
        let stage_interval = plant.stage_interval(fertilizer);
        self.generation += 1;
        self.state = PlotState::Growing;
        self.occupant = Some(Occupant {
            plant: plant.clone(),
            stage: 0,
            stage_interval,
        });
        info!(
            position = %self.position,
            plant = %plant.name,
            fertilizer = %fertilizer.key,
            grow_secs = grow.as_secs_f64(),
            "planted"
        );
        Ok(GrowthPlan {
            generation: self.generation,
            remaining: grow,
            stage_interval,
            steps_left: STAGE_COUNT,
        })
    }

    /// Apply one timer firing scheduled for `generation`.
    ///
    /// Returns `None` for stale firings and for plots that are not growing.
    pub fn advance_growth(&mut self, generation: u64) -> Option<GrowthStep> {
        if generation != self.generation || self.state != PlotState::Growing {
            debug!(
                position = %self.position,
                generation,
                current = self.generation,
                "ignoring stale growth timer"
            );
            return None;
        }
        let occupant = self.occupant.as_mut()?;
        if occupant.stage + 1 < STAGE_COUNT {
            occupant.stage += 1;
            Some(GrowthStep::Stage(occupant.stage))
        } else {
            self.state = PlotState::Ready;
            info!(position = %self.position, plant = %occupant.plant.name, "ready");
            Some(GrowthStep::Ready)
        }
    }

    /// Collect a ready crop, leaving the plot empty.
    pub fn harvest(&mut self) -> Option<PlantType> {
        if self.state != PlotState::Ready {
            debug!(position = %self.position, state = ?self.state, "not ready");
            return None;
        }
        let occupant = self.occupant.take()?;
        self.state = PlotState::Empty;
        self.generation += 1;
        Some(occupant.plant)
    }

    /// Force the plot back to empty, invalidating any outstanding timer.
    pub fn clear(&mut self) {
        self.state = PlotState::Empty;
        self.occupant = None;
        self.generation += 1;
    }

    /// Rebuild a plot from saved fields.
    ///
    /// A restored growing crop yields a plan that resumes from its stage.
    pub fn restore(
        &mut self,
        state: PlotState,
        plant: Option<&PlantType>,
        stage: u8,
        stage_interval: Duration,
    ) -> Result<Option<GrowthPlan>, RestoreError> {
        let plant = match (state, plant) {
            (PlotState::Empty, _) => {
                self.clear();
                return Ok(None);
            }
            (_, None) => return Err(RestoreError::MissingPlant(state)),
            (_, Some(p)) => p,
        };
        if stage >= STAGE_COUNT {
            return Err(RestoreError::StageOutOfRange(stage));
        }
        let steps_left = STAGE_COUNT - stage;
        let invalid = || RestoreError::InvalidInterval(stage_interval.as_secs_f64());
        if stage_interval.is_zero() {
            return Err(invalid());
        }
        let remaining = stage_interval
            .checked_mul(u32::from(steps_left))
            .ok_or_else(invalid)?;
        self.clear();
        self.state = state;
        self.occupant = Some(Occupant {
            plant: plant.clone(),
            stage,
            stage_interval,
        });
        if state == PlotState::Ready {
            return Ok(None);
        }
        Ok(Some(GrowthPlan {
            generation: self.generation,
            remaining,
            stage_interval,
            steps_left,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Catalog;
    use proptest::prelude::*;

    fn wheat() -> PlantType {
        Catalog::builtin().plant("Wheat").unwrap().clone()
    }

    fn basic() -> FertilizerType {
        Catalog::builtin().fertilizer("basic").unwrap().clone()
    }

    fn grow_to_ready(plot: &mut Plot, plan: &GrowthPlan) -> Vec<GrowthStep> {
        (0..plan.steps_left)
            .filter_map(|_| plot.advance_growth(plan.generation))
            .collect()
    }

    #[test]
    fn full_cycle() {
        let mut plot = Plot::new(Position::new(1, 2));
        let plan = plot.plant(&wheat(), &basic()).unwrap();
        assert_eq!(plot.state(), PlotState::Growing);
        assert_eq!(plot.stage(), Some(0));
        assert_eq!(plan.steps_left, 3);

        let steps = grow_to_ready(&mut plot, &plan);
        assert_eq!(
            steps,
            vec![GrowthStep::Stage(1), GrowthStep::Stage(2), GrowthStep::Ready]
        );
        assert_eq!(plot.state(), PlotState::Ready);
        assert_eq!(plot.stage(), Some(2));

        let got = plot.harvest().unwrap();
        assert_eq!(got.name, "Wheat");
        assert_eq!(plot.state(), PlotState::Empty);
        assert_eq!(plot.stage(), None);
        assert_eq!(plot.refresh().stage, None);
    }

    #[test]
    fn double_plant_is_rejected_without_mutation() {
        let mut plot = Plot::new(Position::new(0, 0));
        plot.plant(&wheat(), &basic()).unwrap();
        let before = plot.clone();
        let err = plot.plant(&wheat(), &basic()).unwrap_err();
        assert_eq!(err.state, PlotState::Growing);
        assert_eq!(plot, before);
    }

    #[test]
    fn harvest_before_ready_returns_none() {
        let mut plot = Plot::new(Position::new(0, 0));
        assert!(plot.harvest().is_none());
        let plan = plot.plant(&wheat(), &basic()).unwrap();
        plot.advance_growth(plan.generation);
        assert!(plot.harvest().is_none());
        assert_eq!(plot.state(), PlotState::Growing);
    }

    #[test]
    fn stale_timer_cannot_resurrect_cleared_plot() {
        let mut plot = Plot::new(Position::new(0, 0));
        let old = plot.plant(&wheat(), &basic()).unwrap();
        plot.clear();
        assert_eq!(plot.advance_growth(old.generation), None);
        assert_eq!(plot.state(), PlotState::Empty);

        let new = plot.plant(&wheat(), &basic()).unwrap();
        assert_eq!(plot.advance_growth(old.generation), None);
        assert_eq!(plot.stage(), Some(0));
        assert_eq!(plot.advance_growth(new.generation), Some(GrowthStep::Stage(1)));
    }

    #[test]
    fn restore_growing_resumes_from_stage() {
        let mut plot = Plot::new(Position::new(0, 0));
        let interval = Duration::from_secs(2);
        let plan = plot
            .restore(PlotState::Growing, Some(&wheat()), 1, interval)
            .unwrap()
            .unwrap();
        assert_eq!(plan.steps_left, 2);
        assert_eq!(plan.remaining, Duration::from_secs(4));
        assert_eq!(plot.advance_growth(plan.generation), Some(GrowthStep::Stage(2)));
        assert_eq!(plot.advance_growth(plan.generation), Some(GrowthStep::Ready));
    }

    #[test]
    fn restore_rejects_inconsistent_data() {
        let mut plot = Plot::new(Position::new(0, 0));
        let one = Duration::from_secs(1);
        assert_eq!(
            plot.restore(PlotState::Ready, None, 2, one),
            Err(RestoreError::MissingPlant(PlotState::Ready))
        );
        assert_eq!(
            plot.restore(PlotState::Growing, Some(&wheat()), 3, one),
            Err(RestoreError::StageOutOfRange(3))
        );
        assert_eq!(plot.state(), PlotState::Empty);
        let huge = Duration::MAX / 2;
        assert_eq!(
            plot.restore(PlotState::Growing, Some(&wheat()), 0, huge),
            Err(RestoreError::InvalidInterval(huge.as_secs_f64()))
        );
        assert_eq!(plot.state(), PlotState::Empty);
        assert_eq!(plot.restore(PlotState::Ready, Some(&wheat()), 2, one), Ok(None));
        assert_eq!(plot.harvest().map(|p| p.name), Some("Wheat".to_string()));
    }

    #[test]
    fn empty_plot_ignores_saved_stage() {
        let mut plot = Plot::new(Position::new(0, 0));
        plot.plant(&wheat(), &basic()).unwrap();
        let restored = plot.restore(PlotState::Empty, None, 3, Duration::ZERO);
        assert_eq!(restored, Ok(None));
        assert_eq!(plot.state(), PlotState::Empty);
        assert_eq!(plot.stage(), None);
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlotState::Growing).unwrap(), "\"growing\"");
    }

    proptest! {
        #[test]
        fn harvest_succeeds_iff_ready(firings in 0usize..6) {
            let mut plot = Plot::new(Position::new(0, 0));
            let plan = plot.plant(&wheat(), &basic()).unwrap();
            for _ in 0..firings {
                plot.advance_growth(plan.generation);
            }
            let was_ready = plot.state() == PlotState::Ready;
            let got = plot.harvest();
            prop_assert_eq!(got.is_some(), was_ready);
            prop_assert_eq!(was_ready, firings >= 3);
            if was_ready {
                prop_assert_eq!(plot.state(), PlotState::Empty);
            }
        }
    }
}
