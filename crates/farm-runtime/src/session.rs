//! The game session: grid, stores, achievements and growth timers.

use farm_achievements::{AchievementEngine, StatKey, UnlockEvent, HARVEST_ALL_FLAG};
use farm_core::{
    Barn, CatalogError, FertilizerType, GrowthPlan, GrowthStep, PlantType, Player, Plot,
    PlotRefresh, PlotState, Position, RestoreError,
};
use farm_econ::Shop;
use persistence::PersistenceError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{Scheduler, TimerId};
use crate::config::{ConfigError, GameConfig};

/// Errors that indicate a programming or data mistake, not a player action.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("position {0} is outside the farm")]
    OutOfBounds(Position),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot restore plot: {0}")]
    Restore(#[from] RestoreError),
    #[error(transparent)]
    Save(#[from] PersistenceError),
    #[error("save does not fit this farm: {0}")]
    Layout(String),
}

/// What happened to a planting request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantOutcome {
    Planted,
    /// The plot has not been bought yet.
    NotOwned,
    /// Something is already growing or waiting to be harvested.
    Occupied,
    /// The requested fertilizer is not in the inventory.
    NoFertilizer,
}

impl PlantOutcome {
    pub fn is_planted(self) -> bool {
        self == PlantOutcome::Planted
    }
}

/// Notifications for the UI adapter, in the order they happened.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FarmEvent {
    /// A plot changed; redraw it.
    PlotRefreshed(PlotRefresh),
    /// A crop finished growing.
    PlotReady { position: Position, plant: String },
    /// A plot was bought.
    PlotPurchased { position: Position },
    AchievementUnlocked(UnlockEvent),
}

/// Payload of a growth timer: which plot, and for which planting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GrowthTimer {
    index: usize,
    generation: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct FarmCell {
    pub(crate) plot: Plot,
    pub(crate) owned: bool,
    pending: Option<TimerId>,
}

/// Single-player farm session.
///
/// All mutation goes through `&mut self`; timers only run inside
/// [`FarmSession::advance`], one at a time.
#[derive(Debug)]
pub struct FarmSession {
    pub(crate) config: GameConfig,
    pub(crate) cells: Vec<FarmCell>,
    pub(crate) barn: Barn,
    pub(crate) player: Player,
    pub(crate) achievements: AchievementEngine,
    scheduler: Scheduler<GrowthTimer>,
    events: Vec<FarmEvent>,
}

impl FarmSession {
    pub fn new(config: GameConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let mut cells = Vec::new();
        for y in 0..config.grid_height {
            for x in 0..config.grid_width {
                cells.push(FarmCell {
                    plot: Plot::new(Position::new(x, y)),
                    owned: (cells.len() as u64) < u64::from(config.starter_plots),
                    pending: None,
                });
            }
        }
        let mut player = Player::new(config.starting_balance);
        for fert in config.catalog.fertilizers() {
            player.stock_fertilizer(fert, 0);
        }
        let achievements = AchievementEngine::standard(
            &config.catalog.plant_names(),
            config.purchasable_plots(),
        );
        info!(
            width = config.grid_width,
            height = config.grid_height,
            owned = config.starter_plots,
            "farm session created"
        );
        Ok(Self {
            config,
            cells,
            barn: Barn::new(),
            player,
            achievements,
            scheduler: Scheduler::new(),
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Virtual time since the session started.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn barn(&self) -> &Barn {
        &self.barn
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn achievements(&self) -> &AchievementEngine {
        &self.achievements
    }

    pub fn plot(&self, pos: Position) -> Option<&Plot> {
        self.index(pos).ok().map(|i| &self.cells[i].plot)
    }

    pub fn is_owned(&self, pos: Position) -> bool {
        self.index(pos).map(|i| self.cells[i].owned).unwrap_or(false)
    }

    /// All plots in row-major order.
    pub fn plots(&self) -> impl Iterator<Item = &Plot> {
        self.cells.iter().map(|c| &c.plot)
    }

    pub fn owned_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|c| c.owned)
            .map(|c| c.plot.position())
            .collect()
    }

    /// Growth timers still outstanding.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Take every notification produced since the last call.
    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn index(&self, pos: Position) -> Result<usize, SessionError> {
        if pos.x >= self.config.grid_width || pos.y >= self.config.grid_height {
            return Err(SessionError::OutOfBounds(pos));
        }
        Ok(pos.y as usize * self.config.grid_width as usize + pos.x as usize)
    }

    /// Sow `plant_name` at `pos`, optionally spending one fertilizer.
    pub fn plant(
        &mut self,
        pos: Position,
        plant_name: &str,
        fertilizer: Option<&str>,
    ) -> Result<PlantOutcome, SessionError> {
        let index = self.index(pos)?;
        let plant = self.config.catalog.plant(plant_name)?.clone();
        let fert = match fertilizer {
            Some(key) => self.config.catalog.fertilizer(key)?.clone(),
            None => FertilizerType::unfertilized(),
        };
        if !self.cells[index].owned {
            info!(position = %pos, "plot not owned");
            return Ok(PlantOutcome::NotOwned);
        }
        if fertilizer.is_some() && self.player.fertilizer_count(&fert.key) == 0 {
            info!(position = %pos, fertilizer = %fert.key, "no fertilizer left");
            return Ok(PlantOutcome::NoFertilizer);
        }
        let plan = match self.cells[index].plot.plant(&plant, &fert) {
            Ok(plan) => plan,
            Err(occupied) => {
                info!("{occupied}");
                return Ok(PlantOutcome::Occupied);
            }
        };
        if fertilizer.is_some() {
            self.player.use_fertilizer(&fert.key);
        }
        self.start_growth(index, plan);
        self.push_refresh(index);

        let unlocked = self
            .achievements
            .add_stat(StatKey::PlantsPlanted, 1, Some(&plant.name));
        self.push_unlocks(unlocked);
        if fertilizer.is_some() {
            let unlocked = self.achievements.add_stat(StatKey::FertilizersUsed, 1, None);
            self.push_unlocks(unlocked);
        }
        Ok(PlantOutcome::Planted)
    }

    /// Harvest a ready plot into the barn. `None` if it is not ready.
    pub fn harvest(&mut self, pos: Position) -> Result<Option<PlantType>, SessionError> {
        let index = self.index(pos)?;
        Ok(self.harvest_index(index))
    }

    /// Harvest every ready plot. Sets the harvest-all flag when every owned
    /// plot was ready at once.
    pub fn harvest_all(&mut self) -> Vec<PlantType> {
        let owned: Vec<usize> = (0..self.cells.len())
            .filter(|&i| self.cells[i].owned)
            .collect();
        let ready: Vec<usize> = owned
            .iter()
            .copied()
            .filter(|&i| self.cells[i].plot.state() == PlotState::Ready)
            .collect();
        let everything = !owned.is_empty() && ready.len() == owned.len();
        let harvested: Vec<PlantType> = ready
            .into_iter()
            .filter_map(|i| self.harvest_index(i))
            .collect();
        if everything {
            info!(plots = harvested.len(), "harvested the whole farm at once");
            let unlocked = self.achievements.set_flag(HARVEST_ALL_FLAG, true);
            self.push_unlocks(unlocked);
        }
        harvested
    }

    /// Sell from the barn at `unit_price` coins each.
    pub fn sell(
        &mut self,
        plant_name: &str,
        amount: u32,
        unit_price: u64,
    ) -> Result<bool, SessionError> {
        self.config.catalog.plant(plant_name)?;
        if Shop::sell(plant_name, amount, unit_price, &mut self.player, &mut self.barn).is_none() {
            return Ok(false);
        }
        let unlocked = self
            .achievements
            .add_stat(StatKey::PlantsSold, u64::from(amount), None);
        self.push_unlocks(unlocked);
        self.sync_balance();
        Ok(true)
    }

    pub fn buy_fertilizer(&mut self, key: &str) -> Result<bool, SessionError> {
        let fert = self.config.catalog.fertilizer(key)?;
        if !self.player.buy_fertilizer(fert) {
            return Ok(false);
        }
        self.sync_balance();
        Ok(true)
    }

    /// Buy the plot at `pos`. `false` if already owned or unaffordable.
    pub fn buy_plot(&mut self, pos: Position) -> Result<bool, SessionError> {
        let index = self.index(pos)?;
        if self.cells[index].owned {
            debug!(position = %pos, "plot already owned");
            return Ok(false);
        }
        if !self.player.spend(self.config.plot_price) {
            info!(position = %pos, price = self.config.plot_price, "not enough money for plot");
            return Ok(false);
        }
        self.cells[index].owned = true;
        info!(position = %pos, balance = self.player.balance(), "bought plot");
        self.events.push(FarmEvent::PlotPurchased { position: pos });
        let unlocked = self.achievements.add_stat(StatKey::PlotsOwned, 1, None);
        self.push_unlocks(unlocked);
        self.sync_balance();
        Ok(true)
    }

    /// Run the clock forward by `dt`, firing due growth timers one by one.
    /// Returns the number of timers fired.
    pub fn advance(&mut self, dt: Duration) -> usize {
        let target = self.scheduler.now().saturating_add(dt);
        let mut fired = 0;
        while let Some(timer) = self.scheduler.pop_due(target) {
            self.fire(timer.id, timer.payload);
            fired += 1;
        }
        self.scheduler.settle(target);
        fired
    }

    /// Run until no growth timer is outstanding.
    pub fn run_until_idle(&mut self) -> usize {
        let mut fired = 0;
        while let Some(due) = self.scheduler.next_due() {
            let dt = due.saturating_sub(self.scheduler.now());
            fired += self.advance(dt);
        }
        fired
    }

    fn fire(&mut self, id: TimerId, timer: GrowthTimer) {
        let cell = &mut self.cells[timer.index];
        if cell.pending == Some(id) {
            cell.pending = None;
        }
        match cell.plot.advance_growth(timer.generation) {
            None => {}
            Some(GrowthStep::Stage(_)) => {
                if let Some(interval) = cell.plot.stage_interval() {
                    let next = self.scheduler.schedule_after(
                        interval,
                        GrowthTimer {
                            index: timer.index,
                            generation: timer.generation,
                        },
                    );
                    self.cells[timer.index].pending = Some(next);
                }
                self.push_refresh(timer.index);
            }
            Some(GrowthStep::Ready) => {
                let plant = cell
                    .plot
                    .plant_type()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                let position = cell.plot.position();
                self.push_refresh(timer.index);
                self.events.push(FarmEvent::PlotReady { position, plant });
                if self.config.auto_harvest {
                    self.harvest_index(timer.index);
                }
            }
        }
    }

    pub(crate) fn start_growth(&mut self, index: usize, plan: GrowthPlan) {
        self.cancel_pending(index);
        let id = self.scheduler.schedule_after(
            plan.stage_interval,
            GrowthTimer {
                index,
                generation: plan.generation,
            },
        );
        self.cells[index].pending = Some(id);
    }

    pub(crate) fn cancel_pending(&mut self, index: usize) {
        if let Some(id) = self.cells[index].pending.take() {
            self.scheduler.cancel(id);
        }
    }

    fn harvest_index(&mut self, index: usize) -> Option<PlantType> {
        let plant = self.cells[index].plot.harvest()?;
        self.barn.add(&plant);
        self.push_refresh(index);
        info!(
            position = %self.cells[index].plot.position(),
            plant = %plant.name,
            stored = self.barn.count(&plant.name),
            "harvested"
        );
        let unlocked = self.achievements.add_stat(StatKey::PlantsHarvested, 1, None);
        self.push_unlocks(unlocked);
        Some(plant)
    }

    pub(crate) fn push_refresh(&mut self, index: usize) {
        self.events
            .push(FarmEvent::PlotRefreshed(self.cells[index].plot.refresh()));
    }

    /// The balance stat mirrors the wallet after every wallet change.
    pub(crate) fn sync_balance(&mut self) {
        let unlocked = self
            .achievements
            .set_stat(StatKey::Balance, self.player.balance());
        self.push_unlocks(unlocked);
    }

    fn push_unlocks(&mut self, unlocked: Vec<UnlockEvent>) {
        self.events
            .extend(unlocked.into_iter().map(FarmEvent::AchievementUnlocked));
    }
}
