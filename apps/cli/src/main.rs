#![deny(warnings)]

//! Headless driver: plays a seeded farm on the virtual clock, optionally paced
//! by wall time, and loads or saves the game file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use farm_core::{PlotState, Position};
use farm_runtime::{FarmEvent, FarmSession, GameConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "farmstead", version, about = "Farmstead headless driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Autoplay a farm for a span of game time.
    Run(RunArgs),
    /// Summarize a save file.
    Status {
        #[arg(default_value = persistence::DEFAULT_SAVE_FILE)]
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Game seconds to simulate.
    #[arg(long, default_value_t = 60.0)]
    seconds: f64,
    /// Step between autoplay decisions, in seconds.
    #[arg(long, default_value_t = 0.5)]
    tick: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Coins paid per unit sold.
    #[arg(long, default_value_t = 4)]
    unit_price: u64,
    /// YAML game config; the built-in default when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resume from this save file if it holds a usable game.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Write the final state here.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Pace the clock with wall time instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Print every event as a JSON line.
    #[arg(long)]
    events: bool,
}

struct Autoplay {
    rng: ChaCha8Rng,
    unit_price: u64,
    plants: Vec<String>,
    fertilizers: Vec<String>,
}

impl Autoplay {
    fn new(session: &FarmSession, seed: u64, unit_price: u64) -> Self {
        let catalog = &session.config().catalog;
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            unit_price,
            plants: catalog.plant_names(),
            fertilizers: catalog.fertilizers().map(|f| f.key.clone()).collect(),
        }
    }

    fn step(&mut self, session: &mut FarmSession) -> Result<()> {
        session.harvest_all();

        let stock: Vec<(String, u32)> = session
            .barn()
            .iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        for (name, count) in stock {
            if count > 0 {
                session.sell(&name, count, self.unit_price)?;
            }
        }

        let price = session.config().plot_price;
        if session.player().balance() >= price.saturating_mul(2) && self.rng.gen_bool(0.25) {
            if let Some(pos) = self.unowned(session) {
                session.buy_plot(pos)?;
            }
        }

        if self.plants.is_empty() {
            return Ok(());
        }
        for pos in session.owned_positions() {
            let empty = session
                .plot(pos)
                .map(|p| p.state() == PlotState::Empty)
                .unwrap_or(false);
            if !empty {
                continue;
            }
            let plant = self.plants[self.rng.gen_range(0..self.plants.len())].clone();
            let mut fertilizer = None;
            if !self.fertilizers.is_empty() && self.rng.gen_bool(0.2) {
                let key = self.fertilizers[self.rng.gen_range(0..self.fertilizers.len())].clone();
                if session.player().fertilizer_count(&key) > 0 || session.buy_fertilizer(&key)? {
                    fertilizer = Some(key);
                }
            }
            session.plant(pos, &plant, fertilizer.as_deref())?;
        }
        Ok(())
    }

    fn unowned(&mut self, session: &FarmSession) -> Option<Position> {
        let cfg = session.config();
        let free: Vec<Position> = (0..cfg.grid_height)
            .flat_map(|y| (0..cfg.grid_width).map(move |x| Position::new(x, y)))
            .filter(|&p| !session.is_owned(p))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[self.rng.gen_range(0..free.len())])
    }
}

fn report(events: Vec<FarmEvent>, as_json: bool) -> Result<()> {
    for event in events {
        if as_json {
            println!("{}", serde_json::to_string(&event)?);
        } else if let FarmEvent::AchievementUnlocked(u) = &event {
            info!(id = %u.id, title = %u.title, "achievement unlocked");
        }
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let step = Duration::try_from_secs_f64(args.tick)
        .with_context(|| format!("invalid tick {}", args.tick))?;
    anyhow::ensure!(!step.is_zero(), "tick must be positive");
    anyhow::ensure!(
        args.seconds.is_finite() && args.seconds >= 0.0,
        "seconds must be non-negative"
    );
    let cfg = match &args.config {
        Some(path) => GameConfig::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let mut session = FarmSession::new(cfg)?;
    if let Some(path) = &args.load {
        if session.restore_from_path(path) {
            info!(path = %path.display(), "resumed saved game");
        }
    }
    report(session.drain_events(), args.events)?;

    let steps = (args.seconds / args.tick).ceil() as u64;
    let mut pacer = args.realtime.then(|| tokio::time::interval(step));
    let mut autoplay = Autoplay::new(&session, args.seed, args.unit_price);
    info!(seed = args.seed, steps, realtime = args.realtime, "autoplay started");

    for _ in 0..steps {
        if let Some(pacer) = pacer.as_mut() {
            pacer.tick().await;
        }
        autoplay.step(&mut session)?;
        session.advance(step);
        report(session.drain_events(), args.events)?;
    }

    let unlocked = session.achievements().unlocked_ids();
    println!(
        "Farm | time: {:.1}s | balance: {} | barn: {} | plots: {} | achievements: {}",
        session.now().as_secs_f64(),
        session.player().balance(),
        session.barn().total(),
        session.owned_positions().len(),
        unlocked.len()
    );
    if let Some(path) = &args.save {
        session
            .save_to_path(path)
            .with_context(|| format!("saving to {}", path.display()))?;
    }
    Ok(())
}

fn status(path: PathBuf) -> Result<()> {
    let Some(data) = persistence::load_from_path(&path)
        .with_context(|| format!("reading {}", path.display()))?
    else {
        println!("no saved game at {}", path.display());
        return Ok(());
    };
    let growing = data
        .farm
        .iter()
        .flatten()
        .filter(|p| p.state == PlotState::Growing)
        .count();
    let ready = data
        .farm
        .iter()
        .flatten()
        .filter(|p| p.state == PlotState::Ready)
        .count();
    println!(
        "Save | balance: {} | barn: {} | growing: {} | ready: {}",
        data.player.balance,
        data.barn.values().map(|&c| u64::from(c)).sum::<u64>(),
        growing,
        ready
    );
    if let Some(at) = data.saved_at {
        println!("saved at {}", at.to_rfc3339());
    }
    if let Some(ach) = &data.achievements {
        println!("achievements: {}", ach.unlocked.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Status { path } => status(path),
    }
}
