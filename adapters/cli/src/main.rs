#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives headless Bulwark simulations.

mod replay_transfer;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use bulwark_core::{
    catalog, ActionLog, ContentRegistry, ExecutionMode, MapId, ModContent, Outcome, DEFAULT_SEED,
};
use bulwark_system_pacing::FramePacer;
use bulwark_system_verification::{VerificationLimits, VerificationRequest, Verifier};
use bulwark_world::{self as world, query, SimulationConfig, World};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::LevelFilter;

/// Upper bound on steps when no tick count is given.
const DEFAULT_TICK_LIMIT: u64 = 2_000_000;
/// Frame length used when pacing a simulation in real time.
const FRAME: Duration = Duration::from_millis(16);

/// Headless runner and verifier for Bulwark games.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plays a map with an optional action log and reports the end state.
    Simulate {
        /// Map to play.
        #[arg(long, default_value = catalog::OFFICIAL_MAP)]
        map: String,
        /// Mod JSON files applied on top of the built-in content, in order.
        #[arg(long = "mod", value_name = "PATH")]
        mods: Vec<PathBuf>,
        /// Action log as a JSON file or a `bulwark:v1:` transfer string.
        #[arg(long)]
        actions: Option<String>,
        /// Seed of the simulation.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Stop after this many steps even if the game is still running.
        #[arg(long)]
        ticks: Option<u64>,
        /// Replay as the authoritative executor instead of a live client.
        #[arg(long)]
        verification: bool,
        /// Pace the run in real time at this game speed.
        #[arg(long)]
        speed: Option<f64>,
        /// Write a verification request to this path when the game is won.
        #[arg(long, value_name = "PATH")]
        request_out: Option<PathBuf>,
        /// Player name recorded in the verification request.
        #[arg(long, default_value = "anonymous")]
        player: String,
    },
    /// Replays a verification request and prints the verdict.
    Verify {
        /// Verification request JSON file.
        request: PathBuf,
        /// Wall-clock budget in seconds.
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
        /// Step budget.
        #[arg(long, default_value_t = DEFAULT_TICK_LIMIT)]
        max_ticks: u64,
    },
    /// Prints the transfer string of an action log JSON file.
    EncodeActions {
        /// Action log JSON file.
        path: PathBuf,
    },
    /// Prints the JSON action log carried by a transfer string.
    DecodeActions {
        /// `bulwark:v1:` transfer string.
        value: String,
    },
}

/// Entry point for the Bulwark command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Simulate {
            map,
            mods,
            actions,
            seed,
            ticks,
            verification,
            speed,
            request_out,
            player,
        } => {
            let mods = load_mods(&mods)?;
            let content = Arc::new(
                ContentRegistry::build(catalog::official(), &mods)
                    .context("failed to load content")?,
            );
            let mode = if verification {
                ExecutionMode::Verification
            } else {
                ExecutionMode::Live
            };
            let mut world = World::new(content, &MapId::new(map), SimulationConfig { seed, mode })
                .context("failed to create the simulation")?;
            if let Some(actions) = actions {
                world::load_actions(&mut world, read_actions(&actions)?);
            }

            let limit = ticks.unwrap_or(DEFAULT_TICK_LIMIT);
            match speed {
                Some(speed) => run_paced(&mut world, limit, speed)?,
                None => run(&mut world, limit)?,
            }
            report(&world)?;

            if let Some(path) = request_out {
                if query::outcome(&world) != Outcome::Won {
                    bail!("the game was not won, so no verification request was written");
                }
                let request = VerificationRequest::from_world(mods, &world, player)
                    .context("failed to build the verification request")?;
                let json = serde_json::to_string_pretty(&request)?;
                fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                log::info!("verification request written to {}", path.display());
            }
        }
        Command::Verify {
            request,
            timeout_secs,
            max_ticks,
        } => {
            let json = fs::read_to_string(&request)
                .with_context(|| format!("failed to read {}", request.display()))?;
            let request: VerificationRequest =
                serde_json::from_str(&json).context("failed to parse the verification request")?;
            let verifier = Verifier::new(catalog::official()).with_limits(VerificationLimits {
                wall_clock: Duration::from_secs(timeout_secs),
                max_ticks,
            });
            let verdict = verifier.verify(&request);
            println!("{verdict}");
            if !verdict.is_accepted() {
                std::process::exit(1);
            }
        }
        Command::EncodeActions { path } => {
            let actions = read_actions_file(&path)?;
            println!("{}", replay_transfer::encode(&actions)?);
        }
        Command::DecodeActions { value } => {
            let actions = replay_transfer::decode(&value).context("invalid transfer string")?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().default_filter_or(level.to_string());
    let _ = Builder::from_env(env).try_init();
}

fn load_mods(paths: &[PathBuf]) -> Result<Vec<ModContent>> {
    paths
        .iter()
        .map(|path| {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read mod {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse mod {}", path.display()))
        })
        .collect()
}

fn read_actions(value: &str) -> Result<ActionLog> {
    if replay_transfer::is_transfer_string(value) {
        return replay_transfer::decode(value).context("invalid transfer string");
    }
    read_actions_file(Path::new(value))
}

fn read_actions_file(path: &Path) -> Result<ActionLog> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read action log {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse action log {}", path.display()))
}

fn run(world: &mut World, limit: u64) -> Result<()> {
    let mut events = Vec::new();
    while query::tick(world) < limit {
        events.clear();
        if world::step(world, &mut events)?.is_terminal() {
            break;
        }
    }
    Ok(())
}

fn run_paced(world: &mut World, limit: u64, speed: f64) -> Result<()> {
    let mut pacer = FramePacer::default();
    pacer.set_speed(speed);
    if pacer.is_paused() {
        bail!("game speed must be positive");
    }

    let mut events = Vec::new();
    let mut last_frame = Instant::now();
    while query::tick(world) < limit && !query::outcome(world).is_terminal() {
        thread::sleep(FRAME);
        let now = Instant::now();
        let _ = pacer.run(now - last_frame, || {
            events.clear();
            world::step(world, &mut events).map(|_| ())
        })?;
        last_frame = now;
    }
    Ok(())
}

fn report(world: &World) -> Result<()> {
    println!("map:     {}", query::map_id(world));
    println!("outcome: {:?}", query::outcome(world));
    println!("tick:    {}", query::tick(world));
    println!("wave:    {}", query::wave_number(world));
    println!("score:   {}", query::score(world));
    println!("money:   {}", query::money(world));
    println!("health:  {}", query::player_health(world));
    println!("hash:    {}", query::state_hash(world)?);
    Ok(())
}
