use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use mini_city::simulation::{Algorithm, Command, SimEvent, SimSettings, SimWorld};

#[derive(Parser)]
#[command(name = "mini_city")]
#[command(about = "Tile-grid city traffic simulation, run headless")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.05")]
    delta: f32,

    /// Seed for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    /// Route planning algorithm for the agent
    #[arg(long, value_enum, default_value_t = Algorithm::AStar)]
    algorithm: Algorithm,

    /// Target NPC vehicle count (clamped to 1..=15)
    #[arg(long, default_value = "10")]
    npcs: usize,

    /// Target pedestrian count
    #[arg(long, default_value = "12")]
    pedestrians: usize,

    /// Disable random roadworks and accidents
    #[arg(long)]
    no_obstacles: bool,

    /// Start on a generated map instead of the built-in city
    #[arg(long, conflicts_with = "map")]
    random_map: bool,

    /// Load an ASCII map file
    #[arg(long)]
    map: Option<PathBuf>,

    /// Only log the final state
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.delta <= 0.0 {
        bail!("--delta must be positive, got {}", cli.delta);
    }

    let mut settings = SimSettings::new();
    settings.algorithm = cli.algorithm;
    settings.set_npc_count(cli.npcs);
    settings.pedestrian_count = cli.pedestrians;
    settings.dynamic_obstacles = !cli.no_obstacles;
    settings.seed = cli.seed;

    let mut world = match &cli.map {
        Some(path) => SimWorld::from_map_file(path, settings)?,
        None => SimWorld::with_settings(settings),
    };
    if cli.random_map {
        world.apply(Command::GenerateRandom(cli.seed));
    }

    run_headless(&mut world, cli.ticks, cli.delta, cli.quiet);
    Ok(())
}

/// Run the session for a fixed number of ticks, logging once per simulated second
fn run_headless(world: &mut SimWorld, ticks: u32, delta: f32, quiet: bool) {
    info!("Running mini city headless: {} ticks of {}s", ticks, delta);
    let ticks_per_second = (1.0 / delta).ceil() as u32;

    if !quiet {
        info!("Initial state:");
        world.print_summary();
        world.draw_map();
    }

    let mut tick = 0;
    while tick < ticks {
        let ticks_to_run = ticks_per_second.min(ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(delta);
            for event in world.drain_events() {
                log_event(&event);
            }
        }

        if !quiet {
            info!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * delta
            );
            world.print_summary();
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    world.print_summary();
    world.draw_map();
}

fn log_event(event: &SimEvent) {
    match event {
        SimEvent::GoalReached => info!("Event: goal reached"),
        SimEvent::MapReset => info!("Event: map reset"),
        SimEvent::MapGenerated { seed } => info!("Event: map generated (seed {})", seed),
        SimEvent::PathNotFound { .. } => info!("Event: no route to goal"),
        other => log::debug!("Event: {:?}", other),
    }
}
