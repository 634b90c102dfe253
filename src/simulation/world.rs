//! Main simulation session that ties everything together
//!
//! `SimWorld` owns the grid, the primary agent and every manager. Nothing
//! here renders; callers drive it with `tick`, edit it with `apply`, and
//! read it back through `snapshot` and `drain_events`.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use super::agent::{Agent, AgentContext, AgentStatus};
use super::dynamic_obstacle::{DynamicObstacleManager, ObstacleKind};
use super::events::SimEvent;
use super::grid::Grid;
use super::npc_manager::NpcManager;
use super::pathfinding::{compute_path, path_cost, Algorithm};
use super::pedestrian::PedestrianManager;
use super::sensor::Sensor;
use super::settings::SimSettings;
use super::snapshot::{
    AgentView, CrosswalkView, LightView, NpcView, ObstacleView, PedestrianView, SimSnapshot,
};
use super::traffic_light::TrafficLightManager;
use super::types::GridPos;

/// Upper bound for seeds picked when a random map is requested without one
pub const RANDOM_MAP_SEED_LIMIT: u64 = 100_000;

/// Where a recomputed route begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOrigin {
    /// The grid's start marker; the agent is moved there
    Start,
    /// Wherever the agent is now; it keeps driving from there
    Current,
}

/// Everything an outside caller can ask the session to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ToggleObstacle(GridPos),
    ToggleTrafficLight(GridPos),
    SetStart(GridPos),
    SetGoal(GridPos),
    SelectAlgorithm(Algorithm),
    Recompute(PathOrigin),
    ResetGrid,
    /// `None` picks a seed from the session RNG
    GenerateRandom(Option<u64>),
    Pause,
    Resume,
    TogglePause,
    AddObstacle {
        position: GridPos,
        kind: ObstacleKind,
        lifetime: Option<f32>,
    },
    RemoveObstacle(GridPos),
    ToggleObstacleSpawning,
    SetNpcCount(usize),
}

/// The main simulation session
pub struct SimWorld {
    grid: Grid,
    agent: Agent,
    lights: TrafficLightManager,
    obstacles: DynamicObstacleManager,
    pedestrians: PedestrianManager,
    npcs: NpcManager,
    sensor: Sensor,
    settings: SimSettings,

    /// One RNG for everything, so a fixed seed replays a whole session
    rng: StdRng,

    events: Vec<SimEvent>,

    /// Simulation time
    pub time: f32,
    paused: bool,

    waiting_at_goal: bool,
    goal_timer: f32,
    goals_reached: u32,
    last_path_cost: Option<u32>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_settings(SimSettings::default())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible sessions
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_settings(SimSettings::with_seed(seed))
    }

    pub fn with_settings(settings: SimSettings) -> Self {
        Self::from_grid(Grid::default_city(), settings)
    }

    pub fn from_grid(grid: Grid, settings: SimSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };

        let mut obstacles = DynamicObstacleManager::new();
        obstacles.set_spawn_enabled(settings.dynamic_obstacles);

        let mut world = Self {
            grid,
            agent: Agent::new(),
            lights: TrafficLightManager::new(),
            obstacles,
            pedestrians: PedestrianManager::new(settings.pedestrian_count),
            npcs: NpcManager::new(settings.npc_count()),
            sensor: Sensor::new(settings.sensor_range, settings.sensor_fov),
            settings,
            rng,
            events: Vec::new(),
            time: 0.0,
            paused: false,
            waiting_at_goal: false,
            goal_timer: 0.0,
            goals_reached: 0,
            last_path_cost: None,
        };

        info!("Starting session: {}", world.settings.summary());
        world.lights.sync_with_grid(&world.grid, &mut world.rng);
        world
            .pedestrians
            .setup_from_grid(&world.grid, &mut world.rng);
        world.recompute_path(PathOrigin::Start);
        world
    }

    /// Load an ASCII map from disk and start a session on it
    pub fn from_map_file(path: impl AsRef<Path>, settings: SimSettings) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read map file {}", path.display()))?;
        let grid = Grid::from_ascii(&text)
            .with_context(|| format!("Failed to parse map file {}", path.display()))?;
        Ok(Self::from_grid(grid, settings))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn lights(&self) -> &TrafficLightManager {
        &self.lights
    }

    pub fn obstacles(&self) -> &DynamicObstacleManager {
        &self.obstacles
    }

    pub fn pedestrians(&self) -> &PedestrianManager {
        &self.pedestrians
    }

    pub fn npcs(&self) -> &NpcManager {
        &self.npcs
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn algorithm(&self) -> Algorithm {
        self.settings.algorithm
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn goals_reached(&self) -> u32 {
        self.goals_reached
    }

    pub fn last_path_cost(&self) -> Option<u32> {
        self.last_path_cost
    }

    /// Take every notification emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// The grid with temporary blockers stamped on as obstacles
    pub fn routing_grid(&self) -> Grid {
        self.grid.with_overlay(&self.obstacles.blocked_positions())
    }

    /// Plan a new route for the agent with the selected algorithm.
    /// Returns false and leaves the agent without a route when none exists.
    pub fn recompute_path(&mut self, origin: PathOrigin) -> bool {
        let goal = self.grid.find_goal();
        let start = match origin {
            PathOrigin::Current if self.agent.is_placed() => Some(self.agent.grid_position()),
            _ => self.grid.find_start(),
        };

        let routing = self.routing_grid();
        let algorithm = self.settings.algorithm;
        let path = compute_path(algorithm, &routing, start, goal);

        if path.is_empty() {
            if let (Some(start), Some(goal)) = (start, goal) {
                warn!("No path found from {} to {}", start, goal);
            }
            self.events.push(SimEvent::PathNotFound { start, goal });
            self.last_path_cost = None;
            self.agent.clear_path();
            return false;
        }

        let cost = path_cost(&self.grid, &path);
        info!(
            "{} path: {} cells, cost {}",
            algorithm,
            path.len(),
            cost
        );
        self.events.push(SimEvent::PathComputed {
            algorithm,
            length: path.len(),
            cost,
        });
        self.last_path_cost = Some(cost);

        if path.len() > 1 {
            self.waiting_at_goal = false;
            self.goal_timer = 0.0;
        }
        match origin {
            PathOrigin::Current if self.agent.is_placed() => self.agent.continue_with_new_path(path),
            _ => self.agent.set_path(path),
        }
        true
    }

    /// Apply one external command. Returns true if it changed anything.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::ToggleObstacle(pos) => {
                if !self.grid.toggle_obstacle(pos) {
                    return false;
                }
                self.on_grid_edited(&[pos]);
                self.recompute_path(PathOrigin::Current);
                true
            }
            Command::ToggleTrafficLight(pos) => {
                if !self.grid.toggle_traffic_light(pos) {
                    return false;
                }
                self.on_grid_edited(&[]);
                self.recompute_path(PathOrigin::Current);
                true
            }
            Command::SetStart(pos) => {
                if !self.grid.set_start(pos) {
                    return false;
                }
                self.on_grid_edited(&[]);
                self.paused = true;
                self.recompute_path(PathOrigin::Start);
                true
            }
            Command::SetGoal(pos) => {
                if !self.grid.set_goal(pos) {
                    return false;
                }
                self.on_grid_edited(&[]);
                self.recompute_path(PathOrigin::Current);
                true
            }
            Command::SelectAlgorithm(algorithm) => {
                self.settings.algorithm = algorithm;
                self.recompute_path(PathOrigin::Current);
                true
            }
            Command::Recompute(origin) => self.recompute_path(origin),
            Command::ResetGrid => {
                self.grid.reset();
                self.rebuild();
                info!("Map reset");
                self.events.push(SimEvent::MapReset);
                true
            }
            Command::GenerateRandom(seed) => {
                let seed = seed.unwrap_or_else(|| self.rng.random_range(0..RANDOM_MAP_SEED_LIMIT));
                self.grid.generate_random(seed);
                self.rebuild();
                info!("Generated random map with seed {}", seed);
                self.events.push(SimEvent::MapGenerated { seed });
                true
            }
            Command::Pause => !std::mem::replace(&mut self.paused, true),
            Command::Resume => std::mem::replace(&mut self.paused, false),
            Command::TogglePause => {
                self.paused = !self.paused;
                true
            }
            Command::AddObstacle {
                position,
                kind,
                lifetime,
            } => {
                if !self.grid.is_passable(position)
                    || !self.obstacles.add_obstacle(position, kind, lifetime)
                {
                    return false;
                }
                self.flush_obstacle_changes();
                true
            }
            Command::RemoveObstacle(pos) => {
                if !self.obstacles.remove_obstacle(pos) {
                    return false;
                }
                self.flush_obstacle_changes();
                true
            }
            Command::ToggleObstacleSpawning => {
                self.settings.dynamic_obstacles = self.obstacles.toggle_spawning();
                info!(
                    "Dynamic obstacles {}",
                    if self.settings.dynamic_obstacles { "on" } else { "off" }
                );
                true
            }
            Command::SetNpcCount(count) => {
                self.settings.set_npc_count(count);
                self.npcs.set_max_vehicles(count);
                true
            }
        }
    }

    /// Bring every manager in line with an edited grid
    fn on_grid_edited(&mut self, blocked: &[GridPos]) {
        self.lights.sync_with_grid(&self.grid, &mut self.rng);
        let routing = self.routing_grid();
        self.npcs.refresh_roads(&routing);
        self.npcs.invalidate_blocked_routes(blocked);
        self.pedestrians.setup_from_grid(&self.grid, &mut self.rng);
    }

    /// Start over on a freshly loaded or generated grid
    fn rebuild(&mut self) {
        self.lights.clear();
        self.lights.sync_with_grid(&self.grid, &mut self.rng);
        self.npcs.clear();
        self.obstacles.clear();
        // Superseded by the map event
        self.obstacles.drain_changes();
        self.pedestrians.clear_all();
        self.pedestrians.setup_from_grid(&self.grid, &mut self.rng);
        self.sensor.clear();
        self.agent.reset();
        self.waiting_at_goal = false;
        self.goal_timer = 0.0;
        self.paused = false;
        self.recompute_path(PathOrigin::Start);
    }

    /// Publish queued obstacle changes and reroute around the new set
    fn flush_obstacle_changes(&mut self) {
        let changes = self.obstacles.drain_changes();
        if changes.is_empty() {
            return;
        }
        debug!("Obstacle changes: {:?}", changes);
        self.events.push(SimEvent::ObstaclesChanged(changes));

        let blocked = self.obstacles.blocked_positions();
        let routing = self.routing_grid();
        self.npcs.refresh_roads(&routing);
        self.npcs.invalidate_blocked_routes(&blocked);

        if self.agent.is_placed() && !self.waiting_at_goal {
            self.recompute_path(PathOrigin::Current);
        }
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        if self.paused {
            return;
        }
        self.time += delta_secs;

        // Lights first so every stop decision sees this tick's colours
        if self.lights.update(delta_secs) {
            self.events
                .push(SimEvent::LightsChanged(self.lights.changed_positions().to_vec()));
        }

        let avoid = [self.agent.grid_position()];
        let occupied = self.npcs.positions();
        self.obstacles
            .update(delta_secs, &self.grid, &avoid, &occupied, &mut self.rng);
        self.flush_obstacle_changes();

        let npc_positions = self.npcs.world_positions();
        let crosswalks = self.pedestrians.crosswalk_positions();
        let pedestrian_positions = self.pedestrians.positions();
        let ctx = AgentContext {
            lights: &self.lights,
            npc_positions: &npc_positions,
            crosswalks: &crosswalks,
            pedestrian_positions: &pedestrian_positions,
        };
        self.agent.update(delta_secs, &ctx);

        let routing = self.routing_grid();
        let player = self
            .agent
            .is_placed()
            .then(|| self.agent.position());
        self.npcs
            .update(delta_secs, &routing, &self.lights, player, &mut self.rng);

        let mut vehicles = self.npcs.world_positions();
        if let Some(player) = player {
            vehicles.push(player);
        }
        self.pedestrians
            .update(delta_secs, &vehicles, &self.grid, &mut self.rng);

        let npc_positions = self.npcs.world_positions();
        let pedestrian_positions = self.pedestrians.positions();
        self.sensor.scan(
            self.agent.position(),
            self.agent.heading(),
            &routing,
            &npc_positions,
            &pedestrian_positions,
        );

        self.update_goal_loop(delta_secs);
    }

    fn update_goal_loop(&mut self, delta_secs: f32) {
        if self.agent.status() == AgentStatus::Arrived && !self.waiting_at_goal {
            self.waiting_at_goal = true;
            self.goal_timer = 0.0;
            self.goals_reached += 1;
            info!("Goal reached ({} so far)", self.goals_reached);
            self.events.push(SimEvent::GoalReached);
        }

        if self.waiting_at_goal && self.settings.auto_restart {
            self.goal_timer += delta_secs;
            if self.goal_timer >= self.settings.goal_dwell {
                self.waiting_at_goal = false;
                self.goal_timer = 0.0;
                self.recompute_path(PathOrigin::Start);
            }
        }
    }

    /// Read-only copy of everything a renderer needs
    pub fn snapshot(&self) -> SimSnapshot {
        let agent = &self.agent;
        SimSnapshot {
            time: self.time,
            paused: self.paused,
            grid: self.grid.clone(),
            agent: AgentView {
                position: agent.position(),
                render_position: agent.render_position(),
                heading: agent.heading(),
                status: agent.status(),
                path: agent.path().to_vec(),
                path_index: agent.path_index(),
                brake_lights: agent.brake_lights_on(),
                tilt: agent.tilt(),
                speed: agent.speed_normalized(),
            },
            npcs: self
                .npcs
                .vehicles()
                .iter()
                .map(|npc| NpcView {
                    id: npc.id,
                    position: npc.position,
                    heading: npc.heading,
                    color: npc.color,
                    brake_lights: npc.brake_lights_on(),
                })
                .collect(),
            pedestrians: self
                .pedestrians
                .pedestrians()
                .iter()
                .map(|ped| PedestrianView {
                    id: ped.id,
                    position: ped.position,
                    walk_frame: ped.walk_frame,
                    crosswalk: ped.crosswalk,
                    color: ped.color,
                })
                .collect(),
            crosswalks: self
                .pedestrians
                .crosswalks()
                .iter()
                .map(|cw| CrosswalkView {
                    position: cw.position,
                    axis: cw.axis,
                })
                .collect(),
            lights: self
                .lights
                .lights()
                .map(|light| LightView {
                    position: light.position,
                    state: light.state(),
                    time_remaining: light.time_remaining(),
                })
                .collect(),
            obstacles: self
                .obstacles
                .obstacles()
                .iter()
                .map(|obs| ObstacleView {
                    position: obs.position,
                    kind: obs.kind,
                    color: obs.kind.color(),
                    remaining: obs.remaining(),
                    flash_on: obs.flash_on(),
                })
                .collect(),
            sensor: self.sensor.last_reading().cloned(),
        }
    }

    /// Log a summary of the session state
    pub fn print_summary(&self) {
        info!("=== Mini City Summary ===");
        info!("Time: {:.2}s{}", self.time, if self.paused { " (paused)" } else { "" });
        info!("Algorithm: {}", self.settings.algorithm);
        info!(
            "Agent: {} at {}, progress {:.0}%, path {} cells{}",
            self.agent.status(),
            self.agent.grid_position(),
            self.agent.progress() * 100.0,
            self.agent.path().len(),
            self.last_path_cost
                .map_or_else(String::new, |cost| format!(", cost {}", cost))
        );
        info!("Goals reached: {}", self.goals_reached);
        info!(
            "NPC vehicles: {}/{}, waiting: {}",
            self.npcs.len(),
            self.npcs.target(),
            self.npcs.vehicles().iter().filter(|v| v.is_waiting()).count()
        );
        info!(
            "Pedestrians: {}/{}, crosswalks: {}, crossings completed: {}",
            self.pedestrians.pedestrians().len(),
            self.pedestrians.target(),
            self.pedestrians.crosswalks().len(),
            self.pedestrians.total_crossings()
        );
        for light in self.lights.lights() {
            info!(
                "  Light {}: {} ({:.1}s left)",
                light.position,
                light.state(),
                light.time_remaining()
            );
        }
        info!("Dynamic obstacles: {}", self.obstacles.len());
        for obs in self.obstacles.obstacles() {
            info!(
                "  {} at {}{}",
                obs.kind.label(),
                obs.position,
                obs.remaining()
                    .map_or_else(String::new, |left| format!(" ({:.1}s left)", left))
            );
        }
        if let Some(reading) = self.sensor.last_reading() {
            info!(
                "Sensor: front {:.2} tiles, danger {:.2}",
                reading.front_distance, reading.danger
            );
        }
    }

    /// Text map of the session: `@` agent, `c` NPC, `p` pedestrian,
    /// `x` temporary obstacle, `=` crosswalk, then the grid symbols
    pub fn render_map(&self) -> String {
        let cols = self.grid.cols();
        let mut canvas: Vec<Vec<char>> = self
            .grid
            .cells()
            .chunks(cols.max(1))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect();

        let mut stamp = |pos: GridPos, symbol: char| {
            if self.grid.is_valid(pos) {
                canvas[pos.row as usize][pos.col as usize] = symbol;
            }
        };

        for cw in self.pedestrians.crosswalks() {
            stamp(cw.position, '=');
        }
        for obs in self.obstacles.obstacles() {
            stamp(obs.position, 'x');
        }
        for ped in self.pedestrians.pedestrians() {
            stamp(ped.grid_position(), 'p');
        }
        for npc in self.npcs.vehicles() {
            stamp(npc.grid_position(), 'c');
        }
        if self.agent.is_placed() {
            stamp(self.agent.grid_position(), '@');
        }

        let mut out = String::with_capacity(canvas.len() * (cols + 1));
        for row in canvas {
            out.extend(row);
            out.push('\n');
        }
        out
    }

    /// Log the text map
    pub fn draw_map(&self) {
        info!("=== City Map ===");
        info!("Legend: @=Agent, c=NPC, p=Pedestrian, x=Blocked, ==Crosswalk, T=Light, S/G=Start/Goal");
        for line in self.render_map().lines() {
            info!("{}", line);
        }
    }
}
