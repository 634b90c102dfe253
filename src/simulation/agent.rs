//! The primary vehicle
//!
//! Follows a computed path tile by tile. Every tick it decides whether to
//! stop, slow or drive, checking in order: the light on the next tile, NPCs
//! ahead, pedestrians on the next crosswalk, and finally nearby crosswalks
//! with someone on them.

use std::collections::HashSet;
use std::fmt;

use super::traffic_light::TrafficLightManager;
use super::types::{
    angle_difference, heading_for_step, lerp_angle, GridPos, WorldPos, TILE_SIZE,
};

pub const VEHICLE_SPEED: f32 = 200.0;
pub const VEHICLE_ACCELERATION: f32 = 400.0;
pub const VEHICLE_DECELERATION: f32 = 600.0;
pub const VEHICLE_LERP_SPEED: f32 = 8.0;
pub const VEHICLE_WOBBLE_SPEED: f32 = 3.0;
pub const VEHICLE_WOBBLE_AMOUNT: f32 = 1.5;
pub const VEHICLE_TILT_AMOUNT: f32 = 3.0;

/// Pixels from a waypoint's centre at which it counts as reached
pub const WAYPOINT_REACHED_DISTANCE: f32 = 3.0;

/// Half-angle of the cone in which things count as "ahead"
pub const FORWARD_CONE: f32 = 70.0;

pub const NPC_SCAN_RADIUS: f32 = 2.0;
pub const NPC_STOP_DISTANCE: f32 = 1.5;

/// Seconds spent stopped behind an NPC before crawling past
pub const NPC_WAIT_TIMEOUT: f32 = 4.0;
pub const NPC_CRAWL_MULTIPLIER: f32 = 0.2;

/// A pedestrian must be this close (in tiles) to the next crosswalk's centre
pub const PEDESTRIAN_CROSSWALK_RADIUS: f32 = 0.8;
pub const PEDESTRIAN_STOP_RANGE: f32 = 2.5;

pub const CROSSWALK_SCAN_RANGE: f32 = 3.0;
pub const CROSSWALK_CONE: f32 = 60.0;

/// Brake lights come on below this speed multiplier
pub const BRAKE_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    NoPath,
    Arrived,
    Waiting,
    Moving,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentStatus::NoPath => "No Path",
            AgentStatus::Arrived => "Arrived",
            AgentStatus::Waiting => "Waiting",
            AgentStatus::Moving => "Moving",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    RedLight,
    VehicleAhead,
    PedestrianCrossing,
}

/// Read-only view of everything the agent reacts to during one tick
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub lights: &'a TrafficLightManager,
    pub npc_positions: &'a [WorldPos],
    pub crosswalks: &'a HashSet<GridPos>,
    pub pedestrian_positions: &'a [WorldPos],
}

/// Speed multiplier for a crosswalk with a pedestrian on it, by distance in tiles
pub fn crosswalk_speed_factor(distance_tiles: f32) -> f32 {
    if distance_tiles < 1.0 {
        0.35
    } else if distance_tiles < 2.0 {
        0.50
    } else if distance_tiles < 3.0 {
        0.65
    } else if distance_tiles < 4.0 {
        0.75
    } else {
        1.0
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    position: WorldPos,
    target: WorldPos,
    velocity: f32,
    max_velocity: f32,
    heading: f32,
    target_heading: f32,

    path: Vec<GridPos>,
    /// Index of the last waypoint reached
    path_index: usize,

    /// Set once the agent has been put on the map
    placed: bool,
    arrived: bool,
    waiting: bool,
    braking: bool,
    stop_reason: Option<StopReason>,
    npc_wait_timer: f32,

    wobble_time: f32,
    wobble_offset: (f32, f32),
    tilt: f32,
    acceleration_state: f32,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent {
    pub fn new() -> Self {
        Self {
            position: WorldPos::default(),
            target: WorldPos::default(),
            velocity: 0.0,
            max_velocity: VEHICLE_SPEED,
            heading: 0.0,
            target_heading: 0.0,
            path: Vec::new(),
            path_index: 0,
            placed: false,
            arrived: false,
            waiting: false,
            braking: false,
            stop_reason: None,
            npc_wait_timer: 0.0,
            wobble_time: 0.0,
            wobble_offset: (0.0, 0.0),
            tilt: 0.0,
            acceleration_state: 0.0,
        }
    }

    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn grid_position(&self) -> GridPos {
        self.position.to_grid()
    }

    /// Position with the idle wobble applied
    pub fn render_position(&self) -> WorldPos {
        WorldPos::new(
            self.position.x + self.wobble_offset.0,
            self.position.y + self.wobble_offset.1,
        )
    }

    pub fn target(&self) -> WorldPos {
        self.target
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn max_velocity(&self) -> f32 {
        self.max_velocity
    }

    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// The waypoint currently being driven toward
    pub fn next_waypoint(&self) -> Option<GridPos> {
        self.path.get(self.path_index + 1).copied()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    pub fn is_moving(&self) -> bool {
        self.status() == AgentStatus::Moving
    }

    pub fn brake_lights_on(&self) -> bool {
        self.braking || self.waiting
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn npc_wait_timer(&self) -> f32 {
        self.npc_wait_timer
    }

    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    pub fn acceleration_state(&self) -> f32 {
        self.acceleration_state
    }

    pub fn status(&self) -> AgentStatus {
        if self.path.is_empty() {
            AgentStatus::NoPath
        } else if self.arrived {
            AgentStatus::Arrived
        } else if self.waiting {
            AgentStatus::Waiting
        } else {
            AgentStatus::Moving
        }
    }

    pub fn speed_normalized(&self) -> f32 {
        if self.max_velocity > 0.0 {
            self.velocity / self.max_velocity
        } else {
            0.0
        }
    }

    /// Share of the path completed, 0 to 1
    pub fn progress(&self) -> f32 {
        if self.path.len() <= 1 {
            return if self.arrived { 1.0 } else { 0.0 };
        }
        self.path_index as f32 / (self.path.len() - 1) as f32
    }

    /// Start a fresh path, placing the agent on its first tile.
    /// An empty path leaves the agent where it is with no route.
    pub fn set_path(&mut self, path: Vec<GridPos>) {
        self.path = path;
        self.path_index = 0;
        self.arrived = false;
        self.waiting = false;
        self.stop_reason = None;

        let Some(first) = self.path.first().copied() else {
            return;
        };
        self.position = first.center();
        self.target = self.position;
        self.placed = true;
        if let Some(heading) = self.path.get(1).and_then(|next| heading_for_step(first, *next)) {
            self.target_heading = heading;
            self.heading = heading;
        }
    }

    /// Swap in a path that starts at the agent's current tile without
    /// moving the agent. Empty paths are ignored.
    pub fn continue_with_new_path(&mut self, path: Vec<GridPos>) {
        if path.is_empty() {
            return;
        }
        self.path = path;
        self.path_index = 0;
        self.arrived = false;
        self.waiting = false;
        self.stop_reason = None;

        if let (Some(current), Some(next)) = (self.path.first(), self.path.get(1)) {
            self.target = next.center();
            if let Some(heading) = heading_for_step(*current, *next) {
                self.target_heading = heading;
            }
        }
    }

    /// Drop the route but stay put
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_index = 0;
        self.arrived = false;
        self.waiting = false;
        self.stop_reason = None;
    }

    pub fn set_position(&mut self, pos: GridPos) {
        self.position = pos.center();
        self.target = self.position;
        self.placed = true;
    }

    /// Forget the route and the placement, e.g. when the map is replaced
    pub fn reset(&mut self) {
        self.clear_path();
        self.placed = false;
        self.velocity = 0.0;
        self.braking = false;
        self.npc_wait_timer = 0.0;
    }

    fn is_ahead(&self, point: &WorldPos, cone: f32) -> bool {
        angle_difference(self.position.bearing_to(point), self.heading) < cone
    }

    fn npc_ahead(&self, npcs: &[WorldPos]) -> bool {
        npcs.iter().any(|npc| {
            let dist = self.position.distance(npc);
            dist < TILE_SIZE * NPC_SCAN_RADIUS
                && dist < TILE_SIZE * NPC_STOP_DISTANCE
                && self.is_ahead(npc, FORWARD_CONE)
        })
    }

    /// Someone standing on a crosswalk tile, right at the next tile's
    /// crosswalk, close and ahead of the agent
    fn pedestrian_on_crosswalk(&self, next: GridPos, ctx: &AgentContext<'_>) -> bool {
        if !ctx.crosswalks.contains(&next) {
            return false;
        }
        let crossing = next.center();
        ctx.pedestrian_positions.iter().any(|ped| {
            ctx.crosswalks.contains(&ped.to_grid())
                && ped.distance(&crossing) < TILE_SIZE * PEDESTRIAN_CROSSWALK_RADIUS
                && self.position.distance(ped) < TILE_SIZE * PEDESTRIAN_STOP_RANGE
                && self.is_ahead(ped, FORWARD_CONE)
        })
    }

    /// Why the agent must hold still right now, if it must
    pub fn stop_reason_for(&self, ctx: &AgentContext<'_>) -> Option<StopReason> {
        let next = self.next_waypoint()?;
        if ctx.lights.should_stop_at(next) {
            return Some(StopReason::RedLight);
        }
        if self.npc_ahead(ctx.npc_positions) && self.npc_wait_timer < NPC_WAIT_TIMEOUT {
            return Some(StopReason::VehicleAhead);
        }
        if self.pedestrian_on_crosswalk(next, ctx) {
            return Some(StopReason::PedestrianCrossing);
        }
        None
    }

    pub fn should_stop(&self, ctx: &AgentContext<'_>) -> bool {
        self.stop_reason_for(ctx).is_some()
    }

    /// Slowest multiplier demanded by occupied crosswalks ahead
    fn crosswalk_multiplier(&self, ctx: &AgentContext<'_>) -> f32 {
        let occupied: HashSet<GridPos> = ctx
            .pedestrian_positions
            .iter()
            .map(WorldPos::to_grid)
            .collect();

        ctx.crosswalks
            .iter()
            .filter(|cw| occupied.contains(*cw))
            .map(|cw| {
                let center = cw.center();
                let dist = self.position.distance(&center);
                if dist < TILE_SIZE * CROSSWALK_SCAN_RANGE && self.is_ahead(&center, CROSSWALK_CONE)
                {
                    crosswalk_speed_factor(dist / TILE_SIZE)
                } else {
                    1.0
                }
            })
            .fold(1.0, f32::min)
    }

    /// Advance one tick. Returns true if a waypoint was reached.
    pub fn update(&mut self, delta_secs: f32, ctx: &AgentContext<'_>) -> bool {
        if self.path.is_empty() {
            self.waiting = false;
            self.braking = false;
            self.stop_reason = None;
            self.decelerate(delta_secs);
            self.idle_animation(delta_secs);
            return false;
        }

        self.path_index = self.path_index.min(self.path.len() - 1);
        if self.path_index >= self.path.len() - 1 {
            self.arrived = true;
            self.waiting = false;
            self.braking = true;
            self.stop_reason = None;
            self.decelerate(delta_secs);
            self.move_toward_target(delta_secs);
            return false;
        }

        let next = self.path[self.path_index + 1];
        self.target = next.center();

        // A red light ahead takes precedence, so the NPC timer only runs
        // while the light is clear
        let mut speed_mult: f32 = 1.0;
        if !ctx.lights.should_stop_at(next) {
            if self.npc_ahead(ctx.npc_positions) {
                self.npc_wait_timer += delta_secs;
                if self.npc_wait_timer >= NPC_WAIT_TIMEOUT {
                    speed_mult = speed_mult.min(NPC_CRAWL_MULTIPLIER);
                }
            } else {
                self.npc_wait_timer = 0.0;
            }
        }

        self.stop_reason = self.stop_reason_for(ctx);
        if self.stop_reason.is_some() {
            self.waiting = true;
            self.braking = true;
            self.decelerate(delta_secs);
            self.idle_animation(delta_secs);
            return false;
        }

        speed_mult = speed_mult.min(self.crosswalk_multiplier(ctx));

        self.waiting = false;
        self.braking = speed_mult < BRAKE_THRESHOLD;
        self.accelerate(delta_secs, speed_mult);
        self.move_toward_target(delta_secs);

        let mut reached = false;
        if self.position.distance(&self.target) < WAYPOINT_REACHED_DISTANCE {
            self.path_index += 1;
            reached = true;
            if let Some(after) = self.path.get(self.path_index + 1) {
                if let Some(heading) = heading_for_step(next, *after) {
                    self.target_heading = heading;
                }
            }
        }

        self.movement_animation(delta_secs);
        reached
    }

    fn accelerate(&mut self, delta_secs: f32, speed_mult: f32) {
        let max_vel = self.max_velocity * speed_mult;
        if self.velocity > max_vel {
            self.velocity = (self.velocity - VEHICLE_DECELERATION * delta_secs * 2.0).max(max_vel);
        } else {
            self.velocity = (self.velocity + VEHICLE_ACCELERATION * delta_secs).min(max_vel);
        }
        self.acceleration_state = (self.acceleration_state + delta_secs * 3.0).min(1.0);
    }

    fn decelerate(&mut self, delta_secs: f32) {
        self.velocity = (self.velocity - VEHICLE_DECELERATION * delta_secs).max(0.0);
        self.acceleration_state = (self.acceleration_state - delta_secs * 5.0).max(-1.0);
    }

    fn move_toward_target(&mut self, delta_secs: f32) {
        self.position = self
            .position
            .step_toward(&self.target, self.velocity * delta_secs);
        self.heading = lerp_angle(
            self.heading,
            self.target_heading,
            VEHICLE_LERP_SPEED,
            delta_secs,
        );
    }

    fn idle_animation(&mut self, delta_secs: f32) {
        self.wobble_time += delta_secs * VEHICLE_WOBBLE_SPEED;
        self.wobble_offset = (
            self.wobble_time.sin() * VEHICLE_WOBBLE_AMOUNT * 0.5,
            (self.wobble_time * 0.7).cos() * VEHICLE_WOBBLE_AMOUNT * 0.3,
        );
        self.tilt *= 0.9;
    }

    fn movement_animation(&mut self, delta_secs: f32) {
        self.wobble_offset.0 *= 0.9;
        self.wobble_offset.1 *= 0.9;
        let target_tilt = self.acceleration_state * VEHICLE_TILT_AMOUNT;
        self.tilt += (target_tilt - self.tilt) * delta_secs * 8.0;
    }
}
