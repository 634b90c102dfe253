//! NPC vehicle behaviour
//!
//! Each NPC drives a BFS route toward a random destination and, when done,
//! asks its manager for another. Traits rolled at spawn make some drivers
//! slower, more patient or pushier than others.

use rand::seq::IndexedRandom;
use rand::Rng;

use super::agent::VEHICLE_SPEED;
use super::npc_manager::{Occupancy, Occupant};
use super::traffic_light::TrafficLightManager;
use super::types::{heading_for_step, lerp_angle, GridPos, NpcId, Rgb, WorldPos, TILE_SIZE};

/// Scale applied on top of the rolled speed factor
pub const NPC_SPEED_SCALE: f32 = 0.75;
pub const NPC_ROTATION_RATE: f32 = 8.0;

/// Pixels from a waypoint's centre at which it counts as reached
pub const NPC_WAYPOINT_DISTANCE: f32 = 2.0;

/// Stop for a red light closer than this (in tiles)
pub const NPC_LIGHT_STOP_DISTANCE: f32 = 1.5;
/// Slow for a red light closer than this (in tiles)
pub const NPC_LIGHT_SLOW_DISTANCE: f32 = 2.5;

pub const STUCK_CHECK_INTERVAL: f32 = 3.0;
/// Moving less than this many pixels in one check window counts as stuck
pub const STUCK_MOVE_THRESHOLD: f32 = 5.0;
/// Accumulated stuck time that forces a new destination
pub const STUCK_REROUTE_TIME: f32 = 8.0;

const NPC_COLORS: [Rgb; 10] = [
    (180, 50, 50),
    (50, 100, 180),
    (50, 150, 50),
    (180, 180, 50),
    (150, 80, 180),
    (180, 120, 50),
    (80, 80, 80),
    (200, 200, 200),
    (50, 180, 180),
    (180, 100, 100),
];

/// Result of an NPC update indicating what the manager should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcUpdateResult {
    /// Still sitting out the staggered start
    Delayed,
    /// Route finished, missing or abandoned
    NeedsDestination,
    Waiting,
    Moving,
    ReachedWaypoint,
}

/// Speed multiplier used while creeping past a blocked cell or a light
pub fn yield_multiplier(aggressiveness: f32) -> f32 {
    0.3 + 0.3 * aggressiveness
}

#[derive(Debug, Clone)]
pub struct NpcVehicle {
    pub id: NpcId,
    pub position: WorldPos,
    target: WorldPos,
    /// Nominal speed in pixels per second
    pub speed: f32,
    pub heading: f32,
    target_heading: f32,

    path: Vec<GridPos>,
    /// Index of the last waypoint reached
    path_index: usize,

    pub patience: f32,
    pub aggressiveness: f32,
    pub color: Rgb,

    wait_time: f32,
    waiting: bool,
    brake_lights: bool,
    speed_multiplier: f32,
    pub needs_new_destination: bool,
    spawn_delay: f32,

    stuck_check_timer: f32,
    stuck_time: f32,
    last_sample: WorldPos,
}

impl NpcVehicle {
    pub fn new<R: Rng>(id: NpcId, cell: GridPos, rng: &mut R) -> Self {
        let speed_factor = rng.random_range(0.5..1.4);
        let reach = TILE_SIZE * 0.3;
        let offset = rng.random_range(-reach..reach);
        let center = cell.center();
        let position = WorldPos::new(center.x + offset, center.y + offset);
        let heading = rng.random_range(0.0..360.0);

        Self {
            id,
            position,
            target: position,
            speed: VEHICLE_SPEED * speed_factor * NPC_SPEED_SCALE,
            heading,
            target_heading: heading,
            path: Vec::new(),
            path_index: 0,
            patience: rng.random_range(0.5..3.0),
            aggressiveness: rng.random_range(0.3..1.0),
            color: NPC_COLORS.choose(rng).copied().unwrap_or((200, 200, 200)),
            wait_time: 0.0,
            waiting: false,
            brake_lights: false,
            speed_multiplier: 1.0,
            needs_new_destination: true,
            spawn_delay: rng.random_range(0.0..2.0),
            stuck_check_timer: 0.0,
            stuck_time: 0.0,
            last_sample: position,
        }
    }

    pub fn grid_position(&self) -> GridPos {
        self.position.to_grid()
    }

    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn next_cell(&self) -> Option<GridPos> {
        self.path.get(self.path_index + 1).copied()
    }

    /// Cells still ahead on the route
    pub fn remaining_path(&self) -> &[GridPos] {
        self.path.get(self.path_index + 1..).unwrap_or(&[])
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn brake_lights_on(&self) -> bool {
        self.brake_lights
    }

    /// Multiplier applied to the nominal speed during the last update
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn wait_time(&self) -> f32 {
        self.wait_time
    }

    pub fn stuck_time(&self) -> f32 {
        self.stuck_time
    }

    pub fn set_spawn_delay(&mut self, delay: f32) {
        self.spawn_delay = delay.max(0.0);
    }

    /// Distance to the centre of the next waypoint, if there is one
    pub fn distance_to_next(&self) -> Option<f32> {
        self.next_cell().map(|next| self.position.distance(&next.center()))
    }

    /// Take a new route. Routes shorter than two cells are ignored.
    pub fn set_path(&mut self, path: Vec<GridPos>) -> bool {
        if path.len() < 2 {
            return false;
        }
        if let Some(heading) = heading_for_step(path[0], path[1]) {
            self.target_heading = heading;
        }
        self.target = path[1].center();
        self.path = path;
        self.path_index = 0;
        self.needs_new_destination = false;
        self.stuck_time = 0.0;
        true
    }

    /// Cells this vehicle holds: its own, plus the next one once it is
    /// within half a tile of it
    pub fn claimed_cells(&self) -> Vec<GridPos> {
        let mut cells = vec![self.grid_position()];
        if let Some(next) = self.next_cell() {
            if self.position.distance(&self.target) < TILE_SIZE * 0.5 && !cells.contains(&next) {
                cells.push(next);
            }
        }
        cells
    }

    fn sample_stuck(&mut self, delta_secs: f32) {
        self.stuck_check_timer += delta_secs;
        if self.stuck_check_timer < STUCK_CHECK_INTERVAL {
            return;
        }
        self.stuck_check_timer = 0.0;
        if self.position.distance(&self.last_sample) < STUCK_MOVE_THRESHOLD {
            self.stuck_time += STUCK_CHECK_INTERVAL;
            if self.stuck_time > STUCK_REROUTE_TIME {
                self.needs_new_destination = true;
                self.stuck_time = 0.0;
            }
        } else {
            self.stuck_time = 0.0;
        }
        self.last_sample = self.position;
    }

    fn rotate(&mut self, delta_secs: f32) {
        self.heading = lerp_angle(
            self.heading,
            self.target_heading,
            NPC_ROTATION_RATE,
            delta_secs,
        );
    }

    fn hold(&mut self, delta_secs: f32) -> NpcUpdateResult {
        self.waiting = true;
        self.brake_lights = true;
        self.speed_multiplier = 0.0;
        self.rotate(delta_secs);
        NpcUpdateResult::Waiting
    }

    /// Advance one tick against the current light states and cell claims
    pub fn update(
        &mut self,
        delta_secs: f32,
        lights: &TrafficLightManager,
        occupancy: &Occupancy,
    ) -> NpcUpdateResult {
        if self.spawn_delay > 0.0 {
            self.spawn_delay -= delta_secs;
            if self.spawn_delay > 0.0 {
                return NpcUpdateResult::Delayed;
            }
        }

        self.sample_stuck(delta_secs);

        let Some(next) = self.next_cell().filter(|_| !self.needs_new_destination) else {
            self.needs_new_destination = true;
            self.waiting = false;
            self.speed_multiplier = 0.0;
            self.rotate(delta_secs);
            return NpcUpdateResult::NeedsDestination;
        };

        let me = Occupant::Npc(self.id);
        let mut slow = false;

        if lights.should_stop_at(next) {
            let dist = self.position.distance(&next.center());
            if dist < TILE_SIZE * NPC_LIGHT_STOP_DISTANCE {
                return self.hold(delta_secs);
            } else if dist < TILE_SIZE * NPC_LIGHT_SLOW_DISTANCE {
                slow = true;
            }
        }

        if occupancy.is_blocked_for(next, me) {
            self.wait_time += delta_secs;
            if self.wait_time < self.patience {
                return self.hold(delta_secs);
            }
            slow = true;
        } else {
            self.wait_time = 0.0;
        }

        self.speed_multiplier = if slow {
            yield_multiplier(self.aggressiveness)
        } else {
            1.0
        };

        let step = self.speed * self.speed_multiplier * delta_secs;
        let moved = self.position.step_toward(&self.target, step);

        // Creeping is allowed, entering a held cell is not
        let current = self.grid_position();
        let entering = moved.to_grid();
        if entering != current && occupancy.is_blocked_for(entering, me) {
            return self.hold(delta_secs);
        }

        self.waiting = false;
        self.brake_lights = slow;
        self.position = moved;
        self.rotate(delta_secs);

        if self.position.distance(&self.target) > NPC_WAYPOINT_DISTANCE {
            return NpcUpdateResult::Moving;
        }

        self.path_index += 1;
        match self.path.get(self.path_index + 1).copied() {
            Some(after) => {
                self.target = after.center();
                if let Some(heading) = heading_for_step(next, after) {
                    self.target_heading = heading;
                }
            }
            None => self.needs_new_destination = true,
        }
        NpcUpdateResult::ReachedWaypoint
    }
}
