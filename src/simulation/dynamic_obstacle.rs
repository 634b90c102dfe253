//! Temporary road blockers
//!
//! Obstacles never touch the grid itself. Routing overlays
//! `blocked_positions()` onto a copy, and every change to the set is queued
//! as an `ObstacleChange` for the session to drain.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::grid::{Cell, Grid};
use super::types::{GridPos, Rgb};

/// Seconds between random spawn attempts
pub const OBSTACLE_SPAWN_INTERVAL: f32 = 15.0;

/// Capacity for randomly spawned obstacles
pub const MAX_OBSTACLES: usize = 3;

pub const OBSTACLE_MIN_LIFETIME: f32 = 10.0;
pub const OBSTACLE_MAX_LIFETIME: f32 = 30.0;

/// Minimum Manhattan distance between a spawn and any avoid position
pub const OBSTACLE_SPAWN_CLEARANCE: i32 = 3;

/// Warning-light blink period
pub const OBSTACLE_FLASH_INTERVAL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    Roadwork,
    Accident,
    Construction,
    Debris,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 4] = [
        ObstacleKind::Roadwork,
        ObstacleKind::Accident,
        ObstacleKind::Construction,
        ObstacleKind::Debris,
    ];

    pub fn color(self) -> Rgb {
        match self {
            ObstacleKind::Roadwork => (255, 180, 0),
            ObstacleKind::Accident => (255, 60, 60),
            ObstacleKind::Construction => (255, 220, 0),
            ObstacleKind::Debris => (120, 100, 80),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObstacleKind::Roadwork => "roadwork",
            ObstacleKind::Accident => "accident",
            ObstacleKind::Construction => "construction",
            ObstacleKind::Debris => "debris",
        }
    }
}

/// Something that happened to the obstacle set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleChange {
    Spawned(GridPos, ObstacleKind),
    Added(GridPos, ObstacleKind),
    Expired(GridPos),
    Removed(GridPos),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct DynamicObstacle {
    pub position: GridPos,
    pub kind: ObstacleKind,
    /// `None` lasts until removed
    pub lifetime: Option<f32>,
    age: f32,
    flash_timer: f32,
    flash_on: bool,
}

impl DynamicObstacle {
    pub fn new(position: GridPos, kind: ObstacleKind, lifetime: Option<f32>) -> Self {
        Self {
            position,
            kind,
            lifetime,
            age: 0.0,
            flash_timer: 0.0,
            flash_on: false,
        }
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn remaining(&self) -> Option<f32> {
        self.lifetime.map(|lifetime| (lifetime - self.age).max(0.0))
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime.is_some_and(|lifetime| self.age >= lifetime)
    }

    pub fn flash_on(&self) -> bool {
        self.flash_on
    }

    /// Age the obstacle. Returns true once it has expired.
    pub fn update(&mut self, delta_secs: f32) -> bool {
        self.age += delta_secs;
        if self.is_expired() {
            return true;
        }
        self.flash_timer += delta_secs;
        if self.flash_timer >= OBSTACLE_FLASH_INTERVAL {
            self.flash_timer = 0.0;
            self.flash_on = !self.flash_on;
        }
        false
    }
}

#[derive(Debug)]
pub struct DynamicObstacleManager {
    obstacles: Vec<DynamicObstacle>,
    spawn_timer: f32,
    spawn_interval: f32,
    spawn_enabled: bool,
    max_obstacles: usize,
    changes: Vec<ObstacleChange>,
}

impl Default for DynamicObstacleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicObstacleManager {
    pub fn new() -> Self {
        Self {
            obstacles: Vec::new(),
            spawn_timer: 0.0,
            spawn_interval: OBSTACLE_SPAWN_INTERVAL,
            spawn_enabled: true,
            max_obstacles: MAX_OBSTACLES,
            changes: Vec::new(),
        }
    }

    pub fn obstacles(&self) -> &[DynamicObstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn spawn_enabled(&self) -> bool {
        self.spawn_enabled
    }

    pub fn set_spawn_enabled(&mut self, enabled: bool) {
        self.spawn_enabled = enabled;
    }

    /// Flip random spawning; returns the new setting
    pub fn toggle_spawning(&mut self) -> bool {
        self.spawn_enabled = !self.spawn_enabled;
        self.spawn_enabled
    }

    pub fn is_blocked(&self, position: GridPos) -> bool {
        self.obstacles.iter().any(|obs| obs.position == position)
    }

    pub fn blocked_positions(&self) -> Vec<GridPos> {
        self.obstacles.iter().map(|obs| obs.position).collect()
    }

    /// Place a random obstacle on a plain road tile that is at least
    /// `OBSTACLE_SPAWN_CLEARANCE` from every avoid position and not in
    /// `occupied`. Returns the chosen tile.
    pub fn spawn_random<R: Rng>(
        &mut self,
        grid: &Grid,
        avoid: &[GridPos],
        occupied: &[GridPos],
        rng: &mut R,
    ) -> Option<GridPos> {
        if self.obstacles.len() >= self.max_obstacles {
            return None;
        }

        let candidates: Vec<GridPos> = grid
            .positions()
            .filter(|pos| grid.get_cell(*pos) == Some(Cell::Road))
            .filter(|pos| {
                avoid
                    .iter()
                    .all(|a| pos.manhattan(a) >= OBSTACLE_SPAWN_CLEARANCE)
            })
            .filter(|pos| !occupied.contains(pos) && !self.is_blocked(*pos))
            .collect();

        let position = *candidates.choose(rng)?;
        let kind = *ObstacleKind::ALL.choose(rng)?;
        let lifetime = rng.random_range(OBSTACLE_MIN_LIFETIME..OBSTACLE_MAX_LIFETIME);

        debug!(
            "Spawning {} at {} for {:.1}s",
            kind.label(),
            position,
            lifetime
        );
        self.obstacles
            .push(DynamicObstacle::new(position, kind, Some(lifetime)));
        self.changes.push(ObstacleChange::Spawned(position, kind));
        Some(position)
    }

    /// Manually place an obstacle. Refuses a tile that is already blocked.
    pub fn add_obstacle(
        &mut self,
        position: GridPos,
        kind: ObstacleKind,
        lifetime: Option<f32>,
    ) -> bool {
        if self.is_blocked(position) {
            return false;
        }
        self.obstacles
            .push(DynamicObstacle::new(position, kind, lifetime));
        self.changes.push(ObstacleChange::Added(position, kind));
        true
    }

    pub fn remove_obstacle(&mut self, position: GridPos) -> bool {
        let before = self.obstacles.len();
        self.obstacles.retain(|obs| obs.position != position);
        if self.obstacles.len() == before {
            return false;
        }
        self.changes.push(ObstacleChange::Removed(position));
        true
    }

    pub fn clear(&mut self) {
        if !self.obstacles.is_empty() {
            self.obstacles.clear();
            self.changes.push(ObstacleChange::Cleared);
        }
        self.spawn_timer = 0.0;
    }

    /// Age obstacles, drop expired ones and run the spawn timer.
    /// Returns true if the obstacle set changed.
    pub fn update<R: Rng>(
        &mut self,
        delta_secs: f32,
        grid: &Grid,
        avoid: &[GridPos],
        occupied: &[GridPos],
        rng: &mut R,
    ) -> bool {
        let pending_before = self.changes.len();

        for obstacle in &mut self.obstacles {
            if obstacle.update(delta_secs) {
                debug!("{} at {} cleared", obstacle.kind.label(), obstacle.position);
                self.changes.push(ObstacleChange::Expired(obstacle.position));
            }
        }
        self.obstacles.retain(|obs| !obs.is_expired());

        if self.spawn_enabled {
            self.spawn_timer += delta_secs;
            if self.spawn_timer >= self.spawn_interval {
                self.spawn_timer = 0.0;
                self.spawn_random(grid, avoid, occupied, rng);
            }
        }

        self.changes.len() > pending_before
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Take every change queued since the last drain
    pub fn drain_changes(&mut self) -> Vec<ObstacleChange> {
        std::mem::take(&mut self.changes)
    }
}
