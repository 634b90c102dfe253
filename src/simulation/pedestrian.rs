//! Pedestrians and the crosswalks they use
//!
//! Crosswalks are inferred from the grid shape. Each pedestrian shuttles back
//! and forth across one crosswalk, waiting for traffic to clear, and after a
//! few crossings jumps to a different crosswalk. Nobody is ever despawned.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

use super::grid::{Cell, Grid};
use super::types::{GridPos, PedestrianId, Rgb, SimId, WorldPos, TILE_SIZE};

pub const DEFAULT_PEDESTRIAN_TARGET: usize = 12;

/// Seconds between top-up spawns while below target
pub const PEDESTRIAN_SPAWN_INTERVAL: f32 = 1.0;

/// A vehicle closer than this (in tiles) makes crossing unsafe
pub const PEDESTRIAN_SAFE_DISTANCE: f32 = 2.0;

/// Crosswalk endpoints sit this far (in tiles) either side of the centre
pub const CROSSWALK_HALF_LENGTH: f32 = 0.7;

/// Fewer inferred crosswalks than this triggers the stride fallback
pub const MIN_CROSSWALKS: usize = 3;

const FALLBACK_STRIDE: usize = 3;
const ARRIVAL_DISTANCE: f32 = 2.0;
const WALK_FRAME_INTERVAL: f32 = 0.12;
const WALK_FRAMES: u8 = 4;

const SHIRT_COLORS: [Rgb; 8] = [
    (200, 80, 80),
    (80, 120, 200),
    (80, 180, 80),
    (200, 180, 80),
    (180, 100, 180),
    (200, 200, 200),
    (100, 100, 100),
    (220, 150, 100),
];

/// Direction a pedestrian walks across the tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrosswalkAxis {
    /// Walks along x
    Horizontal,
    /// Walks along y
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crosswalk {
    pub position: GridPos,
    pub axis: CrosswalkAxis,
}

impl Crosswalk {
    pub fn new(position: GridPos, axis: CrosswalkAxis) -> Self {
        Self { position, axis }
    }

    pub fn center(&self) -> WorldPos {
        self.position.center()
    }

    pub fn start(&self) -> WorldPos {
        let c = self.center();
        let reach = TILE_SIZE * CROSSWALK_HALF_LENGTH;
        match self.axis {
            CrosswalkAxis::Horizontal => WorldPos::new(c.x - reach, c.y),
            CrosswalkAxis::Vertical => WorldPos::new(c.x, c.y - reach),
        }
    }

    pub fn end(&self) -> WorldPos {
        let c = self.center();
        let reach = TILE_SIZE * CROSSWALK_HALF_LENGTH;
        match self.axis {
            CrosswalkAxis::Horizontal => WorldPos::new(c.x + reach, c.y),
            CrosswalkAxis::Vertical => WorldPos::new(c.x, c.y + reach),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedestrianState {
    Waiting,
    Walking,
}

/// Result of a pedestrian update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedestrianUpdateResult {
    Continue,
    CrossingComplete,
    /// Finished enough crossings here and wants another crosswalk
    NeedsNewCrosswalk,
}

#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: PedestrianId,
    pub position: WorldPos,
    from: WorldPos,
    to: WorldPos,
    /// Tile of the crosswalk currently in use
    pub crosswalk: GridPos,
    pub speed: f32,
    pub state: PedestrianState,
    returning: bool,
    wait_timer: f32,
    wait_time: f32,
    crossings: u32,
    crossing_threshold: u32,
    pub needs_new_crosswalk: bool,
    walk_timer: f32,
    pub walk_frame: u8,
    pub color: Rgb,
}

impl Pedestrian {
    pub fn new<R: Rng>(id: PedestrianId, crosswalk: &Crosswalk, rng: &mut R) -> Self {
        let (from, to) = pick_side(crosswalk, rng);
        Self {
            id,
            position: from,
            from,
            to,
            crosswalk: crosswalk.position,
            speed: rng.random_range(45.0..80.0),
            state: PedestrianState::Waiting,
            returning: false,
            wait_timer: 0.0,
            wait_time: rng.random_range(0.3..1.5),
            crossings: 0,
            crossing_threshold: rng.random_range(2..=4),
            needs_new_crosswalk: false,
            walk_timer: 0.0,
            walk_frame: 0,
            color: SHIRT_COLORS.choose(rng).copied().unwrap_or((200, 200, 200)),
        }
    }

    pub fn grid_position(&self) -> GridPos {
        self.position.to_grid()
    }

    pub fn is_walking(&self) -> bool {
        self.state == PedestrianState::Walking
    }

    pub fn wait_timer(&self) -> f32 {
        self.wait_timer
    }

    pub fn crossings(&self) -> u32 {
        self.crossings
    }

    /// Point the pedestrian is currently heading for
    pub fn destination(&self) -> WorldPos {
        if self.returning {
            self.from
        } else {
            self.to
        }
    }

    /// Fraction of the current crossing covered, 0 to 1
    pub fn progress(&self) -> f32 {
        let origin = if self.returning { self.to } else { self.from };
        let total = origin.distance(&self.destination());
        if total <= f32::EPSILON {
            return 1.0;
        }
        (origin.distance(&self.position) / total).min(1.0)
    }

    pub fn update<R: Rng>(
        &mut self,
        delta_secs: f32,
        safe_to_cross: bool,
        rng: &mut R,
    ) -> PedestrianUpdateResult {
        if self.state == PedestrianState::Waiting {
            if safe_to_cross {
                self.wait_timer += delta_secs;
                if self.wait_timer >= self.wait_time {
                    self.state = PedestrianState::Walking;
                }
            } else {
                // Traffic nearby pushes the crossing back
                self.wait_timer = (self.wait_timer - delta_secs * 0.5).max(0.0);
            }
            return PedestrianUpdateResult::Continue;
        }

        let target = self.destination();
        if self.position.distance(&target) > ARRIVAL_DISTANCE {
            self.position = self.position.step_toward(&target, self.speed * delta_secs);
            self.walk_timer += delta_secs;
            if self.walk_timer >= WALK_FRAME_INTERVAL {
                self.walk_timer = 0.0;
                self.walk_frame = (self.walk_frame + 1) % WALK_FRAMES;
            }
            return PedestrianUpdateResult::Continue;
        }

        self.crossings += 1;
        self.returning = !self.returning;
        self.state = PedestrianState::Waiting;
        self.wait_timer = 0.0;
        self.wait_time = rng.random_range(0.5..2.0);

        if self.crossings >= self.crossing_threshold {
            self.crossings = 0;
            self.needs_new_crosswalk = true;
            return PedestrianUpdateResult::NeedsNewCrosswalk;
        }
        PedestrianUpdateResult::CrossingComplete
    }

    /// Jump straight to another crosswalk and start waiting there
    pub fn relocate<R: Rng>(&mut self, crosswalk: &Crosswalk, rng: &mut R) {
        let (from, to) = pick_side(crosswalk, rng);
        self.crosswalk = crosswalk.position;
        self.from = from;
        self.to = to;
        self.position = from;
        self.returning = false;
        self.state = PedestrianState::Waiting;
        self.wait_timer = 0.0;
        self.wait_time = rng.random_range(0.2..1.0);
        self.crossing_threshold = rng.random_range(2..=4);
        self.needs_new_crosswalk = false;
    }
}

fn pick_side<R: Rng>(crosswalk: &Crosswalk, rng: &mut R) -> (WorldPos, WorldPos) {
    if rng.random_bool(0.5) {
        (crosswalk.start(), crosswalk.end())
    } else {
        (crosswalk.end(), crosswalk.start())
    }
}

/// Owns the crosswalk set and the pedestrian pool
#[derive(Debug)]
pub struct PedestrianManager {
    crosswalks: Vec<Crosswalk>,
    pedestrians: Vec<Pedestrian>,
    next_id: usize,
    target_pedestrians: usize,
    spawn_timer: f32,
    initialized: bool,
    total_crossings: u64,
}

impl Default for PedestrianManager {
    fn default() -> Self {
        Self::new(DEFAULT_PEDESTRIAN_TARGET)
    }
}

impl PedestrianManager {
    pub fn new(target_pedestrians: usize) -> Self {
        Self {
            crosswalks: Vec::new(),
            pedestrians: Vec::new(),
            next_id: 0,
            target_pedestrians,
            spawn_timer: 0.0,
            initialized: false,
            total_crossings: 0,
        }
    }

    pub fn crosswalks(&self) -> &[Crosswalk] {
        &self.crosswalks
    }

    pub fn pedestrians(&self) -> &[Pedestrian] {
        &self.pedestrians
    }

    pub fn target(&self) -> usize {
        self.target_pedestrians
    }

    pub fn set_target(&mut self, target: usize) {
        self.target_pedestrians = target;
    }

    pub fn total_crossings(&self) -> u64 {
        self.total_crossings
    }

    /// Returns false if a crosswalk already sits on that tile
    pub fn add_crosswalk(&mut self, position: GridPos, axis: CrosswalkAxis) -> bool {
        if self.crosswalks.iter().any(|cw| cw.position == position) {
            return false;
        }
        self.crosswalks.push(Crosswalk::new(position, axis));
        true
    }

    pub fn remove_crosswalk_at(&mut self, position: GridPos) {
        self.crosswalks.retain(|cw| cw.position != position);
        self.flag_orphans();
    }

    /// Rebuild the crosswalk set from the grid layout.
    ///
    /// A plain road tile pinched between obstacles on one axis, with road
    /// continuing along the other, gets a crosswalk. Maps with too few of
    /// those get extra crosswalks on a fixed stride wherever at least two
    /// neighbours are passable.
    pub fn setup_from_grid<R: Rng>(&mut self, grid: &Grid, rng: &mut R) {
        self.crosswalks.clear();

        let blocked = |pos: GridPos| grid.get_cell(pos) == Some(Cell::Obstacle);
        let open = |pos: GridPos| grid.is_passable(pos);

        for row in 1..grid.rows().saturating_sub(1) {
            for col in 1..grid.cols().saturating_sub(1) {
                let pos = GridPos::new(row as i32, col as i32);
                if grid.get_cell(pos) != Some(Cell::Road) {
                    continue;
                }
                let (up, down) = (pos.offset(-1, 0), pos.offset(1, 0));
                let (left, right) = (pos.offset(0, -1), pos.offset(0, 1));

                if blocked(left) && blocked(right) {
                    if open(up) && open(down) {
                        self.add_crosswalk(pos, CrosswalkAxis::Horizontal);
                    }
                } else if blocked(up) && blocked(down) && open(left) && open(right) {
                    self.add_crosswalk(pos, CrosswalkAxis::Vertical);
                }
            }
        }

        if self.crosswalks.len() < MIN_CROSSWALKS {
            for row in (2..grid.rows().saturating_sub(2)).step_by(FALLBACK_STRIDE) {
                for col in (2..grid.cols().saturating_sub(2)).step_by(FALLBACK_STRIDE) {
                    let pos = GridPos::new(row as i32, col as i32);
                    if grid.get_cell(pos) != Some(Cell::Road) {
                        continue;
                    }
                    let open_sides = pos.neighbors().into_iter().filter(|n| open(*n)).count();
                    if open_sides >= 2 {
                        let axis = if rng.random_bool(0.5) {
                            CrosswalkAxis::Horizontal
                        } else {
                            CrosswalkAxis::Vertical
                        };
                        self.add_crosswalk(pos, axis);
                    }
                }
            }
        }

        debug!("Placed {} crosswalks", self.crosswalks.len());
        self.flag_orphans();
    }

    /// Drop crosswalks whose tile is no longer a road or traffic light
    pub fn validate_crosswalks(&mut self, grid: &Grid) {
        self.crosswalks.retain(|cw| {
            matches!(
                grid.get_cell(cw.position),
                Some(Cell::Road | Cell::TrafficLight)
            )
        });
        self.flag_orphans();
    }

    fn flag_orphans(&mut self) {
        let live: HashSet<GridPos> = self.crosswalk_positions();
        for ped in &mut self.pedestrians {
            if !live.contains(&ped.crosswalk) {
                ped.needs_new_crosswalk = true;
            }
        }
    }

    fn spawn_at<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.pedestrians.len() >= self.target_pedestrians {
            return false;
        }
        let Some(crosswalk) = self.crosswalks.choose(rng).copied() else {
            return false;
        };
        let id = PedestrianId(SimId(self.next_id));
        self.next_id += 1;
        self.pedestrians.push(Pedestrian::new(id, &crosswalk, rng));
        true
    }

    fn fill_to_target<R: Rng>(&mut self, rng: &mut R) {
        while self.spawn_at(rng) {}
    }

    /// Advance every pedestrian. `vehicles` holds the world position of
    /// every vehicle that can make a crossing unsafe.
    pub fn update<R: Rng>(
        &mut self,
        delta_secs: f32,
        vehicles: &[WorldPos],
        grid: &Grid,
        rng: &mut R,
    ) {
        self.validate_crosswalks(grid);

        if !self.initialized && !self.crosswalks.is_empty() {
            self.fill_to_target(rng);
            self.initialized = true;
        }

        if self.pedestrians.len() < self.target_pedestrians && !self.crosswalks.is_empty() {
            self.spawn_timer += delta_secs;
            if self.spawn_timer >= PEDESTRIAN_SPAWN_INTERVAL {
                self.spawn_timer = 0.0;
                self.fill_to_target(rng);
            }
        }

        let safe_radius = TILE_SIZE * PEDESTRIAN_SAFE_DISTANCE;
        for ped in &mut self.pedestrians {
            if ped.needs_new_crosswalk {
                let choices: Vec<&Crosswalk> = self
                    .crosswalks
                    .iter()
                    .filter(|cw| cw.position != ped.crosswalk)
                    .collect();
                if let Some(next) = choices.choose(rng) {
                    debug!(
                        "Pedestrian {} moves from {} to {}",
                        ped.id.0 .0, ped.crosswalk, next.position
                    );
                    ped.relocate(next, rng);
                }
            }

            let safe = vehicles
                .iter()
                .all(|v| v.distance(&ped.position) >= safe_radius);

            match ped.update(delta_secs, safe, rng) {
                PedestrianUpdateResult::Continue => {}
                PedestrianUpdateResult::CrossingComplete
                | PedestrianUpdateResult::NeedsNewCrosswalk => self.total_crossings += 1,
            }
        }
    }

    pub fn positions(&self) -> Vec<WorldPos> {
        self.pedestrians.iter().map(|ped| ped.position).collect()
    }

    pub fn grid_positions(&self) -> Vec<GridPos> {
        self.pedestrians.iter().map(Pedestrian::grid_position).collect()
    }

    pub fn crosswalk_positions(&self) -> HashSet<GridPos> {
        self.crosswalks.iter().map(|cw| cw.position).collect()
    }

    pub fn is_crosswalk(&self, position: GridPos) -> bool {
        self.crosswalks.iter().any(|cw| cw.position == position)
    }

    /// Remove every pedestrian but keep the crosswalks
    pub fn clear(&mut self) {
        self.pedestrians.clear();
        self.initialized = false;
        self.spawn_timer = 0.0;
    }

    /// Remove pedestrians and crosswalks
    pub fn clear_all(&mut self) {
        self.clear();
        self.crosswalks.clear();
    }
}
