//! NPC spawning, routing and cell claims
//!
//! Vehicles are never removed during a session; a vehicle that finishes or
//! abandons its route is simply handed a new destination.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use super::grid::Grid;
use super::npc::{NpcUpdateResult, NpcVehicle};
use super::pathfinding::bfs_limited;
use super::traffic_light::TrafficLightManager;
use super::types::{GridPos, NpcId, SimId, WorldPos};

pub const DEFAULT_NPC_TARGET: usize = 10;
pub const MIN_NPC_TARGET: usize = 1;
pub const MAX_NPC_TARGET: usize = 15;

/// Seconds between top-up spawns while below target
pub const NPC_SPAWN_INTERVAL: f32 = 1.0;

/// Spawn cells must be at least this far (Manhattan) from other vehicles
pub const NPC_SPAWN_SEPARATION: i32 = 6;

/// BFS visit budget for a single destination attempt
pub const NPC_SEARCH_LIMIT: usize = 500;

const DESTINATION_ATTEMPTS: usize = 30;
const FALLBACK_DESTINATIONS: usize = 50;
const FAR_DESTINATION: i32 = 6;
const NEAR_DESTINATION: i32 = 3;

/// Something that can hold a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Occupant {
    Player,
    Npc(NpcId),
}

/// Which vehicles hold which cells this tick
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    claims: BTreeMap<GridPos, Vec<Occupant>>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, pos: GridPos, who: Occupant) {
        let holders = self.claims.entry(pos).or_default();
        if !holders.contains(&who) {
            holders.push(who);
        }
    }

    /// Drop every claim held by `who`
    pub fn release(&mut self, who: Occupant) {
        for holders in self.claims.values_mut() {
            holders.retain(|h| *h != who);
        }
        self.claims.retain(|_, holders| !holders.is_empty());
    }

    /// True if anyone other than `who` holds `pos`
    pub fn is_blocked_for(&self, pos: GridPos, who: Occupant) -> bool {
        self.claims
            .get(&pos)
            .is_some_and(|holders| holders.iter().any(|h| *h != who))
    }

    pub fn is_claimed(&self, pos: GridPos) -> bool {
        self.claims.contains_key(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.claims.keys().copied()
    }

    /// Cells held by anyone except `who`
    pub fn cells_blocked_for(&self, who: Occupant) -> Vec<GridPos> {
        self.claims
            .iter()
            .filter(|(_, holders)| holders.iter().any(|h| *h != who))
            .map(|(pos, _)| *pos)
            .collect()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
    }
}

fn quadrant(pos: GridPos, rows: usize, cols: usize) -> usize {
    let lower = if (pos.row as usize) < rows / 2 { 0 } else { 2 };
    let right = if (pos.col as usize) < cols / 2 { 0 } else { 1 };
    lower + right
}

/// Route `vehicle` to a random far-away cell, steering around cells other
/// vehicles hold. Returns false when nothing is reachable right now.
fn assign_destination<R: Rng>(
    vehicle: &mut NpcVehicle,
    roads: &[GridPos],
    grid: &Grid,
    occupancy: &Occupancy,
    rng: &mut R,
) -> bool {
    if roads.is_empty() {
        vehicle.needs_new_destination = true;
        return false;
    }

    let routing = grid.with_overlay(&occupancy.cells_blocked_for(Occupant::Npc(vehicle.id)));
    let current = vehicle.grid_position();

    let farther_than = |min: i32| -> Vec<GridPos> {
        roads
            .iter()
            .copied()
            .filter(|pos| pos.manhattan(&current) > min)
            .collect()
    };
    let mut candidates = farther_than(FAR_DESTINATION);
    if candidates.is_empty() {
        candidates = farther_than(NEAR_DESTINATION);
    }
    if candidates.is_empty() {
        candidates = roads.to_vec();
    }
    candidates.shuffle(rng);

    for dest in candidates.into_iter().take(DESTINATION_ATTEMPTS) {
        let path = bfs_limited(&routing, current, dest, NPC_SEARCH_LIMIT);
        if path.len() > 2 {
            return vehicle.set_path(path);
        }
    }

    for dest in roads.iter().take(FALLBACK_DESTINATIONS) {
        if *dest == current {
            continue;
        }
        let path = bfs_limited(&routing, current, *dest, NPC_SEARCH_LIMIT);
        if path.len() > 1 {
            return vehicle.set_path(path);
        }
    }

    debug!("NPC {} has nowhere to go from {}", vehicle.id.0 .0, current);
    vehicle.needs_new_destination = true;
    false
}

#[derive(Debug)]
pub struct NpcManager {
    vehicles: Vec<NpcVehicle>,
    target_vehicles: usize,
    spawn_timer: f32,
    road_positions: Vec<GridPos>,
    initialized: bool,
    next_id: usize,
    occupancy: Occupancy,
}

impl Default for NpcManager {
    fn default() -> Self {
        Self::new(DEFAULT_NPC_TARGET)
    }
}

impl NpcManager {
    pub fn new(target_vehicles: usize) -> Self {
        Self {
            vehicles: Vec::new(),
            target_vehicles: target_vehicles.clamp(MIN_NPC_TARGET, MAX_NPC_TARGET),
            spawn_timer: 0.0,
            road_positions: Vec::new(),
            initialized: false,
            next_id: 0,
            occupancy: Occupancy::new(),
        }
    }

    pub fn vehicles(&self) -> &[NpcVehicle] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [NpcVehicle] {
        &mut self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn target(&self) -> usize {
        self.target_vehicles
    }

    /// Clamped to 1..=15
    pub fn set_max_vehicles(&mut self, count: usize) {
        self.target_vehicles = count.clamp(MIN_NPC_TARGET, MAX_NPC_TARGET);
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn positions(&self) -> Vec<GridPos> {
        self.vehicles.iter().map(NpcVehicle::grid_position).collect()
    }

    pub fn world_positions(&self) -> Vec<WorldPos> {
        self.vehicles.iter().map(|v| v.position).collect()
    }

    pub fn occupied_cells(&self) -> Vec<GridPos> {
        self.occupancy.cells().collect()
    }

    /// Rebuild the cached road cells after the grid changes
    pub fn refresh_roads(&mut self, grid: &Grid) {
        self.road_positions = grid.passable_positions();
    }

    /// Place one vehicle in the emptiest quadrant, away from everything in
    /// `avoid` and from existing vehicles
    pub fn spawn_vehicle<R: Rng>(
        &mut self,
        grid: &Grid,
        avoid: &[GridPos],
        rng: &mut R,
    ) -> Option<NpcId> {
        if self.vehicles.len() >= self.target_vehicles {
            return None;
        }
        if self.road_positions.is_empty() {
            self.refresh_roads(grid);
        }

        let (rows, cols) = (grid.rows(), grid.cols());
        let mut counts = [0usize; 4];
        for vehicle in &self.vehicles {
            counts[quadrant(vehicle.grid_position(), rows, cols)] += 1;
        }
        let emptiest = (0..4).min_by_key(|q| counts[*q]).unwrap_or(0);

        let mut candidates: Vec<GridPos> = self
            .road_positions
            .iter()
            .copied()
            .filter(|pos| quadrant(*pos, rows, cols) == emptiest)
            .collect();
        if candidates.is_empty() {
            candidates = self.road_positions.clone();
        }
        candidates.shuffle(rng);

        let taken: Vec<GridPos> = self
            .vehicles
            .iter()
            .map(NpcVehicle::grid_position)
            .chain(avoid.iter().copied())
            .collect();

        let cell = candidates.into_iter().find(|pos| {
            grid.is_passable(*pos)
                && !self.occupancy.is_claimed(*pos)
                && taken
                    .iter()
                    .all(|other| pos.manhattan(other) >= NPC_SPAWN_SEPARATION)
        })?;

        let id = NpcId(SimId(self.next_id));
        self.next_id += 1;

        let mut vehicle = NpcVehicle::new(id, cell, rng);
        assign_destination(
            &mut vehicle,
            &self.road_positions,
            grid,
            &self.occupancy,
            rng,
        );
        debug!("Spawned NPC {} at {}", id.0 .0, cell);
        self.vehicles.push(vehicle);
        Some(id)
    }

    fn fill_to_target<R: Rng>(&mut self, grid: &Grid, avoid: &[GridPos], rng: &mut R) {
        while self.spawn_vehicle(grid, avoid, rng).is_some() {}
    }

    fn rebuild_occupancy(&mut self, player: Option<GridPos>) {
        self.occupancy.clear();
        if let Some(cell) = player {
            self.occupancy.claim(cell, Occupant::Player);
        }
        for vehicle in &self.vehicles {
            for cell in vehicle.claimed_cells() {
                self.occupancy.claim(cell, Occupant::Npc(vehicle.id));
            }
        }
    }

    /// Update every vehicle once. `grid` should already carry any temporary
    /// blockers; `player` is the primary agent's position, if placed.
    pub fn update<R: Rng>(
        &mut self,
        delta_secs: f32,
        grid: &Grid,
        lights: &TrafficLightManager,
        player: Option<WorldPos>,
        rng: &mut R,
    ) -> Vec<(NpcId, NpcUpdateResult)> {
        let player_cell = player.map(|p| p.to_grid());
        let avoid: Vec<GridPos> = player_cell.into_iter().collect();

        if !self.initialized {
            self.refresh_roads(grid);
            self.fill_to_target(grid, &avoid, rng);
            self.initialized = true;
        } else if self.vehicles.len() < self.target_vehicles {
            self.spawn_timer += delta_secs;
            if self.spawn_timer >= NPC_SPAWN_INTERVAL {
                self.spawn_timer = 0.0;
                self.fill_to_target(grid, &avoid, rng);
            }
        }

        self.rebuild_occupancy(player_cell);

        let mut results = Vec::with_capacity(self.vehicles.len());
        for vehicle in &mut self.vehicles {
            if vehicle.needs_new_destination {
                assign_destination(vehicle, &self.road_positions, grid, &self.occupancy, rng);
            }

            let result = vehicle.update(delta_secs, lights, &self.occupancy);

            // Later vehicles must see where this one ended up
            let me = Occupant::Npc(vehicle.id);
            self.occupancy.release(me);
            for cell in vehicle.claimed_cells() {
                self.occupancy.claim(cell, me);
            }

            results.push((vehicle.id, result));
        }
        results
    }

    /// Flag vehicles whose remaining route crosses any of `blocked`.
    /// Returns how many were flagged.
    pub fn invalidate_blocked_routes(&mut self, blocked: &[GridPos]) -> usize {
        let mut flagged = 0;
        for vehicle in &mut self.vehicles {
            if vehicle
                .remaining_path()
                .iter()
                .any(|cell| blocked.contains(cell))
            {
                vehicle.needs_new_destination = true;
                flagged += 1;
            }
        }
        if flagged > 0 {
            debug!("Rerouting {} NPCs around new blockers", flagged);
        }
        flagged
    }

    /// Remove every vehicle; the next update spawns a fresh batch
    pub fn clear(&mut self) {
        self.vehicles.clear();
        self.road_positions.clear();
        self.occupancy.clear();
        self.initialized = false;
        self.spawn_timer = 0.0;
    }
}
