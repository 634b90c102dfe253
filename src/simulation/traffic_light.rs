//! Timed traffic lights
//!
//! A light's colour is a pure function of its position in a fixed
//! Red -> Green -> Yellow cycle. Each light starts at a random offset so a
//! junction-heavy map doesn't switch in lockstep.

use ordered_float::OrderedFloat;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;

use super::grid::Grid;
use super::types::GridPos;

pub const RED_DURATION: f32 = 4.0;
pub const GREEN_DURATION: f32 = 4.0;
pub const YELLOW_DURATION: f32 = 1.5;
pub const CYCLE_DURATION: f32 = RED_DURATION + GREEN_DURATION + YELLOW_DURATION;

/// A yellow light with less than this left is treated like red
pub const YELLOW_STOP_MARGIN: f32 = 0.5;

/// Upper bound of the random per-light desync offset
pub const MAX_DESYNC_OFFSET: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightState {
    Red,
    Green,
    Yellow,
}

impl LightState {
    /// State at a point in time, wrapping around the cycle
    pub fn at(elapsed: f32) -> LightState {
        let t = elapsed.rem_euclid(CYCLE_DURATION);
        if t < RED_DURATION {
            LightState::Red
        } else if t < RED_DURATION + GREEN_DURATION {
            LightState::Green
        } else {
            LightState::Yellow
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LightState::Red => "red",
            LightState::Green => "green",
            LightState::Yellow => "yellow",
        };
        f.write_str(label)
    }
}

/// A single light on a grid tile
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub position: GridPos,
    /// Time within the cycle, always in [0, CYCLE_DURATION)
    elapsed: f32,
    state: LightState,
}

impl TrafficLight {
    pub fn new(position: GridPos, offset: f32) -> Self {
        let elapsed = offset.rem_euclid(CYCLE_DURATION);
        Self {
            position,
            elapsed,
            state: LightState::at(elapsed),
        }
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds until the current colour changes
    pub fn time_remaining(&self) -> f32 {
        let t = self.elapsed;
        if t < RED_DURATION {
            RED_DURATION - t
        } else if t < RED_DURATION + GREEN_DURATION {
            RED_DURATION + GREEN_DURATION - t
        } else {
            CYCLE_DURATION - t
        }
    }

    pub fn is_red(&self) -> bool {
        self.state == LightState::Red
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    pub fn is_yellow(&self) -> bool {
        self.state == LightState::Yellow
    }

    /// Red, or yellow about to turn red
    pub fn should_stop(&self) -> bool {
        match self.state {
            LightState::Red => true,
            LightState::Yellow => self.time_remaining() < YELLOW_STOP_MARGIN,
            LightState::Green => false,
        }
    }

    /// Advance the clock. Returns true if the colour changed.
    pub fn update(&mut self, delta_secs: f32) -> bool {
        self.elapsed = (self.elapsed + delta_secs).rem_euclid(CYCLE_DURATION);
        let next = LightState::at(self.elapsed);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    pub fn reset(&mut self, offset: f32) {
        self.elapsed = offset.rem_euclid(CYCLE_DURATION);
        self.state = LightState::at(self.elapsed);
    }
}

/// All lights on the map, keyed by tile
#[derive(Debug, Default)]
pub struct TrafficLightManager {
    lights: BTreeMap<GridPos, TrafficLight>,
    changed_positions: Vec<GridPos>,
}

impl TrafficLightManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_light(&mut self, position: GridPos, offset: f32) {
        self.lights.insert(position, TrafficLight::new(position, offset));
    }

    /// Add a light with a random desync offset
    pub fn add_light_desynced<R: Rng>(&mut self, position: GridPos, rng: &mut R) {
        let offset = rng.random_range(0.0..MAX_DESYNC_OFFSET);
        self.add_light(position, offset);
    }

    pub fn remove_light(&mut self, position: GridPos) -> bool {
        self.lights.remove(&position).is_some()
    }

    pub fn get_light(&self, position: GridPos) -> Option<&TrafficLight> {
        self.lights.get(&position)
    }

    pub fn lights(&self) -> impl Iterator<Item = &TrafficLight> {
        self.lights.values()
    }

    pub fn positions(&self) -> Vec<GridPos> {
        self.lights.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn is_red_at(&self, position: GridPos) -> bool {
        self.lights.get(&position).is_some_and(TrafficLight::is_red)
    }

    /// Red or imminent red at `position`; false where there is no light
    pub fn should_stop_at(&self, position: GridPos) -> bool {
        self.lights
            .get(&position)
            .is_some_and(TrafficLight::should_stop)
    }

    pub fn state_at(&self, position: GridPos) -> Option<LightState> {
        self.lights.get(&position).map(TrafficLight::state)
    }

    pub fn time_remaining_at(&self, position: GridPos) -> f32 {
        self.lights
            .get(&position)
            .map_or(0.0, TrafficLight::time_remaining)
    }

    /// Smallest time remaining across all lights
    pub fn nearest_timer(&self) -> f32 {
        self.lights
            .values()
            .map(|light| OrderedFloat(light.time_remaining()))
            .min()
            .map_or(0.0, OrderedFloat::into_inner)
    }

    /// Advance every light. Returns true if any changed colour.
    pub fn update(&mut self, delta_secs: f32) -> bool {
        self.changed_positions.clear();
        for (position, light) in self.lights.iter_mut() {
            if light.update(delta_secs) {
                self.changed_positions.push(*position);
            }
        }
        !self.changed_positions.is_empty()
    }

    /// Tiles whose light changed during the last update
    pub fn changed_positions(&self) -> &[GridPos] {
        &self.changed_positions
    }

    pub fn state_changed(&self) -> bool {
        !self.changed_positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.changed_positions.clear();
    }

    /// Match the light set to the grid's traffic-light tiles.
    /// Existing lights keep their clocks. Returns true if anything changed.
    pub fn sync_with_grid<R: Rng>(&mut self, grid: &Grid, rng: &mut R) -> bool {
        let target = grid.find_traffic_lights();
        let before = self.lights.len();

        self.lights.retain(|position, _| target.contains(position));
        let removed = before - self.lights.len();

        let mut added = 0;
        for position in target {
            if !self.lights.contains_key(&position) {
                self.add_light_desynced(position, rng);
                added += 1;
            }
        }

        added > 0 || removed > 0
    }
}
