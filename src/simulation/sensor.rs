//! Forward-facing ray sensor
//!
//! Purely advisory: the agent's own stop logic never reads it. Sessions
//! scan once per tick and expose the reading for display.

use ordered_float::OrderedFloat;

use super::grid::{Cell, Grid};
use super::types::{WorldPos, TILE_SIZE};

pub const DEFAULT_SENSOR_RANGE: f32 = 4.0;
pub const DEFAULT_SENSOR_FOV: f32 = 70.0;
pub const SENSOR_RAYS: usize = 5;

/// Ray march step as a fraction of a tile
const STEP_FRACTION: f32 = 0.25;

const NPC_HIT_RADIUS: f32 = 0.6;
const PEDESTRIAN_HIT_RADIUS: f32 = 0.4;

/// Side rays report blocked below this many tiles
const SIDE_CLEAR_DISTANCE: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Npc,
    Pedestrian,
    Obstacle,
    Boundary,
}

/// One cast ray, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub angle: f32,
    pub origin: WorldPos,
    pub end: WorldPos,
    /// Tiles travelled before the hit, or the full range
    pub distance: f32,
    pub kind: Option<HitKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub front_distance: f32,
    pub front_clear: bool,
    pub left_clear: bool,
    pub right_clear: bool,
    pub obstacles: usize,
    pub npcs: usize,
    pub pedestrians: usize,
    /// 0 = nothing nearby, 1 = imminent
    pub danger: f32,
    pub rays: Vec<RayHit>,
}

impl SensorReading {
    fn nearest(&self, kind: HitKind) -> Option<f32> {
        self.rays
            .iter()
            .filter(|ray| ray.kind == Some(kind))
            .map(|ray| OrderedFloat(ray.distance))
            .min()
            .map(OrderedFloat::into_inner)
    }

    pub fn nearest_npc(&self) -> Option<f32> {
        self.nearest(HitKind::Npc)
    }

    pub fn nearest_pedestrian(&self) -> Option<f32> {
        self.nearest(HitKind::Pedestrian)
    }

    pub fn should_brake(&self) -> bool {
        self.front_distance < 1.5
            || self.nearest_npc().is_some_and(|d| d < 2.0)
            || self.nearest_pedestrian().is_some_and(|d| d < 2.5)
    }

    pub fn should_stop(&self) -> bool {
        self.front_distance < 0.8 || self.nearest_pedestrian().is_some_and(|d| d < 1.5)
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    /// Reach in tiles
    pub range: f32,
    /// Full field of view in degrees
    pub fov: f32,
    last: Option<SensorReading>,
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new(DEFAULT_SENSOR_RANGE, DEFAULT_SENSOR_FOV)
    }
}

impl Sensor {
    pub fn new(range: f32, fov: f32) -> Self {
        Self {
            range,
            fov,
            last: None,
        }
    }

    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Cast the ray fan from `origin` facing `heading` and keep the result
    pub fn scan(
        &mut self,
        origin: WorldPos,
        heading: f32,
        grid: &Grid,
        npcs: &[WorldPos],
        pedestrians: &[WorldPos],
    ) -> &SensorReading {
        let center = SENSOR_RAYS / 2;
        let mut reading = SensorReading {
            front_distance: self.range,
            front_clear: true,
            left_clear: true,
            right_clear: true,
            obstacles: 0,
            npcs: 0,
            pedestrians: 0,
            danger: 0.0,
            rays: Vec::with_capacity(SENSOR_RAYS),
        };

        for i in 0..SENSOR_RAYS {
            let t = i as f32 / (SENSOR_RAYS - 1) as f32;
            let angle = heading - self.fov / 2.0 + t * self.fov;
            let ray = self.cast(origin, angle, grid, npcs, pedestrians);

            if i == center {
                reading.front_distance = ray.distance;
                reading.front_clear = ray.kind.is_none() || ray.distance > SIDE_CLEAR_DISTANCE;
            } else if ray.kind.is_some() && ray.distance < SIDE_CLEAR_DISTANCE {
                if i < center {
                    reading.left_clear = false;
                } else {
                    reading.right_clear = false;
                }
            }

            match ray.kind {
                Some(HitKind::Obstacle | HitKind::Boundary) => reading.obstacles += 1,
                Some(HitKind::Npc) => reading.npcs += 1,
                Some(HitKind::Pedestrian) => reading.pedestrians += 1,
                None => {}
            }
            reading.rays.push(ray);
        }

        reading.danger = danger_level(&reading);
        self.last.insert(reading)
    }

    fn cast(
        &self,
        origin: WorldPos,
        angle: f32,
        grid: &Grid,
        npcs: &[WorldPos],
        pedestrians: &[WorldPos],
    ) -> RayHit {
        let step = TILE_SIZE * STEP_FRACTION;
        let max_steps = (self.range * TILE_SIZE / step) as usize;

        for n in 1..=max_steps {
            let travelled = n as f32 * step;
            let point = origin.project(angle, travelled);
            let distance = travelled / TILE_SIZE;

            let kind = if npcs
                .iter()
                .any(|npc| point.distance(npc) < TILE_SIZE * NPC_HIT_RADIUS)
            {
                Some(HitKind::Npc)
            } else if pedestrians
                .iter()
                .any(|ped| point.distance(ped) < TILE_SIZE * PEDESTRIAN_HIT_RADIUS)
            {
                Some(HitKind::Pedestrian)
            } else {
                match grid.get_cell(point.to_grid()) {
                    None => Some(HitKind::Boundary),
                    Some(Cell::Obstacle) => Some(HitKind::Obstacle),
                    Some(_) => None,
                }
            };

            if kind.is_some() {
                return RayHit {
                    angle,
                    origin,
                    end: point,
                    distance,
                    kind,
                };
            }
        }

        RayHit {
            angle,
            origin,
            end: origin.project(angle, self.range * TILE_SIZE),
            distance: self.range,
            kind: None,
        }
    }
}

fn danger_level(reading: &SensorReading) -> f32 {
    let mut danger: f32 = if reading.front_distance < 1.0 {
        0.8
    } else if reading.front_distance < 2.0 {
        0.4
    } else if reading.front_distance < 3.0 {
        0.2
    } else {
        0.0
    };
    if reading.nearest_npc().is_some_and(|d| d < 1.5) {
        danger += 0.5;
    }
    if reading.nearest_pedestrian().is_some_and(|d| d < 2.0) {
        danger += 0.7;
    }
    danger.min(1.0)
}
