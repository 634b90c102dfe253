//! Read-only views of the session for renderers and tests

use super::agent::AgentStatus;
use super::dynamic_obstacle::ObstacleKind;
use super::grid::Grid;
use super::pedestrian::CrosswalkAxis;
use super::sensor::SensorReading;
use super::traffic_light::LightState;
use super::types::{GridPos, NpcId, PedestrianId, Rgb, WorldPos};

#[derive(Debug, Clone, PartialEq)]
pub struct AgentView {
    pub position: WorldPos,
    pub render_position: WorldPos,
    pub heading: f32,
    pub status: AgentStatus,
    pub path: Vec<GridPos>,
    pub path_index: usize,
    pub brake_lights: bool,
    pub tilt: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpcView {
    pub id: NpcId,
    pub position: WorldPos,
    pub heading: f32,
    pub color: Rgb,
    pub brake_lights: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PedestrianView {
    pub id: PedestrianId,
    pub position: WorldPos,
    pub walk_frame: u8,
    pub crosswalk: GridPos,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrosswalkView {
    pub position: GridPos,
    pub axis: CrosswalkAxis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightView {
    pub position: GridPos,
    pub state: LightState,
    pub time_remaining: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleView {
    pub position: GridPos,
    pub kind: ObstacleKind,
    pub color: Rgb,
    /// `None` for obstacles without a lifetime
    pub remaining: Option<f32>,
    pub flash_on: bool,
}

/// Everything an outside observer may read in one tick
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshot {
    pub time: f32,
    pub paused: bool,
    pub grid: Grid,
    pub agent: AgentView,
    pub npcs: Vec<NpcView>,
    pub pedestrians: Vec<PedestrianView>,
    pub crosswalks: Vec<CrosswalkView>,
    pub lights: Vec<LightView>,
    pub obstacles: Vec<ObstacleView>,
    pub sensor: Option<SensorReading>,
}
