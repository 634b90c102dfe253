//! In-memory session settings
//!
//! The only state that survives a map reset or regeneration.

use super::npc_manager::{DEFAULT_NPC_TARGET, MAX_NPC_TARGET, MIN_NPC_TARGET};
use super::pathfinding::Algorithm;
use super::pedestrian::DEFAULT_PEDESTRIAN_TARGET;
use super::sensor::{DEFAULT_SENSOR_FOV, DEFAULT_SENSOR_RANGE};

/// Seconds the agent rests at the goal before the route restarts
pub const DEFAULT_GOAL_DWELL: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimSettings {
    pub algorithm: Algorithm,

    /// Target NPC population, always within 1..=15
    npc_count: usize,

    pub pedestrian_count: usize,

    /// Spawn random roadworks and accidents
    pub dynamic_obstacles: bool,

    /// Sensor reach in tiles
    pub sensor_range: f32,

    /// Sensor field of view in degrees
    pub sensor_fov: f32,

    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,

    /// Restart from the start marker after reaching the goal
    pub auto_restart: bool,

    pub goal_dwell: f32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::AStar,
            npc_count: DEFAULT_NPC_TARGET,
            pedestrian_count: DEFAULT_PEDESTRIAN_TARGET,
            dynamic_obstacles: true,
            sensor_range: DEFAULT_SENSOR_RANGE,
            sensor_fov: DEFAULT_SENSOR_FOV,
            seed: None,
            auto_restart: true,
            goal_dwell: DEFAULT_GOAL_DWELL,
        }
    }
}

impl SimSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn npc_count(&self) -> usize {
        self.npc_count
    }

    pub fn set_npc_count(&mut self, count: usize) {
        self.npc_count = count.clamp(MIN_NPC_TARGET, MAX_NPC_TARGET);
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "algorithm={}, npcs={}, pedestrians={}, obstacles={}, seed={}",
            self.algorithm,
            self.npc_count,
            self.pedestrian_count,
            if self.dynamic_obstacles { "on" } else { "off" },
            self.seed
                .map_or_else(|| "random".to_string(), |s| s.to_string())
        )
    }
}
