//! Outbound notifications drained by whoever drives the session

use super::dynamic_obstacle::ObstacleChange;
use super::pathfinding::Algorithm;
use super::types::GridPos;

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    PathComputed {
        algorithm: Algorithm,
        length: usize,
        cost: u32,
    },
    PathNotFound {
        start: Option<GridPos>,
        goal: Option<GridPos>,
    },
    /// Lights that changed colour this tick
    LightsChanged(Vec<GridPos>),
    ObstaclesChanged(Vec<ObstacleChange>),
    GoalReached,
    MapReset,
    MapGenerated {
        seed: u64,
    },
}
