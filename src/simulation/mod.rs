//! Headless city traffic simulation
//!
//! Everything here runs without a renderer. A front end drives a
//! `SimWorld` with `tick` and `apply`, then reads it back through
//! `snapshot` and `drain_events`.

mod agent;
mod dynamic_obstacle;
mod events;
mod grid;
mod npc;
mod npc_manager;
mod pathfinding;
mod pedestrian;
mod road_network;
mod sensor;
mod settings;
mod snapshot;
mod traffic_light;
mod types;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use agent::{
    crosswalk_speed_factor, Agent, AgentContext, AgentStatus, StopReason, BRAKE_THRESHOLD,
    CROSSWALK_CONE, CROSSWALK_SCAN_RANGE, FORWARD_CONE, NPC_CRAWL_MULTIPLIER, NPC_SCAN_RADIUS,
    NPC_STOP_DISTANCE, NPC_WAIT_TIMEOUT, PEDESTRIAN_CROSSWALK_RADIUS, PEDESTRIAN_STOP_RANGE,
    VEHICLE_ACCELERATION, VEHICLE_DECELERATION, VEHICLE_SPEED, WAYPOINT_REACHED_DISTANCE,
};
#[allow(unused_imports)]
pub use dynamic_obstacle::{
    DynamicObstacle, DynamicObstacleManager, ObstacleChange, ObstacleKind, MAX_OBSTACLES,
    OBSTACLE_MAX_LIFETIME, OBSTACLE_MIN_LIFETIME, OBSTACLE_SPAWN_CLEARANCE,
    OBSTACLE_SPAWN_INTERVAL,
};
#[allow(unused_imports)]
pub use events::SimEvent;
#[allow(unused_imports)]
pub use grid::{Cell, Grid, DEFAULT_CITY_MAP};
#[allow(unused_imports)]
pub use npc::{yield_multiplier, NpcUpdateResult, NpcVehicle, NPC_SPEED_SCALE};
#[allow(unused_imports)]
pub use npc_manager::{
    NpcManager, Occupancy, Occupant, DEFAULT_NPC_TARGET, MAX_NPC_TARGET, MIN_NPC_TARGET,
    NPC_SPAWN_SEPARATION,
};
#[allow(unused_imports)]
pub use pathfinding::{astar, bfs, bfs_limited, compute_path, greedy, path_cost, Algorithm};
#[allow(unused_imports)]
pub use pedestrian::{
    Crosswalk, CrosswalkAxis, Pedestrian, PedestrianManager, PedestrianState,
    PedestrianUpdateResult, DEFAULT_PEDESTRIAN_TARGET, PEDESTRIAN_SAFE_DISTANCE,
};
#[allow(unused_imports)]
pub use road_network::{step_cost, RoadNetwork, TRAFFIC_LIGHT_STEP_COST};
#[allow(unused_imports)]
pub use sensor::{
    HitKind, RayHit, Sensor, SensorReading, DEFAULT_SENSOR_FOV, DEFAULT_SENSOR_RANGE, SENSOR_RAYS,
};
#[allow(unused_imports)]
pub use settings::{SimSettings, DEFAULT_GOAL_DWELL};
#[allow(unused_imports)]
pub use snapshot::{
    AgentView, CrosswalkView, LightView, NpcView, ObstacleView, PedestrianView, SimSnapshot,
};
#[allow(unused_imports)]
pub use traffic_light::{
    LightState, TrafficLight, TrafficLightManager, CYCLE_DURATION, GREEN_DURATION, RED_DURATION,
    YELLOW_DURATION,
};
#[allow(unused_imports)]
pub use types::{
    angle_difference, heading_for_step, lerp_angle, GridPos, NpcId, PedestrianId, Rgb, SimId,
    WorldPos, DIRECTIONS, TILE_SIZE,
};
pub use world::{Command, PathOrigin, SimWorld, RANDOM_MAP_SEED_LIMIT};
