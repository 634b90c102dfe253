use mini_city::simulation::{Cell, Grid, GridPos, HitKind, Sensor, SENSOR_RAYS};

fn open_grid() -> Grid {
    Grid::new(10, 10, Cell::Road)
}

#[test]
fn test_clear_road_reports_no_danger() {
    let grid = open_grid();
    let mut sensor = Sensor::default();
    let reading = sensor.scan(GridPos::new(5, 2).center(), 90.0, &grid, &[], &[]);

    assert_eq!(reading.rays.len(), SENSOR_RAYS);
    assert_eq!(reading.front_distance, 4.0);
    assert!(reading.front_clear && reading.left_clear && reading.right_clear);
    assert_eq!(reading.danger, 0.0);
    assert!(!reading.should_brake());
}

#[test]
fn test_obstacle_ahead_raises_danger() {
    let mut grid = open_grid();
    grid.set_cell(GridPos::new(5, 7), Cell::Obstacle);
    let mut sensor = Sensor::default();
    let reading = sensor.scan(GridPos::new(5, 5).center(), 90.0, &grid, &[], &[]);

    assert!((reading.front_distance - 1.5).abs() < 1e-4);
    assert_eq!(reading.rays[SENSOR_RAYS / 2].kind, Some(HitKind::Obstacle));
    assert!(reading.obstacles >= 1);
    assert!((reading.danger - 0.4).abs() < 1e-4);
}

#[test]
fn test_npc_ahead_is_imminent() {
    let grid = open_grid();
    let mut sensor = Sensor::default();
    let npc = GridPos::new(5, 6).center();
    let reading = sensor.scan(GridPos::new(5, 5).center(), 90.0, &grid, &[npc], &[]);

    assert_eq!(reading.nearest_npc(), Some(0.5));
    assert!(reading.npcs >= 1);
    assert_eq!(reading.danger, 1.0);
    assert!(reading.should_stop());
}

#[test]
fn test_pedestrian_ahead_triggers_stop() {
    let grid = open_grid();
    let mut sensor = Sensor::default();
    let ped = GridPos::new(5, 6).center();
    let reading = sensor.scan(GridPos::new(5, 5).center(), 90.0, &grid, &[], &[ped]);

    assert!(reading.nearest_pedestrian().is_some_and(|d| d < 1.5));
    assert!(reading.should_stop());
    assert!(reading.danger >= 0.7);
}

#[test]
fn test_map_edge_counts_as_boundary() {
    let grid = open_grid();
    let mut sensor = Sensor::default();
    let reading = sensor.scan(GridPos::new(0, 5).center(), 0.0, &grid, &[], &[]);

    assert_eq!(reading.rays[SENSOR_RAYS / 2].kind, Some(HitKind::Boundary));
    assert!(reading.front_distance < 1.0);
}

#[test]
fn test_last_reading_is_kept_until_cleared() {
    let grid = open_grid();
    let mut sensor = Sensor::new(2.0, 40.0);
    assert!(sensor.last_reading().is_none());

    sensor.scan(GridPos::new(5, 5).center(), 180.0, &grid, &[], &[]);
    assert_eq!(sensor.last_reading().map(|r| r.front_distance), Some(2.0));

    sensor.clear();
    assert!(sensor.last_reading().is_none());
}
