use mini_city::simulation::{Cell, Grid, GridPos, DEFAULT_CITY_MAP};

#[test]
fn test_default_city_layout() {
    let grid = Grid::default_city();
    assert_eq!(grid.rows(), 12);
    assert_eq!(grid.cols(), 20);
    assert_eq!(grid.find_start(), Some(GridPos::new(1, 1)));
    assert_eq!(grid.find_goal(), Some(GridPos::new(10, 19)));
    assert_eq!(
        grid.find_traffic_lights(),
        vec![GridPos::new(4, 4), GridPos::new(4, 15), GridPos::new(10, 12)]
    );
    assert_eq!(grid.to_ascii(), DEFAULT_CITY_MAP.join("\n") + "\n");
}

#[test]
fn test_out_of_bounds_queries_are_safe() {
    let mut grid = Grid::default_city();
    assert!(!grid.is_valid(GridPos::new(-1, 0)));
    assert!(!grid.is_valid(GridPos::new(0, 20)));
    assert_eq!(grid.get_cell(GridPos::new(12, 0)), None);
    assert!(!grid.is_passable(GridPos::new(-3, -3)));
    assert!(!grid.set_cell(GridPos::new(100, 100), Cell::Road));
    assert!(!grid.toggle_obstacle(GridPos::new(0, -1)));
}

#[test]
fn test_toggles_only_touch_matching_cells() {
    let mut grid = Grid::default_city();
    let road = GridPos::new(2, 0);
    let start = GridPos::new(1, 1);

    assert!(grid.toggle_obstacle(road));
    assert_eq!(grid.get_cell(road), Some(Cell::Obstacle));
    assert!(grid.toggle_obstacle(road));
    assert_eq!(grid.get_cell(road), Some(Cell::Road));

    assert!(!grid.toggle_obstacle(start));
    assert_eq!(grid.get_cell(start), Some(Cell::Start));

    assert!(grid.toggle_traffic_light(road));
    assert_eq!(grid.get_cell(road), Some(Cell::TrafficLight));
    assert!(!grid.toggle_obstacle(road));
    assert!(grid.toggle_traffic_light(road));
    assert_eq!(grid.get_cell(road), Some(Cell::Road));
}

#[test]
fn test_markers_stay_unique() {
    let mut grid = Grid::default_city();
    assert!(grid.set_start(GridPos::new(6, 5)));
    assert_eq!(grid.find_all(Cell::Start), vec![GridPos::new(6, 5)]);
    assert_eq!(grid.get_cell(GridPos::new(1, 1)), Some(Cell::Road));

    // Obstacles refuse markers
    assert!(!grid.set_goal(GridPos::new(0, 0)));
    assert_eq!(grid.find_goal(), Some(GridPos::new(10, 19)));
}

#[test]
fn test_from_ascii_parses_and_validates() {
    let grid = Grid::from_ascii("S..#\n.T.G\n").expect("valid map");
    assert_eq!(grid.rows(), 2);
    assert_eq!(grid.cols(), 4);
    assert_eq!(grid.get_cell(GridPos::new(1, 1)), Some(Cell::TrafficLight));

    assert!(Grid::from_ascii("").is_err());
    assert!(Grid::from_ascii("S..\n..").is_err());
    assert!(Grid::from_ascii("S.x").is_err());
    assert!(Grid::from_ascii("SS.G").is_err());
}

#[test]
fn test_overlay_leaves_original_untouched() {
    let grid = Grid::default_city();
    let blocked = [GridPos::new(2, 0), GridPos::new(6, 6)];
    let overlay = grid.with_overlay(&blocked);

    for pos in blocked {
        assert!(grid.is_passable(pos));
        assert!(!overlay.is_passable(pos));
    }
    assert_eq!(grid, Grid::default_city());
}

#[test]
fn test_random_generation_is_seeded_and_connected() {
    let mut a = Grid::default_city();
    let mut b = Grid::default_city();
    a.generate_random(42);
    b.generate_random(42);
    assert_eq!(a, b);

    let start = a.find_start().expect("start placed");
    let goal = a.find_goal().expect("goal placed");
    assert_ne!(start, goal);
    assert!(a.find_traffic_lights().len() <= 3);

    let path = mini_city::simulation::bfs(&a, start, goal);
    assert!(!path.is_empty(), "generated endpoints must be connected");
}
