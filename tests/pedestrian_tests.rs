use mini_city::simulation::{
    Cell, Crosswalk, CrosswalkAxis, Grid, GridPos, Pedestrian, PedestrianId, PedestrianManager,
    PedestrianState, PedestrianUpdateResult, SimId, WorldPos, TILE_SIZE,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn crosswalk() -> Crosswalk {
    Crosswalk::new(GridPos::new(6, 6), CrosswalkAxis::Vertical)
}

#[test]
fn test_crosswalk_spans_the_tile() {
    let cw = Crosswalk::new(GridPos::new(2, 3), CrosswalkAxis::Horizontal);
    let center = cw.center();
    assert_eq!(cw.start().y, center.y);
    assert_eq!(cw.end().y, center.y);
    assert!((cw.start().distance(&cw.end()) - TILE_SIZE * 1.4).abs() < 1e-3);

    let vertical = crosswalk();
    assert_eq!(vertical.start().x, vertical.center().x);
    assert!(vertical.start().y < vertical.end().y);
}

#[test]
fn test_pedestrian_waits_while_traffic_is_near() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut ped = Pedestrian::new(PedestrianId(SimId(0)), &crosswalk(), &mut rng);

    for _ in 0..100 {
        let result = ped.update(0.1, false, &mut rng);
        assert_eq!(result, PedestrianUpdateResult::Continue);
    }
    assert_eq!(ped.state, PedestrianState::Waiting);
    assert_eq!(ped.wait_timer(), 0.0);
}

#[test]
fn test_pedestrian_moves_on_after_a_few_crossings() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut ped = Pedestrian::new(PedestrianId(SimId(0)), &crosswalk(), &mut rng);
    let start = ped.position;

    let mut completed = 0;
    let mut moved_on = false;
    for _ in 0..400 {
        match ped.update(0.1, true, &mut rng) {
            PedestrianUpdateResult::Continue => {}
            PedestrianUpdateResult::CrossingComplete => completed += 1,
            PedestrianUpdateResult::NeedsNewCrosswalk => {
                moved_on = true;
                break;
            }
        }
        // Never strays off the crossing line
        assert_eq!(ped.position.x, start.x);
    }

    assert!(moved_on);
    assert!((1..=3).contains(&completed));
    assert!(ped.needs_new_crosswalk);
}

#[test]
fn test_relocate_resets_to_waiting() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut ped = Pedestrian::new(PedestrianId(SimId(0)), &crosswalk(), &mut rng);
    ped.needs_new_crosswalk = true;

    let other = Crosswalk::new(GridPos::new(8, 10), CrosswalkAxis::Horizontal);
    ped.relocate(&other, &mut rng);
    assert_eq!(ped.crosswalk, other.position);
    // Starts at one end of the new crossing
    let offset = ped.position.distance(&other.center());
    assert!((offset - TILE_SIZE * 0.7).abs() < 1e-3);
    assert_eq!(ped.state, PedestrianState::Waiting);
    assert!(!ped.needs_new_crosswalk);
}

#[test]
fn test_setup_places_crosswalks_on_roads() {
    let mut rng = StdRng::seed_from_u64(4);
    let grid = Grid::default_city();
    let mut manager = PedestrianManager::new(12);
    manager.setup_from_grid(&grid, &mut rng);

    assert!(manager.crosswalks().len() >= 3);
    for cw in manager.crosswalks() {
        assert_eq!(grid.get_cell(cw.position), Some(Cell::Road));
    }
}

#[test]
fn test_open_map_falls_back_to_stride_crosswalks() {
    let mut rng = StdRng::seed_from_u64(5);
    let grid = Grid::new(10, 10, Cell::Road);
    let mut manager = PedestrianManager::new(4);
    manager.setup_from_grid(&grid, &mut rng);

    assert!(!manager.crosswalks().is_empty());
    for cw in manager.crosswalks() {
        assert_eq!((cw.position.row - 2) % 3, 0);
        assert_eq!((cw.position.col - 2) % 3, 0);
    }
}

#[test]
fn test_manager_fills_to_target_and_counts_crossings() {
    let mut rng = StdRng::seed_from_u64(6);
    let grid = Grid::default_city();
    let mut manager = PedestrianManager::new(5);
    manager.setup_from_grid(&grid, &mut rng);

    manager.update(0.1, &[], &grid, &mut rng);
    assert_eq!(manager.pedestrians().len(), 5);

    for _ in 0..200 {
        manager.update(0.1, &[], &grid, &mut rng);
    }
    assert!(manager.total_crossings() > 0);
    for ped in manager.pedestrians() {
        assert!(manager.is_crosswalk(ped.crosswalk));
    }
}

#[test]
fn test_vehicle_on_top_blocks_every_crossing() {
    let mut rng = StdRng::seed_from_u64(7);
    let grid = Grid::default_city();
    let mut manager = PedestrianManager::new(1);
    manager.add_crosswalk(GridPos::new(6, 6), CrosswalkAxis::Vertical);
    manager.update(0.1, &[], &grid, &mut rng);
    let ped_pos: WorldPos = manager.pedestrians()[0].position;

    for _ in 0..100 {
        manager.update(0.1, &[ped_pos], &grid, &mut rng);
    }
    assert_eq!(manager.total_crossings(), 0);
    assert!(!manager.pedestrians()[0].is_walking());
}

#[test]
fn test_removed_road_drops_crosswalk() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut grid = Grid::default_city();
    let mut manager = PedestrianManager::new(1);
    manager.add_crosswalk(GridPos::new(6, 6), CrosswalkAxis::Vertical);
    manager.add_crosswalk(GridPos::new(8, 8), CrosswalkAxis::Horizontal);
    manager.update(0.1, &[], &grid, &mut rng);
    let home = manager.pedestrians()[0].crosswalk;

    grid.set_cell(home, Cell::Obstacle);
    manager.validate_crosswalks(&grid);
    assert!(!manager.is_crosswalk(home));
    assert!(manager.pedestrians()[0].needs_new_crosswalk);

    manager.update(0.1, &[], &grid, &mut rng);
    assert_ne!(manager.pedestrians()[0].crosswalk, home);
    assert!(!manager.pedestrians()[0].needs_new_crosswalk);
}
