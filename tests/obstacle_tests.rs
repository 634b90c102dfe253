use mini_city::simulation::{
    Cell, DynamicObstacle, DynamicObstacleManager, Grid, GridPos, ObstacleChange, ObstacleKind,
    MAX_OBSTACLES, OBSTACLE_SPAWN_INTERVAL,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_obstacle_expires_after_lifetime() {
    let mut obstacle = DynamicObstacle::new(GridPos::new(2, 2), ObstacleKind::Accident, Some(1.0));
    assert!(!obstacle.update(0.6));
    assert!(obstacle.flash_on());
    assert!(obstacle.update(0.6));
    assert_eq!(obstacle.remaining(), Some(0.0));

    let mut permanent = DynamicObstacle::new(GridPos::new(2, 2), ObstacleKind::Debris, None);
    assert!(!permanent.update(1000.0));
    assert_eq!(permanent.remaining(), None);
}

#[test]
fn test_manual_add_and_remove() {
    let mut manager = DynamicObstacleManager::new();
    let pos = GridPos::new(6, 6);

    assert!(manager.add_obstacle(pos, ObstacleKind::Roadwork, None));
    assert!(!manager.add_obstacle(pos, ObstacleKind::Debris, None));
    assert!(manager.is_blocked(pos));
    assert!(manager.remove_obstacle(pos));
    assert!(!manager.remove_obstacle(pos));

    assert_eq!(
        manager.drain_changes(),
        vec![
            ObstacleChange::Added(pos, ObstacleKind::Roadwork),
            ObstacleChange::Removed(pos),
        ]
    );
    assert!(!manager.has_pending_changes());
}

#[test]
fn test_spawn_respects_clearance_and_cell_kind() {
    let grid = Grid::default_city();
    let mut rng = StdRng::seed_from_u64(3);
    let avoid = [GridPos::new(6, 10)];
    let occupied = [GridPos::new(8, 0)];

    for _ in 0..20 {
        let mut manager = DynamicObstacleManager::new();
        let pos = manager
            .spawn_random(&grid, &avoid, &occupied, &mut rng)
            .expect("room to spawn");
        assert_eq!(grid.get_cell(pos), Some(Cell::Road));
        assert!(pos.manhattan(&avoid[0]) >= 3);
        assert_ne!(pos, occupied[0]);
    }
}

#[test]
fn test_spawn_timer_and_cap() {
    let grid = Grid::default_city();
    let mut rng = StdRng::seed_from_u64(11);
    let mut manager = DynamicObstacleManager::new();

    assert!(!manager.update(OBSTACLE_SPAWN_INTERVAL - 1.0, &grid, &[], &[], &mut rng));
    assert!(manager.update(1.0, &grid, &[], &[], &mut rng));
    assert_eq!(manager.len(), 1);

    for _ in 0..10 {
        manager.spawn_random(&grid, &[], &[], &mut rng);
    }
    assert_eq!(manager.len(), MAX_OBSTACLES);
}

#[test]
fn test_disabled_spawning_still_ages_obstacles() {
    let grid = Grid::default_city();
    let mut rng = StdRng::seed_from_u64(5);
    let mut manager = DynamicObstacleManager::new();
    manager.set_spawn_enabled(false);
    manager.add_obstacle(GridPos::new(6, 3), ObstacleKind::Construction, Some(2.0));
    manager.drain_changes();

    assert!(!manager.update(1.0, &grid, &[], &[], &mut rng));
    assert!(manager.update(1.5, &grid, &[], &[], &mut rng));
    assert!(manager.is_empty());
    assert_eq!(
        manager.drain_changes(),
        vec![ObstacleChange::Expired(GridPos::new(6, 3))]
    );
}

#[test]
fn test_toggle_spawning_and_clear() {
    let mut manager = DynamicObstacleManager::new();
    assert!(manager.spawn_enabled());
    assert!(!manager.toggle_spawning());
    assert!(manager.toggle_spawning());

    manager.clear();
    assert!(!manager.has_pending_changes());

    manager.add_obstacle(GridPos::new(6, 3), ObstacleKind::Debris, None);
    manager.clear();
    assert_eq!(manager.drain_changes().last(), Some(&ObstacleChange::Cleared));
}
