use mini_city::simulation::{
    Grid, GridPos, LightState, TrafficLight, TrafficLightManager, CYCLE_DURATION, GREEN_DURATION,
    RED_DURATION,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_cycle_order_red_green_yellow() {
    assert_eq!(LightState::at(0.0), LightState::Red);
    assert_eq!(LightState::at(RED_DURATION + 0.1), LightState::Green);
    assert_eq!(LightState::at(RED_DURATION + GREEN_DURATION + 0.1), LightState::Yellow);
    assert_eq!(LightState::at(CYCLE_DURATION + 0.1), LightState::Red);
}

#[test]
fn test_full_cycle_returns_to_start() {
    let mut light = TrafficLight::new(GridPos::new(0, 0), 1.0);
    let before = (light.state(), light.time_remaining());
    for _ in 0..19 {
        light.update(0.5);
    }
    assert_eq!(light.state(), before.0);
    assert!((light.time_remaining() - before.1).abs() < 1e-3);
}

#[test]
fn test_update_reports_changes() {
    let mut light = TrafficLight::new(GridPos::new(0, 0), 0.0);
    assert!(light.is_red());
    assert!(!light.update(1.0));
    assert!(light.update(3.5));
    assert!(light.is_green());
    assert!((light.time_remaining() - 3.5).abs() < 1e-4);
}

#[test]
fn test_yellow_only_stops_near_the_end() {
    // 8.2s in: yellow with 1.3s left
    let early = TrafficLight::new(GridPos::new(0, 0), 8.2);
    assert!(early.is_yellow());
    assert!(!early.should_stop());

    // 9.2s in: yellow with 0.3s left
    let late = TrafficLight::new(GridPos::new(0, 0), 9.2);
    assert!(late.is_yellow());
    assert!(late.should_stop());

    assert!(TrafficLight::new(GridPos::new(0, 0), 1.0).should_stop());
    assert!(!TrafficLight::new(GridPos::new(0, 0), 5.0).should_stop());
}

#[test]
fn test_manager_queries_default_to_go() {
    let mut manager = TrafficLightManager::new();
    manager.add_light(GridPos::new(4, 4), 0.0);

    assert!(manager.should_stop_at(GridPos::new(4, 4)));
    assert!(manager.is_red_at(GridPos::new(4, 4)));
    assert!(!manager.should_stop_at(GridPos::new(1, 1)));
    assert_eq!(manager.state_at(GridPos::new(1, 1)), None);
    assert_eq!(manager.time_remaining_at(GridPos::new(1, 1)), 0.0);
}

#[test]
fn test_manager_tracks_changed_positions() {
    let mut manager = TrafficLightManager::new();
    manager.add_light(GridPos::new(0, 0), 0.0);
    manager.add_light(GridPos::new(0, 1), 3.8);

    assert!(manager.update(0.5));
    assert_eq!(manager.changed_positions(), &[GridPos::new(0, 1)]);
    assert!(!manager.update(0.5));
    assert!(manager.changed_positions().is_empty());
    assert!((manager.nearest_timer() - 3.0).abs() < 1e-4);
}

#[test]
fn test_sync_with_grid_keeps_existing_clocks() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut grid = Grid::default_city();
    let mut manager = TrafficLightManager::new();

    assert!(manager.sync_with_grid(&grid, &mut rng));
    assert_eq!(manager.len(), 3);
    manager.update(1.25);
    let elapsed = manager.get_light(GridPos::new(4, 4)).unwrap().elapsed();

    // Removing one light leaves the others running
    grid.toggle_traffic_light(GridPos::new(4, 15));
    assert!(manager.sync_with_grid(&grid, &mut rng));
    assert_eq!(manager.len(), 2);
    assert_eq!(
        manager.get_light(GridPos::new(4, 4)).unwrap().elapsed(),
        elapsed
    );
    assert!(!manager.sync_with_grid(&grid, &mut rng));
}

#[test]
fn test_new_lights_start_desynced_within_three_seconds() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut manager = TrafficLightManager::new();
    for col in 0..20 {
        manager.add_light_desynced(GridPos::new(0, col), &mut rng);
    }
    for light in manager.lights() {
        assert!(light.elapsed() < 3.0);
        assert_eq!(light.state(), LightState::Red);
    }
}
