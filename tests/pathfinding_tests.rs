use mini_city::simulation::{
    astar, bfs, compute_path, greedy, path_cost, Algorithm, Cell, Grid, GridPos,
};

/// Every step is orthogonal, onto a passable tile, from start to goal
fn assert_valid_path(grid: &Grid, path: &[GridPos], start: GridPos, goal: GridPos) {
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&goal));
    for pair in path.windows(2) {
        assert_eq!(pair[0].manhattan(&pair[1]), 1, "non-adjacent step {:?}", pair);
    }
    for pos in path {
        assert!(grid.is_passable(*pos), "path crosses blocked tile {}", pos);
    }
}

#[test]
fn test_all_algorithms_cross_the_default_city() {
    let grid = Grid::default_city();
    let start = grid.find_start().unwrap();
    let goal = grid.find_goal().unwrap();

    for algorithm in Algorithm::ALL {
        let path = compute_path(algorithm, &grid, Some(start), Some(goal));
        assert!(!path.is_empty(), "{} found no path", algorithm);
        assert_valid_path(&grid, &path, start, goal);
    }
}

#[test]
fn test_bfs_is_shortest_in_steps() {
    let grid = Grid::default_city();
    let start = GridPos::new(1, 1);
    let goal = GridPos::new(10, 19);

    let path = bfs(&grid, start, goal);
    // A monotone route exists, so the shortest path is the Manhattan distance
    assert_eq!(path.len() as i32, start.manhattan(&goal) + 1);
}

#[test]
fn test_astar_never_costs_more_than_bfs() {
    let grid = Grid::default_city();
    let start = GridPos::new(1, 1);
    let goal = GridPos::new(10, 19);

    let bfs_path = bfs(&grid, start, goal);
    let astar_path = astar(&grid, start, goal);
    assert!(path_cost(&grid, &astar_path) <= path_cost(&grid, &bfs_path));
    assert_eq!(path_cost(&grid, &astar_path), 27);
}

#[test]
fn test_astar_steps_around_lights_when_free() {
    let grid = Grid::from_ascii("S.T\n...\n..G").unwrap();
    let path = astar(&grid, GridPos::new(0, 0), GridPos::new(2, 2));

    assert_eq!(path.len(), 5);
    assert!(!path.contains(&GridPos::new(0, 2)));
    assert_eq!(path_cost(&grid, &path), 4);
}

#[test]
fn test_light_tiles_cost_double() {
    let grid = Grid::from_ascii("S.T.G").unwrap();
    let path = astar(&grid, GridPos::new(0, 0), GridPos::new(0, 4));
    assert_eq!(path.len(), 5);
    assert_eq!(path_cost(&grid, &path), 5);

    let mut plain = grid.clone();
    plain.set_cell(GridPos::new(0, 2), Cell::Road);
    assert_eq!(path_cost(&plain, &path), 4);
}

#[test]
fn test_greedy_backtracks_out_of_dead_ends() {
    // The goal-ward corridor is a dead end; the way round is through row 2
    let grid = Grid::from_ascii(".S..#G\n.####.\n......").unwrap();
    let start = GridPos::new(0, 1);
    let goal = GridPos::new(0, 5);

    let path = greedy(&grid, start, goal);
    assert_valid_path(&grid, &path, start, goal);
}

#[test]
fn test_unreachable_goal_gives_empty_path() {
    let grid = Grid::from_ascii("S#G").unwrap();
    for algorithm in Algorithm::ALL {
        let path = compute_path(
            algorithm,
            &grid,
            Some(GridPos::new(0, 0)),
            Some(GridPos::new(0, 2)),
        );
        assert!(path.is_empty(), "{} should fail", algorithm);
    }
}

#[test]
fn test_missing_endpoints_give_empty_path() {
    let grid = Grid::from_ascii("...").unwrap();
    assert!(compute_path(Algorithm::AStar, &grid, None, Some(GridPos::new(0, 2))).is_empty());
    assert!(compute_path(Algorithm::Bfs, &grid, Some(GridPos::new(0, 0)), None).is_empty());
}

#[test]
fn test_start_equals_goal() {
    let grid = Grid::from_ascii("...").unwrap();
    let pos = GridPos::new(0, 1);
    for algorithm in Algorithm::ALL {
        assert_eq!(compute_path(algorithm, &grid, Some(pos), Some(pos)), vec![pos]);
    }
}

/// Hop distances from `start` by plain flood fill
fn flood_distances(grid: &Grid, start: GridPos) -> std::collections::HashMap<GridPos, usize> {
    let mut dist = std::collections::HashMap::from([(start, 0)]);
    let mut frontier = vec![start];
    let mut step = 0;
    while !frontier.is_empty() {
        step += 1;
        let mut next = Vec::new();
        for pos in frontier {
            for n in pos.neighbors() {
                if grid.is_passable(n) && !dist.contains_key(&n) {
                    dist.insert(n, step);
                    next.push(n);
                }
            }
        }
        frontier = next;
    }
    dist
}

#[test]
fn test_bfs_matches_flood_fill_on_random_maps() {
    for seed in 0..10 {
        let mut grid = Grid::default_city();
        grid.generate_random(seed);
        let start = grid.find_start().unwrap();
        let dist = flood_distances(&grid, start);

        for goal in grid.passable_positions().into_iter().step_by(7) {
            let path = bfs(&grid, start, goal);
            match dist.get(&goal) {
                Some(hops) => assert_eq!(path.len(), hops + 1, "seed {} goal {}", seed, goal),
                None => assert!(path.is_empty()),
            }
        }
    }
}

#[test]
fn test_open_walled_grid_is_manhattan_optimal() {
    let mut grid = Grid::new(12, 20, Cell::Obstacle);
    for row in 1..11 {
        for col in 1..19 {
            grid.set_cell(GridPos::new(row, col), Cell::Road);
        }
    }
    let start = GridPos::new(1, 1);
    let goal = GridPos::new(10, 18);
    grid.set_start(start);
    grid.set_goal(goal);

    let path = astar(&grid, start, goal);
    assert_eq!(path.len() as i32, start.manhattan(&goal) + 1);
    assert_eq!(path_cost(&grid, &path), bfs(&grid, start, goal).len() as u32 - 1);
}
