//! Route planning over the city grid
//!
//! Every planner returns the tiles from start to goal inclusive, or an
//! empty vector when no route exists.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use super::grid::Grid;
use super::road_network::{step_cost, RoadNetwork};
use super::types::GridPos;

/// Step budget for greedy search before it gives up and uses BFS
pub const GREEDY_MAX_STEPS: usize = 2000;

/// Dead ends greedy search tolerates before falling back to BFS
pub const GREEDY_MAX_BACKTRACKS: usize = 50;

/// Route planning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Algorithm {
    Bfs,
    Greedy,
    #[default]
    #[value(name = "astar", alias = "a*")]
    AStar,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Bfs, Algorithm::Greedy, Algorithm::AStar];
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Bfs => "BFS",
            Algorithm::Greedy => "Greedy",
            Algorithm::AStar => "A*",
        };
        f.write_str(name)
    }
}

/// Plan a route with the chosen algorithm.
/// Missing endpoints or an unreachable goal give an empty path.
pub fn compute_path(
    algorithm: Algorithm,
    grid: &Grid,
    start: Option<GridPos>,
    goal: Option<GridPos>,
) -> Vec<GridPos> {
    let (Some(start), Some(goal)) = (start, goal) else {
        return Vec::new();
    };

    match algorithm {
        Algorithm::Bfs => bfs(grid, start, goal),
        Algorithm::Greedy => greedy(grid, start, goal),
        Algorithm::AStar => astar(grid, start, goal),
    }
}

/// Unweighted shortest path, first-discovered neighbour wins ties
pub fn bfs(grid: &Grid, start: GridPos, goal: GridPos) -> Vec<GridPos> {
    breadth_first(grid, start, goal, None)
}

/// BFS that gives up once more than `visit_limit` tiles have been discovered
pub fn bfs_limited(grid: &Grid, start: GridPos, goal: GridPos, visit_limit: usize) -> Vec<GridPos> {
    breadth_first(grid, start, goal, Some(visit_limit))
}

fn breadth_first(
    grid: &Grid,
    start: GridPos,
    goal: GridPos,
    visit_limit: Option<usize>,
) -> Vec<GridPos> {
    if !grid.is_valid(start) || !grid.is_valid(goal) {
        return Vec::new();
    }

    let mut came_from: HashMap<GridPos, Option<GridPos>> = HashMap::from([(start, None)]);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            break;
        }
        for next in current.neighbors() {
            if grid.is_passable(next) && !came_from.contains_key(&next) {
                came_from.insert(next, Some(current));
                queue.push_back(next);

                if visit_limit.is_some_and(|limit| came_from.len() > limit) {
                    return Vec::new();
                }
            }
        }
    }

    reconstruct(&came_from, goal)
}

fn reconstruct(came_from: &HashMap<GridPos, Option<GridPos>>, goal: GridPos) -> Vec<GridPos> {
    if !came_from.contains_key(&goal) {
        return Vec::new();
    }
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(Some(prev)) = came_from.get(&current) {
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}

/// Greedy best-first with backtracking.
///
/// Always steps to the unvisited neighbour closest to the goal. A dead end
/// pops the current tile and retries from its predecessor. Too many dead
/// ends, a collapsed path, or an exhausted step budget hand the query to BFS.
pub fn greedy(grid: &Grid, start: GridPos, goal: GridPos) -> Vec<GridPos> {
    if !grid.is_valid(start) || !grid.is_valid(goal) {
        return Vec::new();
    }

    let mut path = vec![start];
    let mut visited = HashSet::from([start]);
    let mut current = start;
    let mut dead_ends = 0;

    for _ in 0..GREEDY_MAX_STEPS {
        if current == goal {
            return path;
        }

        let mut candidates: Vec<GridPos> = current
            .neighbors()
            .into_iter()
            .filter(|next| grid.is_passable(*next) && !visited.contains(next))
            .collect();
        // Stable sort keeps DIRECTIONS order among equally close tiles
        candidates.sort_by_key(|next| next.manhattan(&goal));

        match candidates.first() {
            Some(best) => {
                current = *best;
                path.push(current);
                visited.insert(current);
                dead_ends = 0;
            }
            None => {
                dead_ends += 1;
                if dead_ends > GREEDY_MAX_BACKTRACKS || path.len() <= 1 {
                    return bfs(grid, start, goal);
                }
                path.pop();
                current = path[path.len() - 1];
            }
        }
    }

    if current == goal {
        path
    } else {
        bfs(grid, start, goal)
    }
}

/// Minimum-cost path where traffic-light tiles cost 2 and other tiles 1
pub fn astar(grid: &Grid, start: GridPos, goal: GridPos) -> Vec<GridPos> {
    if !grid.is_valid(start) || !grid.is_valid(goal) {
        return Vec::new();
    }

    let mut network = RoadNetwork::from_grid(grid);
    network.ensure_origin(grid, start);

    network
        .find_path(start, goal)
        .map(|(_, path)| path)
        .unwrap_or_default()
}

/// Weighted cost of walking a path: the entry cost of every tile after the first
pub fn path_cost(grid: &Grid, path: &[GridPos]) -> u32 {
    path.iter()
        .skip(1)
        .filter_map(|pos| grid.get_cell(*pos))
        .map(step_cost)
        .sum()
}
