//! Weighted road graph for cost-aware routing
//!
//! One node per passable tile, one directed edge per passable neighbour.
//! An edge costs whatever it costs to enter its target tile.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::grid::{Cell, Grid};
use super::types::GridPos;

/// Traffic-light tiles cost double so routes prefer to avoid them
pub const TRAFFIC_LIGHT_STEP_COST: u32 = 2;

/// Cost of stepping onto a cell
pub fn step_cost(cell: Cell) -> u32 {
    match cell {
        Cell::TrafficLight => TRAFFIC_LIGHT_STEP_COST,
        _ => 1,
    }
}

/// Road graph built from a grid snapshot
#[derive(Debug, Default)]
pub struct RoadNetwork {
    /// The underlying petgraph directed graph
    graph: DiGraph<GridPos, u32>,

    /// Maps tiles to their node indices in the graph
    cell_to_node: HashMap<GridPos, NodeIndex>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every passable tile of `grid`
    pub fn from_grid(grid: &Grid) -> Self {
        let mut network = Self::new();

        let cells = grid.passable_positions();
        let nodes: Vec<NodeIndex> = cells.iter().map(|pos| network.add_cell(*pos)).collect();

        // Row-major edge order keeps tie-breaking identical between runs
        for (pos, node) in cells.into_iter().zip(nodes) {
            network.connect_outgoing(grid, pos, node);
        }

        network
    }

    /// Adds a tile to the graph if it isn't there yet
    fn add_cell(&mut self, pos: GridPos) -> NodeIndex {
        if let Some(node) = self.cell_to_node.get(&pos) {
            return *node;
        }
        let node = self.graph.add_node(pos);
        self.cell_to_node.insert(pos, node);
        node
    }

    fn connect_outgoing(&mut self, grid: &Grid, pos: GridPos, node: NodeIndex) {
        for next in pos.neighbors() {
            if let (Some(cell), Some(target)) = (grid.get_cell(next), self.cell_to_node.get(&next)) {
                if cell.is_passable() {
                    self.graph.add_edge(node, *target, step_cost(cell));
                }
            }
        }
    }

    /// Make sure a search can leave `pos` even when the tile itself is blocked,
    /// e.g. a vehicle standing on a freshly placed obstacle.
    pub fn ensure_origin(&mut self, grid: &Grid, pos: GridPos) {
        if self.cell_to_node.contains_key(&pos) || !grid.is_valid(pos) {
            return;
        }
        let node = self.add_cell(pos);
        self.connect_outgoing(grid, pos, node);
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.cell_to_node.contains_key(&pos)
    }

    /// Finds the cheapest route with A* and the Manhattan heuristic.
    /// Returns the total cost and the tiles from `start` to `goal` inclusive.
    pub fn find_path(&self, start: GridPos, goal: GridPos) -> Option<(u32, Vec<GridPos>)> {
        if start == goal {
            return Some((0, vec![start]));
        }

        let start_node = self.cell_to_node.get(&start)?;
        let goal_node = self.cell_to_node.get(&goal)?;

        let (cost, nodes) = astar(
            &self.graph,
            *start_node,
            |node| node == *goal_node,
            |edge| *edge.weight(),
            |node| self.graph[node].manhattan(&goal) as u32,
        )?;

        let path = nodes.into_iter().map(|node| self.graph[node]).collect();
        Some((cost, path))
    }

    /// Get number of tiles in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of directed connections
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
