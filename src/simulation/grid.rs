//! The tile map shared by every other system
//!
//! Out-of-bounds queries never fail; they answer `None` or `false`.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};

use super::types::GridPos;

/// Road lattice spacing used by random generation
pub const RANDOM_ROAD_SPACING: usize = 3;

/// Fraction of the map sprinkled with extra road cells during generation
pub const RANDOM_EXTRA_ROAD_RATIO: f32 = 0.08;

/// Maximum number of traffic lights placed on a generated map
pub const RANDOM_MAX_LIGHTS: usize = 3;

/// The built-in 20x12 city map
pub const DEFAULT_CITY_MAP: [&str; 12] = [
    "###.....####....####",
    "#S..##.......##...##",
    "........#..#........",
    "##.###.##..##.###.##",
    "....T..........T....",
    "##.###.######.###.##",
    "....................",
    "##.##.##.##.##.##.##",
    "....................",
    "##.##.##.#.##.##.###",
    "##..........T......G",
    "#####.#######.######",
];

/// Contents of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Road,
    Obstacle,
    Start,
    Goal,
    TrafficLight,
}

impl Cell {
    pub fn is_passable(self) -> bool {
        !matches!(self, Cell::Obstacle)
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Road => '.',
            Cell::Obstacle => '#',
            Cell::Start => 'S',
            Cell::Goal => 'G',
            Cell::TrafficLight => 'T',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Cell> {
        match symbol {
            '.' => Some(Cell::Road),
            '#' => Some(Cell::Obstacle),
            'S' => Some(Cell::Start),
            'G' => Some(Cell::Goal),
            'T' => Some(Cell::TrafficLight),
            _ => None,
        }
    }
}

/// Rectangular city grid stored row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::default_city()
    }
}

impl Grid {
    pub fn new(rows: usize, cols: usize, fill: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![fill; rows * cols],
        }
    }

    pub fn default_city() -> Self {
        let rows = DEFAULT_CITY_MAP.len();
        let cols = DEFAULT_CITY_MAP[0].len();
        let cells = DEFAULT_CITY_MAP
            .iter()
            .flat_map(|line| line.chars())
            .map(|symbol| Cell::from_symbol(symbol).unwrap_or(Cell::Obstacle))
            .collect();
        Self { rows, cols, cells }
    }

    /// Parse a map drawn with `.`, `#`, `S`, `G` and `T`.
    /// Blank lines are skipped; rows must all have the same width.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            bail!("Map contains no rows");
        }

        let cols = lines[0].chars().count();
        let mut cells = Vec::with_capacity(lines.len() * cols);
        let mut starts = 0;
        let mut goals = 0;

        for (row, line) in lines.iter().enumerate() {
            if line.chars().count() != cols {
                bail!(
                    "Row {} has width {}, expected {}",
                    row,
                    line.chars().count(),
                    cols
                );
            }
            for (col, symbol) in line.chars().enumerate() {
                let cell = match Cell::from_symbol(symbol) {
                    Some(cell) => cell,
                    None => bail!("Unknown tile '{}' at ({}, {})", symbol, row, col),
                };
                match cell {
                    Cell::Start => starts += 1,
                    Cell::Goal => goals += 1,
                    _ => {}
                }
                cells.push(cell);
            }
        }

        if starts > 1 {
            bail!("Map has {} start tiles, at most one is allowed", starts);
        }
        if goals > 1 {
            bail!("Map has {} goal tiles, at most one is allowed", goals);
        }

        Ok(Self {
            rows: lines.len(),
            cols,
            cells,
        })
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols.max(1)) {
            out.extend(row.iter().map(|cell| cell.symbol()));
            out.push('\n');
        }
        out
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Restore the built-in city map
    pub fn reset(&mut self) {
        *self = Self::default_city();
    }

    /// Fill every cell with one value
    pub fn clear(&mut self, fill: Cell) {
        self.cells.fill(fill);
    }

    pub fn is_valid(&self, pos: GridPos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows
            && (pos.col as usize) < self.cols
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.is_valid(pos) {
            Some(pos.row as usize * self.cols + pos.col as usize)
        } else {
            None
        }
    }

    pub fn get_cell(&self, pos: GridPos) -> Option<Cell> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    /// Returns false when `pos` is out of bounds
    pub fn set_cell(&mut self, pos: GridPos, cell: Cell) -> bool {
        match self.index(pos) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    pub fn is_passable(&self, pos: GridPos) -> bool {
        self.get_cell(pos).is_some_and(Cell::is_passable)
    }

    /// All grid positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| GridPos::new(row as i32, col as i32))
        })
    }

    pub fn find_all(&self, cell: Cell) -> Vec<GridPos> {
        self.positions()
            .filter(|pos| self.get_cell(*pos) == Some(cell))
            .collect()
    }

    pub fn find_start(&self) -> Option<GridPos> {
        self.positions()
            .find(|pos| self.get_cell(*pos) == Some(Cell::Start))
    }

    pub fn find_goal(&self) -> Option<GridPos> {
        self.positions()
            .find(|pos| self.get_cell(*pos) == Some(Cell::Goal))
    }

    pub fn find_traffic_lights(&self) -> Vec<GridPos> {
        self.find_all(Cell::TrafficLight)
    }

    pub fn passable_positions(&self) -> Vec<GridPos> {
        self.positions().filter(|pos| self.is_passable(*pos)).collect()
    }

    /// Road <-> Obstacle. Other cell kinds are left alone.
    pub fn toggle_obstacle(&mut self, pos: GridPos) -> bool {
        match self.get_cell(pos) {
            Some(Cell::Obstacle) => self.set_cell(pos, Cell::Road),
            Some(Cell::Road) => self.set_cell(pos, Cell::Obstacle),
            _ => false,
        }
    }

    /// Road <-> TrafficLight. Other cell kinds are left alone.
    pub fn toggle_traffic_light(&mut self, pos: GridPos) -> bool {
        match self.get_cell(pos) {
            Some(Cell::TrafficLight) => self.set_cell(pos, Cell::Road),
            Some(Cell::Road) => self.set_cell(pos, Cell::TrafficLight),
            _ => false,
        }
    }

    fn clear_type(&mut self, cell: Cell) {
        for existing in self.cells.iter_mut().filter(|c| **c == cell) {
            *existing = Cell::Road;
        }
    }

    fn place_marker(&mut self, pos: GridPos, marker: Cell) -> bool {
        match self.get_cell(pos) {
            None | Some(Cell::Obstacle) => false,
            Some(_) => {
                self.clear_type(marker);
                self.set_cell(pos, marker)
            }
        }
    }

    /// Move the start marker. Refuses obstacle cells.
    pub fn set_start(&mut self, pos: GridPos) -> bool {
        self.place_marker(pos, Cell::Start)
    }

    /// Move the goal marker. Refuses obstacle cells.
    pub fn set_goal(&mut self, pos: GridPos) -> bool {
        self.place_marker(pos, Cell::Goal)
    }

    /// Replace the map with a random road lattice seeded from `seed`
    pub fn generate_random(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate_random_with(&mut rng);
    }

    pub fn generate_random_with<R: Rng>(&mut self, rng: &mut R) {
        self.clear(Cell::Obstacle);
        if self.rows == 0 || self.cols == 0 {
            return;
        }

        for row in (0..self.rows).step_by(RANDOM_ROAD_SPACING) {
            for col in 0..self.cols {
                self.cells[row * self.cols + col] = Cell::Road;
            }
        }
        for col in (0..self.cols).step_by(RANDOM_ROAD_SPACING) {
            for row in 0..self.rows {
                self.cells[row * self.cols + col] = Cell::Road;
            }
        }

        let extra = (self.rows as f32 * self.cols as f32 * RANDOM_EXTRA_ROAD_RATIO) as usize;
        for _ in 0..extra {
            let row = rng.random_range(0..self.rows);
            let col = rng.random_range(0..self.cols);
            self.cells[row * self.cols + col] = Cell::Road;
        }

        // Only cells connected to the lattice can host markers, so the
        // generated start and goal are always mutually reachable.
        let mut road_cells = self.connected_from(GridPos::new(0, 0));
        if road_cells.len() < 2 {
            return;
        }

        let (start, goal) = most_distant_pair(&road_cells);
        self.set_cell(start, Cell::Start);
        self.set_cell(goal, Cell::Goal);
        road_cells.retain(|pos| *pos != start && *pos != goal);

        road_cells.shuffle(rng);
        for pos in road_cells.into_iter().take(RANDOM_MAX_LIGHTS) {
            self.set_cell(pos, Cell::TrafficLight);
        }
    }

    /// Passable cells reachable from `origin`, in row-major order
    fn connected_from(&self, origin: GridPos) -> Vec<GridPos> {
        if !self.is_passable(origin) {
            return Vec::new();
        }
        let mut seen = HashSet::from([origin]);
        let mut queue = VecDeque::from([origin]);
        while let Some(current) = queue.pop_front() {
            for next in current.neighbors() {
                if self.is_passable(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        self.positions().filter(|pos| seen.contains(pos)).collect()
    }

    /// An independent copy safe to mutate
    pub fn copy_data(&self) -> Grid {
        self.clone()
    }

    /// Copy with the given cells turned into obstacles
    pub fn with_overlay<'a>(&self, blocked: impl IntoIterator<Item = &'a GridPos>) -> Grid {
        let mut copy = self.clone();
        for pos in blocked {
            copy.set_cell(*pos, Cell::Obstacle);
        }
        copy
    }
}

/// First pair (in row-major scan order) with the greatest Manhattan distance
fn most_distant_pair(cells: &[GridPos]) -> (GridPos, GridPos) {
    let mut best = (cells[0], cells[cells.len() - 1]);
    let mut best_dist = -1;
    for (i, a) in cells.iter().enumerate() {
        for b in &cells[i + 1..] {
            let dist = a.manhattan(b);
            if dist > best_dist {
                best_dist = dist;
                best = (*a, *b);
            }
        }
    }
    best
}
