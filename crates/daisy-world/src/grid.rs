//! Patch grid for the world.

use crate::daisy::Daisy;
use daisy_core::{DaisyColor, Direction, EdgeMode, Position, SimulationConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One cell of the grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub temperature: f64,
    soil_pollution: f64,
    pub occupant: Option<Daisy>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn soil_pollution(&self) -> f64 {
        self.soil_pollution
    }

    /// Set soil pollution, clamped to [0, 1]
    pub fn set_soil_pollution(&mut self, value: f64) {
        self.soil_pollution = value.clamp(0.0, 1.0);
    }

    pub fn has_daisy(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn view(&self) -> PatchView {
        PatchView {
            occupant: self.occupant.map(|daisy| daisy.color),
            soil_pollution: self.soil_pollution,
        }
    }
}

/// What a display needs to draw a patch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchView {
    pub occupant: Option<DaisyColor>,
    pub soil_pollution: f64,
}

impl PatchView {
    pub fn symbol(&self) -> char {
        match self.occupant {
            Some(color) => color.symbol(),
            None if self.soil_pollution >= 0.66 => '#',
            None if self.soil_pollution >= 0.33 => ':',
            None => '.',
        }
    }
}

/// A fixed rows x cols grid, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: i32,
    pub cols: i32,
    pub edge_mode: EdgeMode,
    patches: Vec<Patch>,
}

impl Grid {
    /// Empty grid at temperature 0.
    ///
    /// Panics unless both dimensions are positive.
    pub fn new(rows: i32, cols: i32, edge_mode: EdgeMode) -> Self {
        assert!(
            rows > 0 && cols > 0,
            "grid dimensions must be positive, got {}x{}",
            rows,
            cols
        );
        let size = (rows * cols) as usize;
        Self {
            rows,
            cols,
            edge_mode,
            patches: vec![Patch::new(); size],
        }
    }

    /// Create a grid from configuration, contaminating some patches at random
    pub fn from_config(config: &SimulationConfig, rng: &mut ChaCha8Rng) -> Self {
        let world = &config.world;
        let pollution = &config.pollution;
        let mut grid = Self::new(world.rows, world.cols, world.edge_mode);

        for patch in &mut grid.patches {
            if rng.gen::<f64>() < world.initial_pollution_chance {
                patch.set_soil_pollution(rng.gen_range(pollution.min_level..=pollution.max_level));
            }
        }

        grid
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if pos.in_bounds(self.rows, self.cols) {
            Some((pos.row * self.cols + pos.col) as usize)
        } else {
            None
        }
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        index_to_pos(self.cols, index)
    }

    pub fn get(&self, pos: Position) -> Option<&Patch> {
        self.index_of(pos).map(|index| &self.patches[index])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Patch> {
        self.index_of(pos).map(move |index| &mut self.patches[index])
    }

    /// Neighbour in one direction, if it exists under the edge mode
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        let (drow, dcol) = direction.to_delta();
        let candidate = pos.add(drow, dcol);
        match self.edge_mode {
            EdgeMode::Bounded => candidate.in_bounds(self.rows, self.cols).then_some(candidate),
            EdgeMode::Wrapping => Some(candidate.wrap(self.rows, self.cols)),
        }
    }

    /// Orthogonal neighbours in seeding priority order (up, down, left, right)
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        Direction::all()
            .into_iter()
            .filter_map(move |direction| self.neighbor(pos, direction))
    }

    /// Place a daisy on an empty patch; returns false if the patch is taken or missing
    pub fn place(&mut self, daisy: Daisy) -> bool {
        match self.get_mut(daisy.position) {
            Some(patch) if !patch.has_daisy() => {
                patch.occupant = Some(daisy);
                true
            }
            _ => false,
        }
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patches_mut(&mut self) -> &mut [Patch] {
        &mut self.patches
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.patches.iter().map(|patch| patch.temperature).collect()
    }

    pub fn total_temperature(&self) -> f64 {
        self.patches.iter().map(|patch| patch.temperature).sum()
    }

    pub fn mean_temperature(&self) -> f64 {
        if self.patches.is_empty() {
            return 0.0;
        }
        self.total_temperature() / self.patches.len() as f64
    }

    /// Number of patches occupied by a daisy of the given colour
    pub fn count(&self, color: DaisyColor) -> usize {
        self.patches
            .iter()
            .filter(|patch| patch.occupant.map(|daisy| daisy.color) == Some(color))
            .count()
    }

    /// Iterator over all patches with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Patch)> + '_ {
        self.patches
            .iter()
            .enumerate()
            .map(move |(i, patch)| (self.index_to_pos(i), patch))
    }

    /// Text map: B/W for daisies, '.', ':' and '#' for bare soil by pollution
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.patches.len() + self.rows as usize);
        for row in self.patches.chunks(self.cols as usize) {
            out.extend(row.iter().map(|patch| patch.view().symbol()));
            out.push('\n');
        }
        out
    }
}

pub(crate) fn index_to_pos(cols: i32, index: usize) -> Position {
    let row = (index as i32) / cols;
    let col = (index as i32) % cols;
    Position::new(row, col)
}
