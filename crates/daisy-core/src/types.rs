//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one initialised simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Patch coordinate on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn add(&self, drow: i32, dcol: i32) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }

    /// Apply toroidal wrapping for given grid dimensions
    pub fn wrap(&self, rows: i32, cols: i32) -> Self {
        Self {
            row: ((self.row % rows) + rows) % rows,
            col: ((self.col % cols) + cols) % cols,
        }
    }

    pub fn in_bounds(&self, rows: i32, cols: i32) -> bool {
        self.row >= 0 && self.row < rows && self.col >= 0 && self.col < cols
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Orthogonal direction to a neighbouring patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// All directions in seeding priority order
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }
}

/// How neighbour lookups treat the grid border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeMode {
    /// No wraparound; neighbours past the border do not exist
    #[default]
    Bounded,
    /// Torus: neighbours wrap to the opposite side
    Wrapping,
}

/// Daisy colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaisyColor {
    Black,
    White,
}

impl DaisyColor {
    pub fn symbol(&self) -> char {
        match self {
            DaisyColor::Black => 'B',
            DaisyColor::White => 'W',
        }
    }
}

impl fmt::Display for DaisyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaisyColor::Black => write!(f, "black"),
            DaisyColor::White => write!(f, "white"),
        }
    }
}

/// Solar luminosity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Luminosity {
    #[default]
    Low,
    Our,
    High,
}

impl Luminosity {
    pub fn value(&self) -> f64 {
        match self {
            Luminosity::Low => 0.6,
            Luminosity::Our => 1.0,
            Luminosity::High => 1.4,
        }
    }

    /// Map a selector index (0 = low, 1 = ours, 2 = high); anything else falls back to low
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Luminosity::Our,
            2 => Luminosity::High,
            _ => Luminosity::Low,
        }
    }
}
