//! Integer cell coordinates and their `"x|y"` text form.
//!
//! Maps key cells by [`Coord`] directly; the `"x|y"` string only appears at
//! the JSON boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A cell position on the unbounded tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)`, or `None` past the edge of the grid.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self { x: self.x.checked_add(dx)?, y: self.y.checked_add(dy)? })
    }

    /// Format as the map key used in serialized layers.
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for (i32, i32) {
    fn from(c: Coord) -> Self {
        (c.x, c.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.x, self.y)
    }
}

/// Error for malformed `"x|y"` keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell key '{0}', expected \"x|y\"")]
pub struct CoordKeyError(pub String);

impl FromStr for Coord {
    type Err = CoordKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once('|').ok_or_else(|| CoordKeyError(s.to_string()))?;
        let x = x.trim().parse().map_err(|_| CoordKeyError(s.to_string()))?;
        let y = y.trim().parse().map_err(|_| CoordKeyError(s.to_string()))?;
        Ok(Coord { x, y })
    }
}
