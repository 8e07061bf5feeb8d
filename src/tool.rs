//! Line / box / circle tool sessions.
//!
//! A session goes `Idle -> Active -> Idle`. While active, every cursor update
//! recomputes the preview from the anchor; committing writes the preview with
//! the current [`Brush`] as a single undo batch, cancelling drops it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::coord::Coord;
use crate::document::Document;
use crate::geometry;
use crate::tilemap::{Invert, TileEntry, DEFAULT_LAYER};
use crate::tilesheet::TileKey;

/// Which shape the active tool rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    None,
    Line,
    Box,
    Circle,
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolMode::None => "none",
            ToolMode::Line => "line",
            ToolMode::Box => "box",
            ToolMode::Circle => "circle",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ToolMode {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ToolMode::None),
            "line" => Ok(ToolMode::Line),
            "box" | "rect" => Ok(ToolMode::Box),
            "circle" => Ok(ToolMode::Circle),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

/// Errors from tool session transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("unknown tool '{0}' (expected line, box or circle)")]
    UnknownTool(String),
    /// Activation needs a selected tile or cursor cell
    #[error("no anchor cell to start the tool from")]
    NoAnchor,
    #[error("tool mode 'none' cannot be activated")]
    NoTool,
    #[error("no tool session is active")]
    Inactive,
    /// Commit with no tile selected for the brush
    #[error("no tile selected to draw with")]
    NoBrush,
}

/// What a commit writes into each preview cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub tilesheet_id: String,
    pub tile_key: TileKey,
    pub rotation: i32,
    pub invert: Invert,
    pub layer: String,
    /// Remove cells instead of placing tiles
    pub erase: bool,
}

impl Brush {
    pub fn tile(tilesheet_id: impl Into<String>, tile_key: impl Into<TileKey>) -> Self {
        Self {
            tilesheet_id: tilesheet_id.into(),
            tile_key: tile_key.into(),
            rotation: 0,
            invert: Invert::default(),
            layer: DEFAULT_LAYER.to_string(),
            erase: false,
        }
    }

    pub fn eraser(layer: impl Into<String>) -> Self {
        Self {
            tilesheet_id: String::new(),
            tile_key: TileKey::named(""),
            rotation: 0,
            invert: Invert::default(),
            layer: layer.into(),
            erase: true,
        }
    }

    pub fn with_rotation(mut self, rotation: i32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_invert(mut self, invert: Invert) -> Self {
        self.invert = invert;
        self
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    fn entry(&self) -> TileEntry {
        TileEntry::new(
            self.tilesheet_id.clone(),
            self.tile_key.clone(),
            self.rotation,
            self.invert,
            self.layer.clone(),
        )
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Preview cells visited
    pub cells: usize,
    /// Whether an undo batch was pushed
    pub recorded: bool,
}

/// Compute the cells a tool covers from `anchor` to `cursor`.
///
/// Box uses the two points as opposite corners; circle is centered on the
/// anchor with the radius rounded from the Euclidean distance to the cursor.
pub fn shape_cells(mode: ToolMode, anchor: Coord, cursor: Coord, filled: bool) -> Vec<Coord> {
    match mode {
        ToolMode::None => Vec::new(),
        ToolMode::Line => geometry::line(anchor.x, anchor.y, cursor.x, cursor.y),
        ToolMode::Box if filled => geometry::rect_fill(anchor.x, anchor.y, cursor.x, cursor.y),
        ToolMode::Box => geometry::rect_outline(anchor.x, anchor.y, cursor.x, cursor.y),
        ToolMode::Circle => {
            let r = radius(anchor, cursor);
            if filled {
                geometry::circle_fill(anchor.x, anchor.y, r)
            } else {
                geometry::circle_outline(anchor.x, anchor.y, r)
            }
        }
    }
}

fn radius(a: Coord, b: Coord) -> i32 {
    let dx = (b.x as f64) - (a.x as f64);
    let dy = (b.y as f64) - (a.y as f64);
    dx.hypot(dy).round() as i32
}

/// A single tool session. Only one can be active at a time.
#[derive(Debug, Clone, Default)]
pub struct ToolSession {
    mode: ToolMode,
    active: bool,
    anchor: Option<Coord>,
    preview: Vec<Coord>,
}

impl ToolSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn anchor(&self) -> Option<Coord> {
        self.anchor
    }

    /// Cells the render layer should highlight.
    pub fn preview(&self) -> &[Coord] {
        &self.preview
    }

    /// Start a session anchored at `anchor`. Restarting while active replaces
    /// the previous session without touching the map.
    pub fn activate(&mut self, mode: ToolMode, anchor: Option<Coord>) -> Result<(), ToolError> {
        if mode == ToolMode::None {
            return Err(ToolError::NoTool);
        }
        let anchor = anchor.ok_or(ToolError::NoAnchor)?;
        log::debug!("tool {} active at {}", mode, anchor);
        self.mode = mode;
        self.active = true;
        self.anchor = Some(anchor);
        self.preview.clear();
        Ok(())
    }

    /// Recompute the preview from the anchor to `cursor`.
    pub fn update(&mut self, cursor: Coord, filled: bool) -> &[Coord] {
        if let (true, Some(anchor)) = (self.active, self.anchor) {
            self.preview = shape_cells(self.mode, anchor, cursor, filled);
        }
        &self.preview
    }

    /// Write the preview with `brush` as one undo batch and return to idle.
    pub fn commit(&mut self, doc: &mut Document, brush: &Brush) -> Result<CommitSummary, ToolError> {
        if !self.active {
            return Err(ToolError::Inactive);
        }
        let cells = std::mem::take(&mut self.preview);
        let ((), recorded) = doc.edit(|tx| {
            for &cell in &cells {
                if brush.erase {
                    tx.remove(cell, &brush.layer);
                } else {
                    tx.put(cell, brush.entry());
                }
            }
        });
        log::debug!("tool {} committed {} cell(s)", self.mode, cells.len());
        self.reset();
        Ok(CommitSummary { cells: cells.len(), recorded })
    }

    /// Drop the preview without mutating anything.
    pub fn cancel(&mut self) {
        if self.active {
            log::debug!("tool {} cancelled", self.mode);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.mode = ToolMode::None;
        self.active = false;
        self.anchor = None;
        self.preview.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn test_parse_tool_mode() {
        assert_eq!("line".parse::<ToolMode>().unwrap(), ToolMode::Line);
        assert_eq!("Box".parse::<ToolMode>().unwrap(), ToolMode::Box);
        assert_eq!("rect".parse::<ToolMode>().unwrap(), ToolMode::Box);
        assert_eq!("circle".parse::<ToolMode>().unwrap(), ToolMode::Circle);
        assert!(matches!("spray".parse::<ToolMode>(), Err(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_activate_requires_anchor_and_tool() {
        let mut tool = ToolSession::new();
        assert_eq!(tool.activate(ToolMode::Line, None), Err(ToolError::NoAnchor));
        assert_eq!(tool.activate(ToolMode::None, Some(c(0, 0))), Err(ToolError::NoTool));
        assert!(!tool.is_active());
    }

    #[test]
    fn test_update_recomputes_preview() {
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Line, Some(c(0, 0))).unwrap();
        assert_eq!(tool.update(c(3, 0), false).len(), 4);
        assert_eq!(tool.update(c(1, 0), false), &[c(0, 0), c(1, 0)]);
    }

    #[test]
    fn test_update_when_idle_is_noop() {
        let mut tool = ToolSession::new();
        assert!(tool.update(c(5, 5), false).is_empty());
    }

    #[test]
    fn test_box_filled_modifier() {
        assert_eq!(shape_cells(ToolMode::Box, c(0, 0), c(2, 2), false).len(), 8);
        assert_eq!(shape_cells(ToolMode::Box, c(0, 0), c(2, 2), true).len(), 9);
    }

    #[test]
    fn test_circle_radius_rounds() {
        // distance sqrt(2) ~ 1.41 rounds to 1
        assert_eq!(radius(c(0, 0), c(1, 1)), 1);
        // distance sqrt(5) ~ 2.24 rounds to 2
        assert_eq!(radius(c(0, 0), c(1, 2)), 2);
        assert_eq!(radius(c(3, 3), c(3, 3)), 0);
        assert_eq!(shape_cells(ToolMode::Circle, c(4, 4), c(4, 4), false), vec![c(4, 4)]);
    }

    #[test]
    fn test_commit_writes_one_batch() {
        let mut doc = Document::default();
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Box, Some(c(0, 0))).unwrap();
        tool.update(c(2, 2), false);

        let summary = tool.commit(&mut doc, &Brush::tile("house", "wall")).unwrap();
        assert_eq!(summary, CommitSummary { cells: 8, recorded: true });
        assert_eq!(doc.map().len(), 8);
        assert!(doc.map().get_tile(1, 1, "base").is_none());
        assert_eq!(doc.history().undo_len(), 1);
        assert!(!tool.is_active());
        assert!(tool.preview().is_empty());

        doc.undo();
        assert!(doc.map().is_empty());
    }

    #[test]
    fn test_commit_uses_brush_settings() {
        let mut doc = Document::default();
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Line, Some(c(0, 0))).unwrap();
        tool.update(c(0, 1), false);
        let brush = Brush::tile("s", TileKey::grid(1, 2))
            .with_rotation(3)
            .with_invert(Invert::Flag(-1))
            .on_layer("overlay");
        tool.commit(&mut doc, &brush).unwrap();

        let entry = doc.map().get_tile(0, 1, "overlay").unwrap();
        assert_eq!(entry.rotation, 3);
        assert_eq!(entry.invert, Invert::Flag(-1));
        assert_eq!(entry.tile_key, TileKey::grid(1, 2));
    }

    #[test]
    fn test_cancel_leaves_map_untouched() {
        let mut doc = Document::default();
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Circle, Some(c(0, 0))).unwrap();
        tool.update(c(3, 0), true);
        assert!(!tool.preview().is_empty());

        tool.cancel();
        assert!(!tool.is_active());
        assert!(doc.map().is_empty());
        assert_eq!(tool.commit(&mut doc, &Brush::tile("s", "t")), Err(ToolError::Inactive));
    }

    #[test]
    fn test_erase_commit_skips_empty_batch() {
        let mut doc = Document::default();
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Line, Some(c(0, 0))).unwrap();
        tool.update(c(5, 0), false);
        let summary = tool.commit(&mut doc, &Brush::eraser("base")).unwrap();
        assert!(!summary.recorded);
        assert!(!doc.history().can_undo());
    }

    #[test]
    fn test_erase_commit_removes_cells() {
        let mut doc = Document::default();
        for x in 0..4 {
            doc.set_tile(x, 0, "s", "t", 0, Invert::default(), "base");
        }
        let mut tool = ToolSession::new();
        tool.activate(ToolMode::Line, Some(c(1, 0))).unwrap();
        tool.update(c(2, 0), false);
        tool.commit(&mut doc, &Brush::eraser("base")).unwrap();

        assert_eq!(doc.map().len(), 2);
        doc.undo();
        assert_eq!(doc.map().len(), 4);
    }
}
