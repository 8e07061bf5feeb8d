//! Copy, cut and paste of rectangular tile regions.
//!
//! A [`Clip`] stores occupied cells relative to the region's top-left corner,
//! so it can be pasted anywhere and onto any layer. Cut and paste each record
//! exactly one undo batch.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::document::Document;
use crate::tilemap::{TileEntry, TileMap};

/// A copied region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub width: u32,
    pub height: u32,
    /// Occupied cells as (offset from top-left, entry), row-major
    pub cells: Vec<(Coord, TileEntry)>,
}

impl Clip {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Top-left corner and size of the box spanned by two corners. A box covering
/// the whole `i32` range reports `u32::MAX` for that side.
fn region(x0: i32, y0: i32, x1: i32, y1: i32) -> (Coord, u32, u32) {
    let origin = Coord::new(x0.min(x1), y0.min(y1));
    let w = x0.abs_diff(x1).saturating_add(1);
    let h = y0.abs_diff(y1).saturating_add(1);
    (origin, w, h)
}

/// Occupied cells of `layer` inside the box, row-major.
fn occupied<'a>(map: &'a TileMap, layer: &str, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(Coord, &'a TileEntry)> {
    let (xs, ys) = (x0.min(x1)..=x0.max(x1), y0.min(y1)..=y0.max(y1));
    let mut cells: Vec<(Coord, &TileEntry)> = map
        .iter()
        .filter(|(name, c, _)| *name == layer && xs.contains(&c.x) && ys.contains(&c.y))
        .map(|(_, c, e)| (c, e))
        .collect();
    cells.sort_by_key(|(c, _)| (c.y, c.x));
    cells
}

/// Snapshot the occupied cells of one layer inside the box spanned by the two
/// corners (inclusive).
///
/// Cost follows the number of tiles on the layer, not the area of the box.
pub fn copy(map: &TileMap, layer: &str, x0: i32, y0: i32, x1: i32, y1: i32) -> Clip {
    let (origin, width, height) = region(x0, y0, x1, y1);
    let cells = occupied(map, layer, x0, y0, x1, y1)
        .into_iter()
        .filter_map(|(c, e)| {
            // Offsets wider than i32 cannot be stored
            let dx = i32::try_from(i64::from(c.x) - i64::from(origin.x)).ok()?;
            let dy = i32::try_from(i64::from(c.y) - i64::from(origin.y)).ok()?;
            Some((Coord::new(dx, dy), e.clone()))
        })
        .collect();
    Clip { width, height, cells }
}

/// Copy the region, then clear it as one undo batch.
pub fn cut(doc: &mut Document, layer: &str, x0: i32, y0: i32, x1: i32, y1: i32) -> Clip {
    let clip = copy(doc.map(), layer, x0, y0, x1, y1);
    let (origin, _, _) = region(x0, y0, x1, y1);
    doc.edit(|tx| {
        for (offset, _) in &clip.cells {
            if let Some(coord) = origin.offset(offset.x, offset.y) {
                tx.remove(coord, layer);
            }
        }
    });
    log::debug!("cut {} cell(s) from layer '{}'", clip.len(), layer);
    clip
}

/// Write `clip` with its top-left at `(x, y)` on `layer` as one undo batch.
/// Empty clip cells leave the destination untouched, and cells that would
/// land past the edge of the grid are dropped. Returns the number of cells
/// written.
pub fn paste(doc: &mut Document, clip: &Clip, x: i32, y: i32, layer: &str) -> usize {
    let top_left = Coord::new(x, y);
    let (written, _) = doc.edit(|tx| {
        let mut written = 0;
        for (offset, entry) in &clip.cells {
            let Some(coord) = top_left.offset(offset.x, offset.y) else {
                continue;
            };
            let mut entry = entry.clone();
            entry.layer = layer.to_string();
            tx.put(coord, entry);
            written += 1;
        }
        written
    });
    if written < clip.len() {
        log::debug!("paste dropped {} cell(s) past the grid edge", clip.len() - written);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::Invert;
    use crate::tilesheet::TileKey;

    fn doc_with_row() -> Document {
        let mut doc = Document::default();
        doc.edit(|tx| {
            for x in 0..3 {
                tx.set_tile(x, 0, "s", format!("t{}", x), 0, Invert::default(), "base");
            }
        });
        doc
    }

    #[test]
    fn test_copy_relative_offsets() {
        let doc = doc_with_row();
        let clip = copy(doc.map(), "base", 2, 1, 1, 0);

        assert_eq!((clip.width, clip.height), (2, 2));
        assert_eq!(clip.len(), 2);
        assert_eq!(clip.cells[0].0, Coord::new(0, 0));
        assert_eq!(clip.cells[0].1.tile_key, TileKey::named("t1"));
        assert_eq!(clip.cells[1].0, Coord::new(1, 0));
    }

    #[test]
    fn test_copy_other_layer_is_empty() {
        let doc = doc_with_row();
        assert!(copy(doc.map(), "overlay", 0, 0, 2, 0).is_empty());
    }

    #[test]
    fn test_cut_is_one_batch() {
        let mut doc = doc_with_row();
        let before = doc.history().undo_len();
        let clip = cut(&mut doc, "base", 0, 0, 1, 0);

        assert_eq!(clip.len(), 2);
        assert_eq!(doc.map().len(), 1);
        assert_eq!(doc.history().undo_len(), before + 1);

        doc.undo();
        assert_eq!(doc.map().len(), 3);
    }

    #[test]
    fn test_paste_to_other_layer_and_undo() {
        let mut doc = doc_with_row();
        let clip = copy(doc.map(), "base", 0, 0, 2, 0);
        let written = paste(&mut doc, &clip, -5, 4, "overlay");

        assert_eq!(written, 3);
        let entry = doc.map().get_tile(-3, 4, "overlay").unwrap();
        assert_eq!(entry.tile_key, TileKey::named("t2"));
        assert_eq!(entry.layer, "overlay");

        doc.undo();
        assert_eq!(doc.map().layer_len("overlay"), 0);
        assert_eq!(doc.map().layer_len("base"), 3);
    }

    #[test]
    fn test_copy_ignores_tiles_outside_box() {
        let mut doc = doc_with_row();
        doc.set_tile(1, 5, "s", "below", 0, Invert::default(), "base");
        doc.set_tile(-4, 0, "s", "left", 0, Invert::default(), "base");

        let clip = copy(doc.map(), "base", -1_000_000, -1, 1_000_000, 1);
        assert_eq!((clip.width, clip.height), (2_000_001, 3));
        let keys: Vec<String> = clip.cells.iter().map(|(_, e)| e.tile_key.to_string()).collect();
        assert_eq!(keys, vec!["left", "t0", "t1", "t2"]);
        assert_eq!(clip.cells[1].0, Coord::new(1_000_000, 1));
    }

    #[test]
    fn test_copy_whole_grid_corners() {
        let mut doc = Document::default();
        doc.set_tile(i32::MIN, 0, "s", "west", 0, Invert::default(), "base");
        doc.set_tile(i32::MAX, 0, "s", "east", 0, Invert::default(), "base");

        let clip = copy(doc.map(), "base", i32::MIN, 0, i32::MAX, 0);
        assert_eq!(clip.width, u32::MAX);
        // The east tile sits further than an i32 offset can reach
        assert_eq!(clip.len(), 1);
        assert_eq!(clip.cells[0].1.tile_key, TileKey::named("west"));

        let cut_clip = cut(&mut doc, "base", i32::MIN, 0, i32::MIN + 1, 0);
        assert_eq!(cut_clip.len(), 1);
        assert!(doc.map().get_tile(i32::MIN, 0, "base").is_none());
    }

    #[test]
    fn test_paste_near_grid_edge_drops_overflow() {
        let mut doc = doc_with_row();
        let clip = copy(doc.map(), "base", 0, 0, 2, 0);
        let written = paste(&mut doc, &clip, i32::MAX - 1, i32::MAX, "overlay");

        assert_eq!(written, 2);
        assert_eq!(doc.map().layer_len("overlay"), 2);
        assert_eq!(doc.map().get_tile(i32::MAX, i32::MAX, "overlay").unwrap().tile_key, TileKey::named("t1"));
    }

    #[test]
    fn test_paste_empty_clip_records_nothing() {
        let mut doc = Document::default();
        assert_eq!(paste(&mut doc, &Clip::default(), 0, 0, "base"), 0);
        assert!(!doc.history().can_undo());
    }
}
