//! A tilemap paired with its undo log.
//!
//! All locally-undoable edits go through [`Document::edit`], which records
//! every cell it touches into one batch. Writes made directly on
//! [`Document::map_mut`] bypass the log.

use crate::coord::Coord;
use crate::tilemap::{Invert, TileEntry, TileMap, DEFAULT_LAYER};
use crate::tilesheet::TileKey;
use crate::undo::{BatchBuilder, UndoLog, DEFAULT_MAX_UNDO};

/// Map plus undo history.
#[derive(Debug, Clone)]
pub struct Document {
    map: TileMap,
    history: UndoLog,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(TileMap::new(), DEFAULT_MAX_UNDO)
    }
}

/// Mutations staged inside one [`Document::edit`] call.
pub struct Transaction<'a> {
    map: &'a mut TileMap,
    batch: BatchBuilder,
}

impl Transaction<'_> {
    /// Write `entry` at `coord` on `entry.layer`.
    pub fn put(&mut self, coord: Coord, entry: TileEntry) {
        let layer = entry.layer.clone();
        let prev = self.map.put(coord, entry.clone());
        self.batch.record(coord, &layer, prev, Some(entry));
    }

    pub fn set_tile(
        &mut self,
        x: i32,
        y: i32,
        tilesheet_id: impl Into<String>,
        tile_key: impl Into<TileKey>,
        rotation: i32,
        invert: Invert,
        layer: &str,
    ) {
        let entry = TileEntry::new(tilesheet_id, tile_key, rotation, invert, layer);
        self.put(Coord::new(x, y), entry);
    }

    /// Clear a cell. Empty cells are not recorded.
    pub fn remove(&mut self, coord: Coord, layer: &str) {
        if let Some(prev) = self.map.remove(coord, layer) {
            self.batch.record(coord, layer, Some(prev), None);
        }
    }

    /// Read through to the map, including writes staged so far.
    pub fn map(&self) -> &TileMap {
        self.map
    }
}

impl Document {
    pub fn new(map: TileMap, max_undo: usize) -> Self {
        Self { map, history: UndoLog::new(max_undo) }
    }

    pub fn with_history(map: TileMap, history: UndoLog) -> Self {
        Self { map, history }
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Direct map access; changes are not recorded for undo.
    pub fn map_mut(&mut self) -> &mut TileMap {
        &mut self.map
    }

    pub fn history(&self) -> &UndoLog {
        &self.history
    }

    /// Run `f` as one undoable action. The batch is pushed only if `f`
    /// touched at least one cell. Returns `f`'s result and whether a batch
    /// was recorded.
    pub fn edit<F, R>(&mut self, f: F) -> (R, bool)
    where
        F: FnOnce(&mut Transaction<'_>) -> R,
    {
        let mut tx = Transaction { map: &mut self.map, batch: BatchBuilder::new() };
        let result = f(&mut tx);
        let batch = tx.batch.finish();
        let recorded = self.history.push_undo(batch);
        (result, recorded)
    }

    /// Place one tile as its own undo step.
    pub fn set_tile(
        &mut self,
        x: i32,
        y: i32,
        tilesheet_id: impl Into<String>,
        tile_key: impl Into<TileKey>,
        rotation: i32,
        invert: Invert,
        layer: &str,
    ) {
        let entry = TileEntry::new(tilesheet_id, tile_key, rotation, invert, layer);
        self.edit(|tx| tx.put(Coord::new(x, y), entry));
    }

    /// Remove one tile as its own undo step. Returns whether anything was
    /// removed.
    pub fn remove_tile(&mut self, x: i32, y: i32, layer: &str) -> bool {
        self.edit(|tx| tx.remove(Coord::new(x, y), layer)).1
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.map)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.map)
    }

    /// Replace the map (e.g. after loading) and drop history.
    pub fn replace_map(&mut self, map: TileMap) {
        self.map = map;
        self.history.clear();
    }

    pub fn default_layer() -> &'static str {
        DEFAULT_LAYER
    }
}
