//! Batched undo/redo log for tile edits.
//!
//! A [`Batch`] is one user action (a single placement or a whole tool
//! stroke). Each op stores the cell's value before the batch first touched it
//! and its value after the batch's last write, so replaying `prev` values in
//! reverse restores the pre-batch state exactly.

use std::collections::{HashMap, VecDeque};

use crate::coord::Coord;
use crate::tilemap::{TileEntry, TileMap, DEFAULT_LAYER};

/// Number of batches kept when no limit is configured.
pub const DEFAULT_MAX_UNDO: usize = 200;

/// One reversible cell mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOp {
    pub coord: Coord,
    /// Layer the mutation happened on
    pub layer: String,
    /// Cell value before the batch touched it
    pub prev: Option<TileEntry>,
    /// Cell value after the batch's last write
    pub next: Option<TileEntry>,
}

/// An undo-atomic group of cell mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<CellOp>,
}

impl Batch {
    pub fn ops(&self) -> &[CellOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Collects ops for one batch, capturing `prev` at the first touch of each
/// cell and tracking the latest `next`.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    ops: Vec<CellOp>,
    touched: HashMap<(Coord, String), usize>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation of `coord` on `layer` from `prev` to `next`.
    pub fn record(
        &mut self,
        coord: Coord,
        layer: &str,
        prev: Option<TileEntry>,
        next: Option<TileEntry>,
    ) {
        let key = (coord, layer.to_string());
        if let Some(&idx) = self.touched.get(&key) {
            self.ops[idx].next = next;
            return;
        }
        self.touched.insert(key, self.ops.len());
        self.ops.push(CellOp { coord, layer: layer.to_string(), prev, next });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn finish(self) -> Batch {
        Batch { ops: self.ops }
    }
}

/// Bounded undo stack with a redo stack.
#[derive(Debug, Clone)]
pub struct UndoLog {
    undo: VecDeque<Batch>,
    redo: Vec<Batch>,
    max: usize,
    default_layer: String,
    /// Set while a batch is being replayed; pushes are ignored meanwhile
    applying: bool,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl UndoLog {
    pub fn new(max: usize) -> Self {
        Self::with_default_layer(max, DEFAULT_LAYER)
    }

    /// `default_layer` is used to remove cells whose op carries no layer.
    pub fn with_default_layer(max: usize, default_layer: &str) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max: max.max(1),
            default_layer: default_layer.to_string(),
            applying: false,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Push a committed batch. Empty batches and pushes made while a batch is
    /// being replayed are ignored. Evicts the oldest batch beyond the limit and
    /// clears the redo stack. Returns whether the batch was kept.
    pub fn push_undo(&mut self, batch: Batch) -> bool {
        if batch.is_empty() || self.applying {
            return false;
        }
        self.redo.clear();
        self.push_bounded(batch);
        true
    }

    fn push_bounded(&mut self, batch: Batch) {
        self.undo.push_back(batch);
        while self.undo.len() > self.max {
            self.undo.pop_front();
        }
    }

    /// Revert the most recent batch. Returns `false` if there was nothing to
    /// undo.
    pub fn undo(&mut self, map: &mut TileMap) -> bool {
        let Some(batch) = self.undo.pop_back() else {
            return false;
        };
        self.applying = true;
        for op in batch.ops.iter().rev() {
            self.restore(map, op, op.prev.as_ref());
        }
        self.applying = false;
        log::debug!("undo: reverted {} cell(s)", batch.len());
        self.redo.push(batch);
        true
    }

    /// Re-apply the most recently undone batch. Returns `false` if there was
    /// nothing to redo.
    pub fn redo(&mut self, map: &mut TileMap) -> bool {
        let Some(batch) = self.redo.pop() else {
            return false;
        };
        self.applying = true;
        for op in &batch.ops {
            self.restore(map, op, op.next.as_ref());
        }
        self.applying = false;
        log::debug!("redo: reapplied {} cell(s)", batch.len());
        self.push_bounded(batch);
        true
    }

    /// Write `value` into the op's cell. The op's layer decides where it
    /// lands, whatever layer tag the stored entry carries.
    fn restore(&self, map: &mut TileMap, op: &CellOp, value: Option<&TileEntry>) {
        let layer = self.op_layer(op);
        match value {
            Some(entry) => {
                let mut entry = entry.clone();
                if entry.layer != layer {
                    entry.layer = layer.to_string();
                }
                map.put(op.coord, entry);
            }
            None => {
                map.remove(op.coord, layer);
            }
        }
    }

    fn op_layer<'a>(&'a self, op: &'a CellOp) -> &'a str {
        if op.layer.is_empty() {
            &self.default_layer
        } else {
            &op.layer
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Most recent batch, if any.
    pub fn last(&self) -> Option<&Batch> {
        self.undo.back()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
