//! Editor scene: document plus camera, brush and selection state.
//!
//! Each concern lives in its own struct. The scene wires them together for
//! tool gestures, level import/export and peer synchronization. Remote state
//! is merged straight into the map and never enters the undo log.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::config::PixtileConfig;
use crate::coord::Coord;
use crate::document::Document;
use crate::level::{Level, LevelError, LevelOffset, TileRef};
use crate::materialize::MaterializeQueue;
use crate::sync::{self, FlatDiff, SyncError};
use crate::tilemap::{read_entry, Invert, LoadReport, MapError, TileEntry, TileMap};
use crate::tilesheet::{SheetsFile, SourceRect, TileKey, TileSheet};
use crate::tool::{Brush, CommitSummary, ToolError, ToolMode, ToolSession};
use crate::undo::UndoLog;

/// Viewport state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub offset: LevelOffset,
    pub zoom: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self { offset: LevelOffset::default(), zoom: 1.0 }
    }
}

/// Current drawing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushState {
    pub tile: Option<TileRef>,
    pub rotation: i32,
    pub invert: Invert,
    pub layer: String,
    /// Filled variant for box and circle tools
    pub filled: bool,
    pub erase: bool,
}

impl BrushState {
    fn new(layer: &str) -> Self {
        Self {
            tile: None,
            rotation: 0,
            invert: Invert::default(),
            layer: layer.to_string(),
            filled: false,
            erase: false,
        }
    }

    /// The brush a commit would paint with, if one can be built.
    pub fn brush(&self) -> Option<Brush> {
        if self.erase {
            return Some(Brush::eraser(self.layer.clone()));
        }
        let tile = self.tile.as_ref()?;
        Some(
            Brush::tile(tile.tilesheet_id.clone(), tile.tile_key.clone())
                .with_rotation(self.rotation)
                .with_invert(self.invert)
                .on_layer(self.layer.clone()),
        )
    }
}

/// Selected tile and cursor cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected: Option<Coord>,
    pub cursor: Option<Coord>,
}

impl SelectionState {
    /// Where a tool session anchors: the selected cell, else the cursor.
    pub fn anchor(&self) -> Option<Coord> {
        self.selected.or(self.cursor)
    }
}

/// Tile counts from one remote merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteSummary {
    pub tiles_set: usize,
    pub tiles_removed: usize,
}

type FrameKey = (String, TileKey);

/// Full editor state for one level.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: CameraState,
    pub brush: BrushState,
    pub selection: SelectionState,
    pub document: Document,
    pub tool: ToolSession,
    pub tile_size: u32,
    layer_order: Vec<String>,
    frames: MaterializeQueue<FrameKey, Option<SourceRect>>,
    /// Sheet stamp the cached frames were computed against
    frames_stamp: u64,
    /// Remote state keys the scene does not model (collaboration flags etc.)
    shared: Value,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(&PixtileConfig::default())
    }
}

impl Scene {
    pub fn new(config: &PixtileConfig) -> Self {
        let history = UndoLog::with_default_layer(config.undo.max, &config.map.default_layer);
        Self {
            camera: CameraState::default(),
            brush: BrushState::new(&config.map.default_layer),
            selection: SelectionState::default(),
            document: Document::with_history(TileMap::new(), history),
            tool: ToolSession::new(),
            tile_size: config.map.tile_size,
            layer_order: config.map.layers.clone(),
            frames: MaterializeQueue::new(),
            frames_stamp: 0,
            shared: Value::Object(Map::new()),
        }
    }

    pub fn map(&self) -> &TileMap {
        self.document.map()
    }

    /// Layers in composite order: configured layers first, then any others
    /// the map has, in creation order.
    pub fn layer_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = self.layer_order.iter().map(String::as_str).collect();
        for name in self.map().layer_names() {
            if !order.contains(&name) {
                order.push(name);
            }
        }
        order
    }

    // ------------------------------------------------------------------
    // Levels
    // ------------------------------------------------------------------

    /// Build a scene from a level. In strict mode malformed map cells are an
    /// error; otherwise they are skipped and reported.
    pub fn from_level(
        level: &Level,
        config: &PixtileConfig,
        strict: bool,
    ) -> Result<(Self, LoadReport), LevelError> {
        let mut scene = Scene::new(config);
        let mut map = TileMap::new();
        let report = map.load_json(&level.map, strict)?;
        scene.document.replace_map(map);
        scene.camera = CameraState { offset: level.level_offset, zoom: level.zoom };
        scene.tile_size = level.tile_size;
        scene.brush.tile = level.draw_type.clone();
        scene.brush.rotation = level.draw_rot;
        scene.brush.invert = level.draw_invert;
        Ok((scene, report))
    }

    pub fn to_level(&self) -> Level {
        Level {
            map: self.map().to_json(),
            level_offset: self.camera.offset,
            tile_size: self.tile_size,
            draw_type: self.brush.tile.clone(),
            draw_rot: self.brush.rotation,
            draw_invert: self.brush.invert,
            zoom: self.camera.zoom,
        }
    }

    /// Register every sheet in a sheets payload. Returns how many were added.
    pub fn register_sheets(&mut self, sheets: &SheetsFile) -> Result<usize, MapError> {
        for payload in &sheets.sheets {
            let sheet = TileSheet::from_payload(payload);
            self.document.map_mut().register_tile_sheet(payload.id.clone(), sheet)?;
        }
        Ok(sheets.sheets.len())
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    /// Start a tool at the selected cell or the cursor.
    pub fn begin_tool(&mut self, mode: ToolMode) -> Result<(), ToolError> {
        self.tool.activate(mode, self.selection.anchor())
    }

    /// Move the cursor, refreshing the active tool's preview.
    pub fn move_cursor(&mut self, cursor: Coord) -> &[Coord] {
        self.selection.cursor = Some(cursor);
        self.tool.update(cursor, self.brush.filled)
    }

    pub fn commit_tool(&mut self) -> Result<CommitSummary, ToolError> {
        if !self.tool.is_active() {
            return Err(ToolError::Inactive);
        }
        let brush = self.brush.brush().ok_or(ToolError::NoBrush)?;
        self.tool.commit(&mut self.document, &brush)
    }

    pub fn cancel_tool(&mut self) {
        self.tool.cancel();
    }

    pub fn undo(&mut self) -> bool {
        self.document.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.document.redo()
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Drop cached frames once the map's sheets changed.
    fn refresh_frames(&mut self) {
        let stamp = self.map().sheets_stamp();
        if stamp != self.frames_stamp {
            self.frames.clear();
            self.frames_stamp = stamp;
        }
    }

    /// Source rectangle of a tile, materialized on demand.
    pub fn frame(&mut self, tilesheet_id: &str, key: &TileKey) -> Option<SourceRect> {
        self.refresh_frames();
        let map = self.document.map();
        *self.frames.request((tilesheet_id.to_string(), key.clone()), |(id, key)| {
            map.get_tile_sheet(id).and_then(|s| s.source_rect(key))
        })
    }

    /// Queue every tile the map references for background materialization.
    /// Returns how many were newly queued.
    pub fn prefetch_frames(&mut self) -> usize {
        self.refresh_frames();
        let keys: Vec<FrameKey> = self
            .map()
            .iter()
            .map(|(_, _, e)| (e.tilesheet_id.clone(), e.tile_key.clone()))
            .collect();
        keys.into_iter().filter(|k| self.frames.enqueue(k.clone())).count()
    }

    /// Materialize up to `budget` queued frames. Returns `true` once drained.
    pub fn tick_frames(&mut self, budget: usize) -> bool {
        self.refresh_frames();
        let map = self.document.map();
        self.frames.tick(budget, |(id, key)| map.get_tile_sheet(id).and_then(|s| s.source_rect(key)))
    }

    pub fn frame_progress(&self) -> f32 {
        self.frames.progress()
    }

    /// Frames materialized so far that did not resolve to a rectangle.
    pub fn unresolved_frames(&self) -> usize {
        if self.map().sheets_stamp() != self.frames_stamp {
            return 0;
        }
        let keys: HashSet<FrameKey> = self
            .map()
            .iter()
            .map(|(_, _, e)| (e.tilesheet_id.clone(), e.tile_key.clone()))
            .collect();
        keys.iter().filter(|k| matches!(self.frames.get(k), Some(None))).count()
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// State tree exchanged with peers.
    ///
    /// Tiles live under `tiles/<layer>/<x|y>`.
    pub fn snapshot(&self) -> Value {
        let mut tiles = Map::new();
        for (layer, coord, entry) in self.map().iter() {
            let cells = tiles
                .entry(layer.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(cells) = cells {
                cells.insert(coord.key(), json!(entry));
            }
        }
        let mut state = self.shared.clone();
        sync::merge(
            &mut state,
            &json!({
                "camera": self.camera,
                "brush": self.brush,
                "selection": self.selection,
            }),
        );
        if let Value::Object(obj) = &mut state {
            obj.insert("tiles".to_string(), Value::Object(tiles));
        }
        state
    }

    /// Flat diff of everything that changed since `previous` (an earlier
    /// [`Scene::snapshot`]).
    pub fn local_diff(&self, previous: &Value) -> FlatDiff {
        sync::diff(previous, &self.snapshot())
    }

    /// Expand and apply a flat remote diff.
    pub fn apply_remote_diff(&mut self, diff: &FlatDiff) -> Result<RemoteSummary, SyncError> {
        let expanded = sync::expand(diff)?;
        self.apply_remote_state(&expanded)
    }

    /// Merge an expanded remote state tree. Tile writes bypass undo.
    ///
    /// The whole update is validated before anything is applied.
    pub fn apply_remote_state(&mut self, remote: &Value) -> Result<RemoteSummary, SyncError> {
        let Value::Object(root) = remote else {
            return Err(SyncError::NotAnObject);
        };

        let tile_ops = match root.get("tiles") {
            Some(tiles) => remote_tile_ops(self.map(), tiles)?,
            None => Vec::new(),
        };
        let camera = merged_section(&self.camera, root.get("camera"), "camera")?;
        let brush = merged_section(&self.brush, root.get("brush"), "brush")?;
        let selection = merged_section(&self.selection, root.get("selection"), "selection")?;

        let mut summary = RemoteSummary::default();
        let map = self.document.map_mut();
        for op in tile_ops {
            match op {
                RemoteOp::Put(coord, entry) => {
                    map.put(coord, entry);
                    summary.tiles_set += 1;
                }
                RemoteOp::Remove(layer, coord) => {
                    if map.remove(coord, &layer).is_some() {
                        summary.tiles_removed += 1;
                    }
                }
                RemoteOp::ClearLayer(layer) => {
                    summary.tiles_removed += map.clear_layer(&layer);
                }
                RemoteOp::ClearAll => {
                    summary.tiles_removed += map.len();
                    map.clear();
                }
            }
        }
        self.camera = camera;
        self.brush = brush;
        self.selection = selection;

        let extra: Map<String, Value> = root
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "tiles" | "camera" | "brush" | "selection"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extra.is_empty() {
            sync::merge(&mut self.shared, &Value::Object(extra));
        }

        log::debug!(
            "remote merge: {} tile(s) set, {} removed",
            summary.tiles_set,
            summary.tiles_removed
        );
        Ok(summary)
    }

    /// Collaboration values the scene carries without interpreting.
    pub fn shared(&self) -> &Value {
        &self.shared
    }
}

/// One validated tile mutation from a remote update.
enum RemoteOp {
    Put(Coord, TileEntry),
    Remove(String, Coord),
    ClearLayer(String),
    ClearAll,
}

/// Translate the `tiles` section into map operations. A cell value is a
/// patch over the entry the cell already holds, so a diff carrying only the
/// changed fields updates just those fields.
fn remote_tile_ops(map: &TileMap, tiles: &Value) -> Result<Vec<RemoteOp>, SyncError> {
    let invalid = |path: String, message: &str| SyncError::InvalidValue { path, message: message.to_string() };
    let layers = match tiles {
        Value::Null => return Ok(vec![RemoteOp::ClearAll]),
        Value::Object(layers) => layers,
        _ => return Err(invalid("tiles".to_string(), "expected an object of layers")),
    };

    let mut ops = Vec::new();
    for (layer, cells) in layers {
        let cells = match cells {
            Value::Null => {
                ops.push(RemoteOp::ClearLayer(layer.clone()));
                continue;
            }
            Value::Object(cells) => cells,
            _ => return Err(invalid(format!("tiles/{}", layer), "expected an object of cells")),
        };
        for (key, value) in cells {
            let path = format!("tiles/{}/{}", layer, key);
            let coord: Coord = match key.parse() {
                Ok(coord) => coord,
                Err(e) => return Err(invalid(path, &format!("{}", e))),
            };
            if value.is_null() {
                ops.push(RemoteOp::Remove(layer.clone(), coord));
                continue;
            }
            let mut merged = match map.get(coord, layer) {
                Some(current) => serde_json::to_value(current).map_err(|e| invalid(path.clone(), &e.to_string()))?,
                None => Value::Object(Map::new()),
            };
            sync::merge(&mut merged, value);
            let (mut entry, notes) = read_entry(&merged).map_err(|e| invalid(path.clone(), &e))?;
            for note in notes {
                log::warn!("{}: {}", path, note);
            }
            // The containing layer wins over the entry's own tag
            entry.layer = layer.clone();
            ops.push(RemoteOp::Put(coord, entry));
        }
    }
    Ok(ops)
}

fn merged_section<T>(current: &T, patch: Option<&Value>, name: &str) -> Result<T, SyncError>
where
    T: Serialize + serde::de::DeserializeOwned + Clone,
{
    let Some(patch) = patch else {
        return Ok(current.clone());
    };
    let mut value = serde_json::to_value(current)
        .map_err(|e| SyncError::InvalidValue { path: name.to_string(), message: e.to_string() })?;
    sync::merge(&mut value, patch);
    serde_json::from_value(value)
        .map_err(|e| SyncError::InvalidValue { path: name.to_string(), message: e.to_string() })
}
