//! Layered sparse tilemap.
//!
//! A map is a set of named layers, each a sparse `Coord -> TileEntry` map.
//! Absence of an entry means the cell is empty. Layers are created lazily on
//! first write and iterate in insertion order, matching how the editor
//! serializes them.
//!
//! Tile sheets are registered by id; entries refer to sheets by id only and a
//! missing sheet is a soft condition surfaced through [`TileRenderInfo`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::coord::Coord;
use crate::registry::{Registry, SheetRegistry};
use crate::tilesheet::{TileKey, TileLoc, TileSheet};

/// Layer written to when none is specified.
pub const DEFAULT_LAYER: &str = "base";

/// Errors produced by tilemap operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MapError {
    /// `register_tile_sheet` was called with an empty id
    #[error("tile sheet id must not be empty")]
    EmptySheetId,
    /// Input was not valid JSON
    #[error("invalid map JSON: {0}")]
    Json(String),
    /// Strict load hit a malformed payload
    #[error("malformed map payload: {0}")]
    Malformed(String),
}

/// Horizontal flip flag (`1` or `-1`) or a per-axis scale vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Invert {
    Flag(i32),
    Vector([i32; 2]),
}

impl Default for Invert {
    fn default() -> Self {
        Invert::Flag(1)
    }
}

impl Invert {
    pub fn flips_horizontal(&self) -> bool {
        match self {
            Invert::Flag(f) => *f < 0,
            Invert::Vector([x, _]) => *x < 0,
        }
    }

    pub fn flips_vertical(&self) -> bool {
        match self {
            Invert::Flag(_) => false,
            Invert::Vector([_, y]) => *y < 0,
        }
    }
}

/// The stored record for one occupied cell.
///
/// Fields this crate does not model are kept in `extra` and written back
/// unchanged, so a load/save cycle never loses data another editor stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileEntry {
    #[serde(default)]
    pub tilesheet_id: String,
    #[serde(default = "missing_key")]
    pub tile_key: TileKey,
    /// Quarter turns clockwise, 0..=3
    #[serde(default, deserialize_with = "quarter_turns")]
    pub rotation: u8,
    #[serde(default)]
    pub invert: Invert,
    #[serde(default = "default_layer_name")]
    pub layer: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_layer_name() -> String {
    DEFAULT_LAYER.to_string()
}

fn missing_key() -> TileKey {
    TileKey::Other(Value::Null)
}

fn quarter_turns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let turns = i64::deserialize(deserializer)?;
    Ok(turns.rem_euclid(4) as u8)
}

impl Serialize for TileEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        // A field kept verbatim in `extra` replaces its typed default.
        if !self.extra.contains_key("tilesheetId") {
            map.serialize_entry("tilesheetId", &self.tilesheet_id)?;
        }
        if !self.extra.contains_key("tileKey") {
            map.serialize_entry("tileKey", &self.tile_key)?;
        }
        if !self.extra.contains_key("rotation") {
            map.serialize_entry("rotation", &self.rotation)?;
        }
        if !self.extra.contains_key("invert") {
            map.serialize_entry("invert", &self.invert)?;
        }
        map.serialize_entry("layer", &self.layer)?;
        for (key, value) in &self.extra {
            if key != "layer" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl TileEntry {
    pub fn new(
        tilesheet_id: impl Into<String>,
        tile_key: impl Into<TileKey>,
        rotation: i32,
        invert: Invert,
        layer: impl Into<String>,
    ) -> Self {
        Self {
            tilesheet_id: tilesheet_id.into(),
            tile_key: tile_key.into(),
            rotation: rotation.rem_euclid(4) as u8,
            invert,
            layer: layer.into(),
            extra: Map::new(),
        }
    }
}

/// Read a stored entry without dropping anything it carries.
///
/// A known field holding an unexpected shape is moved into `extra` verbatim
/// and reported in the returned notes. Only a non-object value is an error.
pub(crate) fn read_entry(value: &Value) -> Result<(TileEntry, Vec<String>), String> {
    let Value::Object(fields) = value else {
        return Err(format!("entry is not an object: {}", value));
    };
    let mut fields = fields.clone();
    let mut kept = Map::new();
    let mut notes = Vec::new();

    for name in ["tilesheetId", "tileKey"] {
        if !fields.contains_key(name) {
            notes.push(format!("missing '{}'", name));
        }
    }
    for name in ["tilesheetId", "rotation", "invert", "layer"] {
        let fits = match fields.get(name) {
            None => true,
            Some(v) => match name {
                "rotation" => v.as_i64().is_some(),
                "invert" => Invert::deserialize(v).is_ok(),
                _ => v.is_string(),
            },
        };
        if fits {
            continue;
        }
        if let Some(v) = fields.remove(name) {
            notes.push(format!("unexpected '{}' value {}", name, v));
            // The containing layer always decides the tag
            if name != "layer" {
                kept.insert(name.to_string(), v);
            }
        }
    }

    let has_key = fields.contains_key("tileKey");
    let mut entry = TileEntry::deserialize(&Value::Object(fields)).map_err(|e| e.to_string())?;
    if let (true, TileKey::Other(key)) = (has_key, &entry.tile_key) {
        notes.push(format!("unrecognized 'tileKey' {}", key));
    }
    entry.extra.extend(kept);
    Ok((entry, notes))
}

/// Everything the render layer needs to draw one cell.
#[derive(Debug, Clone, Copy)]
pub struct TileRenderInfo<'a> {
    pub coord: Coord,
    pub entry: &'a TileEntry,
    /// `None` when the entry references an unregistered sheet
    pub sheet: Option<&'a TileSheet>,
    /// Grid location inside the sheet, when both sheet and key resolve
    pub loc: Option<TileLoc>,
}

/// A non-fatal problem found while loading a map.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadWarning {
    pub message: String,
}

/// Outcome of a lenient load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub warnings: Vec<LoadWarning>,
    /// Sheet ids the payload expects the caller to register
    pub sheet_ids: Vec<String>,
    pub entries: usize,
}

/// One named layer. Cells keep insertion order; overwriting a cell keeps its
/// position, removing and re-adding moves it to the end.
#[derive(Debug, Clone, Default)]
struct Layer {
    name: String,
    cells: HashMap<Coord, (u64, TileEntry)>,
    order: BTreeMap<u64, Coord>,
    next_seq: u64,
}

impl Layer {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    fn get(&self, coord: Coord) -> Option<&TileEntry> {
        self.cells.get(&coord).map(|(_, entry)| entry)
    }

    fn insert(&mut self, coord: Coord, entry: TileEntry) -> Option<TileEntry> {
        if let Some((_, slot)) = self.cells.get_mut(&coord) {
            return Some(std::mem::replace(slot, entry));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, coord);
        self.cells.insert(coord, (seq, entry));
        None
    }

    fn remove(&mut self, coord: Coord) -> Option<TileEntry> {
        let (seq, entry) = self.cells.remove(&coord)?;
        self.order.remove(&seq);
        Some(entry)
    }

    fn iter(&self) -> impl Iterator<Item = (Coord, &TileEntry)> {
        self.order.values().filter_map(move |c| self.get(*c).map(|e| (*c, e)))
    }

    fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Sparse layered tile map plus its sheet registry.
#[derive(Debug, Clone, Default)]
pub struct TileMap {
    layers: Vec<Layer>,
    sheets: SheetRegistry,
    sheets_stamp: u64,
}

/// Source of sheet stamps, unique across every map in the process.
static SHEET_STAMPS: AtomicU64 = AtomicU64::new(1);

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes whenever any registered sheet may have changed. Two maps with
    /// the same stamp hold the same sheets.
    pub fn sheets_stamp(&self) -> u64 {
        self.sheets_stamp
    }

    fn touch_sheets(&mut self) {
        self.sheets_stamp = SHEET_STAMPS.fetch_add(1, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------
    // Sheet registry
    // ------------------------------------------------------------------

    /// Register a sheet under `id`. Fails only for an empty id.
    pub fn register_tile_sheet(
        &mut self,
        id: impl Into<String>,
        sheet: TileSheet,
    ) -> Result<(), MapError> {
        self.sheets.register(id, sheet)?;
        self.touch_sheets();
        Ok(())
    }

    pub fn unregister_tile_sheet(&mut self, id: &str) -> Option<TileSheet> {
        let removed = self.sheets.unregister(id);
        if removed.is_some() {
            self.touch_sheets();
        }
        removed
    }

    pub fn get_tile_sheet(&self, id: &str) -> Option<&TileSheet> {
        self.sheets.get(id)
    }

    /// Mutable access to a sheet. Counts as a change for [`Self::sheets_stamp`].
    pub fn get_tile_sheet_mut(&mut self, id: &str) -> Option<&mut TileSheet> {
        if self.sheets.get(id).is_some() {
            self.touch_sheets();
        }
        self.sheets.get_mut(id)
    }

    pub fn sheets(&self) -> &SheetRegistry {
        &self.sheets
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    /// Place a tile, overwriting whatever the cell held on that layer.
    /// Returns the previous entry.
    pub fn set_tile(
        &mut self,
        x: i32,
        y: i32,
        tilesheet_id: impl Into<String>,
        tile_key: impl Into<TileKey>,
        rotation: i32,
        invert: Invert,
        layer: &str,
    ) -> Option<TileEntry> {
        let entry = TileEntry::new(tilesheet_id, tile_key, rotation, invert, layer);
        self.put(Coord::new(x, y), entry)
    }

    /// Store `entry` at `coord` on the layer named by `entry.layer`.
    pub fn put(&mut self, coord: Coord, entry: TileEntry) -> Option<TileEntry> {
        let layer = entry.layer.clone();
        self.layer_mut(&layer).insert(coord, entry)
    }

    pub fn get_tile(&self, x: i32, y: i32, layer: &str) -> Option<&TileEntry> {
        self.get(Coord::new(x, y), layer)
    }

    pub fn get(&self, coord: Coord, layer: &str) -> Option<&TileEntry> {
        self.layer(layer)?.get(coord)
    }

    /// Remove a tile. No-op (returns `None`) when the cell is empty.
    pub fn remove_tile(&mut self, x: i32, y: i32, layer: &str) -> Option<TileEntry> {
        self.remove(Coord::new(x, y), layer)
    }

    pub fn remove(&mut self, coord: Coord, layer: &str) -> Option<TileEntry> {
        self.layers.iter_mut().find(|l| l.name == layer)?.remove(coord)
    }

    /// Resolve a cell for drawing. `None` if the cell is empty; the info's
    /// `sheet` is `None` if the entry's sheet is not registered.
    pub fn get_tile_render_info(&self, x: i32, y: i32, layer: &str) -> Option<TileRenderInfo<'_>> {
        let coord = Coord::new(x, y);
        let entry = self.get(coord, layer)?;
        Some(self.render_info(coord, entry))
    }

    fn render_info<'a>(&'a self, coord: Coord, entry: &'a TileEntry) -> TileRenderInfo<'a> {
        let sheet = self.sheets.get(&entry.tilesheet_id);
        let loc = sheet.and_then(|s| s.resolve(&entry.tile_key));
        TileRenderInfo { coord, entry, sheet, loc }
    }

    /// Drawable cells for the given layer order, bottom first.
    ///
    /// Entries whose sheet is missing are skipped with a warning.
    pub fn render_list(&self, layer_order: &[&str]) -> Vec<TileRenderInfo<'_>> {
        let mut out = Vec::new();
        for name in layer_order {
            let Some(layer) = self.layer(name) else { continue };
            for (coord, entry) in layer.iter() {
                let info = self.render_info(coord, entry);
                if info.sheet.is_none() {
                    log::warn!(
                        "tile at {} on layer '{}' references missing sheet '{}', skipped",
                        coord,
                        name,
                        entry.tilesheet_id
                    );
                    continue;
                }
                out.push(info);
            }
        }
        out
    }

    /// Visit entries of one layer, or of every layer in creation order.
    pub fn for_each<F>(&self, mut callback: F, layer: Option<&str>)
    where
        F: FnMut(Coord, &TileEntry),
    {
        match layer {
            Some(name) => {
                if let Some(l) = self.layer(name) {
                    l.iter().for_each(|(c, e)| callback(c, e));
                }
            }
            None => {
                for l in &self.layers {
                    l.iter().for_each(|(c, e)| callback(c, e));
                }
            }
        }
    }

    /// Iterate `(layer, coord, entry)` over all layers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Coord, &TileEntry)> {
        self.layers.iter().flat_map(|l| l.iter().map(move |(c, e)| (l.name.as_str(), c, e)))
    }

    /// Layer names in creation order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn layer_len(&self, layer: &str) -> usize {
        self.layer(layer).map_or(0, Layer::len)
    }

    /// Total number of entries across all layers.
    pub fn len(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every layer. Registered sheets are kept.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Drop one layer and its entries. Returns how many entries it held.
    pub fn clear_layer(&mut self, layer: &str) -> usize {
        match self.layers.iter().position(|l| l.name == layer) {
            Some(idx) => self.layers.remove(idx).len(),
            None => 0,
        }
    }

    /// Inclusive bounding box of occupied cells on one layer or all layers.
    pub fn bounds(&self, layer: Option<&str>) -> Option<(Coord, Coord)> {
        let mut result: Option<(Coord, Coord)> = None;
        self.for_each(
            |c, _| {
                result = Some(match result {
                    None => (c, c),
                    Some((min, max)) => (
                        Coord::new(min.x.min(c.x), min.y.min(c.y)),
                        Coord::new(max.x.max(c.x), max.y.max(c.y)),
                    ),
                });
            },
            layer,
        );
        result
    }

    /// Sheet ids referenced by entries but not registered.
    pub fn missing_sheets(&self) -> BTreeSet<String> {
        self.iter()
            .filter(|(_, _, e)| !self.sheets.contains(&e.tilesheet_id))
            .map(|(_, _, e)| e.tilesheet_id.clone())
            .collect()
    }

    fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    fn layer_mut(&mut self, name: &str) -> &mut Layer {
        let idx = match self.layers.iter().position(|l| l.name == name) {
            Some(idx) => idx,
            None => {
                self.layers.push(Layer::new(name));
                self.layers.len() - 1
            }
        };
        &mut self.layers[idx]
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize layers and sheet ids. Sheet objects are not included.
    pub fn to_json(&self) -> Value {
        let mut layers = serde_json::Map::new();
        for layer in &self.layers {
            let cells: Vec<Value> =
                layer.iter().map(|(c, e)| json!([c.key(), e])).collect();
            layers.insert(layer.name.clone(), Value::Array(cells));
        }
        let ids: Vec<&String> = self.sheets.names().collect();
        json!({ "layers": layers, "tileSheetIds": ids })
    }

    /// Replace all layers with the contents of `value`, leniently.
    ///
    /// A missing `layers` key loads an empty map. Cells that cannot be read
    /// are skipped and reported.
    pub fn from_json(&mut self, value: &Value) -> LoadReport {
        self.load_json(value, false).unwrap_or_default()
    }

    /// Replace all layers with the contents of `value`.
    ///
    /// In strict mode the first problem is returned as an error and the map is
    /// left untouched.
    pub fn load_json(&mut self, value: &Value, strict: bool) -> Result<LoadReport, MapError> {
        let mut report = LoadReport::default();
        let mut fresh = TileMap::new();

        let warn = |report: &mut LoadReport, message: String| -> Result<(), MapError> {
            if strict {
                return Err(MapError::Malformed(message));
            }
            log::warn!("{}", message);
            report.warnings.push(LoadWarning { message });
            Ok(())
        };

        if let Some(ids) = value.get("tileSheetIds").and_then(Value::as_array) {
            report.sheet_ids = ids.iter().filter_map(Value::as_str).map(String::from).collect();
        }

        match value.get("layers") {
            None | Some(Value::Null) => {}
            Some(Value::Object(layers)) => {
                for (name, cells) in layers {
                    let Some(cells) = cells.as_array() else {
                        warn(&mut report, format!("layer '{}' is not an array", name))?;
                        continue;
                    };
                    fresh.layer_mut(name);
                    for (idx, cell) in cells.iter().enumerate() {
                        match read_cell(cell) {
                            Ok((coord, mut entry, notes)) => {
                                for note in notes {
                                    warn(&mut report, format!("layer '{}' cell {}: {}", name, idx, note))?;
                                }
                                if entry.layer != *name {
                                    log::debug!("cell {} tagged '{}' stored on '{}'", coord, entry.layer, name);
                                    entry.layer = name.clone();
                                }
                                fresh.layer_mut(name).insert(coord, entry);
                                report.entries += 1;
                            }
                            Err(msg) => {
                                warn(&mut report, format!("layer '{}' cell {}: {}", name, idx, msg))?;
                            }
                        }
                    }
                }
            }
            Some(_) => {
                warn(&mut report, "'layers' is not an object".to_string())?;
            }
        }

        self.layers = fresh.layers;
        Ok(report)
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self, pretty: bool) -> String {
        let value = self.to_json();
        if pretty {
            serde_json::to_string_pretty(&value).unwrap_or_default()
        } else {
            value.to_string()
        }
    }

    /// Parse a JSON string and load it leniently.
    pub fn from_json_str(&mut self, s: &str) -> Result<LoadReport, MapError> {
        let value: Value = serde_json::from_str(s).map_err(|e| MapError::Json(e.to_string()))?;
        Ok(self.from_json(&value))
    }
}

/// Read one `["x|y", entry]` pair. Only an unusable pair or key is an error;
/// entry problems come back as notes.
fn read_cell(cell: &Value) -> Result<(Coord, TileEntry, Vec<String>), String> {
    let pair = cell.as_array().ok_or("expected [\"x|y\", entry] pair")?;
    if pair.len() != 2 {
        return Err(format!("expected 2 elements, found {}", pair.len()));
    }
    let key = pair[0].as_str().ok_or("cell key is not a string")?;
    let coord = key.parse::<Coord>().map_err(|e| e.to_string())?;
    let (entry, notes) = read_entry(&pair[1])?;
    Ok((coord, entry, notes))
}
