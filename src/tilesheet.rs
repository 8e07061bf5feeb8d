//! Tile sheets: named tiles located on a fixed-size grid within a source image.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Grid location of a tile within its sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileLoc {
    pub row: u32,
    pub col: u32,
}

/// How a tile entry refers to its tile: by registered name or by grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileKey {
    /// A name previously added with [`TileSheet::add_tile`]
    Named(String),
    /// A direct grid address; resolves without registration
    Grid { row: u32, col: u32 },
    /// Any other key shape, carried verbatim. Never resolves.
    Other(Value),
}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TileKey::Named(name) => name.hash(state),
            TileKey::Grid { row, col } => (row, col).hash(state),
            // Equal values may differ in key order, so only the variant hashes
            TileKey::Other(_) => {}
        }
    }
}

impl TileKey {
    pub fn named(name: impl Into<String>) -> Self {
        TileKey::Named(name.into())
    }

    pub fn grid(row: u32, col: u32) -> Self {
        TileKey::Grid { row, col }
    }
}

impl From<&str> for TileKey {
    fn from(s: &str) -> Self {
        TileKey::Named(s.to_string())
    }
}

impl From<String> for TileKey {
    fn from(s: String) -> Self {
        TileKey::Named(s)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKey::Named(name) => write!(f, "{}", name),
            TileKey::Grid { row, col } => write!(f, "{}/{}", row, col),
            TileKey::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Opaque reference to the image a sheet slices.
///
/// Decoding the image is the render layer's concern; the core only carries
/// the reference through interchange payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Path or file name inside a packaged archive
    File(String),
    /// Inline encoded image (e.g. a data URL)
    Data(String),
    /// No image attached yet
    None,
}

/// Pixel rectangle of a tile inside the sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A sheet of square tiles sharing one edge length.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSheet {
    image: ImageSource,
    slice_px: u32,
    tiles: BTreeMap<String, TileLoc>,
}

impl TileSheet {
    /// Create an empty sheet over `image` with `slice_px` pixel tiles.
    pub fn new(image: ImageSource, slice_px: u32) -> Self {
        Self { image, slice_px, tiles: BTreeMap::new() }
    }

    pub fn image(&self) -> &ImageSource {
        &self.image
    }

    pub fn slice_px(&self) -> u32 {
        self.slice_px
    }

    /// Register or overwrite a named tile. Locations are not checked against
    /// the image; out-of-range tiles simply render nothing.
    pub fn add_tile(&mut self, name: impl Into<String>, row: u32, col: u32) {
        self.tiles.insert(name.into(), TileLoc { row, col });
    }

    /// Look up a named tile.
    pub fn get_tile(&self, name: &str) -> Option<TileLoc> {
        self.tiles.get(name).copied()
    }

    /// Remove a named tile. Returns the old location if it existed.
    pub fn remove_tile(&mut self, name: &str) -> Option<TileLoc> {
        self.tiles.remove(name)
    }

    /// Resolve any tile key to a grid location.
    pub fn resolve(&self, key: &TileKey) -> Option<TileLoc> {
        match key {
            TileKey::Named(name) => self.get_tile(name),
            TileKey::Grid { row, col } => Some(TileLoc { row: *row, col: *col }),
            TileKey::Other(_) => None,
        }
    }

    /// Pixel rectangle for a tile key, if it resolves and its pixel offset
    /// fits in `u32`.
    pub fn source_rect(&self, key: &TileKey) -> Option<SourceRect> {
        let loc = self.resolve(key)?;
        Some(SourceRect {
            x: loc.col.checked_mul(self.slice_px)?,
            y: loc.row.checked_mul(self.slice_px)?,
            w: self.slice_px,
            h: self.slice_px,
        })
    }

    /// Iterate named tiles in name order.
    pub fn tiles(&self) -> impl Iterator<Item = (&str, TileLoc)> {
        self.tiles.iter().map(|(name, loc)| (name.as_str(), *loc))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Build a sheet from its interchange form.
    pub fn from_payload(payload: &SheetPayload) -> Self {
        let image = match (&payload.image_file, &payload.image_data) {
            (Some(file), _) => ImageSource::File(file.clone()),
            (None, Some(data)) => ImageSource::Data(data.clone()),
            (None, None) => ImageSource::None,
        };
        Self { image, slice_px: payload.slice_px, tiles: payload.tiles.clone() }
    }

    /// Interchange form of this sheet under `id`.
    pub fn to_payload(&self, id: &str) -> SheetPayload {
        let (image_file, image_data) = match &self.image {
            ImageSource::File(f) => (Some(f.clone()), None),
            ImageSource::Data(d) => (None, Some(d.clone())),
            ImageSource::None => (None, None),
        };
        SheetPayload {
            id: id.to_string(),
            slice_px: self.slice_px,
            tiles: self.tiles.clone(),
            image_file,
            image_data,
        }
    }
}

/// One sheet in the tilesheet interchange file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPayload {
    pub id: String,
    pub slice_px: u32,
    #[serde(default)]
    pub tiles: BTreeMap<String, TileLoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// Tilesheet interchange payload: `{ "sheets": [...] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetsFile {
    #[serde(default)]
    pub sheets: Vec<SheetPayload>,
}
