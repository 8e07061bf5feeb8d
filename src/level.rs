//! Level files: the exported scene payload wrapping the map JSON.
//!
//! ```json
//! { "map": { "layers": {...}, "tileSheetIds": [...] },
//!   "levelOffset": {"x": 0, "y": 0}, "tileSize": 16,
//!   "drawType": {"tilesheetId": "house", "tileKey": "wall"},
//!   "drawRot": 0, "drawInvert": 1, "zoom": 1 }
//! ```
//!
//! Files are read as JSON, falling back to JSON5 (comments, trailing commas)
//! when strict JSON fails. They are always written as plain JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::default_tile_size;
use crate::tilemap::{Invert, MapError};
use crate::tilesheet::{SheetsFile, TileKey};

/// Errors from reading or writing level and sheet files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LevelError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level: {0}")]
    Parse(String),
    #[error("failed to serialize level: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Camera offset in world pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelOffset {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// The tile the brush paints with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRef {
    pub tilesheet_id: String,
    pub tile_key: TileKey,
}

/// A saved level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// Map JSON as produced by `TileMap::to_json`
    #[serde(default = "empty_map")]
    pub map: Value,
    #[serde(default)]
    pub level_offset: LevelOffset,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_type: Option<TileRef>,
    #[serde(default)]
    pub draw_rot: i32,
    #[serde(default)]
    pub draw_invert: Invert,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn empty_map() -> Value {
    serde_json::json!({ "layers": {}, "tileSheetIds": [] })
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for Level {
    fn default() -> Self {
        Self {
            map: empty_map(),
            level_offset: LevelOffset::default(),
            tile_size: default_tile_size(),
            draw_type: None,
            draw_rot: 0,
            draw_invert: Invert::default(),
            zoom: default_zoom(),
        }
    }
}

impl Level {
    /// Parse level text. Strict JSON first, JSON5 as a fallback.
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        match serde_json::from_str(text) {
            Ok(level) => Ok(level),
            Err(json_err) => json5::from_str(text).map_err(|json5_err| {
                log::debug!("strict JSON parse failed: {}", json_err);
                LevelError::Parse(json5_err.to_string())
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        Self::parse(&read(path)?)
    }

    pub fn to_string_pretty(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LevelError> {
        let mut text = self.to_string_pretty()?;
        text.push('\n');
        fs::write(path, text).map_err(|source| LevelError::Io { path: path.display().to_string(), source })
    }
}

/// Load a `{ "sheets": [...] }` file.
pub fn load_sheets(path: &Path) -> Result<SheetsFile, LevelError> {
    let text = read(path)?;
    serde_json::from_str(&text)
        .or_else(|_| json5::from_str(&text))
        .map_err(|e: json5::Error| LevelError::Parse(e.to_string()))
}

fn read(path: &Path) -> Result<String, LevelError> {
    fs::read_to_string(path).map_err(|source| LevelError::Io { path: path.display().to_string(), source })
}
