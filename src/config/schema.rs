//! Configuration schema types for `pixtile.toml`
//!
//! Every section is optional; missing keys fall back to the editor defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tilemap::DEFAULT_LAYER;
use crate::undo::DEFAULT_MAX_UNDO;

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoConfig {
    /// Maximum number of batches kept
    #[serde(default = "default_undo_max")]
    pub max: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max: default_undo_max() }
    }
}

fn default_undo_max() -> usize {
    DEFAULT_MAX_UNDO
}

/// Map and layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Layer used when a command does not name one
    #[serde(default = "default_layer")]
    pub default_layer: String,
    /// Layer composite order, bottom first
    #[serde(default = "default_layers")]
    pub layers: Vec<String>,
    /// Tile edge in pixels for new levels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_layer: default_layer(),
            layers: default_layers(),
            tile_size: default_tile_size(),
        }
    }
}

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

fn default_layers() -> Vec<String> {
    vec!["bg".to_string(), DEFAULT_LAYER.to_string(), "overlay".to_string()]
}

pub(crate) fn default_tile_size() -> u32 {
    16
}

/// Background materialization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Items materialized per tick
    #[serde(default = "default_budget")]
    pub budget: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { budget: default_budget() }
    }
}

fn default_budget() -> usize {
    8
}

/// Complete pixtile.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixtileConfig {
    #[serde(default)]
    pub undo: UndoConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "map.tile_size")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pixtile.toml: '{}' {}", self.field, self.message)
    }
}

impl PixtileConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.undo.max == 0 {
            push("undo.max", "must be a positive integer");
        }
        if self.map.default_layer.trim().is_empty() {
            push("map.default_layer", "must be a non-empty string");
        }
        if self.map.tile_size == 0 {
            push("map.tile_size", "must be a positive integer");
        }
        if self.queue.budget == 0 {
            push("queue.budget", "must be a positive integer");
        }

        if self.map.layers.is_empty() {
            push("map.layers", "must name at least one layer");
        } else {
            let mut seen = HashSet::new();
            for name in &self.map.layers {
                if name.trim().is_empty() {
                    push("map.layers", "layer names must be non-empty");
                } else if !seen.insert(name.as_str()) {
                    push("map.layers", &format!("layer '{}' is listed twice", name));
                }
            }
            if !self.map.layers.contains(&self.map.default_layer) {
                push("map.default_layer", "must be one of map.layers");
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Layer order as string slices, bottom first.
    pub fn layer_order(&self) -> Vec<&str> {
        self.map.layers.iter().map(String::as_str).collect()
    }
}
