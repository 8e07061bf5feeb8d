//! Pixtile - Library for layered pixel-art tilemap editing
//!
//! This library provides functionality to:
//! - Store sparse tiles per named layer and resolve them against tilesheets
//! - Rasterize line, box and circle tool gestures with undo/redo
//! - Read and write level files (JSON, with a JSON5 fallback on read)
//! - Exchange flat state diffs with collaborating peers

pub mod cli;
pub mod clipboard;
pub mod color;
pub mod config;
pub mod coord;
pub mod document;
pub mod geometry;
pub mod level;
pub mod materialize;
pub mod registry;
pub mod scene;
pub mod sync;
pub mod tilemap;
pub mod tilesheet;
pub mod tool;
pub mod undo;

pub use coord::Coord;
pub use document::Document;
pub use scene::Scene;
pub use tilemap::{TileEntry, TileMap};
pub use tilesheet::{TileKey, TileSheet};
