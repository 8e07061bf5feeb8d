//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod draw;
mod info;
mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, PixtileConfig};
use crate::coord::Coord;
use crate::level::{load_sheets, Level, LevelError};
use crate::scene::Scene;
use crate::tilemap::LoadReport;
use crate::tilesheet::TileKey;
use crate::tool::ToolMode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Find all level files in a directory (recursively).
///
/// Tilesheet files (a top-level `sheets` key) live next to levels but are
/// not levels, so they are left out.
pub fn find_level_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let dir_str = dir.display().to_string();

    for pattern in ["json", "json5"] {
        if let Ok(paths) = glob(&format!("{}/**/*.{}", dir_str, pattern)) {
            files.extend(paths.filter_map(Result::ok).filter(|p| !is_sheets_file(p)));
        }
    }

    files.sort();
    files
}

fn is_sheets_file(path: &Path) -> bool {
    let Ok(text) = std::fs::read_to_string(path) else {
        return false;
    };
    let value = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .or_else(|| json5::from_str::<serde_json::Value>(&text).ok());
    value.is_some_and(|v| v.get("sheets").is_some())
}

/// Parse an `x,y` cell argument.
pub(crate) fn parse_cell(s: &str) -> Result<Coord, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("invalid x in '{}': {}", s, e))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("invalid y in '{}': {}", s, e))?;
    Ok(Coord::new(x, y))
}

/// Parse a tile argument: `row,col` addresses the grid, anything else is a
/// tile name.
pub(crate) fn parse_tile_key(s: &str) -> Result<TileKey, String> {
    if s.trim().is_empty() {
        return Err("tile key must not be empty".to_string());
    }
    if let Some((row, col)) = s.split_once(',') {
        if let (Ok(row), Ok(col)) = (row.trim().parse::<u32>(), col.trim().parse::<u32>()) {
            return Ok(TileKey::grid(row, col));
        }
    }
    Ok(TileKey::named(s))
}

/// Pixtile - layered pixel-art tilemap levels
#[derive(Parser)]
#[command(name = "pixtile")]
#[command(about = "Pixtile - inspect, validate and draw into layered tilemap levels")]
#[command(version)]
pub struct Cli {
    /// Path to a pixtile.toml (default: discovered from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Shape and placement shared by `draw` and `erase`.
#[derive(clap::Args, Debug, Clone)]
pub struct ShapeArgs {
    /// Shape to rasterize (line, box, circle)
    #[arg(long)]
    pub tool: ToolMode,

    /// Anchor cell, e.g. --from 0,0 (circle center)
    #[arg(long, value_parser = parse_cell, allow_hyphen_values = true)]
    pub from: Coord,

    /// Cursor cell, e.g. --to 4,-2
    #[arg(long, value_parser = parse_cell, allow_hyphen_values = true)]
    pub to: Coord,

    /// Layer to write (default: map.default_layer from config)
    #[arg(long)]
    pub layer: Option<String>,

    /// Filled box or circle
    #[arg(long)]
    pub fill: bool,

    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the resulting level instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show layers, entry counts, bounds and sheet references of a level
    Info {
        /// Level file
        level: PathBuf,

        /// Tilesheet file ({"sheets": [...]}) used to resolve tiles
        #[arg(long)]
        sheets: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate level files or directories of level files
    Validate {
        /// Files or directories to validate
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Tilesheet file used to check sheet references
        #[arg(long)]
        sheets: Option<PathBuf>,
    },

    /// Draw a line, box or circle of tiles into a level
    Draw {
        /// Level file
        level: PathBuf,

        #[command(flatten)]
        shape: ShapeArgs,

        /// Tile sheet id
        #[arg(long)]
        sheet: String,

        /// Tile name, or row,col
        #[arg(long, value_parser = parse_tile_key)]
        tile: TileKey,

        /// Quarter turns clockwise
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rot: i32,

        /// Horizontal flip flag (1 or -1)
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        invert: i32,
    },

    /// Remove the tiles covered by a line, box or circle
    Erase {
        /// Level file
        level: PathBuf,

        #[command(flatten)]
        shape: ShapeArgs,
    },
}

/// Load configuration, applying a layer override when given.
pub(crate) fn resolve_config(path: Option<&Path>, layer: Option<&str>) -> Result<PixtileConfig, ExitCode> {
    let mut config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    let overrides = CliOverrides { layer: layer.map(String::from), ..Default::default() };
    merge_cli_overrides(&mut config, &overrides);
    Ok(config)
}

/// Load a level into a scene and register the optional sheets file.
pub(crate) fn open_level(
    path: &Path,
    sheets: Option<&Path>,
    config: &PixtileConfig,
    strict: bool,
) -> Result<(Scene, LoadReport), LevelError> {
    let level = Level::load(path)?;
    let (mut scene, report) = Scene::from_level(&level, config, strict)?;
    if let Some(sheets) = sheets {
        let added = scene.register_sheets(&load_sheets(sheets)?)?;
        log::debug!("registered {} sheet(s) from {}", added, sheets.display());
    }
    Ok((scene, report))
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Info { level, sheets, json } => {
            info::run_info(config_path, &level, sheets.as_deref(), json)
        }
        Commands::Validate { paths, strict, sheets } => {
            validate::run_validate(config_path, &paths, strict, sheets.as_deref())
        }
        Commands::Draw { level, shape, sheet, tile, rot, invert } => {
            let paint = draw::Paint::Tile { sheet, tile, rot, invert };
            draw::run_draw(config_path, &level, &shape, paint)
        }
        Commands::Erase { level, shape } => {
            draw::run_draw(config_path, &level, &shape, draw::Paint::Erase)
        }
    }
}
