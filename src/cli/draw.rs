//! Draw and erase command implementations

use std::path::Path;
use std::process::ExitCode;

use crate::level::TileRef;
use crate::scene::Scene;
use crate::tilemap::Invert;
use crate::tilesheet::TileKey;
use crate::tool::ToolMode;

use super::{open_level, resolve_config, ShapeArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// What the shape is filled with.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Tile { sheet: String, tile: TileKey, rot: i32, invert: i32 },
    Erase,
}

/// Run one tool gesture from `shape.from` to `shape.to` on the scene.
///
/// The brush settings saved with the level are left as they were. Returns the
/// number of cells changed.
fn apply_shape(scene: &mut Scene, shape: &ShapeArgs, paint: &Paint) -> Result<usize, String> {
    let saved = scene.brush.clone();
    match paint {
        Paint::Tile { sheet, tile, rot, invert } => {
            scene.brush.tile = Some(TileRef { tilesheet_id: sheet.clone(), tile_key: tile.clone() });
            scene.brush.rotation = *rot;
            scene.brush.invert = Invert::Flag(*invert);
            scene.brush.erase = false;
        }
        Paint::Erase => scene.brush.erase = true,
    }
    scene.brush.filled = shape.fill;

    let before = scene.map().layer_len(&scene.brush.layer);
    scene.selection.selected = Some(shape.from);
    let result = scene.begin_tool(shape.tool).and_then(|()| {
        scene.move_cursor(shape.to);
        scene.commit_tool()
    });
    scene.cancel_tool();
    let after = scene.map().layer_len(&scene.brush.layer);
    scene.brush = saved;

    let summary = result.map_err(|e| e.to_string())?;
    log::info!("{} cell(s) visited, recorded: {}", summary.cells, summary.recorded);

    Ok(match paint {
        Paint::Tile { .. } => summary.cells,
        Paint::Erase => before.saturating_sub(after),
    })
}

/// Execute the draw or erase command
pub fn run_draw(config_path: Option<&Path>, level: &Path, shape: &ShapeArgs, paint: Paint) -> ExitCode {
    if shape.tool == ToolMode::None {
        eprintln!("Error: --tool must be line, box or circle");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    if let Paint::Tile { invert, sheet, .. } = &paint {
        if *invert != 1 && *invert != -1 {
            eprintln!("Error: --invert must be 1 or -1");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        if sheet.is_empty() {
            eprintln!("Error: --sheet must not be empty");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    let config = match resolve_config(config_path, shape.layer.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let (mut scene, report) = match open_level(level, None, &config, false) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}: {}", level.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    for warning in &report.warnings {
        eprintln!("Warning: {}: {}", level.display(), warning.message);
    }

    let changed = match apply_shape(&mut scene, shape, &paint) {
        Ok(changed) => changed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let verb = match paint {
        Paint::Tile { .. } => "Drew",
        Paint::Erase => "Erased",
    };
    let layer = &scene.brush.layer;

    let result = scene.to_level();
    if shape.dry_run {
        match result.to_string_pretty() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        eprintln!("{} {} cell(s) with {} on layer '{}' (dry run)", verb, changed, shape.tool, layer);
        return ExitCode::from(EXIT_SUCCESS);
    }

    let out = shape.output.as_deref().unwrap_or(level);
    if let Err(e) = result.save(out) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("{} {} cell(s) with {} on layer '{}' -> {}", verb, changed, shape.tool, layer, out.display());
    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coord;

    fn shape(tool: ToolMode, from: (i32, i32), to: (i32, i32), fill: bool) -> ShapeArgs {
        ShapeArgs {
            tool,
            from: Coord::new(from.0, from.1),
            to: Coord::new(to.0, to.1),
            layer: None,
            fill,
            output: None,
            dry_run: false,
        }
    }

    fn wall() -> Paint {
        Paint::Tile { sheet: "house".into(), tile: TileKey::named("wall"), rot: 1, invert: -1 }
    }

    #[test]
    fn test_apply_filled_box() {
        let mut scene = Scene::default();
        let changed = apply_shape(&mut scene, &shape(ToolMode::Box, (0, 0), (2, 1), true), &wall()).unwrap();
        assert_eq!(changed, 6);

        let entry = scene.map().get_tile(2, 1, "base").unwrap();
        assert_eq!(entry.rotation, 1);
        assert_eq!(entry.invert, Invert::Flag(-1));
        assert!(scene.brush.tile.is_none());
        assert!(!scene.tool.is_active());
    }

    #[test]
    fn test_apply_erase_counts_removed() {
        let mut scene = Scene::default();
        apply_shape(&mut scene, &shape(ToolMode::Line, (0, 0), (4, 0), false), &wall()).unwrap();
        let removed = apply_shape(&mut scene, &shape(ToolMode::Line, (3, 0), (9, 0), false), &Paint::Erase).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(scene.map().layer_len("base"), 3);
    }

    #[test]
    fn test_apply_none_tool_fails() {
        let mut scene = Scene::default();
        assert!(apply_shape(&mut scene, &shape(ToolMode::None, (0, 0), (1, 1), false), &wall()).is_err());
        assert!(scene.map().is_empty());
    }
}
