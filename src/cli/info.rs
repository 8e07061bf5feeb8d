//! Info command implementation

use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;

use crate::coord::Coord;
use crate::scene::Scene;

use super::{open_level, resolve_config, EXIT_ERROR, EXIT_SUCCESS};

fn format_bounds(bounds: Option<(Coord, Coord)>) -> String {
    match bounds {
        Some((min, max)) => format!("({}, {}) .. ({}, {})", min.x, min.y, max.x, max.y),
        None => "empty".to_string(),
    }
}

fn referenced_sheets(scene: &Scene) -> BTreeSet<String> {
    scene.map().iter().map(|(_, _, e)| e.tilesheet_id.clone()).collect()
}

/// Execute the info command
pub fn run_info(config_path: Option<&Path>, level: &Path, sheets: Option<&Path>, json: bool) -> ExitCode {
    let config = match resolve_config(config_path, None) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let (mut scene, report) = match open_level(level, sheets, &config, false) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}: {}", level.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    for warning in &report.warnings {
        eprintln!("Warning: {}: {}", level.display(), warning.message);
    }

    // Resolve every referenced tile in budgeted batches
    let mut unresolved = None;
    if sheets.is_some() {
        scene.prefetch_frames();
        while !scene.tick_frames(config.queue.budget) {
            log::debug!("frames {:.0}% materialized", scene.frame_progress() * 100.0);
        }
        unresolved = Some(scene.unresolved_frames());
    }
    let missing: Vec<String> = if sheets.is_some() {
        scene.map().missing_sheets().into_iter().collect()
    } else {
        Vec::new()
    };

    let layers: Vec<(String, usize)> = scene
        .layer_order()
        .into_iter()
        .map(|name| (name.to_string(), scene.map().layer_len(name)))
        .collect();
    let bounds = scene.map().bounds(None);
    let referenced = referenced_sheets(&scene);

    if json {
        let layer_values: Vec<_> = layers
            .iter()
            .map(|(name, count)| json!({ "name": name, "tiles": count }))
            .collect();
        let output = json!({
            "path": level.display().to_string(),
            "tileSize": scene.tile_size,
            "zoom": scene.camera.zoom,
            "tiles": scene.map().len(),
            "layers": layer_values,
            "bounds": bounds.map(|(min, max)| json!({ "min": min, "max": max })),
            "tileSheetIds": report.sheet_ids,
            "referencedSheets": referenced,
            "missingSheets": missing,
            "unresolvedTiles": unresolved,
            "warnings": report.warnings.len(),
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    println!("Level: {}", level.display());
    println!("Tile size: {}px", scene.tile_size);
    println!("Zoom: {}", scene.camera.zoom);
    println!("Tiles: {}", scene.map().len());
    println!("Layers:");
    for (name, count) in &layers {
        println!("  {:<12} {} tile(s)", name, count);
    }
    println!("Bounds: {}", format_bounds(bounds));
    if !report.sheet_ids.is_empty() {
        println!("Sheet ids: {}", report.sheet_ids.join(", "));
    }
    if !referenced.is_empty() {
        println!("Referenced sheets: {}", referenced.into_iter().collect::<Vec<_>>().join(", "));
    }
    if !missing.is_empty() {
        println!("Missing sheets: {}", missing.join(", "));
    }
    if let Some(unresolved) = unresolved {
        println!("Unresolved tiles: {}", unresolved);
    }

    ExitCode::from(EXIT_SUCCESS)
}
