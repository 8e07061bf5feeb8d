//! Library-level integration tests.
//!
//! Exercises the public API end to end: editing through tools and the
//! clipboard with undo/redo, level persistence, and peer synchronization.

use pixtile::clipboard;
use pixtile::config::PixtileConfig;
use pixtile::coord::Coord;
use pixtile::level::{Level, TileRef};
use pixtile::scene::Scene;
use pixtile::sync;
use pixtile::tilemap::{Invert, TileMap};
use pixtile::tilesheet::TileKey;
use pixtile::tool::ToolMode;
use serde_json::json;
use tempfile::TempDir;

fn scene_with_tile(tile: &str) -> Scene {
    let mut scene = Scene::default();
    scene.brush.tile = Some(TileRef { tilesheet_id: "house".into(), tile_key: TileKey::named(tile) });
    scene
}

fn gesture(scene: &mut Scene, mode: ToolMode, from: Coord, to: Coord) -> usize {
    scene.selection.selected = Some(from);
    scene.begin_tool(mode).expect("tool should activate");
    scene.move_cursor(to);
    scene.commit_tool().expect("commit should succeed").cells
}

// ============================================================================
// Editing and history
// ============================================================================

#[test]
fn test_room_editing_session() {
    let mut scene = scene_with_tile("wall");

    // Walls, then a floor on another layer, then a doorway
    assert_eq!(gesture(&mut scene, ToolMode::Box, Coord::new(0, 0), Coord::new(4, 3)), 14);
    scene.brush.layer = "bg".into();
    scene.brush.tile = Some(TileRef { tilesheet_id: "house".into(), tile_key: TileKey::grid(0, 0) });
    scene.brush.filled = true;
    assert_eq!(gesture(&mut scene, ToolMode::Box, Coord::new(1, 1), Coord::new(3, 2)), 6);
    scene.brush.layer = "base".into();
    scene.brush.erase = true;
    gesture(&mut scene, ToolMode::Line, Coord::new(2, 3), Coord::new(2, 3));

    assert_eq!(scene.map().layer_len("base"), 13);
    assert_eq!(scene.map().layer_len("bg"), 6);
    assert_eq!(scene.document.history().undo_len(), 3);

    // Undo the doorway and the floor, redo the floor
    assert!(scene.undo());
    assert!(scene.map().get_tile(2, 3, "base").is_some());
    assert!(scene.undo());
    assert_eq!(scene.map().layer_len("bg"), 0);
    assert!(scene.redo());
    assert_eq!(scene.map().layer_len("bg"), 6);

    // A new edit drops the redo branch
    scene.brush.erase = false;
    gesture(&mut scene, ToolMode::Line, Coord::new(9, 9), Coord::new(9, 9));
    assert!(!scene.redo());
}

#[test]
fn test_clipboard_with_tool_history() {
    let mut scene = scene_with_tile("crate");
    gesture(&mut scene, ToolMode::Line, Coord::new(0, 0), Coord::new(2, 0));

    let clip = clipboard::copy(scene.map(), "base", 0, 0, 2, 0);
    clipboard::paste(&mut scene.document, &clip, 0, 5, "overlay");
    let cut = clipboard::cut(&mut scene.document, "base", 0, 0, 0, 0);

    assert_eq!(cut.len(), 1);
    assert_eq!(scene.map().layer_len("base"), 2);
    assert_eq!(scene.map().layer_len("overlay"), 3);

    scene.undo();
    scene.undo();
    assert_eq!(scene.map().layer_len("overlay"), 0);
    assert_eq!(scene.map().layer_len("base"), 3);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_level_save_load_preserves_order_and_state() {
    let temp = TempDir::new().expect("should create temp dir");
    let path = temp.path().join("level.json");

    let mut scene = scene_with_tile("wall");
    scene.document.set_tile(5, 5, "house", "b", 0, Invert::default(), "overlay");
    scene.document.set_tile(-1, 2, "house", "a", 3, Invert::Vector([-1, 1]), "base");
    scene.document.set_tile(0, 0, "cave", "c", 0, Invert::default(), "base");
    scene.camera.zoom = 0.5;
    scene.to_level().save(&path).expect("should save");

    let level = Level::load(&path).expect("should load");
    let (loaded, report) = Scene::from_level(&level, &PixtileConfig::default(), true).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.entries, 3);
    assert_eq!(loaded.map().layer_names(), vec!["overlay", "base"]);

    let base: Vec<Coord> = loaded.map().iter().filter(|(l, _, _)| *l == "base").map(|(_, c, _)| c).collect();
    assert_eq!(base, vec![Coord::new(-1, 2), Coord::new(0, 0)]);
    assert_eq!(loaded.map().get_tile(-1, 2, "base").unwrap().invert, Invert::Vector([-1, 1]));
    assert_eq!(loaded.camera.zoom, 0.5);
    assert_eq!(loaded.brush.tile, scene.brush.tile);
}

#[test]
fn test_map_json_shape() {
    let mut map = TileMap::new();
    map.set_tile(1, -2, "house", "wall", 0, Invert::default(), "base");
    let value = map.to_json();

    assert_eq!(value["layers"]["base"][0][0], json!("1|-2"));
    assert_eq!(value["layers"]["base"][0][1]["tilesheetId"], json!("house"));
    assert!(value["tileSheetIds"].as_array().unwrap().is_empty());
}

// ============================================================================
// Synchronization
// ============================================================================

#[test]
fn test_two_peers_converge() {
    let mut alice = scene_with_tile("wall");
    let mut bob = Scene::default();

    let base = alice.snapshot();
    gesture(&mut alice, ToolMode::Line, Coord::new(0, 0), Coord::new(3, 3));
    let diff = alice.local_diff(&base);

    // Round trip through the wire format
    let wire = serde_json::to_string(&diff).unwrap();
    let received: sync::FlatDiff = serde_json::from_str(&wire).unwrap();
    let summary = bob.apply_remote_diff(&received).unwrap();

    assert_eq!(summary.tiles_set, 4);
    assert_eq!(bob.snapshot()["tiles"], alice.snapshot()["tiles"]);
    assert!(!bob.document.history().can_undo());

    // Bob erases; Alice applies the change
    let before = bob.snapshot();
    bob.brush.erase = true;
    gesture(&mut bob, ToolMode::Box, Coord::new(0, 0), Coord::new(1, 1));
    alice.apply_remote_diff(&bob.local_diff(&before)).unwrap();

    assert_eq!(alice.map().len(), 2);
    assert_eq!(alice.snapshot()["tiles"], bob.snapshot()["tiles"]);
}
