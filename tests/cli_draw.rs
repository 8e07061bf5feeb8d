//! CLI integration tests for the `pixtile` commands.
//!
//! Runs the built binary against temporary level files: drawing and erasing
//! shapes, dry runs, output redirection, validation and info reports.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run pixtile inside `dir` and return (stdout, stderr, exit code).
///
/// The config search is pinned to `dir` so a developer's own pixtile.toml
/// never leaks into the tests.
fn run(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pixtile"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute pixtile");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A level with one wall tile at 0|0 on the base layer.
fn create_level(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "level.json",
        r#"{
  "map": {
    "layers": {"base": [["0|0", {"tilesheetId": "house", "tileKey": "wall", "layer": "base"}]]},
    "tileSheetIds": ["house"]
  },
  "tileSize": 16,
  "zoom": 2
}"#,
    )
}

fn read_level(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn cell_keys(level: &Value, layer: &str) -> Vec<String> {
    level["map"]["layers"][layer]
        .as_array()
        .map(|cells| cells.iter().map(|c| c[0].as_str().unwrap().to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// draw
// ============================================================================

#[test]
fn test_draw_line_in_place() {
    let dir = TempDir::new().unwrap();
    let level = create_level(&dir);

    let (stdout, stderr, code) = run(
        dir.path(),
        &["draw", "level.json", "--tool", "line", "--from", "1,0", "--to", "3,0", "--sheet", "house", "--tile", "floor"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Drew 3 cell(s)"), "stdout: {}", stdout);

    let saved = read_level(&level);
    assert_eq!(cell_keys(&saved, "base"), vec!["0|0", "1|0", "2|0", "3|0"]);
    assert_eq!(saved["map"]["layers"]["base"][3][1]["tileKey"], "floor");
    assert_eq!(saved["zoom"], 2.0);
}

#[test]
fn test_draw_filled_box_on_layer_with_grid_tile() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);

    let (_, stderr, code) = run(
        dir.path(),
        &[
            "draw", "level.json", "--tool", "box", "--from", "0,0", "--to", "-1,-1", "--fill", "--layer",
            "overlay", "--sheet", "house", "--tile", "2,3", "--rot", "5", "--invert", "-1", "--output",
            "out.json",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);

    let out = read_level(&dir.path().join("out.json"));
    assert_eq!(cell_keys(&out, "overlay").len(), 4);
    let entry = &out["map"]["layers"]["overlay"][0][1];
    assert_eq!(entry["tileKey"]["row"], 2);
    assert_eq!(entry["tileKey"]["col"], 3);
    assert_eq!(entry["rotation"], 1);
    assert_eq!(entry["invert"], -1);
    assert_eq!(entry["layer"], "overlay");

    // The input is untouched
    assert_eq!(cell_keys(&read_level(&dir.path().join("level.json")), "overlay").len(), 0);
}

#[test]
fn test_draw_dry_run_does_not_write() {
    let dir = TempDir::new().unwrap();
    let level = create_level(&dir);
    let before = std::fs::read_to_string(&level).unwrap();

    let (stdout, stderr, code) = run(
        dir.path(),
        &[
            "draw", "level.json", "--tool", "circle", "--from", "0,0", "--to", "1,0", "--fill", "--sheet",
            "house", "--tile", "grass", "--dry-run",
        ],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stderr.contains("dry run"));

    let printed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(cell_keys(&printed, "base").len(), 5);
    assert_eq!(std::fs::read_to_string(&level).unwrap(), before);
}

#[test]
fn test_draw_invalid_arguments() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);

    let (_, _, code) = run(
        dir.path(),
        &["draw", "level.json", "--tool", "spray", "--from", "0,0", "--to", "1,1", "--sheet", "s", "--tile", "t"],
    );
    assert_eq!(code, 2);

    let (_, _, code) = run(
        dir.path(),
        &["draw", "level.json", "--tool", "line", "--from", "0", "--to", "1,1", "--sheet", "s", "--tile", "t"],
    );
    assert_eq!(code, 2);

    let (_, stderr, code) = run(
        dir.path(),
        &[
            "draw", "level.json", "--tool", "line", "--from", "0,0", "--to", "1,1", "--sheet", "s", "--tile", "t",
            "--invert", "3",
        ],
    );
    assert_eq!(code, 2);
    assert!(stderr.contains("--invert"));
}

#[test]
fn test_draw_missing_level_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run(
        dir.path(),
        &["draw", "nope.json", "--tool", "line", "--from", "0,0", "--to", "1,1", "--sheet", "s", "--tile", "t"],
    );
    assert_eq!(code, 1);
    assert!(stderr.starts_with("Error:"));
}

// ============================================================================
// erase
// ============================================================================

#[test]
fn test_erase_box() {
    let dir = TempDir::new().unwrap();
    let level = create_level(&dir);
    run(
        dir.path(),
        &["draw", "level.json", "--tool", "line", "--from", "1,0", "--to", "4,0", "--sheet", "house", "--tile", "wall"],
    );

    let (stdout, stderr, code) =
        run(dir.path(), &["erase", "level.json", "--tool", "box", "--from", "0,0", "--to", "2,0"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Erased 3 cell(s)"), "stdout: {}", stdout);
    assert_eq!(cell_keys(&read_level(&level), "base"), vec!["3|0", "4|0"]);
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_default_layer() {
    let dir = TempDir::new().unwrap();
    let level = create_level(&dir);
    write(&dir, "pixtile.toml", "[map]\ndefault_layer = \"bg\"\n");

    let (_, stderr, code) = run(
        dir.path(),
        &["draw", "level.json", "--tool", "line", "--from", "5,5", "--to", "5,6", "--sheet", "house", "--tile", "dirt"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(cell_keys(&read_level(&level), "bg"), vec!["5|5", "5|6"]);
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);
    write(&dir, "pixtile.toml", "[undo]\nmax = 0\n");

    let (_, stderr, code) = run(dir.path(), &["info", "level.json"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("undo.max"), "stderr: {}", stderr);
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_directory() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);
    std::fs::create_dir(dir.path().join("world")).unwrap();
    write(&dir, "world/broken.json", r#"{"map": {"layers": {"base": [["x", {}]]}}}"#);
    write(&dir, "world/sheets.json", r#"{"sheets": [{"id": "house", "slicePx": 16, "tiles": {}}]}"#);

    let (stdout, stderr, code) = run(dir.path(), &["validate", "."]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Validated 2 file(s): 0 failed, 1 warning(s)"), "stdout: {}", stdout);
    assert!(stderr.contains("Warning:"));

    let (stdout, _, code) = run(dir.path(), &["validate", ".", "--strict"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("1 failed"));
}

#[test]
fn test_validate_json5_level() {
    let dir = TempDir::new().unwrap();
    write(&dir, "hand.json5", "{\n  // hand edited\n  map: {layers: {}},\n  zoom: 2,\n}\n");
    let (stdout, _, code) = run(dir.path(), &["validate", "hand.json5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("OK:"));
}

// ============================================================================
// info
// ============================================================================

#[test]
fn test_info_json_with_sheets() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);
    run(
        dir.path(),
        &["draw", "level.json", "--tool", "line", "--from", "0,1", "--to", "0,2", "--sheet", "cave", "--tile", "rock"],
    );
    write(
        &dir,
        "sheets.json",
        r#"{"sheets": [{"id": "house", "slicePx": 16, "tiles": {"wall": {"row": 0, "col": 1}}}]}"#,
    );

    let (stdout, stderr, code) = run(dir.path(), &["info", "level.json", "--sheets", "sheets.json", "--json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let info: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(info["tiles"], 3);
    assert_eq!(info["layers"][1]["name"], "base");
    assert_eq!(info["layers"][1]["tiles"], 3);
    assert_eq!(info["bounds"]["max"]["y"], 2);
    assert_eq!(info["missingSheets"][0], "cave");
    assert_eq!(info["unresolvedTiles"], 1);
}

#[test]
fn test_info_text() {
    let dir = TempDir::new().unwrap();
    create_level(&dir);
    let (stdout, _, code) = run(dir.path(), &["info", "level.json"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Tiles: 1"));
    assert!(stdout.contains("Bounds: (0, 0) .. (0, 0)"));
    assert!(stdout.contains("Sheet ids: house"));
}
