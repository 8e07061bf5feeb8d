//! Validate command implementation

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{find_level_files, open_level, resolve_config, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::PixtileConfig;

/// Problems found in one level file.
#[derive(Debug, Default)]
struct FileResult {
    warnings: Vec<String>,
    error: Option<String>,
}

fn validate_file(path: &Path, sheets: Option<&Path>, config: &PixtileConfig, strict: bool) -> FileResult {
    let mut result = FileResult::default();
    let (scene, report) = match open_level(path, sheets, config, strict) {
        Ok(loaded) => loaded,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };
    result.warnings.extend(report.warnings.into_iter().map(|w| w.message));

    if sheets.is_some() {
        for id in scene.map().missing_sheets() {
            result.warnings.push(format!("sheet '{}' is not defined in the sheets file", id));
        }
    } else if !report.sheet_ids.is_empty() {
        let declared: BTreeSet<&str> = report.sheet_ids.iter().map(String::as_str).collect();
        let undeclared: BTreeSet<&str> = scene
            .map()
            .iter()
            .map(|(_, _, e)| e.tilesheet_id.as_str())
            .filter(|id| !declared.contains(id))
            .collect();
        for id in undeclared {
            result.warnings.push(format!("sheet '{}' is used but not listed in tileSheetIds", id));
        }
    }
    result
}

/// Execute the validate command
pub fn run_validate(
    config_path: Option<&Path>,
    paths: &[PathBuf],
    strict: bool,
    sheets: Option<&Path>,
) -> ExitCode {
    let config = match resolve_config(config_path, None) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = find_level_files(path);
            if found.is_empty() {
                eprintln!("Warning: no level files found in {}", path.display());
            }
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        eprintln!("Error: No files to validate");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut failed = 0;
    let mut warning_count = 0;
    for file in &files {
        let result = validate_file(file, sheets, &config, strict);
        for warning in &result.warnings {
            eprintln!("Warning: {}: {}", file.display(), warning);
        }
        warning_count += result.warnings.len();
        if let Some(error) = &result.error {
            eprintln!("Error: {}: {}", file.display(), error);
            failed += 1;
        } else if strict && !result.warnings.is_empty() {
            failed += 1;
        } else {
            println!("OK: {}", file.display());
        }
    }

    println!();
    println!(
        "Validated {} file(s): {} failed, {} warning(s)",
        files.len(),
        failed,
        warning_count
    );

    if failed > 0 {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
