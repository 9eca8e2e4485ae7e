// src/flatten/mod.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::Catalog;
use crate::layout;
use crate::report::StageReport;

/// Remove the redundant wrapper directory some archives introduce: when a
/// year directory holds exactly one immediate subdirectory, its files move
/// up one level and the emptied wrapper is deleted. Zero or several
/// subdirectories leave the tree untouched, and nothing ever recurses
/// deeper than that single level.
pub fn flatten_all(catalog: &Catalog, root: &Path) -> StageReport {
    let mut report = StageReport::start("flatten");

    for (year, module) in catalog.pairs() {
        if !catalog.is_available(module, year) {
            continue;
        }

        let unit = format!("module {module} {year}");
        match flatten_dir(&layout::year_dir(root, module, year)) {
            Ok(move_failures) => {
                report.record_ok();
                for (path, reason) in move_failures {
                    report.record_failure(format!("{unit}/{}", path.display()), reason);
                }
            }
            Err(err) => report.record_failure(unit, format!("{err:#}")),
        }
    }

    report.finish()
}

/// Flatten one directory. Returns per-file move failures; the overall
/// operation only errors when the directory itself cannot be listed.
pub fn flatten_dir(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.path().is_dir() {
            subdirs.push(entry.path());
        }
    }

    // Only the "exactly one wrapper" shape is flattened.
    if subdirs.len() != 1 {
        return Ok(Vec::new());
    }
    let wrapper = subdirs.remove(0);
    info!(wrapper = %wrapper.display(), "flattening redundant directory");

    let mut failures = Vec::new();
    for entry in
        fs::read_dir(&wrapper).with_context(|| format!("listing {}", wrapper.display()))?
    {
        let entry = entry.with_context(|| format!("listing {}", wrapper.display()))?;
        let source = entry.path();
        if !source.is_file() {
            continue;
        }
        let target = match source.file_name() {
            Some(name) => dir.join(name),
            None => continue,
        };
        if target.exists() {
            failures.push((source, "name collision in parent directory".to_string()));
            continue;
        }
        if let Err(err) = fs::rename(&source, &target) {
            failures.push((source, format!("{err:#}")));
        }
    }

    // Non-recursive on purpose: a wrapper that still holds anything (failed
    // moves, deeper directories) stays on disk and is reported instead.
    if let Err(err) = fs::remove_dir(&wrapper) {
        failures.push((wrapper, format!("removing wrapper: {err:#}")));
    }

    Ok(failures)
}
