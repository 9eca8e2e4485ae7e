// src/layout.rs
//
// The fixed on-disk vocabulary of a run: one scratch directory holding the
// downloaded archives, and the extracted tree underneath
// `<root>/Enaho/in/Raw Data/module <code>/<year>/`.

use std::path::{Path, PathBuf};

pub const DOWNLOADS_DIR: &str = "downloads";
pub const DATASET_DIR: &str = "Enaho";

/// Scratch directory the Fetcher writes archives into.
pub fn downloads_dir(root: &Path) -> PathBuf {
    root.join(DOWNLOADS_DIR)
}

/// Canonical archive file name for one (module, year) pair.
pub fn archive_name(module: &str, year: u16) -> String {
    format!("module {module} {year}.zip")
}

pub fn archive_path(root: &Path, module: &str, year: u16) -> PathBuf {
    downloads_dir(root).join(archive_name(module, year))
}

/// Root of the extracted raw-data tree.
pub fn raw_data_root(root: &Path) -> PathBuf {
    root.join(DATASET_DIR).join("in").join("Raw Data")
}

pub fn module_dir(root: &Path, module: &str) -> PathBuf {
    raw_data_root(root).join(format!("module {module}"))
}

/// Destination directory for one (module, year) pair's extracted files.
pub fn year_dir(root: &Path, module: &str, year: u16) -> PathBuf {
    module_dir(root, module).join(year.to_string())
}

/// The single file name each pair must end the pipeline with.
pub fn canonical_output(year: u16) -> String {
    format!("{year}.dta")
}
