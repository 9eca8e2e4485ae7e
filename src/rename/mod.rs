// src/rename/mod.rs
use anyhow::{bail, Context, Result};
use glob::glob;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::{Catalog, GOVERNANCE_MODULE};
use crate::layout;
use crate::report::StageReport;

/// Give every (module, year) directory its canonical `<year>.dta`.
///
/// Three rules, in priority order:
/// - module 85 ships pre-split pairs; the file whose stem ends `<year>-1`
///   is the canonical pick,
/// - the module-05 split years already hold the converter's merged
///   `<year>.dta`, which must survive as-is,
/// - everywhere else the largest Stata file wins, ties going to the
///   lexicographically smallest name. Files that lose stay untouched.
pub fn rename_all(catalog: &Catalog, root: &Path) -> StageReport {
    let mut report = StageReport::start("rename");

    for (year, module) in catalog.pairs() {
        if !catalog.is_available(module, year) {
            continue;
        }

        let dir = layout::year_dir(root, module, year);
        let unit = format!("module {module} {year}");
        let outcome = if module == GOVERNANCE_MODULE {
            rename_year_suffixed(&dir, year)
        } else if catalog.is_split_pair(module, year) {
            keep_merged(&dir, year)
        } else {
            rename_largest(&dir, year)
        };

        match outcome {
            Ok(kept) => {
                info!(year, module, kept = %kept, "canonical file in place");
                report.record_ok();
            }
            Err(err) => report.record_failure(unit, format!("{err:#}")),
        }
    }

    report.finish()
}

/// Module-85 rule: the `<year>-1`-stemmed file becomes `<year>.dta`.
fn rename_year_suffixed(dir: &Path, year: u16) -> Result<String> {
    let canonical = dir.join(layout::canonical_output(year));
    let suffix = format!("{year}-1");
    let picked = modern_files(dir)?.into_iter().find(|path| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(&suffix))
            .unwrap_or(false)
    });

    match picked {
        Some(source) => {
            let name = file_name(&source);
            fs::rename(&source, &canonical)
                .with_context(|| format!("renaming {}", source.display()))?;
            Ok(name)
        }
        // Re-runs have already renamed the pair away.
        None if canonical.is_file() => Ok(layout::canonical_output(year)),
        None => bail!("no file with stem ending {suffix}"),
    }
}

/// Split-years rule: the merged file already carries the canonical name;
/// the split pieces must never displace it.
fn keep_merged(dir: &Path, year: u16) -> Result<String> {
    let canonical = dir.join(layout::canonical_output(year));
    if canonical.is_file() {
        Ok(layout::canonical_output(year))
    } else {
        bail!("merged {} missing, pair needs manual conversion", layout::canonical_output(year))
    }
}

/// General rule: largest file by byte size, ties broken by name.
fn rename_largest(dir: &Path, year: u16) -> Result<String> {
    let files = modern_files(dir)?;
    if files.is_empty() {
        bail!("no Stata files present");
    }

    let mut sized = Vec::with_capacity(files.len());
    for file in &files {
        let size = fs::metadata(file)
            .with_context(|| format!("sizing {}", file.display()))?
            .len();
        sized.push((file, size));
    }
    // Strictly-greater keeps the first (smallest-named) of a tie, since
    // `modern_files` comes back sorted.
    let mut best = sized[0];
    for candidate in &sized[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    let (source, _) = best;

    let name = file_name(source);
    let canonical = dir.join(layout::canonical_output(year));
    if *source != canonical {
        fs::rename(source, &canonical)
            .with_context(|| format!("renaming {}", source.display()))?;
    }
    Ok(name)
}

/// The case-insensitive union of `.dta` files directly inside `dir`,
/// deduplicated and sorted by name.
fn modern_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut set = BTreeSet::new();
    for pattern in ["*.dta", "*.DTA"] {
        let full = format!("{}/{}", dir.display(), pattern);
        for entry in glob(&full).with_context(|| format!("globbing {full}"))? {
            let path = entry.context("reading glob entry")?;
            if path.is_file() {
                set.insert(path);
            }
        }
    }
    Ok(set.into_iter().collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn largest_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("small.dta"), vec![0u8; 500]).unwrap();
        fs::write(dir.path().join("large.dta"), vec![0u8; 700]).unwrap();

        let kept = rename_largest(dir.path(), 2005).unwrap();

        assert_eq!(kept, "large.dta");
        assert_eq!(
            fs::metadata(dir.path().join("2005.dta")).unwrap().len(),
            700
        );
        // The loser is left untouched.
        assert!(dir.path().join("small.dta").is_file());
    }

    #[test]
    fn size_tie_breaks_on_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bbb.dta"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("aaa.dta"), vec![0u8; 100]).unwrap();

        let kept = rename_largest(dir.path(), 2005).unwrap();

        assert_eq!(kept, "aaa.dta");
        assert!(dir.path().join("bbb.dta").is_file());
    }

    #[test]
    fn uppercase_extension_is_included() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ENAHO.DTA"), vec![0u8; 900]).unwrap();
        fs::write(dir.path().join("other.dta"), vec![0u8; 100]).unwrap();

        let kept = rename_largest(dir.path(), 2007).unwrap();
        assert_eq!(kept, "ENAHO.DTA");
        assert!(dir.path().join("2007.dta").is_file());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(rename_largest(dir.path(), 2005).is_err());
    }

    #[test]
    fn governance_pair_keeps_the_dash_one_half() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("enaho01b-2003-1.dta"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("enaho01b-2003-2.dta"), vec![0u8; 900]).unwrap();

        let kept = rename_year_suffixed(dir.path(), 2003).unwrap();

        assert_eq!(kept, "enaho01b-2003-1.dta");
        assert_eq!(
            fs::metadata(dir.path().join("2003.dta")).unwrap().len(),
            100
        );
        assert!(dir.path().join("enaho01b-2003-2.dta").is_file());
    }

    #[test]
    fn governance_rerun_accepts_existing_canonical() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2003.dta"), vec![0u8; 100]).unwrap();

        let kept = rename_year_suffixed(dir.path(), 2003).unwrap();
        assert_eq!(kept, "2003.dta");
    }

    #[test]
    fn merged_split_output_survives() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2001-1.dta"), vec![0u8; 400]).unwrap();
        fs::write(dir.path().join("2001-2.dta"), vec![0u8; 900]).unwrap();
        fs::write(dir.path().join("2001.dta"), vec![0u8; 100]).unwrap();

        let kept = keep_merged(dir.path(), 2001).unwrap();

        assert_eq!(kept, "2001.dta");
        // The merge keeps the canonical name even though a split piece is
        // bigger; the pieces stay in place.
        assert_eq!(
            fs::metadata(dir.path().join("2001.dta")).unwrap().len(),
            100
        );
        assert!(dir.path().join("2001-2.dta").is_file());
    }

    #[test]
    fn missing_merge_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2001-1.dta"), vec![0u8; 400]).unwrap();
        assert!(keep_merged(dir.path(), 2001).is_err());
    }
}
