// src/convert/mod.rs
pub mod table;

use anyhow::{bail, Context, Result};
use glob::glob;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::catalog::{Catalog, MERGE_KEYS};
use crate::dbf;
use crate::dta;
use crate::layout;
use crate::report::StageReport;

/// Convert every legacy dBASE file in the extracted tree to Stata.
///
/// Years published in the modern format contain no `.dbf` files and pass
/// through untouched. A file that fails to parse or write is recorded for
/// manual conversion and its siblings still get processed. The module-05
/// split years additionally produce the key-merged `<year>.dta`.
pub fn convert_all(catalog: &Catalog, root: &Path) -> StageReport {
    let mut report = StageReport::start("convert");

    for (year, module) in catalog.pairs() {
        if !catalog.is_available(module, year) {
            continue;
        }

        let dir = layout::year_dir(root, module, year);
        let unit = format!("module {module} {year}");

        if catalog.is_split_pair(module, year) {
            match convert_split(&dir, year) {
                Ok(()) => report.record_ok(),
                Err(err) => {
                    // Untrusted partial outputs are removed; the legacy
                    // sources stay for manual conversion.
                    for name in [
                        format!("{year}-1.dta"),
                        format!("{year}-2.dta"),
                        layout::canonical_output(year),
                    ] {
                        let _ = fs::remove_file(dir.join(name));
                    }
                    report.record_failure(
                        unit.clone(),
                        format!("{err:#}; both files must be converted manually"),
                    );
                }
            }
            continue;
        }

        let files = match legacy_files(&dir) {
            Ok(files) => files,
            Err(err) => {
                report.record_failure(unit, format!("{err:#}"));
                continue;
            }
        };
        for file in files {
            match convert_file(&file) {
                Ok(()) => report.record_ok(),
                Err(err) => report.record_failure(
                    format!("{unit}/{}", file.display()),
                    format!("{err:#}; must be converted manually"),
                ),
            }
        }
    }

    report.finish()
}

/// The case-insensitive union of `.dbf` files directly inside `dir`,
/// deduplicated and sorted by name so every run walks them in the same
/// order.
pub fn legacy_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut set = BTreeSet::new();
    for pattern in ["*.dbf", "*.DBF"] {
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

/// General case: one legacy file becomes one Stata file with the same stem,
/// and the source is deleted only after the output is fully written.
pub fn convert_file(source: &Path) -> Result<()> {
    info!(file = %source.display(), "converting");
    let mut parsed = dbf::read_dbf(source)?;
    parsed.normalize_columns();

    let dest = source.with_extension("dta");
    dta::write_dta(&dest, &parsed)?;
    fs::remove_file(source)
        .with_context(|| format!("removing converted source {}", source.display()))?;
    Ok(())
}

/// Split-file exception: exactly two legacy files, converted individually
/// as `<year>-1` / `<year>-2` (sorted name order decides which is which)
/// and merged on the household/person key into `<year>.dta`. All-or-
/// nothing: any failure leaves both sources in place.
pub fn convert_split(dir: &Path, year: u16) -> Result<()> {
    let files = legacy_files(dir)?;
    if files.len() != 2 {
        bail!("expected exactly two legacy files, found {}", files.len());
    }
    info!(
        first = %files[0].display(),
        second = %files[1].display(),
        "converting split pair"
    );

    let mut first = dbf::read_dbf(&files[0])?;
    let mut second = dbf::read_dbf(&files[1])?;
    first.normalize_columns();
    second.normalize_columns();

    let merged = first.inner_join(&second, &MERGE_KEYS)?;

    dta::write_dta(&dir.join(format!("{year}-1.dta")), &first)?;
    dta::write_dta(&dir.join(format!("{year}-2.dta")), &second)?;
    dta::write_dta(&dir.join(layout::canonical_output(year)), &merged)?;

    for file in &files {
        fs::remove_file(file)
            .with_context(|| format!("removing converted source {}", file.display()))?;
    }
    Ok(())
}
