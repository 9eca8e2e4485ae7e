// src/extract/mod.rs
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::info;
use zip::ZipArchive;

use crate::catalog::Catalog;
use crate::layout;
use crate::report::StageReport;

/// Unpack every downloaded archive into its per-module, per-year directory.
///
/// Each destination directory is recreated from scratch so re-runs start
/// clean. A missing or unreadable archive records one failure for the pair;
/// a bad entry records one failure for that entry. Neither stops the batch.
pub fn extract_all(catalog: &Catalog, root: &Path) -> StageReport {
    let mut report = StageReport::start("extract");

    for (year, module) in catalog.pairs() {
        if !catalog.is_available(module, year) {
            continue;
        }

        let unit = layout::archive_name(module, year);
        let archive = layout::archive_path(root, module, year);
        let dest = layout::year_dir(root, module, year);

        match extract_archive(&archive, &dest) {
            Ok(entry_failures) => {
                info!(year, module, "extracted");
                report.record_ok();
                for (entry, reason) in entry_failures {
                    report.record_failure(format!("{unit}/{entry}"), reason);
                }
            }
            Err(err) => report.record_failure(unit, format!("{err:#}")),
        }
    }

    report.finish()
}

/// Extract one archive into a freshly recreated `dest` directory.
///
/// Returns the per-entry failures as (entry name, reason) pairs; an error is
/// only returned when the archive itself cannot be opened or the destination
/// cannot be recreated.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(archive_path)
        .with_context(|| format!("opening archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading archive {}", archive_path.display()))?;

    if dest.exists() {
        fs::remove_dir_all(dest)
            .with_context(|| format!("clearing destination {}", dest.display()))?;
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("creating destination {}", dest.display()))?;

    let mut failures = Vec::new();
    for index in 0..archive.len() {
        if let Err(err) = extract_entry(&mut archive, index, dest) {
            failures.push((entry_name(&mut archive, index), format!("{err:#}")));
        }
    }
    Ok(failures)
}

fn extract_entry(archive: &mut ZipArchive<File>, index: usize, dest: &Path) -> Result<()> {
    let mut entry = archive
        .by_index(index)
        .with_context(|| format!("reading entry #{index}"))?;

    let Some(relative) = entry.enclosed_name() else {
        bail!("entry name escapes the destination directory");
    };
    let out_path = dest.join(relative);

    if entry.is_dir() {
        fs::create_dir_all(&out_path)
            .with_context(|| format!("creating {}", out_path.display()))?;
        return Ok(());
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut out_file =
        File::create(&out_path).with_context(|| format!("creating {}", out_path.display()))?;
    io::copy(&mut entry, &mut out_file)
        .with_context(|| format!("writing {}", out_path.display()))?;
    Ok(())
}

fn entry_name(archive: &mut ZipArchive<File>, index: usize) -> String {
    archive
        .by_index_raw(index)
        .map(|entry| entry.name().to_string())
        .unwrap_or_else(|_| format!("#{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{ExtendedFileOptions, FileOptions};
    use zip::CompressionMethod;

    fn write_test_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            let options = FileOptions::<ExtendedFileOptions>::default()
                .compression_method(CompressionMethod::Stored);
            zip.start_file(*name, options).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_every_entry() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("module 01 1997.zip");
        write_test_zip(
            &archive,
            &[("a.dbf", b"one".as_ref()), ("nested/b.dbf", b"two".as_ref())],
        );

        let dest = dir.path().join("1997");
        let failures = extract_archive(&archive, &dest).unwrap();

        assert!(failures.is_empty());
        assert_eq!(fs::read(dest.join("a.dbf")).unwrap(), b"one");
        assert_eq!(fs::read(dest.join("nested/b.dbf")).unwrap(), b"two");
    }

    #[test]
    fn destination_is_recreated_fresh() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("module 01 1998.zip");
        write_test_zip(&archive, &[("fresh.dbf", b"data".as_ref())]);

        let dest = dir.path().join("1998");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("leftover.dta"), b"stale").unwrap();

        let failures = extract_archive(&archive, &dest).unwrap();

        assert!(failures.is_empty());
        assert!(!dest.join("leftover.dta").exists());
        assert!(dest.join("fresh.dbf").exists());
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = extract_archive(&dir.path().join("absent.zip"), &dir.path().join("out"));
        assert!(result.is_err());
    }
}
