// src/fetch/mod.rs
pub mod urls;
pub mod zips;

use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::layout;
use crate::report::StageReport;

/// Download every covered (year, module) archive into the scratch directory.
///
/// Pairs whose archive is already present with the expected byte size are
/// skipped without touching the network. A failed download removes any
/// partial file and records the URL; the batch always continues.
pub fn fetch_all(client: &Client, catalog: &Catalog, root: &Path) -> StageReport {
    let mut report = StageReport::start("fetch");

    for (year, module) in catalog.pairs() {
        if !catalog.is_available(module, year) {
            continue;
        }

        let dest = layout::archive_path(root, module, year);
        let expected = catalog.expected_archive_size(module, year);
        if !zips::needs_download(&dest, expected) {
            info!(year, module, "archive already present");
            report.record_ok();
            continue;
        }

        if dest.exists() {
            info!(year, module, "replacing stale archive");
            if let Err(err) = fs::remove_file(&dest) {
                report.record_failure(layout::archive_name(module, year), format!("{err:#}"));
                continue;
            }
        }

        let Some(survey_code) = catalog.survey_code(year) else {
            report.record_failure(
                layout::archive_name(module, year),
                "no survey code in catalog",
            );
            continue;
        };
        let url = match urls::archive_url(survey_code, module, year) {
            Ok(url) => url,
            Err(err) => {
                report.record_failure(layout::archive_name(module, year), format!("{err:#}"));
                continue;
            }
        };

        info!(year, module, url = %url, "downloading");
        match zips::download_archive(client, &url, &dest) {
            Ok(()) => report.record_ok(),
            Err(err) => {
                // Never leave a partial body behind to be mistaken for a
                // complete archive on the next run.
                if dest.exists() {
                    let _ = fs::remove_file(&dest);
                }
                warn!(year, module, url = %url, "download failed");
                report.record_failure(url.to_string(), format!("{err:#}"));
            }
        }
    }

    report.finish()
}
