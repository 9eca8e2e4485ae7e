// src/fetch/zips.rs
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use url::Url;

/// Whether the archive at `dest` still has to be fetched. A file that exists
/// with exactly the expected byte size is trusted; anything else (missing,
/// short, oversized, or of unknown expected size) gets re-downloaded.
pub fn needs_download(dest: &Path, expected_size: Option<u64>) -> bool {
    match (fs::metadata(dest), expected_size) {
        (Ok(meta), Some(size)) => meta.len() != size,
        _ => true,
    }
}

/// GET one archive URL and save the body to `dest`. The caller is expected
/// to have removed any stale file first, and removes the partial on error.
pub fn download_archive(client: &Client, url: &Url, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating download directory {}", parent.display()))?;
    }

    let resp = client
        .get(url.as_str())
        .send()
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("requesting {url}"))?;
    let bytes = resp
        .bytes()
        .with_context(|| format!("reading body of {url}"))?;
    fs::write(dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
    Ok(())
}
