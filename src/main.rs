use anyhow::Result;
use enahoscraper::{
    catalog::Catalog, cleanup, convert, extract, fetch, flatten, layout, rename,
};
use reqwest::blocking::Client;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configure dirs ───────────────────────────────────────────
    let root = PathBuf::from("workspace");
    let catalog = Catalog::builtin();
    fs::create_dir_all(layout::downloads_dir(&root))?;
    fs::create_dir_all(layout::raw_data_root(&root))?;

    // ─── 3) run the stages, strictly in order ────────────────────────
    let client = Client::builder().build()?;
    fetch::fetch_all(&client, catalog, &root).log_summary();
    pause()?;

    extract::extract_all(catalog, &root).log_summary();
    pause()?;

    flatten::flatten_all(catalog, &root).log_summary();
    pause()?;

    convert::convert_all(catalog, &root).log_summary();
    pause()?;

    rename::rename_all(catalog, &root).log_summary();
    pause()?;

    // ─── 4) cleanup gate ─────────────────────────────────────────────
    cleanup::remove_downloads(&layout::downloads_dir(&root), |question| {
        print!("{question}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })?;

    info!("all done");
    Ok(())
}

/// Blocking acknowledgment between stages, so the operator can inspect each
/// summary before the next stage mutates the tree.
fn pause() -> Result<()> {
    print!("Press enter to continue...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
