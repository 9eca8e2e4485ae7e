// src/catalog/mod.rs
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

/// Survey years strictly before this one are published as dBASE archives;
/// everything from this year on ships Stata files directly.
pub const LEGACY_FORMAT_CUTOFF: u16 = 2004;

/// Module 85 (governance, democracy and transparency) was only added to the
/// questionnaire in 2003; earlier pairs are skipped by every stage.
pub const GOVERNANCE_MODULE: &str = "85";
pub const GOVERNANCE_FIRST_YEAR: u16 = 2003;

/// Module 05 (employment and income) arrives as two dBASE files for these
/// years; both halves are converted and also merged on `MERGE_KEYS`.
pub const EMPLOYMENT_MODULE: &str = "05";
pub const SPLIT_FILE_YEARS: RangeInclusive<u16> = 2001..=2003;

/// Household cluster, dwelling, household and person identifiers, the key
/// tuple shared by both halves of a split module-05 release.
pub const MERGE_KEYS: [&str; 4] = ["conglome", "vivienda", "hogar", "codperso"];

static EMBEDDED_CATALOG: &str = include_str!("../../config/catalog.json");

static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    Catalog::parse(EMBEDDED_CATALOG).expect("embedded config/catalog.json should be valid")
});

/// Static description of every ENAHO release this pipeline covers: the
/// per-year survey codes INEI assigns, the module codes, and the byte size
/// each archive is expected to have once fully downloaded.
///
/// The covered year range is derived from the survey table itself, so the
/// catalog file is the single source of truth for what a full run touches.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    surveys: BTreeMap<u16, String>,
    modules: Vec<String>,
    archive_sizes: HashMap<String, u64>,
}

impl Catalog {
    /// The catalog compiled into the binary from `config/catalog.json`.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Load a catalog from an on-disk JSON file.
    pub fn load(path: &Path) -> Result<Catalog> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading catalog file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing catalog file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Catalog> {
        let catalog: Catalog = serde_json::from_str(text)?;
        if catalog.surveys.is_empty() {
            bail!("catalog lists no survey years");
        }
        if catalog.modules.is_empty() {
            bail!("catalog lists no modules");
        }
        Ok(catalog)
    }

    /// Inclusive range of survey years covered by the catalog.
    pub fn years(&self) -> RangeInclusive<u16> {
        // `parse` rejects an empty survey table, so both bounds exist.
        let first = self.surveys.keys().next().copied().unwrap_or_default();
        let last = self.surveys.keys().next_back().copied().unwrap_or_default();
        first..=last
    }

    /// Survey code INEI assigned to one year's release.
    pub fn survey_code(&self, year: u16) -> Option<&str> {
        self.surveys.get(&year).map(String::as_str)
    }

    /// The fixed set of thematic module codes.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Expected byte size of the `module <code> <year>.zip` archive, used to
    /// decide whether an existing download can be trusted.
    pub fn expected_archive_size(&self, module: &str, year: u16) -> Option<u64> {
        self.archive_sizes
            .get(&crate::layout::archive_name(module, year))
            .copied()
    }

    /// Whether INEI published this (module, year) pair at all.
    pub fn is_available(&self, module: &str, year: u16) -> bool {
        module != GOVERNANCE_MODULE || year >= GOVERNANCE_FIRST_YEAR
    }

    /// Whether this pair falls under the split-file exception.
    pub fn is_split_pair(&self, module: &str, year: u16) -> bool {
        module == EMPLOYMENT_MODULE && SPLIT_FILE_YEARS.contains(&year)
    }

    /// Every (year, module) pair in the covered range, year-major, the order
    /// all stages walk the dataset in. Unavailable pairs are included; each
    /// stage applies `is_available` itself.
    pub fn pairs(&self) -> impl Iterator<Item = (u16, &str)> + '_ {
        self.years()
            .flat_map(move |year| self.modules.iter().map(move |m| (year, m.as_str())))
    }
}
