// src/fetch/urls.rs
use anyhow::{Context, Result};
use url::Url;

use crate::catalog::LEGACY_FORMAT_CUTOFF;

/// INEI's download endpoint for the "ENAHO Metodología ACTUALIZADA" series.
pub const DOWNLOAD_BASE: &str = "http://iinei.inei.gob.pe/iinei/srienaho/descarga";

/// Path segment selecting the publication format for one survey year.
pub fn format_segment(year: u16) -> &'static str {
    if year < LEGACY_FORMAT_CUTOFF {
        "DBF"
    } else {
        "STATA"
    }
}

/// Build the archive URL for one (survey, module, year) triple. The shape is
/// deterministic: `<base>/<format>/<survey>-Modulo<module>.zip`.
pub fn archive_url(survey_code: &str, module: &str, year: u16) -> Result<Url> {
    let raw = format!(
        "{}/{}/{}-Modulo{}.zip",
        DOWNLOAD_BASE,
        format_segment(year),
        survey_code,
        module
    );
    Url::parse(&raw).with_context(|| format!("building archive url {raw}"))
}
