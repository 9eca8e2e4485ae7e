// src/dta/writer.rs
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::convert::table::{Table, Value};

const RELEASE: u8 = 114;
const BYTEORDER_LSF: u8 = 2;
const FILETYPE: u8 = 1;

const LABEL_LEN: usize = 81;
const TIMESTAMP_LEN: usize = 18;
const NAME_LEN: usize = 33;
const FORMAT_LEN: usize = 49;
const VAR_LABEL_LEN: usize = 81;

const TYPE_DOUBLE: u8 = 255;
const MAX_STR_LEN: usize = 244;
const MAX_NAME: usize = 32;

// Bit pattern of the "." system missing value for doubles.
const MISSING_DOUBLE: u64 = 0x7fe0_0000_0000_0000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColKind {
    Double,
    Str(usize),
}

/// Writer for one in-memory [`Table`] as a release-114 Stata file.
///
/// Columns whose cells are all numeric (or missing) become `double`
/// variables; everything else becomes a fixed-width `str#` sized to the
/// longest value. No value labels and no variable labels are emitted.
pub struct DtaWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> DtaWriter<W> {
    pub fn new(writer: W) -> Self {
        DtaWriter {
            writer: BufWriter::new(writer),
        }
    }

    /// Write the whole table and flush.
    pub fn write_table(mut self, table: &Table) -> Result<()> {
        let names = variable_names(table)?;
        if table.columns.len() > i16::MAX as usize {
            bail!("{} variables exceed the dta limit", table.columns.len());
        }
        if table.rows.len() > i32::MAX as usize {
            bail!("{} observations exceed the dta limit", table.rows.len());
        }
        for (index, row) in table.rows.iter().enumerate() {
            if row.len() != table.columns.len() {
                bail!(
                    "row #{index} has {} cells, expected {}",
                    row.len(),
                    table.columns.len()
                );
            }
        }
        let kinds = plan_columns(table);

        // Header: release, byteorder, filetype, padding, dimensions,
        // dataset label, timestamp.
        self.writer.write_all(&[RELEASE, BYTEORDER_LSF, FILETYPE, 0])?;
        self.writer
            .write_all(&(table.columns.len() as i16).to_le_bytes())?;
        self.writer
            .write_all(&(table.rows.len() as i32).to_le_bytes())?;
        self.writer.write_all(&padded(b"", LABEL_LEN))?;
        let stamp = Local::now().format("%d %b %Y %H:%M").to_string();
        self.writer.write_all(&padded(stamp.as_bytes(), TIMESTAMP_LEN))?;

        // Descriptors.
        for kind in &kinds {
            self.writer.write_all(&[match kind {
                ColKind::Double => TYPE_DOUBLE,
                ColKind::Str(len) => *len as u8,
            }])?;
        }
        for name in &names {
            self.writer.write_all(&padded(name.as_bytes(), NAME_LEN))?;
        }
        // srtlist: unsorted.
        self.writer
            .write_all(&vec![0u8; 2 * (table.columns.len() + 1)])?;
        for kind in &kinds {
            let format = match kind {
                ColKind::Double => "%10.0g".to_string(),
                ColKind::Str(len) => format!("%{len}s"),
            };
            self.writer.write_all(&padded(format.as_bytes(), FORMAT_LEN))?;
        }
        // lbllist and variable labels: none.
        self.writer
            .write_all(&vec![0u8; NAME_LEN * table.columns.len()])?;
        self.writer
            .write_all(&vec![0u8; VAR_LABEL_LEN * table.columns.len()])?;
        // Expansion-field terminator.
        self.writer.write_all(&[0u8; 5])?;

        // Row-major data.
        for row in &table.rows {
            for (cell, kind) in row.iter().zip(&kinds) {
                match kind {
                    ColKind::Double => self.writer.write_all(&encode_double(cell))?,
                    ColKind::Str(len) => self.writer.write_all(&encode_str(cell, *len))?,
                }
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}

impl DtaWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(file))
    }
}

/// Convenience wrapper: create `path` and write `table` into it.
pub fn write_dta(path: &Path, table: &Table) -> Result<()> {
    DtaWriter::create(path)?
        .write_table(table)
        .with_context(|| format!("writing {}", path.display()))
}

/// Validate and clamp column names to Stata's variable-name rules:
/// letters, digits and underscores, not starting with a digit, at most 32
/// bytes. Over-long names are truncated; the result must stay unique.
fn variable_names(table: &Table) -> Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        if column.is_empty() {
            bail!("empty variable name");
        }
        let valid_start = column
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_start || !valid_rest {
            bail!("invalid variable name {column:?}");
        }
        let mut name = column.clone();
        name.truncate(MAX_NAME);
        if !seen.insert(name.clone()) {
            bail!("duplicate variable name {name:?}");
        }
        names.push(name);
    }
    Ok(names)
}

fn plan_columns(table: &Table) -> Vec<ColKind> {
    (0..table.columns.len())
        .map(|index| {
            let cells = table.rows.iter().map(move |row| &row[index]);
            if cells.clone().all(|cell| !matches!(cell, Value::Str(_))) {
                ColKind::Double
            } else {
                let width = cells
                    .map(|cell| cell_text(cell).len())
                    .max()
                    .unwrap_or(1)
                    .clamp(1, MAX_STR_LEN);
                ColKind::Str(width)
            }
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Str(s) => s.clone(),
        Value::Num(n) => n.to_string(),
        Value::Missing => String::new(),
    }
}

fn encode_double(cell: &Value) -> [u8; 8] {
    match cell {
        Value::Num(n) if n.is_finite() => n.to_le_bytes(),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => n.to_le_bytes(),
            _ => MISSING_DOUBLE.to_le_bytes(),
        },
        _ => MISSING_DOUBLE.to_le_bytes(),
    }
}

fn encode_str(cell: &Value, length: usize) -> Vec<u8> {
    let text = cell_text(cell);
    let mut out = Vec::with_capacity(length);
    for c in text.chars().take(length) {
        // The on-disk encoding is single-byte; anything wider degrades.
        out.push(if (c as u32) <= 0xff { c as u8 } else { b'?' });
    }
    out.resize(length, 0);
    out
}

fn padded(bytes: &[u8], length: usize) -> Vec<u8> {
    let mut out = bytes.to_vec();
    // Reserve the final byte for the NUL terminator.
    out.truncate(length - 1);
    out.resize(length, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER_LEN: usize = 109;

    fn sample_table() -> Table {
        Table {
            columns: vec!["ingreso".into(), "conglome".into()],
            rows: vec![
                vec![Value::Num(1250.5), Value::Str("001".into())],
                vec![Value::Missing, Value::Str("02".into())],
            ],
        }
    }

    fn write_to_vec(table: &Table) -> Vec<u8> {
        let mut out = Vec::new();
        DtaWriter::new(&mut out).write_table(table).unwrap();
        out
    }

    /// Offset of the first data byte for a file with `nvar` variables.
    fn data_start(nvar: usize) -> usize {
        HEADER_LEN + nvar + 33 * nvar + 2 * (nvar + 1) + 49 * nvar + 33 * nvar + 81 * nvar + 5
    }

    #[test]
    fn header_declares_release_and_dimensions() {
        let bytes = write_to_vec(&sample_table());

        assert_eq!(bytes[0], 114);
        assert_eq!(bytes[1], 2); // little-endian
        assert_eq!(bytes[2], 1);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 2);
        assert_eq!(
            i32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            2
        );
    }

    #[test]
    fn typlist_marks_doubles_and_string_widths() {
        let bytes = write_to_vec(&sample_table());

        // "ingreso" is all-numeric, "conglome" is str3 ("001").
        assert_eq!(bytes[HEADER_LEN], 255);
        assert_eq!(bytes[HEADER_LEN + 1], 3);

        let varlist = &bytes[HEADER_LEN + 2..HEADER_LEN + 2 + 33];
        assert!(varlist.starts_with(b"ingreso\0"));
    }

    #[test]
    fn file_length_matches_layout() {
        let table = sample_table();
        let bytes = write_to_vec(&table);
        // Two rows of (double + str3).
        assert_eq!(bytes.len(), data_start(2) + 2 * (8 + 3));
    }

    #[test]
    fn missing_numeric_encodes_the_dot_sentinel() {
        let table = Table {
            columns: vec!["ingreso".into()],
            rows: vec![vec![Value::Missing]],
        };
        let bytes = write_to_vec(&table);
        let start = data_start(1);
        assert_eq!(
            &bytes[start..start + 8],
            &[0, 0, 0, 0, 0, 0, 0xe0, 0x7f]
        );
    }

    #[test]
    fn overlong_names_are_truncated_not_rejected() {
        let table = Table {
            columns: vec!["a".repeat(40)],
            rows: vec![],
        };
        let bytes = write_to_vec(&table);
        let varlist = &bytes[HEADER_LEN + 1..HEADER_LEN + 1 + 33];
        assert_eq!(&varlist[..32], "a".repeat(32).as_bytes());
        assert_eq!(varlist[32], 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let table = Table {
            columns: vec!["hogar".into(), "hogar".into()],
            rows: vec![],
        };
        assert!(DtaWriter::new(Vec::new()).write_table(&table).is_err());
    }

    #[test]
    fn names_must_be_stata_legal() {
        for bad in ["", "9to5", "con glome"] {
            let table = Table {
                columns: vec![bad.to_string()],
                rows: vec![],
            };
            assert!(DtaWriter::new(Vec::new()).write_table(&table).is_err());
        }
    }

    #[test]
    fn string_cells_are_nul_padded() {
        let table = Table {
            columns: vec!["conglome".into()],
            rows: vec![vec![Value::Str("ab".into())], vec![Value::Str("abcd".into())]],
        };
        let bytes = write_to_vec(&table);
        let start = data_start(1);
        assert_eq!(&bytes[start..start + 4], b"ab\0\0");
        assert_eq!(&bytes[start + 4..start + 8], b"abcd");
    }
}
