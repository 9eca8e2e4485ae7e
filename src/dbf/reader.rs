// src/dbf/reader.rs
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::convert::table::{Table, Value};

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const DESCRIPTOR_TERMINATOR: u8 = 0x0d;
const DELETED_FLAG: u8 = b'*';

#[derive(Debug)]
struct Field {
    name: String,
    kind: u8,
    length: usize,
}

/// Parse one `.dbf` file into a [`Table`]. Deleted records are skipped;
/// column names come through exactly as stored (normalization is the
/// converter's job).
pub fn read_dbf(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_from(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

/// Parse a dBASE III table from any byte stream.
pub fn read_from<R: Read>(mut reader: R) -> Result<Table> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .context("header truncated")?;

    let record_count =
        u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let header_len = u16::from_le_bytes([header[8], header[9]]) as usize;
    let record_len = u16::from_le_bytes([header[10], header[11]]) as usize;
    if header_len <= HEADER_LEN {
        bail!("declared header length {header_len} leaves no room for field descriptors");
    }

    let mut descriptor_area = vec![0u8; header_len - HEADER_LEN];
    reader
        .read_exact(&mut descriptor_area)
        .context("field descriptors truncated")?;
    let fields = parse_descriptors(&descriptor_area)?;
    if fields.is_empty() {
        bail!("table declares no fields");
    }

    let expected_len: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
    if expected_len != record_len {
        bail!("declared record length {record_len} does not match field widths {expected_len}");
    }

    let columns: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    let mut rows = Vec::with_capacity(record_count);
    let mut record = vec![0u8; record_len];
    for index in 0..record_count {
        reader
            .read_exact(&mut record)
            .with_context(|| format!("record #{index} truncated"))?;
        if record[0] == DELETED_FLAG {
            continue;
        }

        let mut row = Vec::with_capacity(fields.len());
        let mut offset = 1;
        for field in &fields {
            row.push(parse_value(field.kind, &record[offset..offset + field.length]));
            offset += field.length;
        }
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

fn parse_descriptors(area: &[u8]) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < area.len() && area[offset] != DESCRIPTOR_TERMINATOR {
        if offset + DESCRIPTOR_LEN > area.len() {
            bail!("field descriptor #{} truncated", fields.len());
        }
        let descriptor = &area[offset..offset + DESCRIPTOR_LEN];

        let name_bytes = &descriptor[0..11];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(11);
        let name = latin1(&name_bytes[..name_end]);

        fields.push(Field {
            name,
            kind: descriptor[11],
            length: descriptor[16] as usize,
        });
        offset += DESCRIPTOR_LEN;
    }
    Ok(fields)
}

fn parse_value(kind: u8, raw: &[u8]) -> Value {
    let text = latin1(raw);
    let trimmed = text.trim();
    match kind {
        b'N' | b'F' => match trimmed.parse::<f64>() {
            Ok(number) => Value::Num(number),
            Err(_) => Value::Missing,
        },
        b'L' => match trimmed.as_bytes().first() {
            Some(b'T' | b't' | b'Y' | b'y') => Value::Num(1.0),
            Some(b'F' | b'f' | b'N' | b'n') => Value::Num(0.0),
            _ => Value::Missing,
        },
        // Character and date fields stay textual.
        _ => Value::Str(trimmed.to_string()),
    }
}

// The survey files predate UTF-8; every byte is one Latin-1 character.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
