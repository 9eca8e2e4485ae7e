// src/convert/table.rs
use anyhow::{bail, Result};
use std::collections::HashMap;
use tracing::warn;

/// One cell of a parsed legacy table. Numeric fields with blank content
/// carry `Missing`, which the Stata writer encodes as the "." sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Missing,
}

impl Value {
    /// Canonical text used when joining on identifier columns. Integral
    /// numbers print without a fraction so "007" read as text and 7.0 read
    /// as numeric still meet; missing cells never match anything.
    fn key_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.trim().to_string()),
            Value::Num(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Value::Num(n) => Some(n.to_string()),
            Value::Missing => None,
        }
    }
}

/// Column names plus row-major cells, the unit every converter step works
/// on. Mirrors the shape the raw files have; no schema beyond the names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Lower-case a column name and strip embedded NUL bytes and spaces.
/// Total and idempotent: any input maps to exactly one fixed point.
pub fn normalize_column(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\0' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Table {
    /// Apply `normalize_column` to every column name in place.
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = normalize_column(column);
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Inner join with `other` on the named key columns. Rows whose key
    /// tuple appears in only one input are dropped; the drop counts are
    /// logged as a data-quality warning rather than vanishing silently.
    /// Non-key columns of `other` whose names collide with a left-hand
    /// column come through with a `_2` suffix.
    pub fn inner_join(&self, other: &Table, keys: &[&str]) -> Result<Table> {
        let left_keys = self.key_indices(keys)?;
        let right_keys = other.key_indices(keys)?;

        // Index the right side by key tuple; a key may map to several rows.
        let mut right_by_key: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        let mut right_unkeyed = 0usize;
        for (index, row) in other.rows.iter().enumerate() {
            match key_tuple(row, &right_keys) {
                Some(tuple) => right_by_key.entry(tuple).or_default().push(index),
                None => right_unkeyed += 1,
            }
        }

        let right_carry: Vec<usize> = (0..other.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let mut columns = self.columns.clone();
        for &i in &right_carry {
            let name = &other.columns[i];
            if columns.iter().any(|c| c == name) {
                columns.push(format!("{name}_2"));
            } else {
                columns.push(name.clone());
            }
        }

        let mut rows = Vec::new();
        let mut matched_right: Vec<bool> = vec![false; other.rows.len()];
        let mut dropped_left = 0usize;
        for row in &self.rows {
            let Some(tuple) = key_tuple(row, &left_keys) else {
                dropped_left += 1;
                continue;
            };
            let Some(partners) = right_by_key.get(&tuple) else {
                dropped_left += 1;
                continue;
            };
            for &partner in partners {
                matched_right[partner] = true;
                let mut merged = row.clone();
                for &i in &right_carry {
                    merged.push(other.rows[partner][i].clone());
                }
                rows.push(merged);
            }
        }

        let dropped_right =
            right_unkeyed + matched_right.iter().filter(|matched| !**matched).count();
        if dropped_left > 0 || dropped_right > 0 {
            warn!(
                dropped_left,
                dropped_right, "join dropped rows with unmatched key tuples"
            );
        }

        Ok(Table { columns, rows })
    }

    fn key_indices(&self, keys: &[&str]) -> Result<Vec<usize>> {
        keys.iter()
            .map(|key| match self.column_index(key) {
                Some(index) => Ok(index),
                None => bail!("key column {key} not present"),
            })
            .collect()
    }
}

fn key_tuple(row: &[Value], indices: &[usize]) -> Option<Vec<String>> {
    indices
        .iter()
        .map(|&i| row.get(i).and_then(Value::key_text))
        .collect()
}
