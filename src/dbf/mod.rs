// src/dbf/mod.rs
//
// Reader for the dBASE III tables the pre-2004 survey releases ship in.
// Only the subset those files actually use is supported: fixed-width
// character, numeric, date and logical fields, with the usual one-byte
// deleted-record flag.

mod reader;

pub use reader::{read_dbf, read_from};

#[cfg(test)]
pub(crate) use reader::tests::build_dbf;
