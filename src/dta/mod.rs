// src/dta/mod.rs
//
// Writer for Stata `.dta` files, release 114, the format the 2004+ survey
// releases ship natively and every converted legacy table is written in.

mod writer;

pub use writer::{write_dta, DtaWriter};
