pub mod catalog;
pub mod cleanup;
pub mod convert;
pub mod dbf;
pub mod dta;
pub mod extract;
pub mod fetch;
pub mod flatten;
pub mod layout;
pub mod rename;
pub mod report;
