//! `sheetframe-model` defines the normalized table every spreadsheet reader produces.
//!
//! The `.xlsx` and `.xls` decoders only hand over raw text ([`RawSheet`]); turning that text into
//! typed values and padded rows happens here so both formats share exactly one set of rules.

mod address;
pub mod table;
mod value;

pub use address::{A1ParseError, CellRef};
pub use table::{RawSheet, Table, TableBuilder, TableError};
pub use value::{coerce, CellValue};
