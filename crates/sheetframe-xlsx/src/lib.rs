//! XLSX (SpreadsheetML) worksheet reader.
//!
//! The reader opens the OPC ZIP container, loads the workbook's shared string table, picks one
//! worksheet part and flattens its `<sheetData>` into a [`sheetframe_model::Table`]. Styles,
//! formulas and every other part are ignored.

mod path;
pub mod read;
pub mod shared_strings;
mod workbook;
mod zip_util;

use thiserror::Error;

pub use read::{
    list_sheet_names, read_table_from_bytes, read_table_from_path, read_table_from_reader,
    XlsxReadOptions,
};
pub use shared_strings::{parse_shared_strings_xml, SharedStrings, SharedStringsError};
pub use zip_util::DEFAULT_MAX_ZIP_PART_BYTES;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("sharedStrings.xml parse error: {0}")]
    SharedStrings(#[from] SharedStringsError),
    #[error("invalid xlsx: {0}")]
    Invalid(String),
    #[error("xlsx part is too large to load safely: {part} is {size} bytes (max {max} bytes)")]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("worksheet `{sheet}` not found")]
    SheetNotFound { sheet: String },
    #[error("worksheet part `{part}` contains no rows")]
    EmptySheet { part: String },
}
