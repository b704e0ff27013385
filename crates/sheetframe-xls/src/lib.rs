//! Legacy Excel 97-2003 `.xls` (BIFF) import support.
//!
//! The importer is best-effort: it walks the BIFF record stream, keeps cell values from the first
//! sheet that has any, and reports recovered anomalies as [`ImportWarning`]s. A stream wrapped in
//! an OLE2 compound document is located heuristically (see [`ole`]).

use std::fmt;
use std::path::Path;

use sheetframe_model::{Table, TableBuilder};
use thiserror::Error;

pub(crate) mod biff;
pub mod ole;

pub use biff::records::MAX_RECORD_BYTES;
pub use ole::{locate_biff_stream, LocateStrategy, StreamLocation};

/// First little-endian u16 of an OLE2 compound document (`D0 CF 11 E0 ...`).
const OLE_SIGNATURE: u16 = 0xCFD0;
/// Byte-swapped OLE2 signature accepted from producers that write it big-endian.
const OLE_SIGNATURE_SWAPPED: u16 = 0xD0CF;

/// How the BIFF record stream is stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyLayout {
    /// The file starts directly with a BIFF `BOF` record.
    RawRecordStream,
    /// The BIFF stream lives inside an OLE2 compound document.
    OleWrapped,
}

/// Classify a legacy buffer by its first little-endian u16.
pub fn detect_legacy_layout(bytes: &[u8]) -> Option<LegacyLayout> {
    match leading_signature(bytes)? {
        biff::records::RECORD_BOF_BIFF8 | biff::records::RECORD_BOF_BIFF5 => {
            Some(LegacyLayout::RawRecordStream)
        }
        OLE_SIGNATURE | OLE_SIGNATURE_SWAPPED => Some(LegacyLayout::OleWrapped),
        _ => None,
    }
}

/// First little-endian u16 of `bytes`, if there are at least two.
pub fn leading_signature(bytes: &[u8]) -> Option<u16> {
    bytes.get(0..2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

/// A recovered anomaly: the record was skipped or a fallback value substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// Offset of the record header in the decoded buffer.
    pub offset: usize,
    pub record_id: u16,
    pub message: String,
}

impl ImportWarning {
    pub(crate) fn new(offset: usize, record_id: u16, message: impl Into<String>) -> Self {
        Self {
            offset,
            record_id,
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BIFF record 0x{:04X} at offset {}: {}",
            self.record_id, self.offset, self.message
        )
    }
}

#[derive(Debug)]
pub struct XlsImport {
    pub table: Table,
    pub layout: LegacyLayout,
    /// Offset of the first `BOF` record in the input buffer.
    pub stream_offset: usize,
    pub warnings: Vec<ImportWarning>,
}

fn describe_record_id(record_id: &Option<u16>) -> String {
    match record_id {
        Some(id) => format!("record 0x{id:04X}"),
        None => "no complete record header".to_string(),
    }
}

fn describe_signature(signature: &Option<u16>) -> String {
    match signature {
        Some(sig) => format!("0x{sig:04X}"),
        None => "none (input shorter than 2 bytes)".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read `.xls`: {0}")]
    Io(#[from] std::io::Error),
    #[error("unrecognized `.xls` signature: {}", describe_signature(.signature))]
    UnsupportedSignature { signature: Option<u16> },
    #[error("no BIFF stream found inside the OLE2 compound document")]
    StreamNotFound,
    #[error("expected a BOF record at offset {offset}, found {}", describe_record_id(.record_id))]
    MalformedRecord {
        offset: usize,
        record_id: Option<u16>,
    },
    #[error("workbook contains no rows")]
    EmptyWorkbook,
}

/// Import a legacy `.xls` workbook from disk.
pub fn import_xls_path(path: impl AsRef<Path>) -> Result<XlsImport, ImportError> {
    let bytes = std::fs::read(path)?;
    import_xls_bytes(&bytes)
}

/// Import a legacy `.xls` buffer, dispatching on its leading signature.
pub fn import_xls_bytes(bytes: &[u8]) -> Result<XlsImport, ImportError> {
    match detect_legacy_layout(bytes) {
        Some(LegacyLayout::RawRecordStream) => import_biff_stream(bytes),
        Some(LegacyLayout::OleWrapped) => import_ole_wrapped(bytes),
        None => Err(ImportError::UnsupportedSignature {
            signature: leading_signature(bytes),
        }),
    }
}

/// Import a bare BIFF record stream that starts with a `BOF` record.
pub fn import_biff_stream(bytes: &[u8]) -> Result<XlsImport, ImportError> {
    build_import(bytes, 0, LegacyLayout::RawRecordStream)
}

/// Import a BIFF stream embedded in an OLE2 compound document.
pub fn import_ole_wrapped(bytes: &[u8]) -> Result<XlsImport, ImportError> {
    let location = locate_biff_stream(bytes).ok_or(ImportError::StreamNotFound)?;
    build_import(bytes, location.offset, LegacyLayout::OleWrapped)
}

fn build_import(
    bytes: &[u8],
    offset: usize,
    layout: LegacyLayout,
) -> Result<XlsImport, ImportError> {
    let (sheet, warnings) = biff::decode_sheet(bytes, offset)?;
    let table = TableBuilder::from_raw(sheet)
        .map_err(|_| ImportError::EmptyWorkbook)?
        .build();
    Ok(XlsImport {
        table,
        layout,
        stream_offset: offset,
        warnings,
    })
}
