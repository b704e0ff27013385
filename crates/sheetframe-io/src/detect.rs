//! Workbook format sniffing from file extension and leading bytes.

use std::path::Path;

use sheetframe_xls::{detect_legacy_layout, leading_signature, LegacyLayout};

use crate::Error;

/// ZIP local file header magic; every OOXML package starts with one.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// SpreadsheetML package (`.xlsx`, `.xlsm`).
    Ooxml,
    /// BIFF records starting at byte 0.
    LegacyRawRecordStream,
    /// BIFF records inside an OLE2 compound document.
    LegacyOleWrapped,
    Unsupported,
}

impl From<LegacyLayout> for WorkbookFormat {
    fn from(layout: LegacyLayout) -> Self {
        match layout {
            LegacyLayout::RawRecordStream => WorkbookFormat::LegacyRawRecordStream,
            LegacyLayout::OleWrapped => WorkbookFormat::LegacyOleWrapped,
        }
    }
}

/// Lowercased extension of `path`, if it has one.
pub(crate) fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// True for extensions the readers accept before looking at any bytes.
pub(crate) fn is_supported_extension(extension: &str) -> bool {
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "xlsx" | "xlsm" | "xls"
    )
}

/// Classify `bytes`, using `extension` (without the dot) when known.
///
/// `.xlsx`/`.xlsm` are trusted without inspecting bytes. `.xls` is split by its leading
/// little-endian u16. Without an extension, the ZIP magic marks OOXML and the legacy signatures
/// are tried next.
pub fn classify(extension: Option<&str>, bytes: &[u8]) -> WorkbookFormat {
    let legacy = || {
        detect_legacy_layout(bytes)
            .map(WorkbookFormat::from)
            .unwrap_or(WorkbookFormat::Unsupported)
    };

    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("xlsx" | "xlsm") => WorkbookFormat::Ooxml,
        Some("xls") => legacy(),
        Some(_) => WorkbookFormat::Unsupported,
        None if bytes.starts_with(ZIP_MAGIC) => WorkbookFormat::Ooxml,
        None => legacy(),
    }
}

/// Like [`classify`], but an unsupported input is an error naming the offending extension or
/// signature.
pub fn detect_workbook_format(
    extension: Option<&str>,
    bytes: &[u8],
) -> Result<WorkbookFormat, Error> {
    detect_with_origin(None, extension, bytes)
}

/// Detect the format of the file at `path`.
///
/// An unrecognized extension fails before the file is opened.
pub fn detect_workbook_format_path(path: impl AsRef<Path>) -> Result<WorkbookFormat, Error> {
    let path = path.as_ref();
    let extension = path_extension(path);
    check_extension(Some(path), extension.as_deref())?;

    let bytes = std::fs::read(path).map_err(|source| Error::OpenIo {
        path: path.to_path_buf(),
        source,
    })?;
    detect_with_origin(Some(path), extension.as_deref(), &bytes)
}

pub(crate) fn check_extension(path: Option<&Path>, extension: Option<&str>) -> Result<(), Error> {
    match extension {
        Some(ext) if !is_supported_extension(ext) => Err(Error::UnsupportedExtension {
            path: path.map(Path::to_path_buf),
            extension: ext.to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn detect_with_origin(
    path: Option<&Path>,
    extension: Option<&str>,
    bytes: &[u8],
) -> Result<WorkbookFormat, Error> {
    check_extension(path, extension)?;
    match classify(extension, bytes) {
        WorkbookFormat::Unsupported => Err(Error::UnsupportedSignature {
            path: path.map(Path::to_path_buf),
            signature: leading_signature(bytes),
        }),
        format => {
            log::debug!("detected {format:?}");
            Ok(format)
        }
    }
}
