//! Read `.xlsx` and `.xls` workbooks into [`Table`]s.
//!
//! The format is sniffed first (see [`detect`]); the matching decoder then produces a raw sheet
//! that is coerced and normalized into a rectangular table.

use std::path::{Path, PathBuf};

use sheetframe_xls as xls;
use sheetframe_xlsx as xlsx;
use thiserror::Error;

pub mod detect;

pub use detect::{classify, detect_workbook_format, detect_workbook_format_path, WorkbookFormat};
pub use sheetframe_model::{CellValue, Table};

fn describe_origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("`{}`", path.display()),
        None => "in-memory workbook".to_string(),
    }
}

fn describe_signature(signature: &Option<u16>) -> String {
    match signature {
        Some(sig) => format!("0x{sig:04X}"),
        None => "none".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported extension `{extension}` for {}", describe_origin(.path))]
    UnsupportedExtension {
        path: Option<PathBuf>,
        extension: String,
    },
    #[error("unsupported workbook signature {} for {}", describe_signature(.signature), describe_origin(.path))]
    UnsupportedSignature {
        path: Option<PathBuf>,
        signature: Option<u16>,
    },
    #[error("failed to open workbook `{path}`: {source}")]
    OpenIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read `.xlsx` {}: {source}", describe_origin(.path))]
    OpenXlsx {
        path: Option<PathBuf>,
        #[source]
        source: xlsx::XlsxError,
    },
    #[error("failed to read `.xls` {}: {source}", describe_origin(.path))]
    OpenXls {
        path: Option<PathBuf>,
        #[source]
        source: xls::ImportError,
    },
    #[error("{} has no sheet directory; legacy workbooks expose a single sheet", describe_origin(.path))]
    NoSheetDirectory { path: Option<PathBuf> },
}

/// Closed classification of [`Error`] for callers that branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown extension or signature.
    UnsupportedFormat,
    /// The container (ZIP package, XML parts, shared strings) could not be decoded.
    Container,
    /// The requested sheet or embedded stream does not exist.
    NotFound,
    /// The selected sheet decoded to zero rows.
    EmptyInput,
    /// The legacy record stream does not start where expected.
    MalformedRecord,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedExtension { .. }
            | Error::UnsupportedSignature { .. }
            | Error::NoSheetDirectory { .. } => ErrorKind::UnsupportedFormat,
            Error::OpenIo { .. } => ErrorKind::Io,
            Error::OpenXlsx { source, .. } => match source {
                xlsx::XlsxError::Io(_) => ErrorKind::Io,
                xlsx::XlsxError::SheetNotFound { .. } => ErrorKind::NotFound,
                xlsx::XlsxError::EmptySheet { .. } => ErrorKind::EmptyInput,
                xlsx::XlsxError::Zip(_)
                | xlsx::XlsxError::Xml(_)
                | xlsx::XlsxError::Attr(_)
                | xlsx::XlsxError::Utf8(_)
                | xlsx::XlsxError::SharedStrings(_)
                | xlsx::XlsxError::Invalid(_)
                | xlsx::XlsxError::PartTooLarge { .. } => ErrorKind::Container,
            },
            Error::OpenXls { source, .. } => match source {
                xls::ImportError::Io(_) => ErrorKind::Io,
                xls::ImportError::UnsupportedSignature { .. } => ErrorKind::UnsupportedFormat,
                xls::ImportError::StreamNotFound => ErrorKind::NotFound,
                xls::ImportError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
                xls::ImportError::EmptyWorkbook => ErrorKind::EmptyInput,
            },
        }
    }
}

/// Per-call read configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Sheet to read from an `.xlsx` workbook, by name or part name. `None` reads the first
    /// sheet. Legacy workbooks always yield their first sheet with data.
    pub sheet: Option<String>,
    /// Maximum uncompressed size of a single `.xlsx` package part.
    pub max_part_bytes: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            max_part_bytes: xlsx::DEFAULT_MAX_ZIP_PART_BYTES,
        }
    }
}

impl ReadOptions {
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    fn xlsx_options(&self) -> xlsx::XlsxReadOptions {
        xlsx::XlsxReadOptions {
            sheet: self.sheet.clone(),
            max_part_bytes: self.max_part_bytes,
        }
    }
}

/// Read one sheet of the workbook at `path` into a [`Table`].
///
/// An unsupported extension is rejected before the file is opened.
pub fn read_excel(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Table, Error> {
    read_excel_with_format(path, options).map(|(_, table)| table)
}

/// Like [`read_excel`], also returning the detected container format. The file is read once.
pub fn read_excel_with_format(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<(WorkbookFormat, Table), Error> {
    let path = path.as_ref();
    let extension = detect::path_extension(path);
    detect::check_extension(Some(path), extension.as_deref())?;

    let bytes = std::fs::read(path).map_err(|source| Error::OpenIo {
        path: path.to_path_buf(),
        source,
    })?;
    read_with_origin(Some(path), &bytes, extension.as_deref(), options)
}

/// Read one sheet of an in-memory workbook. `extension` is the file extension without the dot,
/// when known.
pub fn read_excel_bytes(
    bytes: &[u8],
    extension: Option<&str>,
    options: &ReadOptions,
) -> Result<Table, Error> {
    read_with_origin(None, bytes, extension, options).map(|(_, table)| table)
}

fn read_with_origin(
    path: Option<&Path>,
    bytes: &[u8],
    extension: Option<&str>,
    options: &ReadOptions,
) -> Result<(WorkbookFormat, Table), Error> {
    let format = detect::detect_with_origin(path, extension, bytes)?;
    let owned_path = || path.map(Path::to_path_buf);

    let legacy = match format {
        WorkbookFormat::Ooxml => {
            return xlsx::read_table_from_bytes(bytes, &options.xlsx_options())
                .map(|table| (format, table))
                .map_err(|source| Error::OpenXlsx {
                    path: owned_path(),
                    source,
                });
        }
        WorkbookFormat::LegacyRawRecordStream => xls::import_biff_stream(bytes),
        WorkbookFormat::LegacyOleWrapped => xls::import_ole_wrapped(bytes),
        WorkbookFormat::Unsupported => {
            return Err(Error::UnsupportedSignature {
                path: owned_path(),
                signature: xls::leading_signature(bytes),
            })
        }
    };

    if let Some(sheet) = &options.sheet {
        log::warn!("sheet selector `{sheet}` ignored: legacy workbooks expose a single sheet");
    }
    let import = legacy.map_err(|source| Error::OpenXls {
        path: owned_path(),
        source,
    })?;
    if !import.warnings.is_empty() {
        log::debug!(
            "legacy import recovered from {} record anomalies",
            import.warnings.len()
        );
    }
    Ok((format, import.table))
}

/// Sheet names of the `.xlsx` workbook at `path`, in tab order. `options.max_part_bytes` caps
/// each package part; the sheet selector is not used.
pub fn sheet_names(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let format = detect_workbook_format_path(path)?;
    if format != WorkbookFormat::Ooxml {
        return Err(Error::NoSheetDirectory {
            path: Some(path.to_path_buf()),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| Error::OpenIo {
        path: path.to_path_buf(),
        source,
    })?;
    xlsx::list_sheet_names(&bytes, options.max_part_bytes).map_err(|source| Error::OpenXlsx {
        path: Some(path.to_path_buf()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_read_first_sheet_with_package_cap() {
        let options = ReadOptions::default();
        assert_eq!(options.sheet, None);
        assert_eq!(options.max_part_bytes, xlsx::DEFAULT_MAX_ZIP_PART_BYTES);
        assert_eq!(
            options.with_sheet("Data").sheet.as_deref(),
            Some("Data")
        );
    }

    #[test]
    fn error_kinds_follow_the_wrapped_source() {
        let not_found = Error::OpenXlsx {
            path: None,
            source: xlsx::XlsxError::SheetNotFound {
                sheet: "Missing".to_string(),
            },
        };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let malformed = Error::OpenXls {
            path: Some(PathBuf::from("a.xls")),
            source: xls::ImportError::MalformedRecord {
                offset: 512,
                record_id: Some(0x0203),
            },
        };
        assert_eq!(malformed.kind(), ErrorKind::MalformedRecord);
        assert_eq!(
            malformed.to_string(),
            "failed to read `.xls` `a.xls`: expected a BOF record at offset 512, found record 0x0203"
        );

        let ods = Error::UnsupportedExtension {
            path: None,
            extension: "ods".to_string(),
        };
        assert_eq!(ods.kind(), ErrorKind::UnsupportedFormat);
    }
}
