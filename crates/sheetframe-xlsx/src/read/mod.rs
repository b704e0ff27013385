//! Worksheet decoding: sheet selection, `<sheetData>` parsing and table assembly.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sheetframe_model::{CellRef, RawSheet, Table, TableBuilder};
use zip::ZipArchive;

use crate::path::rels_for_part;
use crate::shared_strings::{parse_shared_strings_xml, SharedStrings};
use crate::workbook::{
    parse_relationships, parse_workbook_sheets, resolve_sheet_entries, SheetEntry, WORKBOOK_PART,
};
use crate::zip_util::{
    find_zip_part, find_zip_part_by_suffix, read_zip_part_optional_with_limit,
    DEFAULT_MAX_ZIP_PART_BYTES,
};
use crate::XlsxError;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEETS_DIR: &str = "xl/worksheets";
const DEFAULT_SHEET_SUFFIX: &str = "sheet1.xml";

/// Options for a single XLSX read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsxReadOptions {
    /// Sheet to read, by workbook name or by worksheet part name (`"sheet2"`).
    /// `None` reads the first sheet.
    pub sheet: Option<String>,
    /// Maximum uncompressed size of any single part inflated into memory.
    pub max_part_bytes: u64,
}

impl Default for XlsxReadOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            max_part_bytes: DEFAULT_MAX_ZIP_PART_BYTES,
        }
    }
}

impl XlsxReadOptions {
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

/// Read one worksheet of an `.xlsx` file into a [`Table`].
pub fn read_table_from_path(
    path: impl AsRef<Path>,
    options: &XlsxReadOptions,
) -> Result<Table, XlsxError> {
    let file = std::fs::File::open(path)?;
    read_table_from_reader(file, options)
}

pub fn read_table_from_bytes(bytes: &[u8], options: &XlsxReadOptions) -> Result<Table, XlsxError> {
    read_table_from_reader(Cursor::new(bytes), options)
}

pub fn read_table_from_reader<R: Read + Seek>(
    reader: R,
    options: &XlsxReadOptions,
) -> Result<Table, XlsxError> {
    let mut workbook = WorkbookReader::open(reader, options.max_part_bytes)?;
    let part = workbook.resolve_sheet_part(options.sheet.as_deref())?;
    log::debug!("reading worksheet part `{part}`");
    let raw = workbook.read_raw_sheet(&part)?;
    let builder = TableBuilder::from_raw(raw).map_err(|_| XlsxError::EmptySheet { part })?;
    Ok(builder.build())
}

/// Sheet names of an `.xlsx` file in workbook tab order. Every part read along the way is
/// capped at `max_part_bytes`.
pub fn list_sheet_names(bytes: &[u8], max_part_bytes: u64) -> Result<Vec<String>, XlsxError> {
    let workbook = WorkbookReader::open(Cursor::new(bytes), max_part_bytes)?;
    Ok(workbook.sheets.into_iter().map(|entry| entry.name).collect())
}

/// Per-call decode state: the open archive plus the workbook's shared string table.
struct WorkbookReader<R> {
    archive: ZipArchive<R>,
    shared_strings: SharedStrings,
    sheets: Vec<SheetEntry>,
    max_part_bytes: u64,
}

impl<R: Read + Seek> WorkbookReader<R> {
    fn open(reader: R, max_part_bytes: u64) -> Result<Self, XlsxError> {
        let mut archive = ZipArchive::new(reader)?;

        let shared_strings =
            match read_zip_part_optional_with_limit(&mut archive, SHARED_STRINGS_PART, max_part_bytes)?
            {
                Some(xml) => parse_shared_strings_xml(&xml)?,
                None => SharedStrings::default(),
            };

        let sheets = match read_zip_part_optional_with_limit(&mut archive, WORKBOOK_PART, max_part_bytes)?
        {
            Some(xml) => {
                let sheets = parse_workbook_sheets(&xml)?;
                let rels_part = rels_for_part(WORKBOOK_PART);
                let rels = match read_zip_part_optional_with_limit(
                    &mut archive,
                    &rels_part,
                    max_part_bytes,
                )? {
                    Some(rels_xml) => parse_relationships(WORKBOOK_PART, &rels_xml)?,
                    None => Default::default(),
                };
                resolve_sheet_entries(sheets, &rels)
            }
            None => Vec::new(),
        };

        Ok(Self {
            archive,
            shared_strings,
            sheets,
            max_part_bytes,
        })
    }

    /// Map the selector to a worksheet part name.
    ///
    /// Workbook sheet names are tried first (ASCII case-insensitive); otherwise the selector is
    /// treated as a part file name (`"Sheet2"` -> `.../sheet2.xml`).
    fn resolve_sheet_part(&self, selector: Option<&str>) -> Result<String, XlsxError> {
        let from_workbook = match selector {
            None => self.sheets.first(),
            Some(name) => self
                .sheets
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(name)),
        };
        if let Some(part) = from_workbook
            .and_then(|entry| entry.part.as_deref())
            .filter(|part| find_zip_part(&self.archive, part).is_some())
        {
            return Ok(part.to_string());
        }

        let suffix = match selector {
            None => DEFAULT_SHEET_SUFFIX.to_string(),
            Some(name) => format!("{}.xml", name.to_lowercase()),
        };
        find_zip_part_by_suffix(&self.archive, WORKSHEETS_DIR, &suffix).ok_or_else(|| {
            XlsxError::SheetNotFound {
                sheet: selector.unwrap_or("sheet1").to_string(),
            }
        })
    }

    fn read_raw_sheet(&mut self, part: &str) -> Result<RawSheet, XlsxError> {
        let xml = read_zip_part_optional_with_limit(&mut self.archive, part, self.max_part_bytes)?
            .ok_or_else(|| XlsxError::SheetNotFound {
                sheet: part.to_string(),
            })?;
        parse_sheet_data(&xml, &self.shared_strings)
    }
}

/// Cell attributes and content gathered between `<c>` and `</c>`.
#[derive(Debug, Default)]
struct PendingCell {
    col: Option<u32>,
    cell_type: Option<String>,
    value: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, XlsxError> {
        let mut cell = PendingCell::default();
        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"r" => {
                    let a1 = attr.unescape_value()?;
                    match CellRef::from_a1(&a1) {
                        Ok(cell_ref) => cell.col = Some(cell_ref.col),
                        Err(err) => log::warn!("ignoring invalid cell reference `{a1}`: {err}"),
                    }
                }
                b"t" => cell.cell_type = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }
        Ok(cell)
    }

    /// Resolve the cell's display text by its declared type.
    fn resolve(self, shared_strings: &SharedStrings) -> Option<String> {
        match self.cell_type.as_deref() {
            Some("s") => {
                let raw = self.value?;
                match raw.trim().parse::<usize>().ok().and_then(|idx| shared_strings.get(idx)) {
                    Some(text) => Some(text.to_string()),
                    None => {
                        log::warn!(
                            "shared string index `{raw}` out of range (table has {} entries); keeping raw value",
                            shared_strings.len()
                        );
                        Some(raw)
                    }
                }
            }
            Some("inlineStr") => self.inline.or(self.value),
            Some("b") => self.value.map(|v| match v.trim() {
                "1" => "true".to_string(),
                "0" => "false".to_string(),
                _ => v,
            }),
            _ => self.value,
        }
    }
}

/// Row under construction; `next_col` tracks placement for cells without an `r` reference.
#[derive(Debug, Default)]
struct RowBuilder {
    cells: Vec<Option<String>>,
    next_col: usize,
}

impl RowBuilder {
    fn place(&mut self, col: Option<u32>, value: Option<String>) {
        let col = col.map(|c| c as usize).unwrap_or(self.next_col);
        if self.cells.len() <= col {
            self.cells.resize(col + 1, None);
        }
        self.cells[col] = value;
        self.next_col = col + 1;
    }
}

/// Flatten `<sheetData>` into raw text rows.
pub(crate) fn parse_sheet_data(
    xml: &[u8],
    shared_strings: &SharedStrings,
) -> Result<RawSheet, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut sheet = RawSheet::new();
    let mut in_sheet_data = false;
    let mut row: Option<RowBuilder> = None;
    let mut cell: Option<PendingCell> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = true,
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = false,

            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                row = Some(RowBuilder::default());
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                sheet.push_row(Vec::new());
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some(done) = row.take() {
                    sheet.push_row(done.cells);
                }
            }

            Event::Start(e) if row.is_some() && e.local_name().as_ref() == b"c" => {
                cell = Some(PendingCell::from_start(&e)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                if let Some(row) = row.as_mut() {
                    let empty = PendingCell::from_start(&e)?;
                    row.place(empty.col, None);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => {
                if let (Some(done), Some(row)) = (cell.take(), row.as_mut()) {
                    let col = done.col;
                    row.place(col, done.resolve(shared_strings));
                }
            }

            Event::Start(e) if cell.is_some() && e.local_name().as_ref() == b"v" => {
                let text = read_text(&mut reader, b"v")?;
                if let Some(cell) = cell.as_mut() {
                    cell.value = Some(text);
                }
            }
            Event::Start(e) if cell.is_some() && e.local_name().as_ref() == b"is" => {
                let text = parse_inline_is_text(&mut reader)?;
                if let Some(cell) = cell.as_mut() {
                    cell.inline = Some(text);
                }
            }
            Event::Start(e) if cell.is_some() => {
                // `<f>`, `<extLst>` and friends carry nothing we keep.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }

            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheet)
}

fn parse_inline_is_text(reader: &mut Reader<&[u8]>) -> Result<String, XlsxError> {
    let mut buf = Vec::new();
    let mut out = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                out.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                out.push_str(&parse_inline_r_text(reader)?);
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"is" => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected EOF while parsing inline string <is>".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn parse_inline_r_text(reader: &mut Reader<&[u8]>) -> Result<String, XlsxError> {
    let mut buf = Vec::new();
    let mut out = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                out.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected EOF while parsing inline string <r>".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn read_text(reader: &mut Reader<&[u8]>, end_local: &[u8]) -> Result<String, XlsxError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Event::End(e) if e.local_name().as_ref() == end_local => break,
            Event::Eof => {
                return Err(XlsxError::Invalid(format!(
                    "unexpected EOF while parsing <{}>",
                    String::from_utf8_lossy(end_local)
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}
