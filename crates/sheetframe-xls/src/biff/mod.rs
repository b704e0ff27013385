//! BIFF record stream walking.
//!
//! The walker reads records sequentially from a start offset, decodes the handful of cell records
//! that carry values and drops everything else. The first substream that produces values becomes
//! the sheet.

use std::collections::BTreeMap;

use sheetframe_model::RawSheet;

pub(crate) mod cells;
pub(crate) mod records;
pub(crate) mod sst;
pub(crate) mod strings;

use crate::{ImportError, ImportWarning};
use records::{
    is_bof_record, peek_header, LogicalBiffRecord, LogicalBiffRecordIter, RECORD_BLANK,
    RECORD_BOOLERR, RECORD_EOF, RECORD_HEADER_LEN, RECORD_LABEL, RECORD_LABELSST, RECORD_MULBLANK,
    RECORD_MULRK, RECORD_NUMBER, RECORD_RK, RECORD_ROW, RECORD_SST,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BiffVersion {
    Biff5,
    Biff8,
}

// BIFF version number stored in the BOF record payload. See [MS-XLS] 2.4.21 (BOF).
const BOF_VERSION_BIFF8: u16 = 0x0600;

impl BiffVersion {
    fn from_bof(data: &[u8]) -> Self {
        match data.get(0..2) {
            Some(bytes) if u16::from_le_bytes([bytes[0], bytes[1]]) == BOF_VERSION_BIFF8 => {
                BiffVersion::Biff8
            }
            Some(_) => BiffVersion::Biff5,
            None => BiffVersion::Biff8,
        }
    }
}

/// Per-call decode state. Never shared across calls.
struct DecodeContext {
    biff: BiffVersion,
    strings: Vec<String>,
    rows: BTreeMap<u32, BTreeMap<u32, Option<String>>>,
    substream_values: usize,
    warnings: Vec<ImportWarning>,
}

impl DecodeContext {
    fn new() -> Self {
        Self {
            biff: BiffVersion::Biff8,
            strings: Vec::new(),
            rows: BTreeMap::new(),
            substream_values: 0,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, offset: usize, record_id: u16, message: impl Into<String>) {
        let warning = ImportWarning::new(offset, record_id, message);
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Place a cell from a value-bearing record (number, string, boolean).
    fn place(&mut self, cell: cells::DecodedCell) {
        self.put(cell);
        self.substream_values += 1;
    }

    /// Place a formatted empty cell. Blanks widen the row but do not make a substream count as
    /// a sheet with data.
    fn place_blank(&mut self, cell: cells::DecodedCell) {
        self.put(cell);
    }

    fn put(&mut self, (row, col, text): cells::DecodedCell) {
        let row = self.rows.entry(row).or_default();
        // A blank record never clears a value already placed at the same position.
        match (row.get(&col), &text) {
            (Some(Some(_)), None) => {}
            _ => {
                row.insert(col, text);
            }
        }
    }

    fn declare_row(&mut self, row: u32) {
        self.rows.entry(row).or_default();
    }

    fn open_substream(&mut self, record: &LogicalBiffRecord<'_>) {
        self.biff = BiffVersion::from_bof(&record.data);
        self.substream_values = 0;
        log::debug!(
            "BOF at offset {} opens a {:?} substream",
            record.offset,
            self.biff
        );
    }

    /// Returns `true` when the walk should stop.
    fn close_substream(&mut self) -> bool {
        if self.substream_values > 0 {
            return true;
        }
        // Rows and blanks of a substream without values do not carry over to the next one.
        self.rows.clear();
        false
    }

    fn dispatch(&mut self, record: &LogicalBiffRecord<'_>) {
        let data = record.data.as_ref();
        let result = match record.record_id {
            RECORD_SST => {
                let parsed = sst::parse_sst(record);
                log::debug!("SST at offset {} holds {} strings", record.offset, parsed.strings.len());
                self.strings.extend(parsed.strings);
                parsed.error.map_or(Ok(()), Err)
            }
            RECORD_LABELSST => cells::decode_labelsst(data).map(|(row, col, isst)| {
                let text = self.strings.get(isst).cloned();
                if text.is_none() {
                    let message = format!(
                        "shared string index {isst} out of range ({} strings); cell left empty",
                        self.strings.len()
                    );
                    self.warn(record.offset, record.record_id, message);
                }
                self.place((row, col, text));
            }),
            RECORD_LABEL => cells::decode_label(data, self.biff).map(|cell| self.place(cell)),
            RECORD_NUMBER => cells::decode_number(data).map(|cell| self.place(cell)),
            RECORD_RK => cells::decode_rk_record(data).map(|cell| self.place(cell)),
            RECORD_MULRK => cells::decode_mulrk(data).map(|decoded| {
                for cell in decoded {
                    self.place(cell);
                }
            }),
            RECORD_BOOLERR => cells::decode_boolerr(data).map(|cell| {
                if let Some(cell) = cell {
                    self.place(cell);
                }
            }),
            RECORD_BLANK => cells::decode_blank(data).map(|cell| self.place_blank(cell)),
            RECORD_MULBLANK => cells::decode_mulblank(data).map(|decoded| {
                for cell in decoded {
                    self.place_blank(cell);
                }
            }),
            RECORD_ROW => cells::decode_row(data).map(|row| self.declare_row(row)),
            _ => Ok(()),
        };

        if let Err(message) = result {
            self.warn(record.offset, record.record_id, message);
        }
    }

    fn into_sheet(self) -> (RawSheet, Vec<ImportWarning>) {
        let sheet = self
            .rows
            .into_values()
            .map(|cells| {
                let width = cells.keys().next_back().map_or(0, |&col| col as usize + 1);
                let mut row = vec![None; width];
                for (col, text) in cells {
                    row[col as usize] = text;
                }
                row
            })
            .collect();
        (sheet, self.warnings)
    }
}

/// Walk the BIFF record stream starting at `start` and collect the first sheet with data.
///
/// The record at `start` must be a `BOF` whose payload fits in the buffer.
pub(crate) fn decode_sheet(
    stream: &[u8],
    start: usize,
) -> Result<(RawSheet, Vec<ImportWarning>), ImportError> {
    match peek_header(stream, start) {
        Some((record_id, len))
            if is_bof_record(record_id) && start + RECORD_HEADER_LEN + len <= stream.len() => {}
        Some((record_id, _)) => {
            return Err(ImportError::MalformedRecord {
                offset: start,
                record_id: Some(record_id),
            })
        }
        None => {
            return Err(ImportError::MalformedRecord {
                offset: start,
                record_id: None,
            })
        }
    }

    let mut ctx = DecodeContext::new();
    for record in LogicalBiffRecordIter::from_offset(stream, start) {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let (offset, record_id) = match &err {
                    records::RecordError::Truncated {
                        offset, record_id, ..
                    }
                    | records::RecordError::TooLarge {
                        offset, record_id, ..
                    }
                    | records::RecordError::TooManyFragments {
                        offset, record_id, ..
                    } => (*offset, *record_id),
                };
                ctx.warn(offset, record_id, format!("{err}; stopping"));
                break;
            }
        };

        if record.is_oversized() {
            ctx.warn(
                record.offset,
                record.record_id,
                format!(
                    "record declares {} bytes (max {}); skipped",
                    record.first_fragment().len(),
                    records::MAX_RECORD_BYTES
                ),
            );
            continue;
        }

        match record.record_id {
            id if is_bof_record(id) => ctx.open_substream(&record),
            RECORD_EOF => {
                if ctx.close_substream() {
                    break;
                }
            }
            _ => ctx.dispatch(&record),
        }
    }

    Ok(ctx.into_sheet())
}
