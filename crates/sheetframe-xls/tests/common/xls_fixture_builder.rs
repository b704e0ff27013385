#![allow(dead_code)]

use std::io::{Cursor, Write};

// Just enough BIFF to exercise the importer. Record ids stay named so fixtures read clearly.
pub const RECORD_BOF: u16 = 0x0809;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_SST: u16 = 0x00FC;
pub const RECORD_LABELSST: u16 = 0x00FD;
pub const RECORD_LABEL: u16 = 0x0204;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_RK: u16 = 0x027E;
pub const RECORD_BOOLERR: u16 = 0x0205;
pub const RECORD_ROW: u16 = 0x0208;
pub const RECORD_BLANK: u16 = 0x0201;
pub const RECORD_CODEPAGE: u16 = 0x0042;
pub const RECORD_INTERFACEEND: u16 = 0x00E2;
pub const RECORD_DRAWINGGROUP: u16 = 0x00EB;

const BOF_VERSION_BIFF8: u16 = 0x0600;
const BOF_VERSION_BIFF5: u16 = 0x0500;
const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;

const XF_GENERAL_CELL: u16 = 15;

pub fn record(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn bof(version: u16, dt: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&version.to_le_bytes());
    payload.extend_from_slice(&dt.to_le_bytes());
    payload.extend_from_slice(&0x0DBBu16.to_le_bytes()); // build
    payload.extend_from_slice(&0x07CCu16.to_le_bytes()); // year
    payload.extend_from_slice(&[0; 8]);
    record(RECORD_BOF, &payload)
}

pub fn bof_globals() -> Vec<u8> {
    bof(BOF_VERSION_BIFF8, BOF_DT_WORKBOOK_GLOBALS)
}

pub fn bof_worksheet() -> Vec<u8> {
    bof(BOF_VERSION_BIFF8, BOF_DT_WORKSHEET)
}

pub fn bof_worksheet_biff5() -> Vec<u8> {
    bof(BOF_VERSION_BIFF5, BOF_DT_WORKSHEET)
}

pub fn eof() -> Vec<u8> {
    record(RECORD_EOF, &[])
}

fn cell_header(row: u16, col: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&row.to_le_bytes());
    out.extend_from_slice(&col.to_le_bytes());
    out.extend_from_slice(&XF_GENERAL_CELL.to_le_bytes());
    out
}

pub fn number(row: u16, col: u16, value: f64) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&value.to_le_bytes());
    record(RECORD_NUMBER, &payload)
}

pub fn rk_int(row: u16, col: u16, value: i32) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&(((value << 2) as u32) | 0x02).to_le_bytes());
    record(RECORD_RK, &payload)
}

pub fn labelsst(row: u16, col: u16, isst: u32) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&isst.to_le_bytes());
    record(RECORD_LABELSST, &payload)
}

/// BIFF8 `LABEL` with a compressed (8-bit) `XLUnicodeString`.
pub fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&(text.len() as u16).to_le_bytes());
    payload.push(0);
    payload.extend_from_slice(text.as_bytes());
    record(RECORD_LABEL, &payload)
}

/// BIFF8 `LABEL` with UTF-16LE characters.
pub fn label_utf16(row: u16, col: u16, text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&(units.len() as u16).to_le_bytes());
    payload.push(0x01);
    for unit in units {
        payload.extend_from_slice(&unit.to_le_bytes());
    }
    record(RECORD_LABEL, &payload)
}

/// BIFF5 `LABEL`: u16 length and raw bytes.
pub fn label_biff5(row: u16, col: u16, bytes: &[u8]) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    payload.extend_from_slice(bytes);
    record(RECORD_LABEL, &payload)
}

pub fn boolean(row: u16, col: u16, value: bool) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&[u8::from(value), 0]);
    record(RECORD_BOOLERR, &payload)
}

pub fn error_cell(row: u16, col: u16, code: u8) -> Vec<u8> {
    let mut payload = cell_header(row, col);
    payload.extend_from_slice(&[code, 1]);
    record(RECORD_BOOLERR, &payload)
}

pub fn blank(row: u16, col: u16) -> Vec<u8> {
    record(RECORD_BLANK, &cell_header(row, col))
}

pub fn row(index: u16) -> Vec<u8> {
    let mut payload = index.to_le_bytes().to_vec();
    payload.extend_from_slice(&[0; 14]);
    record(RECORD_ROW, &payload)
}

fn xl_unicode_string(text: &str) -> Vec<u8> {
    let mut out = (text.len() as u16).to_le_bytes().to_vec();
    out.push(0);
    out.extend_from_slice(text.as_bytes());
    out
}

/// `SST` holding `strings`, all 8-bit, in a single physical record.
pub fn sst(strings: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for text in strings {
        payload.extend_from_slice(&xl_unicode_string(text));
    }
    record(RECORD_SST, &payload)
}

/// `SST` whose last string is split across a `CONTINUE` record after `split_at` characters.
pub fn sst_with_continue(strings: &[&str], split_at: usize) -> Vec<u8> {
    let (last, head) = strings.split_last().expect("at least one string");
    let mut payload = Vec::new();
    payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for text in head {
        payload.extend_from_slice(&xl_unicode_string(text));
    }
    payload.extend_from_slice(&(last.len() as u16).to_le_bytes());
    payload.push(0);
    payload.extend_from_slice(&last.as_bytes()[..split_at]);

    let mut continued = vec![0u8];
    continued.extend_from_slice(&last.as_bytes()[split_at..]);

    [record(RECORD_SST, &payload), record(RECORD_CONTINUE, &continued)].concat()
}

/// Globals substream (with `SST`) followed by one worksheet substream holding `cells`.
pub fn workbook_stream(shared: &[&str], cells: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(bof_globals());
    out.extend(record(RECORD_CODEPAGE, &1200u16.to_le_bytes()));
    out.extend(record(RECORD_INTERFACEEND, &[]));
    if !shared.is_empty() {
        out.extend(sst(shared));
    }
    out.extend(eof());
    out.extend(bof_worksheet());
    for cell in cells {
        out.extend_from_slice(cell);
    }
    out.extend(eof());
    out
}

/// The `name`/`age` sheet used across tests: header plus two people.
pub fn people_stream() -> Vec<u8> {
    workbook_stream(
        &["name", "age", "Alice", "Bob"],
        &[
            labelsst(0, 0, 0),
            labelsst(0, 1, 1),
            labelsst(1, 0, 2),
            number(1, 1, 25.0),
            labelsst(2, 0, 3),
            rk_int(2, 1, 30),
        ],
    )
}

/// Pad `stream` past the compound-file mini-stream cutoff so its bytes land in regular sectors.
fn pad_for_regular_sectors(mut stream: Vec<u8>) -> Vec<u8> {
    while stream.len() < 4096 {
        stream.extend(record(RECORD_DRAWINGGROUP, &[0; 512]));
    }
    stream
}

/// Wrap `workbook_stream` as the `Workbook` stream of an OLE2 compound document.
pub fn ole_wrapped(workbook_stream: Vec<u8>) -> Vec<u8> {
    let workbook_stream = pad_for_regular_sectors(workbook_stream);
    let cursor = Cursor::new(Vec::new());
    let mut ole = cfb::CompoundFile::create(cursor).expect("create cfb");
    {
        let mut stream = ole.create_stream("Workbook").expect("Workbook stream");
        stream
            .write_all(&workbook_stream)
            .expect("write Workbook stream");
    }
    ole.into_inner().into_inner()
}

/// A hand-laid OLE2 buffer: compound-file signature, zeroed sectors, and `workbook_stream` copied
/// in at `offset`.
pub fn ole_with_stream_at(workbook_stream: &[u8], offset: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; offset + workbook_stream.len() + 512];
    bytes[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    bytes[offset..offset + workbook_stream.len()].copy_from_slice(workbook_stream);
    bytes
}
