//! Cell record payload decoding.
//!
//! Each decoder takes the record payload and returns the cells it describes as
//! `(row, col, text)`; `None` text is a blank cell that still widens its row.

use super::strings::parse_label_string;
use super::BiffVersion;

pub(crate) type DecodedCell = (u32, u32, Option<String>);

fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn f64_at(data: &[u8], offset: usize) -> Option<f64> {
    let bytes = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(f64::from_le_bytes(buf))
}

fn short_payload(kind: &str, need: usize, data: &[u8]) -> String {
    format!("{kind} payload is {} bytes, need at least {need}", data.len())
}

fn row_col(data: &[u8]) -> Option<(u32, u32)> {
    Some((u16_at(data, 0)? as u32, u16_at(data, 2)? as u32))
}

/// Shortest round-trip decimal rendering (`25.0` -> `"25"`, `1.5` -> `"1.5"`).
pub(crate) fn format_number(value: f64) -> String {
    value.to_string()
}

/// Decode an RK value [MS-XLS] 2.5.217.
///
/// Bit 0 divides by 100; bit 1 selects a 30-bit signed integer instead of the upper 30 bits of
/// an IEEE-754 double.
pub(crate) fn decode_rk(rk: u32) -> f64 {
    let div_100 = rk & 0x01 != 0;
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & 0xFFFF_FFFC) << 32)
    };
    if div_100 {
        value / 100.0
    } else {
        value
    }
}

/// `NUMBER`: row, col, xf, 8-byte little-endian IEEE-754 double.
pub(crate) fn decode_number(data: &[u8]) -> Result<DecodedCell, String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("NUMBER", 14, data))?;
    let value = f64_at(data, 6).ok_or_else(|| short_payload("NUMBER", 14, data))?;
    Ok((row, col, Some(format_number(value))))
}

/// `RK`: row, col, then an `RkRec` (xf + RK number).
pub(crate) fn decode_rk_record(data: &[u8]) -> Result<DecodedCell, String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("RK", 10, data))?;
    let rk = u32_at(data, 6).ok_or_else(|| short_payload("RK", 10, data))?;
    Ok((row, col, Some(format_number(decode_rk(rk)))))
}

/// `MULRK`: row, first col, N six-byte `RkRec`s, last col.
pub(crate) fn decode_mulrk(data: &[u8]) -> Result<Vec<DecodedCell>, String> {
    if data.len() < 12 {
        return Err(short_payload("MULRK", 12, data));
    }
    let (row, first_col) = row_col(data).ok_or_else(|| short_payload("MULRK", 12, data))?;
    let count = (data.len() - 6) / 6;
    let mut out = Vec::with_capacity(count);
    for idx in 0..count {
        let rk = u32_at(data, 4 + idx * 6 + 2).ok_or_else(|| short_payload("MULRK", 12, data))?;
        out.push((
            row,
            first_col + idx as u32,
            Some(format_number(decode_rk(rk))),
        ));
    }
    Ok(out)
}

/// `LABELSST`: row, col, xf, u32 index into the shared string table.
pub(crate) fn decode_labelsst(data: &[u8]) -> Result<(u32, u32, usize), String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("LABELSST", 10, data))?;
    let isst = u32_at(data, 6).ok_or_else(|| short_payload("LABELSST", 10, data))?;
    Ok((row, col, isst as usize))
}

/// `LABEL`: row, col, xf, then an inline string in the substream's string layout.
pub(crate) fn decode_label(data: &[u8], biff: BiffVersion) -> Result<DecodedCell, String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("LABEL", 8, data))?;
    let rest = data
        .get(6..)
        .ok_or_else(|| short_payload("LABEL", 8, data))?;
    let (text, _) = parse_label_string(rest, biff).map_err(|err| format!("LABEL: {err}"))?;
    Ok((row, col, Some(text)))
}

/// `BOOLERR`: row, col, xf, value byte, error flag. Error cells decode to `None`.
pub(crate) fn decode_boolerr(data: &[u8]) -> Result<Option<DecodedCell>, String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("BOOLERR", 8, data))?;
    let (Some(&value), Some(&is_error)) = (data.get(6), data.get(7)) else {
        return Err(short_payload("BOOLERR", 8, data));
    };
    if is_error != 0 {
        return Ok(None);
    }
    let text = if value != 0 { "true" } else { "false" };
    Ok(Some((row, col, Some(text.to_string()))))
}

/// `BLANK`: row, col, xf.
pub(crate) fn decode_blank(data: &[u8]) -> Result<DecodedCell, String> {
    let (row, col) = row_col(data).ok_or_else(|| short_payload("BLANK", 6, data))?;
    Ok((row, col, None))
}

/// `MULBLANK`: row, first col, N xf indices, last col.
pub(crate) fn decode_mulblank(data: &[u8]) -> Result<Vec<DecodedCell>, String> {
    if data.len() < 8 {
        return Err(short_payload("MULBLANK", 8, data));
    }
    let (row, first_col) = row_col(data).ok_or_else(|| short_payload("MULBLANK", 8, data))?;
    let count = (data.len() - 6) / 2;
    Ok((0..count)
        .map(|idx| (row, first_col + idx as u32, None))
        .collect())
}

/// `ROW`: only the row index is used.
pub(crate) fn decode_row(data: &[u8]) -> Result<u32, String> {
    u16_at(data, 0)
        .map(u32::from)
        .ok_or_else(|| short_payload("ROW", 2, data))
}
