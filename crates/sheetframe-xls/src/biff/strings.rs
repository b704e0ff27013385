use encoding_rs::{UTF_16LE, WINDOWS_1252};

use super::BiffVersion;

// BIFF8 string option flags. See [MS-XLS] 2.5.293 (XLUnicodeRichExtendedString) and 2.5.294.
pub(crate) const STR_FLAG_HIGH_BYTE: u8 = 0x01;
pub(crate) const STR_FLAG_EXT: u8 = 0x04;
pub(crate) const STR_FLAG_RICH_TEXT: u8 = 0x08;

/// Keep printable ASCII plus tab, newline and carriage return.
pub(crate) fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, ' '..='~' | '\t' | '\n' | '\r'))
        .collect()
}

/// Decode "compressed" 8-bit character data.
pub(crate) fn decode_8bit(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    sanitize(&text)
}

/// Decode UTF-16LE character data.
pub(crate) fn decode_utf16le(bytes: &[u8]) -> String {
    let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
    sanitize(&text)
}

/// Parse the string payload of a `LABEL` record, returning the text and bytes consumed.
pub(crate) fn parse_label_string(input: &[u8], biff: BiffVersion) -> Result<(String, usize), String> {
    match biff {
        BiffVersion::Biff8 => parse_biff8_unicode_string(input),
        BiffVersion::Biff5 => parse_biff5_byte_string(input),
    }
}

/// BIFF8 `XLUnicodeString`: u16 character count, option flags, then 8-bit or UTF-16LE chars.
pub(crate) fn parse_biff8_unicode_string(input: &[u8]) -> Result<(String, usize), String> {
    if input.len() < 3 {
        return Err("truncated XLUnicodeString header".to_string());
    }
    let cch = u16::from_le_bytes([input[0], input[1]]) as usize;
    let flags = input[2];
    let mut offset = 3usize;

    let mut rich_runs = 0usize;
    let mut ext_len = 0usize;
    if flags & STR_FLAG_RICH_TEXT != 0 {
        let bytes = input
            .get(offset..offset + 2)
            .ok_or_else(|| "truncated rich text run count".to_string())?;
        rich_runs = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        offset += 2;
    }
    if flags & STR_FLAG_EXT != 0 {
        let bytes = input
            .get(offset..offset + 4)
            .ok_or_else(|| "truncated extended string size".to_string())?;
        ext_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        offset += 4;
    }

    let char_bytes = if flags & STR_FLAG_HIGH_BYTE != 0 {
        cch * 2
    } else {
        cch
    };
    let chars = input
        .get(offset..offset + char_bytes)
        .ok_or_else(|| format!("string declares {cch} characters but payload is too short"))?;
    let text = if flags & STR_FLAG_HIGH_BYTE != 0 {
        decode_utf16le(chars)
    } else {
        decode_8bit(chars)
    };
    offset += char_bytes;

    let trailing = rich_runs * 4 + ext_len;
    if input.len() < offset + trailing {
        return Err("truncated string formatting runs".to_string());
    }
    Ok((text, offset + trailing))
}

/// BIFF5 byte string: u16 length followed by 8-bit characters.
pub(crate) fn parse_biff5_byte_string(input: &[u8]) -> Result<(String, usize), String> {
    if input.len() < 2 {
        return Err("truncated byte string header".to_string());
    }
    let len = u16::from_le_bytes([input[0], input[1]]) as usize;
    let bytes = input
        .get(2..2 + len)
        .ok_or_else(|| format!("byte string declares {len} bytes but payload is too short"))?;
    Ok((decode_8bit(bytes), 2 + len))
}
