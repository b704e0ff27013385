//! Shared string table (`SST`) decoding across `CONTINUE` boundaries.

use super::records::LogicalBiffRecord;
use super::strings::{
    decode_8bit, decode_utf16le, STR_FLAG_EXT, STR_FLAG_HIGH_BYTE, STR_FLAG_RICH_TEXT,
};

/// Strings decoded from one `SST` record.
///
/// `error` is set when the table ended early; `strings` then holds everything read before it.
#[derive(Debug, Default)]
pub(crate) struct ParsedSst {
    pub(crate) strings: Vec<String>,
    pub(crate) error: Option<String>,
}

/// Parse `SST`: u32 `cstTotal`, u32 `cstUnique`, then `cstUnique` `XLUnicodeRichExtendedString`s.
pub(crate) fn parse_sst(record: &LogicalBiffRecord<'_>) -> ParsedSst {
    let fragments = record.fragments();
    let mut cursor = FragmentCursor::new(&fragments);
    let mut out = ParsedSst::default();

    let unique = match cursor.read_u32_le().and_then(|_| cursor.read_u32_le()) {
        Ok(unique) => unique as usize,
        Err(err) => {
            out.error = Some(format!("SST header: {err}"));
            return out;
        }
    };

    for idx in 0..unique {
        match cursor.read_xl_unicode_rich_extended_string() {
            Ok(text) => out.strings.push(text),
            Err(err) => {
                out.error = Some(format!("SST string {idx} of {unique}: {err}"));
                break;
            }
        }
    }
    out
}

struct FragmentCursor<'a> {
    fragments: &'a [&'a [u8]],
    frag_idx: usize,
    offset: usize,
}

impl<'a> FragmentCursor<'a> {
    fn new(fragments: &'a [&'a [u8]]) -> Self {
        Self {
            fragments,
            frag_idx: 0,
            offset: 0,
        }
    }

    fn remaining_in_fragment(&self) -> usize {
        self.fragments
            .get(self.frag_idx)
            .map(|f| f.len().saturating_sub(self.offset))
            .unwrap_or(0)
    }

    fn advance_fragment(&mut self) -> Result<(), String> {
        self.frag_idx += 1;
        self.offset = 0;
        if self.frag_idx >= self.fragments.len() {
            return Err("unexpected end of record".to_string());
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, String> {
        loop {
            let frag = self
                .fragments
                .get(self.frag_idx)
                .ok_or_else(|| "unexpected end of record".to_string())?;
            if let Some(&b) = frag.get(self.offset) {
                self.offset += 1;
                return Ok(b);
            }
            self.advance_fragment()?;
        }
    }

    fn read_u16_le(&mut self) -> Result<u16, String> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_u32_le(&mut self) -> Result<u32, String> {
        let lo = self.read_u16_le()?;
        let hi = self.read_u16_le()?;
        Ok(u32::from(lo) | (u32::from(hi) << 16))
    }

    fn skip_bytes(&mut self, mut n: usize) -> Result<(), String> {
        while n > 0 {
            let available = self.remaining_in_fragment();
            if available == 0 {
                self.advance_fragment()?;
                continue;
            }
            let take = n.min(available);
            self.offset += take;
            n -= take;
        }
        Ok(())
    }

    /// Read `cch` characters. A string continued into the next fragment re-states its
    /// `fHighByte` flag in a one-byte prefix, so the encoding may switch mid-string.
    fn read_chars(&mut self, cch: usize, initial_is_unicode: bool) -> Result<String, String> {
        let mut is_unicode = initial_is_unicode;
        let mut remaining = cch;
        let mut out = String::new();

        while remaining > 0 {
            if self.remaining_in_fragment() == 0 {
                self.advance_fragment()?;
                let flags = self.read_u8()?;
                is_unicode = flags & STR_FLAG_HIGH_BYTE != 0;
                continue;
            }

            let bytes_per_char = if is_unicode { 2 } else { 1 };
            let available_chars = self.remaining_in_fragment() / bytes_per_char;
            if available_chars == 0 {
                return Err("string continuation split mid-character".to_string());
            }

            let take = remaining.min(available_chars);
            let start = self.offset;
            let end = start + take * bytes_per_char;
            let frag = self
                .fragments
                .get(self.frag_idx)
                .and_then(|f| f.get(start..end))
                .ok_or_else(|| "unexpected end of record".to_string())?;
            if is_unicode {
                out.push_str(&decode_utf16le(frag));
            } else {
                out.push_str(&decode_8bit(frag));
            }
            self.offset = end;
            remaining -= take;
        }

        Ok(out)
    }

    /// `XLUnicodeRichExtendedString` [MS-XLS] 2.5.293; formatting runs and phonetic data are
    /// skipped.
    fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, String> {
        let cch = self.read_u16_le()? as usize;
        let flags = self.read_u8()?;

        let runs = if flags & STR_FLAG_RICH_TEXT != 0 {
            self.read_u16_le()? as usize
        } else {
            0
        };
        let ext_len = if flags & STR_FLAG_EXT != 0 {
            self.read_u32_le()? as usize
        } else {
            0
        };

        let text = self.read_chars(cch, flags & STR_FLAG_HIGH_BYTE != 0)?;
        self.skip_bytes(runs * 4)?;
        self.skip_bytes(ext_len)?;
        Ok(text)
    }
}
