use std::borrow::Cow;

use thiserror::Error;

/// BIFF8 `BOF` record id.
pub(crate) const RECORD_BOF_BIFF8: u16 = 0x0809;
/// Alternate `BOF` record id accepted for BIFF5-era streams.
pub(crate) const RECORD_BOF_BIFF5: u16 = 0x0805;
pub(crate) const RECORD_EOF: u16 = 0x000A;
pub(crate) const RECORD_CONTINUE: u16 = 0x003C;
pub(crate) const RECORD_SST: u16 = 0x00FC;
pub(crate) const RECORD_LABELSST: u16 = 0x00FD;
pub(crate) const RECORD_LABEL: u16 = 0x0204;
pub(crate) const RECORD_NUMBER: u16 = 0x0203;
pub(crate) const RECORD_RK: u16 = 0x027E;
pub(crate) const RECORD_MULRK: u16 = 0x00BD;
pub(crate) const RECORD_BOOLERR: u16 = 0x0205;
pub(crate) const RECORD_ROW: u16 = 0x0208;
pub(crate) const RECORD_BLANK: u16 = 0x0201;
pub(crate) const RECORD_MULBLANK: u16 = 0x00BE;

/// Size of a physical record header: u16 record id + u16 payload length.
pub(crate) const RECORD_HEADER_LEN: usize = 4;

/// Largest payload a single physical BIFF8 record may carry. Longer declared lengths are treated as
/// corruption and the record is skipped.
pub const MAX_RECORD_BYTES: usize = 8224;

// Hard caps for coalescing `CONTINUE` fragments into one logical record.
#[cfg(not(test))]
pub(crate) const MAX_LOGICAL_RECORD_BYTES: usize = 16 * 1024 * 1024;
#[cfg(test)]
pub(crate) const MAX_LOGICAL_RECORD_BYTES: usize = 1024;

#[cfg(not(test))]
pub(crate) const MAX_LOGICAL_RECORD_FRAGMENTS: usize = 4096;
#[cfg(test)]
pub(crate) const MAX_LOGICAL_RECORD_FRAGMENTS: usize = 64;

pub(crate) fn is_bof_record(record_id: u16) -> bool {
    record_id == RECORD_BOF_BIFF8 || record_id == RECORD_BOF_BIFF5
}

/// Only the shared string table is split across `CONTINUE` records by the cell decoder.
pub(crate) fn allows_continuation(record_id: u16) -> bool {
    record_id == RECORD_SST
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RecordError {
    #[error(
        "BIFF record 0x{record_id:04X} at offset {offset} declares {declared} bytes but only {available} remain"
    )]
    Truncated {
        offset: usize,
        record_id: u16,
        declared: usize,
        available: usize,
    },
    #[error(
        "logical BIFF record 0x{record_id:04X} at offset {offset} exceeds max continued size ({max} bytes)"
    )]
    TooLarge {
        offset: usize,
        record_id: u16,
        max: usize,
    },
    #[error(
        "logical BIFF record 0x{record_id:04X} at offset {offset} exceeds max continued fragments ({max} fragments)"
    )]
    TooManyFragments {
        offset: usize,
        record_id: u16,
        max: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BiffRecord<'a> {
    /// Offset of the record header in the parent stream.
    pub(crate) offset: usize,
    pub(crate) record_id: u16,
    pub(crate) data: &'a [u8],
}

impl BiffRecord<'_> {
    pub(crate) fn is_oversized(&self) -> bool {
        self.data.len() > MAX_RECORD_BYTES
    }
}

/// Read the record header at `offset` without consuming it.
pub(crate) fn peek_header(stream: &[u8], offset: usize) -> Option<(u16, usize)> {
    let header = stream.get(offset..offset.checked_add(RECORD_HEADER_LEN)?)?;
    Some((
        u16::from_le_bytes([header[0], header[1]]),
        u16::from_le_bytes([header[2], header[3]]) as usize,
    ))
}

/// Iterator over physical BIFF records.
///
/// Fewer than four remaining bytes is a clean end of stream. A payload that runs past the end of
/// the buffer yields [`RecordError::Truncated`] and terminates iteration, since nothing after it
/// can be resynchronised.
pub(crate) struct BiffRecordIter<'a> {
    stream: &'a [u8],
    offset: usize,
}

impl<'a> BiffRecordIter<'a> {
    pub(crate) fn from_offset(stream: &'a [u8], offset: usize) -> Self {
        Self {
            stream,
            offset: offset.min(stream.len()),
        }
    }
}

impl<'a> Iterator for BiffRecordIter<'a> {
    type Item = Result<BiffRecord<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (record_id, len) = match peek_header(self.stream, self.offset) {
            Some(header) => header,
            None => {
                self.offset = self.stream.len();
                return None;
            }
        };

        let offset = self.offset;
        let data_start = offset + RECORD_HEADER_LEN;
        let data_end = data_start.saturating_add(len);
        let Some(data) = self.stream.get(data_start..data_end) else {
            self.offset = self.stream.len();
            return Some(Err(RecordError::Truncated {
                offset,
                record_id,
                declared: len,
                available: self.stream.len() - data_start,
            }));
        };

        self.offset = data_end;
        Some(Ok(BiffRecord {
            offset,
            record_id,
            data,
        }))
    }
}

/// A logical BIFF record: the physical record plus any `CONTINUE` fragments that followed it,
/// concatenated into `data`.
///
/// `fragment_sizes` keeps the physical boundaries; continued BIFF8 strings re-state their
/// encoding flags at the start of each fragment.
#[derive(Debug, Clone)]
pub(crate) struct LogicalBiffRecord<'a> {
    pub(crate) offset: usize,
    pub(crate) record_id: u16,
    pub(crate) data: Cow<'a, [u8]>,
    pub(crate) fragment_sizes: Vec<usize>,
}

impl<'a> LogicalBiffRecord<'a> {
    fn single(record: BiffRecord<'a>) -> Self {
        Self {
            offset: record.offset,
            record_id: record.record_id,
            data: Cow::Borrowed(record.data),
            fragment_sizes: vec![record.data.len()],
        }
    }

    pub(crate) fn first_fragment(&self) -> &[u8] {
        let first_len = self.fragment_sizes.first().copied().unwrap_or(0);
        self.data.get(0..first_len).unwrap_or_default()
    }

    /// True when the leading physical record declared more than [`MAX_RECORD_BYTES`].
    pub(crate) fn is_oversized(&self) -> bool {
        self.first_fragment().len() > MAX_RECORD_BYTES
    }

    pub(crate) fn fragments(&self) -> Vec<&[u8]> {
        let mut out = Vec::with_capacity(self.fragment_sizes.len());
        let mut start = 0usize;
        for size in &self.fragment_sizes {
            let end = start + size;
            if let Some(fragment) = self.data.get(start..end) {
                out.push(fragment);
            }
            start = end;
        }
        out
    }
}

/// Iterates over BIFF records, combining `CONTINUE` fragments for record ids accepted by
/// [`allows_continuation`].
pub(crate) struct LogicalBiffRecordIter<'a> {
    iter: std::iter::Peekable<BiffRecordIter<'a>>,
    finished: bool,
}

impl<'a> LogicalBiffRecordIter<'a> {
    pub(crate) fn from_offset(stream: &'a [u8], offset: usize) -> Self {
        Self {
            iter: BiffRecordIter::from_offset(stream, offset).peekable(),
            finished: false,
        }
    }
}

impl<'a> Iterator for LogicalBiffRecordIter<'a> {
    type Item = Result<LogicalBiffRecord<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let first = match self.iter.next()? {
            Ok(record) => record,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };

        if !allows_continuation(first.record_id) || first.is_oversized() {
            return Some(Ok(LogicalBiffRecord::single(first)));
        }

        // Only allocate when a CONTINUE actually follows.
        match self.iter.peek() {
            Some(Ok(next)) if next.record_id == RECORD_CONTINUE && !next.is_oversized() => {}
            _ => return Some(Ok(LogicalBiffRecord::single(first))),
        }

        let mut fragment_sizes = vec![first.data.len()];
        let mut combined = first.data.to_vec();

        while let Some(Ok(next)) = self.iter.peek() {
            // An oversized CONTINUE is left in place and skipped as its own record.
            if next.record_id != RECORD_CONTINUE || next.is_oversized() {
                break;
            }
            let next = *next;
            self.iter.next();

            if combined.len() + next.data.len() > MAX_LOGICAL_RECORD_BYTES {
                self.finished = true;
                return Some(Err(RecordError::TooLarge {
                    offset: first.offset,
                    record_id: first.record_id,
                    max: MAX_LOGICAL_RECORD_BYTES,
                }));
            }
            if fragment_sizes.len() >= MAX_LOGICAL_RECORD_FRAGMENTS {
                self.finished = true;
                return Some(Err(RecordError::TooManyFragments {
                    offset: first.offset,
                    record_id: first.record_id,
                    max: MAX_LOGICAL_RECORD_FRAGMENTS,
                }));
            }

            fragment_sizes.push(next.data.len());
            combined.extend_from_slice(next.data);
        }

        Some(Ok(LogicalBiffRecord {
            offset: first.offset,
            record_id: first.record_id,
            data: Cow::Owned(combined),
            fragment_sizes,
        }))
    }
}
