//! Heuristic location of the BIFF stream inside an OLE2 compound document.
//!
//! This does not walk the compound-file directory. It probes a few sector-aligned offsets where
//! the workbook stream usually starts and falls back to scanning every 512-byte sector.

use crate::biff::records::{is_bof_record, peek_header};

/// Offsets probed before falling back to the sector scan.
pub const FIXED_PROBE_OFFSETS: [usize; 4] = [512, 1024, 2048, 4096];

/// Sector size used by the fallback scan.
pub const SECTOR_STRIDE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    FixedProbe,
    StrideScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLocation {
    pub offset: usize,
    pub strategy: LocateStrategy,
}

fn has_bof_signature(bytes: &[u8], offset: usize) -> bool {
    peek_header(bytes, offset).is_some_and(|(record_id, _)| is_bof_record(record_id))
}

/// Find the first plausible BIFF `BOF` record in an OLE2-wrapped buffer.
pub fn locate_biff_stream(bytes: &[u8]) -> Option<StreamLocation> {
    if let Some(offset) = FIXED_PROBE_OFFSETS
        .into_iter()
        .find(|&offset| has_bof_signature(bytes, offset))
    {
        log::debug!("BIFF stream found at fixed offset {offset}");
        return Some(StreamLocation {
            offset,
            strategy: LocateStrategy::FixedProbe,
        });
    }

    let offset = (SECTOR_STRIDE..bytes.len())
        .step_by(SECTOR_STRIDE)
        .find(|&offset| has_bof_signature(bytes, offset))?;
    log::debug!("BIFF stream found by sector scan at offset {offset}");
    Some(StreamLocation {
        offset,
        strategy: LocateStrategy::StrideScan,
    })
}
