use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::XlsxError;

/// Default maximum uncompressed size permitted for any single ZIP part inflated into memory.
///
/// Guards against ZIP bombs and forged `uncompressed_size` metadata.
pub const DEFAULT_MAX_ZIP_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Canonical form of a ZIP entry name for tolerant comparisons:
/// - percent-decodes valid `%xx` sequences
/// - strips leading `/` or `\` separators
/// - normalizes `\` to `/`
/// - ASCII-lowercases
pub(crate) fn zip_part_name_key(name: &str) -> Vec<u8> {
    let mut bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_leading_separators = true;
    while let Some(&b) = bytes.first() {
        let decoded = if b == b'%' && bytes.len() >= 3 {
            match (hex_val(bytes[1]), hex_val(bytes[2])) {
                (Some(hi), Some(lo)) => {
                    bytes = &bytes[3..];
                    (hi << 4) | lo
                }
                _ => {
                    bytes = &bytes[1..];
                    b
                }
            }
        } else {
            bytes = &bytes[1..];
            b
        };

        if in_leading_separators && matches!(decoded, b'/' | b'\\') {
            continue;
        }
        in_leading_separators = false;

        out.push(if decoded == b'\\' {
            b'/'
        } else {
            decoded.to_ascii_lowercase()
        });
    }
    out
}

pub(crate) fn zip_part_names_equivalent(a: &str, b: &str) -> bool {
    zip_part_name_key(a) == zip_part_name_key(b)
}

/// Find the archive index of `name`, tolerating common producer mistakes (leading `/`,
/// Windows-style separators, ASCII case). An exact match always wins.
pub(crate) fn find_zip_part<R: Read + Seek>(archive: &ZipArchive<R>, name: &str) -> Option<usize> {
    fn is_alt_slash_variant(entry: &str, name: &str) -> bool {
        if let Some(stripped) = name.strip_prefix('/') {
            entry == stripped
        } else {
            entry.strip_prefix('/').is_some_and(|rest| rest == name)
        }
    }

    let mut candidate = None::<(usize, u8)>;
    for (idx, entry) in archive.file_names().enumerate() {
        if entry == name {
            return Some(idx);
        }
        if is_alt_slash_variant(entry, name) {
            candidate = Some((idx, 2));
            continue;
        }
        if zip_part_names_equivalent(entry, name) && candidate.map_or(true, |(_, score)| score < 1)
        {
            candidate = Some((idx, 1));
        }
    }
    candidate.map(|(idx, _)| idx)
}

/// Find a part whose final path segment(s) equal `suffix`.
///
/// Parts under `preferred_dir` win over matches elsewhere in the package; among equal matches
/// the first entry in archive order is returned.
pub(crate) fn find_zip_part_by_suffix<R: Read + Seek>(
    archive: &ZipArchive<R>,
    preferred_dir: &str,
    suffix: &str,
) -> Option<String> {
    let suffix_key = zip_part_name_key(suffix);
    let mut preferred_key = zip_part_name_key(preferred_dir);
    if !preferred_key.ends_with(b"/") {
        preferred_key.push(b'/');
    }

    let mut fallback = None;
    for entry in archive.file_names() {
        let key = zip_part_name_key(entry);
        let matches = key == suffix_key
            || (key.ends_with(&suffix_key)
                && key.len() > suffix_key.len()
                && key[key.len() - suffix_key.len() - 1] == b'/');
        if !matches {
            continue;
        }
        if key.starts_with(&preferred_key) {
            return Some(entry.to_string());
        }
        if fallback.is_none() {
            fallback = Some(entry.to_string());
        }
    }
    fallback
}

/// Read a ZIP part into memory, returning `Ok(None)` when the entry does not exist.
///
/// The declared uncompressed size is checked first, and the read itself is capped at
/// `max_part_bytes + 1` so forged metadata cannot inflate past the limit.
pub(crate) fn read_zip_part_optional_with_limit<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    max_part_bytes: u64,
) -> Result<Option<Vec<u8>>, XlsxError> {
    let Some(idx) = find_zip_part(archive, name) else {
        return Ok(None);
    };

    let file = archive.by_index(idx)?;
    if file.is_dir() {
        return Ok(None);
    }

    let declared_size = file.size();
    if declared_size > max_part_bytes {
        return Err(XlsxError::PartTooLarge {
            part: name.to_string(),
            size: declared_size,
            max: max_part_bytes,
        });
    }

    let mut buf = Vec::new();
    let read_limit = max_part_bytes.checked_add(1).unwrap_or(u64::MAX);
    file.take(read_limit).read_to_end(&mut buf)?;

    let observed = buf.len() as u64;
    if observed > max_part_bytes {
        return Err(XlsxError::PartTooLarge {
            part: name.to_string(),
            size: observed,
            max: max_part_bytes,
        });
    }

    Ok(Some(buf))
}
