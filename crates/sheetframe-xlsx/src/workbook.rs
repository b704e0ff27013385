//! Sheet discovery from `xl/workbook.xml` and its relationships part.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::path::resolve_target;
use crate::XlsxError;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";

/// A `<sheet>` entry resolved to its worksheet part, in workbook tab order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    pub(crate) name: String,
    /// Part name of the worksheet XML, when the relationship could be resolved.
    pub(crate) part: Option<String>,
}

/// Parse `<sheets><sheet name=".." r:id=".."/></sheets>` into `(name, relationship id)` pairs.
pub(crate) fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, Option<String>)>, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"name" => name = Some(attr.unescape_value()?.into_owned()),
                        // `r:id` in the officeDocument relationships namespace; some producers
                        // use a different prefix.
                        key if attr.key.local_name().as_ref() == b"id" && key != b"id" => {
                            rel_id = Some(attr.unescape_value()?.into_owned());
                        }
                        _ => {}
                    }
                }
                if let Some(name) = name {
                    out.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Parse a `.rels` part into `Id -> resolved target part`.
pub(crate) fn parse_relationships(
    source_part: &str,
    xml: &[u8],
) -> Result<HashMap<String, String>, XlsxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut out = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let external = is_external(&e)?;
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (false, Some(id), Some(target)) = (external, id, target) {
                    out.insert(id, resolve_target(source_part, &target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn is_external(e: &BytesStart<'_>) -> Result<bool, XlsxError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"TargetMode" {
            return Ok(attr.unescape_value()?.eq_ignore_ascii_case("External"));
        }
    }
    Ok(false)
}

/// Join workbook sheet entries with their relationship targets.
pub(crate) fn resolve_sheet_entries(
    sheets: Vec<(String, Option<String>)>,
    rels: &HashMap<String, String>,
) -> Vec<SheetEntry> {
    sheets
        .into_iter()
        .map(|(name, rel_id)| SheetEntry {
            part: rel_id.and_then(|id| rels.get(&id).cloned()),
            name,
        })
        .collect()
}
