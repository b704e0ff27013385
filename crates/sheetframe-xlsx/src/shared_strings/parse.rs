use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use super::SharedStrings;

#[derive(Debug, Error)]
pub enum SharedStringsError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed sharedStrings.xml: {0}")]
    Malformed(&'static str),
}

/// Parse `xl/sharedStrings.xml`.
///
/// Each `<si>` becomes one entry: the concatenation of its direct `<t>` text and any rich-text
/// `<r><t>` runs. Phonetic (`<rPh>`) and unknown subtrees are skipped. Any XML error aborts the
/// parse; a partially-read table is never returned.
pub fn parse_shared_strings_xml(xml: &[u8]) -> Result<SharedStrings, SharedStringsError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(parse_si(&mut reader)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => items.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(SharedStrings::new(items))
}

fn parse_si(reader: &mut Reader<&[u8]>) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                text.push_str(&parse_r(reader)?);
            }
            Event::Start(e) => {
                // `<rPh>` and extension subtrees may contain `<t>` nodes that are not part of
                // the displayed string.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <si>")),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn parse_r(reader: &mut Reader<&[u8]>) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, b"t")?);
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <r>")),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn read_text(reader: &mut Reader<&[u8]>, end_local: &[u8]) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                let t: Cow<'_, str> = e.unescape()?;
                text.push_str(&t);
            }
            Event::CData(e) => {
                text.push_str(std::str::from_utf8(e.as_ref())?);
            }
            Event::End(e) if e.local_name().as_ref() == end_local => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <t>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}
