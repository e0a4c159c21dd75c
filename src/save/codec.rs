//! Save record encoding
//!
//! Three interchangeable encodings:
//! - Binary: MessagePack with named fields (self-describing, compact)
//! - JSON: pretty-printed, human-editable
//! - XML: one element per field, repeated elements for arrays
//!
//! The format is always chosen by the caller (from settings, an explicit
//! argument, or a file extension). Nothing here sniffs content.

use super::types::*;
use log::warn;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// Encode a record in the given format
pub fn encode(record: &SaveRecord, format: SaveFormat) -> SaveResult<Vec<u8>> {
    match format {
        SaveFormat::Binary => Ok(rmp_serde::to_vec_named(record)?),
        SaveFormat::Json => Ok(serde_json::to_vec_pretty(record)?),
        SaveFormat::Xml => {
            let body = quick_xml::se::to_string(record).map_err(|e| SaveError::Xml(e.to_string()))?;
            let body = escape_edge_whitespace(&body);
            let mut xml = String::with_capacity(XML_DECLARATION.len() + body.len());
            xml.push_str(XML_DECLARATION);
            xml.push_str(&body);
            Ok(xml.into_bytes())
        }
    }
}

/// Replaces whitespace at the edges of element text with character references
///
/// The XML reader trims raw text before unescaping it, so `&#x20;` survives
/// where a literal space would be dropped. Expects serializer output: no
/// attributes and no whitespace between elements.
fn escape_edge_whitespace(body: &str) -> String {
    let mut escaped = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(tag_end) = rest.find('>') {
        escaped.push_str(&rest[..=tag_end]);
        rest = &rest[tag_end + 1..];

        let text_end = rest.find('<').unwrap_or(rest.len());
        let text = &rest[..text_end];
        rest = &rest[text_end..];

        let inner_start = text.len() - text.trim_start_matches(is_xml_space).len();
        let inner = text[inner_start..].trim_end_matches(is_xml_space);
        let inner_end = inner_start + inner.len();

        push_char_refs(&mut escaped, &text[..inner_start]);
        escaped.push_str(inner);
        push_char_refs(&mut escaped, &text[inner_end..]);
    }
    escaped.push_str(rest);

    escaped
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn push_char_refs(out: &mut String, whitespace: &str) {
    for c in whitespace.chars() {
        let _ = write!(out, "&#x{:X};", u32::from(c));
    }
}

/// Decode a record, keeping the reason on failure
pub fn try_decode(bytes: &[u8], format: SaveFormat) -> SaveResult<SaveRecord> {
    match format {
        SaveFormat::Binary => Ok(rmp_serde::from_slice(bytes)?),
        SaveFormat::Json => Ok(serde_json::from_slice(bytes)?),
        SaveFormat::Xml => {
            let text = std::str::from_utf8(bytes).map_err(|e| SaveError::Xml(e.to_string()))?;
            quick_xml::de::from_str(text).map_err(|e| SaveError::Xml(e.to_string()))
        }
    }
}

/// Decode a record; a malformed payload is logged and yields `None`
pub fn decode(bytes: &[u8], format: SaveFormat) -> Option<SaveRecord> {
    match try_decode(bytes, format) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Payload is not a valid {:?} save: {}", format, e);
            None
        }
    }
}

/// Read and decode the file at `path`
///
/// The file is opened, read and closed before this returns.
pub fn read_file(path: &Path, format: SaveFormat) -> SaveResult<SaveRecord> {
    let bytes = fs::read(path)?;
    try_decode(&bytes, format)
}
