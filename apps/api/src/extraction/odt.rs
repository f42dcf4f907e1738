//! ODT extractor: streams `content.xml` and collects text fragments in document
//! order. Element names are matched without their namespace prefix.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::extraction::normalize::collapse_whitespace;
use crate::extraction::package::read_part;
use crate::extraction::{xml_text, ExtractError};

const CONTENT_PART: &str = "content.xml";

/// Nesting limit for `content.xml`. Real documents stay far below it.
pub(crate) const MAX_ELEMENT_DEPTH: usize = 512;

/// Extracts the text of an OpenDocument Text package.
pub fn extract_odt(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_part(bytes, CONTENT_PART)?;
    let fragments = collect_fragments(&xml)?;

    let joined = fragments.join(" ").replace('\u{a0}', " ");
    Ok(collapse_whitespace(&joined))
}

/// Text fragments of every element in document order. `tab` yields a tab and
/// `s` / `line-break` a single space; their own content is ignored. Paragraphs,
/// headings, spans and unknown elements contribute their nested text.
fn collect_fragments(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    // Depth of an open `tab`/`s`/`line-break` whose content is skipped.
    let mut skip_from: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth > MAX_ELEMENT_DEPTH {
                    return Err(ExtractError::Xml(format!(
                        "{CONTENT_PART} nests deeper than {MAX_ELEMENT_DEPTH} elements"
                    )));
                }
                if skip_from.is_none() {
                    if let Some(fragment) = marker(e.local_name().as_ref()) {
                        fragments.push(fragment.to_string());
                        skip_from = Some(depth);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_from.is_none() {
                    if let Some(fragment) = marker(e.local_name().as_ref()) {
                        fragments.push(fragment.to_string());
                    }
                }
            }
            Ok(Event::Text(e)) if skip_from.is_none() => fragments.push(xml_text(&e)),
            Ok(Event::CData(e)) if skip_from.is_none() => {
                fragments.push(String::from_utf8_lossy(&e).into_owned())
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return Err(ExtractError::Xml("unexpected closing tag".to_string()));
                }
                if skip_from == Some(depth) {
                    skip_from = None;
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(ExtractError::Xml(format!(
            "{depth} unclosed element(s) in {CONTENT_PART}"
        )));
    }
    Ok(fragments)
}

fn marker(local_name: &[u8]) -> Option<&'static str> {
    match local_name {
        b"tab" => Some("\t"),
        b"s" | b"line-break" => Some(" "),
        _ => None,
    }
}
