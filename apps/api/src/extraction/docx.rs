//! DOCX extractor: text runs from `word/document.xml` in document order.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::extraction::package::read_part;
use crate::extraction::{xml_text, ExtractError};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts the raw text of a Word-processing package.
///
/// Only `w:t` runs contribute text. Tabs become `\t`, explicit breaks become newlines
/// and every paragraph is closed by a blank line. Styles, fields and embedded objects
/// are skipped.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_part(bytes, DOCUMENT_PART)?;
    extract_runs(&xml)
}

fn extract_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => out.push_str(&xml_text(&e)),
            Ok(Event::CData(e)) if in_text_run => {
                out.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::package::test_support::build_package;

    fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>{body}</w:body>
</w:document>"#
        )
    }

    #[test]
    fn test_extract_docx_paragraphs_in_order() {
        let xml = document_xml(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Ada Lovelace</w:t></w:r></w:p>
               <w:p><w:r><w:t xml:space="preserve">Analytical </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Engine</w:t></w:r></w:p>"#,
        );
        let package = build_package(&[("word/document.xml", &xml)]);

        let text = extract_docx(&package).unwrap();
        let lines: Vec<&str> = text.split("\n\n").map(str::trim).collect();
        assert_eq!(lines[0], "Ada Lovelace");
        assert_eq!(lines[1], "Analytical Engine");
    }

    #[test]
    fn test_extract_docx_tabs_and_breaks() {
        let xml = document_xml(
            r#"<w:p><w:r><w:t>Skills</w:t><w:tab/><w:t>Rust</w:t><w:br/><w:t>Go</w:t></w:r></w:p>"#,
        );
        let package = build_package(&[("word/document.xml", &xml)]);

        let text = extract_docx(&package).unwrap();
        assert!(text.starts_with("Skills\tRust\nGo"));
    }

    #[test]
    fn test_extract_docx_ignores_markup_text_outside_runs() {
        let xml = document_xml(
            r#"<w:p><w:r><w:instrText>PAGE \* MERGEFORMAT</w:instrText><w:t>Visible</w:t></w:r></w:p>"#,
        );
        let package = build_package(&[("word/document.xml", &xml)]);

        let text = extract_docx(&package).unwrap();
        assert_eq!(text.trim(), "Visible");
    }

    #[test]
    fn test_extract_docx_unescapes_entities() {
        let xml = document_xml(r#"<w:p><w:r><w:t>R&amp;D &lt;lead&gt;</w:t></w:r></w:p>"#);
        let package = build_package(&[("word/document.xml", &xml)]);

        assert_eq!(extract_docx(&package).unwrap().trim(), "R&D <lead>");
    }

    #[test]
    fn test_extract_docx_missing_document_part() {
        let package = build_package(&[("word/styles.xml", "<w:styles/>")]);
        let err = extract_docx(&package).unwrap_err();
        assert!(matches!(err, ExtractError::MissingPart(_)));
    }

    #[test]
    fn test_extract_docx_corrupt_zip() {
        let err = extract_docx(b"PK\x03\x04 this is not really a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Zip(_)));
    }

    #[test]
    fn test_extract_docx_malformed_xml() {
        let package = build_package(&[(
            "word/document.xml",
            "<w:document><w:body><w:p><w:t>oops</w:p></w:body>",
        )]);
        let err = extract_docx(&package).unwrap_err();
        assert!(matches!(err, ExtractError::Xml(_)));
    }
}
