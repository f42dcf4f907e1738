//! ZIP package access shared by the DOCX and ODT extractors.

use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::extraction::ExtractError;

/// Maximum decompressed bytes read from a single package part (zip-bomb protection).
pub const MAX_PART_BYTES: u64 = 50 * 1024 * 1024;

/// Opens `bytes` as a ZIP archive and reads one named part, bounded by `MAX_PART_BYTES`.
pub fn read_part(bytes: &[u8], name: &str) -> Result<Vec<u8>, ExtractError> {
    read_part_bounded(bytes, name, MAX_PART_BYTES)
}

fn read_part_bounded(bytes: &[u8], name: &str, max_bytes: u64) -> Result<Vec<u8>, ExtractError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Zip(e.to_string()))?;

    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ExtractError::MissingPart(name.to_string())),
        Err(e) => return Err(ExtractError::Zip(e.to_string())),
    };

    let mut out = Vec::new();
    entry
        .take(max_bytes + 1)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Zip(e.to_string()))?;

    if out.len() as u64 > max_bytes {
        return Err(ExtractError::Zip(format!(
            "{name} exceeds size limit ({max_bytes} bytes)"
        )));
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds an in-memory ZIP package from `(name, contents)` pairs.
    pub fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in parts {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_package;
    use super::*;

    #[test]
    fn test_read_part_returns_contents() {
        let package = build_package(&[("content.xml", "<doc/>"), ("meta.xml", "<meta/>")]);
        let part = read_part(&package, "content.xml").unwrap();
        assert_eq!(part, b"<doc/>");
    }

    #[test]
    fn test_read_part_missing_entry() {
        let package = build_package(&[("meta.xml", "<meta/>")]);
        let err = read_part(&package, "content.xml").unwrap_err();
        assert!(matches!(err, ExtractError::MissingPart(ref name) if name == "content.xml"));
    }

    #[test]
    fn test_read_part_rejects_non_zip() {
        let err = read_part(b"definitely not a zip file", "content.xml").unwrap_err();
        assert!(matches!(err, ExtractError::Zip(_)));
    }

    #[test]
    fn test_read_part_rejects_truncated_zip() {
        let package = build_package(&[("content.xml", "<doc>some text here</doc>")]);
        let truncated = &package[..package.len() / 2];
        assert!(read_part(truncated, "content.xml").is_err());
    }

    #[test]
    fn test_read_part_enforces_size_limit() {
        let package = build_package(&[("content.xml", "0123456789abcdef")]);
        let err = read_part_bounded(&package, "content.xml", 8).unwrap_err();
        assert!(matches!(err, ExtractError::Zip(ref msg) if msg.contains("size limit")));
    }
}
