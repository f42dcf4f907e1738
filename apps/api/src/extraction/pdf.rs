//! PDF extractor: layered heuristics over the raw bytes, no object-model parsing.
//!
//! Tiers, tried in order by the dispatcher:
//! 1. `text_operators`: string operands inside `BT … ET` text objects.
//! 2. `stream_scan`: printable runs inside `stream … endstream` blocks, keeping only
//!    fragments longer than 10 characters.
//! 3. `raw_printable`: the whole buffer decoded as UTF-8 with non-printables removed.
//!
//! Compressed content streams defeat tiers 1 and 2; tier 3 then returns whatever
//! printable noise the file contains. That is a known limitation of the heuristic.
//! `structured` wraps the `pdf-extract` crate and is only used when enabled in config.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::extraction::normalize::{collapse_whitespace, strip_non_printable};
use crate::extraction::ExtractError;

/// Fragments from `stream` blocks must be longer than this to count as text.
const MIN_STREAM_FRAGMENT_CHARS: usize = 10;

/// TJ kerning offsets at or below this value are treated as a word gap.
const TJ_WORD_GAP: f32 = -200.0;

lazy_static! {
    static ref RE_TEXT_OBJECT: Regex = Regex::new(r"(?s-u)\bBT\b(.*?)\bET\b").unwrap();
    static ref RE_STREAM: Regex = Regex::new(r"(?s-u)\bstream\b(.*?)\bendstream\b").unwrap();
}

/// Tier 1: text-show operands from every `BT … ET` span.
pub fn text_operators(bytes: &[u8]) -> Result<String, ExtractError> {
    let fragments: Vec<String> = RE_TEXT_OBJECT
        .captures_iter(bytes)
        .filter_map(|caps| caps.get(1))
        .map(|span| collapse_whitespace(&span_text(span.as_bytes())))
        .filter(|text| !text.is_empty())
        .collect();

    if fragments.is_empty() {
        return Err(ExtractError::NoText("no BT/ET text objects"));
    }
    Ok(collapse_whitespace(&fragments.join(" ")))
}

/// Tier 2: printable ASCII runs inside `stream … endstream` blocks.
pub fn stream_scan(bytes: &[u8]) -> Result<String, ExtractError> {
    let fragments: Vec<String> = RE_STREAM
        .captures_iter(bytes)
        .filter_map(|caps| caps.get(1))
        .map(|body| collapse_whitespace(&printable_ascii(body.as_bytes())))
        .filter(|text| text.chars().count() > MIN_STREAM_FRAGMENT_CHARS)
        .collect();

    if fragments.is_empty() {
        return Err(ExtractError::NoText("no printable stream content"));
    }
    Ok(fragments.join(" "))
}

/// Tier 3: whole-buffer UTF-8 decode with non-printables removed. Never fails.
pub fn raw_printable(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(collapse_whitespace(&strip_non_printable(
        &String::from_utf8_lossy(bytes),
    )))
}

/// Optional first tier backed by `pdf-extract`. The crate can panic on malformed
/// input, so the call is isolated with `catch_unwind`.
pub fn structured(bytes: &[u8]) -> Result<String, ExtractError> {
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Pdf("pdf-extract panicked".to_string()))?;
    let text = result.map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::NoText("pdf-extract found no text"));
    }
    Ok(text)
}

/// Keeps bytes in 0x20–0x7E; whitespace bytes become spaces, everything else is dropped.
fn printable_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter_map(|&b| match b {
            0x20..=0x7E => Some(b as char),
            b'\n' | b'\r' | b'\t' | 0x0C => Some(' '),
            _ => None,
        })
        .collect()
}

/// Reads the operands of one text object. Bytes are taken as Latin-1.
///
/// Each `Tj`/`'`/`"` operand is its own fragment; the pieces of a `[ … ] TJ` array are
/// concatenated, with a space for large negative kerning offsets.
fn span_text(span: &[u8]) -> String {
    let mut fragments: Vec<String> = Vec::new();
    let mut array: Option<String> = None;
    let mut number = String::new();
    let mut i = 0;

    while i < span.len() {
        let b = span[i];

        if let Some(current) = array.as_mut() {
            if b == b'-' || b == b'.' || b.is_ascii_digit() {
                number.push(b as char);
                i += 1;
                continue;
            }
            if !number.is_empty() {
                if number.parse::<f32>().is_ok_and(|n| n <= TJ_WORD_GAP) {
                    current.push(' ');
                }
                number.clear();
            }
        }

        match b {
            b'(' => {
                let (literal, next) = read_literal(span, i + 1);
                push_piece(&mut fragments, &mut array, literal);
                i = next;
            }
            b'<' if span.get(i + 1) != Some(&b'<') => {
                let (hex, next) = read_hex_string(span, i + 1);
                push_piece(&mut fragments, &mut array, hex);
                i = next;
            }
            b'[' => {
                array = Some(String::new());
                i += 1;
            }
            b']' => {
                if let Some(joined) = array.take() {
                    fragments.push(joined);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some(joined) = array {
        fragments.push(joined);
    }
    fragments.join(" ")
}

fn push_piece(fragments: &mut Vec<String>, array: &mut Option<String>, piece: String) {
    match array {
        Some(current) => current.push_str(&piece),
        None => fragments.push(piece),
    }
}

/// Reads a literal string starting just after its opening `(`. Returns the decoded
/// text and the index after the closing `)`. Balanced inner parentheses are kept.
fn read_literal(span: &[u8], start: usize) -> (String, usize) {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut i = start;

    while i < span.len() {
        let b = span[i];
        match b {
            b'\\' => {
                let Some(&next) = span.get(i + 1) else {
                    i += 1;
                    continue;
                };
                match next {
                    b'n' | b'r' | b't' | b'f' | b'b' => {
                        out.push(' ');
                        i += 2;
                    }
                    b'0'..=b'7' => {
                        let digits = span[i + 1..]
                            .iter()
                            .take(3)
                            .take_while(|d| matches!(**d, b'0'..=b'7'))
                            .count();
                        let code = span[i + 1..i + 1 + digits]
                            .iter()
                            .fold(0u32, |acc, d| acc * 8 + u32::from(*d - b'0'));
                        if let Some(c) = char::from_u32(code & 0xFF) {
                            out.push(c);
                        }
                        i += 1 + digits;
                    }
                    // Escaped line ending continues the string on the next line.
                    b'\r' if span.get(i + 2) == Some(&b'\n') => i += 3,
                    b'\r' | b'\n' => i += 2,
                    other => {
                        out.push(other as char);
                        i += 2;
                    }
                }
            }
            b'(' => {
                depth += 1;
                out.push('(');
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    return (out, i + 1);
                }
                depth -= 1;
                out.push(')');
                i += 1;
            }
            _ => {
                out.push(b as char);
                i += 1;
            }
        }
    }

    (out, i)
}

/// Reads a hex string starting just after its opening `<`. Non-printable decodes are
/// discarded since they usually index a font's glyph table rather than encode text.
fn read_hex_string(span: &[u8], start: usize) -> (String, usize) {
    let end = span[start..]
        .iter()
        .position(|&b| b == b'>')
        .map_or(span.len(), |p| start + p);

    let mut digits: Vec<u8> = span[start..end]
        .iter()
        .copied()
        .filter(u8::is_ascii_hexdigit)
        .collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }

    let decoded: String = digits
        .chunks(2)
        .filter_map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some(char::from((hi * 16 + lo) as u8))
        })
        .collect();

    let text = if decoded.chars().all(|c| (' '..='~').contains(&c)) {
        decoded
    } else {
        String::new()
    };
    (text, (end + 1).min(span.len()))
}
