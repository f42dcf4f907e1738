//! Normalizer: shared whitespace and control-character cleanup applied to every
//! extraction result before it reaches a caller.

/// Collapses every run of whitespace (newlines included) into a single space and trims.
/// Used by extractors that produce one flat line of text.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces every non-printable character with a space, keeping ordinary whitespace
/// as a space too. The result is ready for `collapse_whitespace`.
pub fn strip_non_printable(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() || c == char::REPLACEMENT_CHARACTER {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// Full normalization pass.
///
/// - drops control characters other than `\n` and `\t`, plus U+FFFD from lossy decodes
/// - converts CRLF / CR line endings to LF
/// - collapses horizontal whitespace to a single space and trims every line
/// - caps consecutive blank lines at one
/// - trims leading and trailing whitespace
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_newlines = 0usize;

    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .filter(|c| *c != char::REPLACEMENT_CHARACTER)
            .map(|c| if c.is_control() && c != '\t' { ' ' } else { c })
            .collect();
        let collapsed = collapse_whitespace(&cleaned);

        if collapsed.is_empty() {
            pending_newlines += 1;
            continue;
        }
        if !out.is_empty() {
            // One newline ends the previous line; any blank lines in between fold into one.
            out.push_str(if pending_newlines > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        pending_newlines = 0;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace_flattens_newlines() {
        assert_eq!(collapse_whitespace("  Hello \n\n\t world  "), "Hello world");
    }

    #[test]
    fn test_collapse_whitespace_empty() {
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_strip_non_printable_replaces_controls() {
        let stripped = strip_non_printable("a\u{0}b\u{7}c\u{FFFD}d");
        assert_eq!(collapse_whitespace(&stripped), "a b c d");
    }

    #[test]
    fn test_normalize_caps_blank_lines() {
        let text = "First\n\n\n\n\nSecond\nThird";
        assert_eq!(normalize_text(text), "First\n\nSecond\nThird");
    }

    #[test]
    fn test_normalize_collapses_horizontal_whitespace() {
        let text = "  Senior   Engineer\t\t at  Acme  ";
        assert_eq!(normalize_text(text), "Senior Engineer at Acme");
    }

    #[test]
    fn test_normalize_handles_crlf_and_whitespace_only_lines() {
        let text = "Line one\r\n   \r\n \t \r\nLine two\r";
        assert_eq!(normalize_text(text), "Line one\n\nLine two");
    }

    #[test]
    fn test_normalize_drops_control_characters() {
        let text = "Na\u{0}me\u{1b}: Ada\u{FFFD}";
        assert_eq!(normalize_text(text), "Na me : Ada");
    }

    #[test]
    fn test_normalize_output_never_has_runs() {
        let text = "a \t  b\n\n\n\n c  \n\n\n\n\n\n d\t\t";
        let out = normalize_text(text);
        assert!(!out.contains("\n\n\n"));
        assert!(!out.contains("  "));
        assert!(!out.contains("\t"));
        assert!(!out.contains(" \t") && !out.contains("\t "));
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("\n\n\n"), "");
    }
}
