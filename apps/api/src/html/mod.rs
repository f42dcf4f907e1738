//! HTML → plain text for web-sourced content (job postings, pasted descriptions).
//!
//! Regex passes, in order: comments, risky elements with their content, block
//! structure to newlines, remaining tags, entities, whitespace. Only a fixed set of
//! entities is decoded; anything else is removed.

pub mod handlers;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::extraction::normalize::normalize_text;

/// Elements deleted together with everything inside them.
const RISKY_ELEMENTS: [&str; 10] = [
    "script", "style", "noscript", "iframe", "object", "embed", "form", "button", "textarea",
    "select",
];

lazy_static! {
    static ref RE_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref RE_RISKY: Vec<Regex> = RISKY_ELEMENTS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect();
    static ref RE_RISKY_OPEN: Regex = Regex::new(&format!(
        r"(?is)<(?:{})\b[^>]*/?>",
        RISKY_ELEMENTS.join("|")
    ))
    .unwrap();
    static ref RE_LIST_ITEM: Regex = Regex::new(r"(?i)<li\b[^>]*>").unwrap();
    static ref RE_BLOCK: Regex = Regex::new(r"(?i)</?(?:p|h[1-6])\b[^>]*>").unwrap();
    static ref RE_ROW: Regex = Regex::new(r"(?i)</tr\s*>").unwrap();
    static ref RE_CELL: Regex = Regex::new(r"(?i)</?t[dh]\b[^>]*>").unwrap();
    static ref RE_BREAK: Regex = Regex::new(r"(?i)<(?:br|hr)\b[^>]*/?>").unwrap();
    static ref RE_CONTAINER: Regex = Regex::new(
        r"(?i)</?(?:div|section|article|header|footer|main|nav|aside|ul|ol|table|thead|tbody|blockquote)\b[^>]*>"
    )
    .unwrap();
    static ref RE_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref RE_ENTITY: Regex =
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z][a-zA-Z0-9]*);").unwrap();
}

/// Converts an HTML fragment or document to readable plain text.
pub fn html_to_text(html: &str) -> String {
    let mut text = RE_COMMENT.replace_all(html, "").into_owned();
    for re in RE_RISKY.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    // Unclosed or self-closing risky tags: drop the tag itself.
    text = RE_RISKY_OPEN.replace_all(&text, "").into_owned();

    text = RE_LIST_ITEM.replace_all(&text, "\n- ").into_owned();
    text = RE_BLOCK.replace_all(&text, "\n\n").into_owned();
    text = RE_ROW.replace_all(&text, "\n").into_owned();
    text = RE_CELL.replace_all(&text, " ").into_owned();
    text = RE_BREAK.replace_all(&text, "\n").into_owned();
    text = RE_CONTAINER.replace_all(&text, "\n").into_owned();
    text = RE_TAG.replace_all(&text, "").into_owned();

    let decoded = decode_entities(&text);
    normalize_text(&decoded)
}

/// Decodes `&name;`, `&#NNN;` and `&#xHH;` in a single pass. Names outside the fixed
/// table, and numeric references that are not valid characters, decode to nothing.
pub fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| decode_entity(&caps[1]))
        .into_owned()
}

fn decode_entity(entity: &str) -> String {
    let numeric = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        Some(u32::from_str_radix(hex, 16).ok())
    } else {
        entity.strip_prefix('#').map(|dec| dec.parse::<u32>().ok())
    };

    if let Some(code) = numeric {
        return code
            .and_then(char::from_u32)
            .filter(|c| *c != '\0')
            .map(String::from)
            .unwrap_or_default();
    }

    match entity {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        _ => "",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_basic() {
        assert_eq!(html_to_text("A &amp; B&nbsp;C"), "A & B C");
    }

    #[test]
    fn test_unknown_entity_disappears() {
        assert_eq!(html_to_text("&foo;"), "");
        assert_eq!(html_to_text("Price: 5&euro;"), "Price: 5");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("it&#39;s"), "it's");
        assert_eq!(decode_entities("&#xFFFFFFFF;&#0;"), "");
    }

    #[test]
    fn test_dashes_and_quotes() {
        assert_eq!(
            decode_entities("2019&ndash;2023 &mdash; &quot;Lead&quot; &apos;x&apos; &lt;b&gt;"),
            "2019\u{2013}2023 \u{2014} \"Lead\" 'x' <b>"
        );
    }

    #[test]
    fn test_entities_decode_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_removes_risky_elements_with_content() {
        let html = r#"<p>Keep</p><script type="text/javascript">alert("x")</script>
            <style>p { color: red }</style><form><input name="q"><button>Go</button></form>
            <noscript>Enable JS</noscript><select><option>One</option></select>
            <textarea>typed</textarea><iframe src="x"></iframe><p>Also keep</p>"#;
        let text = html_to_text(html);
        assert_eq!(text, "Keep\n\nAlso keep");
    }

    #[test]
    fn test_removes_comments() {
        assert_eq!(html_to_text("a<!-- hidden\n comment -->b"), "ab");
    }

    #[test]
    fn test_list_items_become_bullets() {
        let html = "<h2>Requirements</h2><ul><li>Rust</li><li>Tokio</li></ul>";
        assert_eq!(html_to_text(html), "Requirements\n\n- Rust\n- Tokio");
    }

    #[test]
    fn test_tables_and_breaks() {
        let html = "<table><tr><td>Role</td><td>Engineer</td></tr><tr><td>Level</td><td>Senior</td></tr></table>Line<br/>Next<hr>End";
        assert_eq!(
            html_to_text(html),
            "Role Engineer\nLevel Senior\n\nLine\nNext\nEnd"
        );
    }

    #[test]
    fn test_caps_blank_lines() {
        let html = "<p>One</p><p></p><p></p><div><p>Two</p></div>";
        let text = html_to_text(html);
        assert_eq!(text, "One\n\nTwo");
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_strips_unknown_tags_and_attributes() {
        let html = r#"<span class="x" data-a="1">Hello</span> <a href="/jobs">world</a>"#;
        assert_eq!(html_to_text(html), "Hello world");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text("No markup here"), "No markup here");
        assert_eq!(html_to_text(""), "");
    }
}
