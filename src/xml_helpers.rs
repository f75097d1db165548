//! Shared XML helpers for reading and writing spreadsheet parts.
//!
//! Attribute readers handle namespace-prefixed keys and UTF-8 conversion
//! safely; writers escape text and attribute content.

use std::borrow::Cow;

use quick_xml::events::BytesStart;

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8. Entity
/// references in the value are unescaped.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a string attribute by local name (ignoring namespace prefix).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Returns `None` if missing. Recognizes `"1"`, `"true"` as true; anything else as false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Extract the `val` attribute as a string.
fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

/// Extract the `val` attribute as `f64`.
pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// Whether a toggle element such as `<b/>` or `<i val="0"/>` is on.
///
/// A missing `val` means on.
pub fn toggle_on(e: &BytesStart) -> bool {
    attr_val(e).map_or(true, |v| v != "0" && v != "false")
}

/// RGB hex from an element's `rgb` attribute, dropping the ARGB alpha byte.
pub fn attr_rgb(e: &BytesStart) -> Option<String> {
    let raw = attr_string(e, b"rgb")?;
    let hex = raw.trim().trim_start_matches('#');
    let rgb = if hex.len() == 8 { hex.get(2..)? } else { hex };
    if rgb.len() == 6 && rgb.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(rgb.to_ascii_uppercase())
    } else {
        None
    }
}

/// Minimal XML escaping for attribute/text content.
///
/// Characters XML 1.0 cannot carry at all are dropped; cell text goes through
/// [`encode_cell_text`] first so nothing is lost there.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if u32::from(c) < 0x20 => {}
            _ => out.push(c),
        }
    }
    out
}

/// Encode cell text for a `<t>` element.
///
/// Control characters XML cannot carry become `_xHHHH_`. An underscore that
/// would otherwise start such an escape is written as `_x005F_`.
pub fn encode_cell_text(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") && !s.chars().any(is_unencodable_control) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for (i, c) in s.char_indices() {
        if is_unencodable_control(c) {
            out.push_str(&format!("_x{:04X}_", u32::from(c)));
        } else if c == '_' && s.get(i..).and_then(escape_code).is_some() {
            out.push_str("_x005F_");
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Decode `_xHHHH_` escapes in cell text read from a workbook.
pub fn decode_cell_text(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        if let Some(decoded) = escape_code(rest).and_then(char::from_u32) {
            out.push(decoded);
            rest = rest.get(7..).unwrap_or_default();
        } else {
            out.push(c);
            rest = rest.get(c.len_utf8()..).unwrap_or_default();
        }
    }
    Cow::Owned(out)
}

fn is_unencodable_control(c: char) -> bool {
    u32::from(c) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}

/// Code point of an `_xHHHH_` escape at the start of `s`.
fn escape_code(s: &str) -> Option<u32> {
    let tail = s.strip_prefix("_x")?;
    let hex = tail.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) || !tail.get(4..)?.starts_with('_') {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string() {
        let e = make_start(r#"<foo name="a &amp; b" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("a & b".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_string_local() {
        let e = make_start(r#"<hyperlink r:id="rId3" />"#);
        assert_eq!(attr_string_local(&e, b"id"), Some("rId3".to_string()));
        assert_eq!(attr_string(&e, b"id"), None);
    }

    #[test]
    fn test_attr_numbers() {
        let e = make_start(r#"<foo count="42" size="10.5" />"#);
        assert_eq!(attr_u32(&e, b"count"), Some(42));
        assert_eq!(attr_u32(&e, b"missing"), None);
        let diff = attr_f64(&e, b"size").unwrap_or(0.0) - 10.5;
        assert!(diff.abs() < f64::EPSILON);
    }

    #[test]
    fn test_toggles() {
        assert!(toggle_on(&make_start("<b/>")));
        assert!(toggle_on(&make_start(r#"<b val="1"/>"#)));
        assert!(!toggle_on(&make_start(r#"<b val="0"/>"#)));
        assert_eq!(attr_bool(&make_start(r#"<a wrapText="1"/>"#), b"wrapText"), Some(true));
    }

    #[test]
    fn test_attr_rgb() {
        assert_eq!(attr_rgb(&make_start(r#"<color rgb="FFff0000"/>"#)), Some("FF0000".into()));
        assert_eq!(attr_rgb(&make_start(r#"<color rgb="00AA11"/>"#)), Some("00AA11".into()));
        assert_eq!(attr_rgb(&make_start(r#"<color theme="1"/>"#)), None);
        assert_eq!(attr_rgb(&make_start(r#"<color rgb="nothex"/>"#)), None);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
        assert_eq!(xml_escape("line1\nline2\u{1}"), "line1\nline2");
    }

    #[test]
    fn test_encode_cell_text() {
        assert_eq!(encode_cell_text("plain"), Cow::Borrowed("plain"));
        assert_eq!(encode_cell_text("a\u{7}b"), "a_x0007_b");
        assert_eq!(encode_cell_text("tab\tkept"), "tab\tkept");
        assert_eq!(encode_cell_text("_x0041_"), "_x005F_x0041_");
        assert_eq!(encode_cell_text("snake_x_case"), "snake_x_case");
    }

    #[test]
    fn test_decode_cell_text() {
        assert_eq!(decode_cell_text("a_x0007_b"), "a\u{7}b");
        assert_eq!(decode_cell_text("_x005F_x0041_"), "_x0041_");
        assert_eq!(decode_cell_text("caf\u{e9}_x00E9_"), "caf\u{e9}\u{e9}");
        assert_eq!(decode_cell_text("_xZZZZ_ and _x12"), "_xZZZZ_ and _x12");
    }

    #[test]
    fn test_cell_text_survives_encoding() {
        for text in ["a\u{7}b", "_x0041_", "\u{1}\u{1f}_x005F_", "📌 a_x1.png"] {
            assert_eq!(decode_cell_text(&encode_cell_text(text)), text);
        }
    }
}
