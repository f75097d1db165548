//! Worksheet parsing - reads cell values, style indices and hyperlinks from sheet XML.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;

use crate::cell_ref::{parse_cell_ref, CellAddress};
use crate::error::{ArchiveError, ArchiveResult};
use crate::hyperlinks::{parse_hyperlink_element, RawHyperlink};
use crate::xml_helpers::decode_cell_text;

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Default,
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Default,
    }
}

pub(super) fn parse_u32_bytes(value: &[u8]) -> Option<u32> {
    let mut num: u32 = 0;
    let mut seen = false;
    for &b in value {
        if !b.is_ascii_digit() {
            return None;
        }
        seen = true;
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
    }
    if seen {
        Some(num)
    } else {
        None
    }
}

/// A cell as read from sheet XML, with its value resolved to display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SheetCell {
    pub address: CellAddress,
    pub text: String,
    pub style_idx: Option<u32>,
}

#[derive(Debug, Default)]
pub(super) struct SheetContent {
    pub cells: Vec<SheetCell>,
    pub hyperlinks: Vec<RawHyperlink>,
}

struct PendingCell {
    address: CellAddress,
    tag: CellTypeTag,
    style_idx: Option<u32>,
    value: String,
    inline: String,
}

/// Parse a worksheet part.
///
/// Whitespace inside `<t>` and `<v>` is preserved. Cells without an `r`
/// attribute take the position after the previous cell in the row.
pub(super) fn parse_sheet<B: BufRead>(
    xml: &mut Reader<B>,
    shared_strings: &[String],
) -> ArchiveResult<SheetContent> {
    xml.trim_text(false);

    let mut content = SheetContent::default();
    let mut buf = Vec::new();

    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut cell: Option<PendingCell> = None;
    let mut in_v = false;
    let mut in_t = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start_event = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        current_row = crate::xml_helpers::attr_u32(e, b"r")
                            .and_then(|r| r.checked_sub(1))
                            .unwrap_or(current_row);
                        next_col = 0;
                    }
                    b"c" => {
                        let pending = start_cell(e, current_row, next_col);
                        current_row = pending.address.row;
                        next_col = pending.address.col.saturating_add(1);
                        if is_start_event {
                            cell = Some(pending);
                        } else {
                            finish_cell(&mut content, pending, shared_strings);
                        }
                    }
                    b"v" if is_start_event && cell.is_some() => in_v = true,
                    b"t" if is_start_event && cell.is_some() && !in_rph => in_t = true,
                    b"rPh" if is_start_event => in_rph = true,
                    b"hyperlink" => {
                        content.hyperlinks.extend(parse_hyperlink_element(e));
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if in_v || in_t => {
                let text = e.unescape().map_err(ArchiveError::Xml)?;
                if let Some(ref mut pending) = cell {
                    if in_v {
                        pending.value.push_str(&text);
                    } else {
                        pending.inline.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(ref e)) if in_v || in_t => {
                if let Some(ref mut pending) = cell {
                    let text = String::from_utf8_lossy(e.as_ref());
                    if in_v {
                        pending.value.push_str(&text);
                    } else {
                        pending.inline.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_t = false,
                b"rPh" => in_rph = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        finish_cell(&mut content, pending, shared_strings);
                    }
                    in_v = false;
                    in_t = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ArchiveError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

fn start_cell(e: &BytesStart<'_>, row: u32, next_col: u32) -> PendingCell {
    let mut address = CellAddress::new(row, next_col);
    let mut tag = CellTypeTag::Default;
    let mut style_idx = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                if let Some(addr) = std::str::from_utf8(&attr.value).ok().and_then(parse_cell_ref) {
                    address = addr;
                }
            }
            b"t" => tag = parse_cell_type_tag(&attr.value),
            b"s" => style_idx = parse_u32_bytes(&attr.value),
            _ => {}
        }
    }

    PendingCell {
        address,
        tag,
        style_idx,
        value: String::new(),
        inline: String::new(),
    }
}

fn finish_cell(content: &mut SheetContent, pending: PendingCell, shared_strings: &[String]) {
    let text = resolve_cell_text(pending.tag, &pending.value, pending.inline, shared_strings);
    if text.is_empty() && pending.style_idx.is_none() {
        return;
    }
    content.cells.push(SheetCell {
        address: pending.address,
        text,
        style_idx: pending.style_idx,
    });
}

/// Resolve a cell's display text from its type tag and raw value.
pub(super) fn resolve_cell_text(
    tag: CellTypeTag,
    value: &str,
    inline: String,
    shared_strings: &[String],
) -> String {
    match tag {
        CellTypeTag::Shared => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .cloned()
            .unwrap_or_default(),
        CellTypeTag::Inline => {
            let raw = if inline.is_empty() { value.to_string() } else { inline };
            match decode_cell_text(&raw) {
                Cow::Borrowed(_) => raw,
                Cow::Owned(decoded) => decoded,
            }
        }
        CellTypeTag::Bool => match value.trim() {
            "1" | "true" => "TRUE".to_string(),
            "0" | "false" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellTypeTag::Str | CellTypeTag::Error => value.to_string(),
        CellTypeTag::Default => {
            if value.is_empty() {
                inline
            } else {
                value.trim().to_string()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn parse(xml: &str, sst: &[&str]) -> SheetContent {
        let sst: Vec<String> = sst.iter().map(ToString::to_string).collect();
        parse_sheet(&mut Reader::from_str(xml), &sst).unwrap()
    }

    #[test]
    fn test_cell_kinds() {
        let content = parse(
            r#"<worksheet><sheetData>
<row r="1">
  <c r="A1" t="s"><v>1</v></c>
  <c r="B1" t="inlineStr" s="2"><is><t xml:space="preserve">  padded </t></is></c>
  <c r="C1"><v>42</v></c>
  <c r="D1" t="b"><v>1</v></c>
  <c r="E1" t="e"><v>#N/A</v></c>
  <c r="F1" t="str"><f>A1</f><v>computed</v></c>
</row>
<row r="3"><c r="A3" t="inlineStr"><is><r><t>rich </t></r><r><t>text</t></r></is></c></row>
</sheetData></worksheet>"#,
            &["zero", "one"],
        );
        let texts: Vec<(String, &str)> = content
            .cells
            .iter()
            .map(|c| (c.address.to_a1(), c.text.as_str()))
            .collect();
        assert_eq!(
            texts,
            [
                ("A1".to_string(), "one"),
                ("B1".to_string(), "  padded "),
                ("C1".to_string(), "42"),
                ("D1".to_string(), "TRUE"),
                ("E1".to_string(), "#N/A"),
                ("F1".to_string(), "computed"),
                ("A3".to_string(), "rich text"),
            ]
        );
        assert_eq!(content.cells[1].style_idx, Some(2));
    }

    #[test]
    fn test_multiline_text_and_entities() {
        let content = parse(
            "<worksheet><sheetData><row r=\"2\"><c r=\"B2\" t=\"inlineStr\"><is><t>line1\nline2 &amp; more</t></is></c></row></sheetData></worksheet>",
            &[],
        );
        assert_eq!(content.cells[0].text, "line1\nline2 & more");
        assert_eq!(content.cells[0].address, CellAddress::new(1, 1));
    }

    #[test]
    fn test_cells_without_reference() {
        let content = parse(
            r#"<worksheet><sheetData><row r="4"><c t="inlineStr"><is><t>a</t></is></c><c><v>2</v></c></row></sheetData></worksheet>"#,
            &[],
        );
        assert_eq!(content.cells[0].address.to_a1(), "A4");
        assert_eq!(content.cells[1].address.to_a1(), "B4");
    }

    #[test]
    fn test_empty_cells_skipped_unless_styled() {
        let content = parse(
            r#"<worksheet><sheetData><row r="1"><c r="A1"/><c r="B1" s="1"/></row></sheetData></worksheet>"#,
            &[],
        );
        assert_eq!(content.cells.len(), 1);
        assert_eq!(content.cells[0].address.to_a1(), "B1");
    }

    #[test]
    fn test_hyperlinks_collected() {
        let content = parse(
            r#"<worksheet xmlns:r="r"><sheetData/><hyperlinks><hyperlink ref="A1" r:id="rId1" display="📌 cat.png"/></hyperlinks></worksheet>"#,
            &[],
        );
        assert_eq!(content.hyperlinks.len(), 1);
        assert_eq!(content.hyperlinks[0].r_id.as_deref(), Some("rId1"));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let sst: Vec<String> = Vec::new();
        let result = parse_sheet(
            &mut Reader::from_str("<worksheet><sheetData><row></sheetData></worksheet>"),
            &sst,
        );
        assert!(matches!(result, Err(ArchiveError::Xml(_))));
    }
}
