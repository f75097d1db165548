//! Generates worksheet and stylesheet XML from grid cells.
//!
//! Text is written as inline strings (`t="inlineStr"`), so no shared string
//! table is needed. A value is written as a number only when its text is exactly
//! what the number prints as, so every cell's text survives a round trip.

use crate::cell_ref::col_to_letter;
use crate::types::{CellStyle, GridCell};
use crate::xml_helpers::{encode_cell_text, xml_escape};

const HYPERLINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Distinct cell styles, in first-use order. Index 0 is the default `xf`.
#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    styles: Vec<CellStyle>,
}

impl StyleTable {
    /// The `cellXfs` index for a style, registering it on first use.
    pub(crate) fn index_for(&mut self, style: &CellStyle) -> Option<usize> {
        if style.is_plain() {
            return None;
        }
        let idx = match self.styles.iter().position(|s| s == style) {
            Some(idx) => idx,
            None => {
                self.styles.push(style.clone());
                self.styles.len() - 1
            }
        };
        Some(idx + 1)
    }

    /// Render `styles.xml`.
    pub(crate) fn to_xml(&self) -> String {
        let mut fonts = vec![r#"<font><sz val="11"/><name val="Calibri"/><family val="2"/></font>"#.to_string()];
        let mut fills = vec![
            r#"<fill><patternFill patternType="none"/></fill>"#.to_string(),
            r#"<fill><patternFill patternType="gray125"/></fill>"#.to_string(),
        ];
        let mut xfs = vec![r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#.to_string()];

        for style in &self.styles {
            let font_id = if style.has_font() {
                fonts.push(font_xml(style));
                fonts.len() - 1
            } else {
                0
            };
            let fill_id = match style.fill_color {
                Some(ref rgb) => {
                    fills.push(format!(
                        r#"<fill><patternFill patternType="solid"><fgColor rgb="FF{}"/><bgColor indexed="64"/></patternFill></fill>"#,
                        xml_escape(rgb)
                    ));
                    fills.len() - 1
                }
                None => 0,
            };

            let mut xf = format!(r#"<xf numFmtId="0" fontId="{font_id}" fillId="{fill_id}" borderId="0" xfId="0""#);
            if font_id > 0 {
                xf.push_str(r#" applyFont="1""#);
            }
            if fill_id > 0 {
                xf.push_str(r#" applyFill="1""#);
            }
            if style.wrap_text {
                xf.push_str(r#" applyAlignment="1"><alignment wrapText="1"/></xf>"#);
            } else {
                xf.push_str("/>");
            }
            xfs.push(xf);
        }

        let mut out = String::with_capacity(1024);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
        push_list(&mut out, "fonts", &fonts);
        push_list(&mut out, "fills", &fills);
        out.push_str(r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#);
        out.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);
        push_list(&mut out, "cellXfs", &xfs);
        out.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
        out.push_str("</styleSheet>");
        out
    }
}

fn font_xml(style: &CellStyle) -> String {
    let mut font = String::from("<font>");
    if style.bold {
        font.push_str("<b/>");
    }
    if style.italic {
        font.push_str("<i/>");
    }
    if let Some(size) = style.font_size {
        font.push_str(&format!(r#"<sz val="{size}"/>"#));
    }
    if let Some(ref rgb) = style.font_color {
        font.push_str(&format!(r#"<color rgb="FF{}"/>"#, xml_escape(rgb)));
    }
    font.push_str(r#"<name val="Calibri"/><family val="2"/></font>"#);
    font
}

fn push_list(out: &mut String, tag: &str, items: &[String]) {
    out.push_str(&format!("<{tag} count=\"{}\">", items.len()));
    for item in items {
        out.push_str(item);
    }
    out.push_str(&format!("</{tag}>"));
}

/// Worksheet XML plus its relationships part (present when there are hyperlinks).
pub(crate) struct SheetXml {
    pub sheet: String,
    pub rels: Option<String>,
}

/// Write the worksheet for `cells`, which must be in row-major order.
pub(crate) fn write_sheet_xml(cells: &[GridCell], styles: &mut StyleTable) -> SheetXml {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push('\n');

    // <dimension>
    let max_row = cells.iter().map(|c| c.address.row).max();
    let max_col = cells.iter().map(|c| c.address.col).max();
    if let (Some(r), Some(c)) = (max_row, max_col) {
        out.push_str(&format!(
            "<dimension ref=\"A1:{}{}\"/>\n",
            col_to_letter(c),
            u64::from(r) + 1
        ));
    }

    // <sheetData>
    out.push_str("<sheetData>\n");
    write_sheet_data(&mut out, cells, styles);
    out.push_str("</sheetData>\n");

    // <hyperlinks>
    let linked: Vec<(&GridCell, &str)> = cells
        .iter()
        .filter_map(|c| c.hyperlink.as_deref().map(|target| (c, target)))
        .collect();
    let mut rels = None;
    if !linked.is_empty() {
        out.push_str("<hyperlinks>\n");
        let mut rels_xml = String::new();
        rels_xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        rels_xml.push('\n');
        rels_xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (idx, (cell, target)) in linked.iter().enumerate() {
            out.push_str(&format!(
                "<hyperlink ref=\"{}\" r:id=\"rId{}\" display=\"{}\"/>\n",
                cell.address.to_a1(),
                idx + 1,
                xml_escape(&cell.text)
            ));
            rels_xml.push_str(&format!(
                "<Relationship Id=\"rId{}\" Type=\"{HYPERLINK_REL}\" Target=\"{}\" TargetMode=\"External\"/>",
                idx + 1,
                xml_escape(target)
            ));
        }
        out.push_str("</hyperlinks>\n");
        rels_xml.push_str("</Relationships>");
        rels = Some(rels_xml);
    }

    out.push_str("</worksheet>");
    SheetXml { sheet: out, rels }
}

/// Write all cell rows into `<sheetData>`.
fn write_sheet_data(out: &mut String, cells: &[GridCell], styles: &mut StyleTable) {
    let mut current_row: Option<u32> = None;
    for cell in cells {
        if current_row != Some(cell.address.row) {
            if current_row.is_some() {
                out.push_str("</row>\n");
            }
            out.push_str(&format!("<row r=\"{}\">", u64::from(cell.address.row) + 1));
            current_row = Some(cell.address.row);
        }
        let style_idx = cell.style.as_ref().and_then(|s| styles.index_for(s));
        write_cell(out, cell, style_idx);
    }
    if current_row.is_some() {
        out.push_str("</row>\n");
    }
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, cell: &GridCell, style_idx: Option<usize>) {
    out.push_str(&format!("<c r=\"{}\"", cell.address.to_a1()));

    if let Some(si) = style_idx {
        out.push_str(&format!(" s=\"{si}\""));
    }

    if cell.text.is_empty() {
        out.push_str("/>");
    } else if is_exact_number(&cell.text) {
        out.push_str(&format!("><v>{}</v></c>", cell.text));
    } else {
        out.push_str(" t=\"inlineStr\"><is><t xml:space=\"preserve\">");
        out.push_str(&xml_escape(&encode_cell_text(&cell.text)));
        out.push_str("</t></is></c>");
    }
}

/// Whether `text` is exactly the canonical printing of a finite number.
///
/// Negative zero is kept as text since spreadsheets display it as `0`.
pub(crate) fn is_exact_number(text: &str) -> bool {
    text.parse::<f64>().is_ok_and(|n| {
        n.is_finite() && n.to_bits() != (-0.0f64).to_bits() && n.to_string() == text
    })
}
