//! Stylesheet parsing - resolves `cellXfs` entries into pass-through cell styles.
//!
//! Only what survives an export/import round trip is read: bold, italic, font
//! size and color, solid fill color, and wrap alignment.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

use crate::types::CellStyle;
use crate::xml_helpers::{attr_bool, attr_rgb, attr_u32, attr_val_f64, toggle_on};

#[derive(Debug, Default, Clone)]
struct RawFont {
    bold: bool,
    italic: bool,
    size: Option<f64>,
    color: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct RawFill {
    solid: bool,
    color: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct CellXf {
    font_id: Option<u32>,
    fill_id: Option<u32>,
    wrap_text: bool,
}

/// Parse `styles.xml` into one resolved style per `cellXfs` index.
///
/// Font 0 is the workbook default and contributes nothing; fills 0 and 1 are
/// the reserved `none` and `gray125` patterns.
pub(crate) fn parse_styles<R: BufRead>(reader: R) -> Vec<CellStyle> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut fonts: Vec<RawFont> = Vec::new();
    let mut fills: Vec<RawFill> = Vec::new();
    let mut xfs: Vec<CellXf> = Vec::new();
    let mut buf = Vec::new();

    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut current_font: Option<RawFont> = None;
    let mut current_fill: Option<RawFill> = None;
    let mut current_xf: Option<CellXf> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();
                let name_str = std::str::from_utf8(name.as_ref()).unwrap_or("");

                match name_str {
                    "fonts" => in_fonts = !is_empty,
                    "fills" => in_fills = !is_empty,
                    "cellXfs" => in_cell_xfs = !is_empty,

                    "font" if in_fonts => {
                        if is_empty {
                            fonts.push(RawFont::default());
                        } else {
                            current_font = Some(RawFont::default());
                        }
                    }
                    "b" => {
                        if let Some(ref mut font) = current_font {
                            font.bold = toggle_on(e);
                        }
                    }
                    "i" => {
                        if let Some(ref mut font) = current_font {
                            font.italic = toggle_on(e);
                        }
                    }
                    "sz" => {
                        if let Some(ref mut font) = current_font {
                            font.size = attr_val_f64(e);
                        }
                    }
                    "color" => {
                        if let Some(ref mut font) = current_font {
                            font.color = attr_rgb(e);
                        }
                    }

                    "fill" if in_fills => {
                        if is_empty {
                            fills.push(RawFill::default());
                        } else {
                            current_fill = Some(RawFill::default());
                        }
                    }
                    "patternFill" => {
                        if let Some(ref mut fill) = current_fill {
                            fill.solid = crate::xml_helpers::attr_string(e, b"patternType")
                                .is_some_and(|p| p == "solid");
                        }
                    }
                    "fgColor" => {
                        if let Some(ref mut fill) = current_fill {
                            fill.color = attr_rgb(e);
                        }
                    }

                    "xf" if in_cell_xfs => {
                        let xf = CellXf {
                            font_id: attr_u32(e, b"fontId"),
                            fill_id: attr_u32(e, b"fillId"),
                            wrap_text: false,
                        };
                        // Self-closing <xf .../> has no End event
                        if is_empty {
                            xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    "alignment" => {
                        if let Some(ref mut xf) = current_xf {
                            xf.wrap_text = attr_bool(e, b"wrapText").unwrap_or(false);
                        }
                    }
                    _ => {}
                }
            }

            Ok(Event::End(ref e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"fonts" => in_fonts = false,
                    b"fills" => in_fills = false,
                    b"cellXfs" => in_cell_xfs = false,
                    b"font" => {
                        if let Some(font) = current_font.take() {
                            fonts.push(font);
                        }
                    }
                    b"fill" => {
                        if let Some(fill) = current_fill.take() {
                            fills.push(fill);
                        }
                    }
                    b"xf" => {
                        if let Some(xf) = current_xf.take() {
                            xfs.push(xf);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    xfs.iter().map(|xf| resolve_xf(xf, &fonts, &fills)).collect()
}

fn resolve_xf(xf: &CellXf, fonts: &[RawFont], fills: &[RawFill]) -> CellStyle {
    let mut style = CellStyle {
        wrap_text: xf.wrap_text,
        ..CellStyle::default()
    };

    let font = xf
        .font_id
        .filter(|&id| id > 0)
        .and_then(|id| fonts.get(usize::try_from(id).ok()?));
    if let Some(font) = font {
        style.bold = font.bold;
        style.italic = font.italic;
        style.font_size = font.size;
        style.font_color = font.color.clone();
    }

    let fill = xf
        .fill_id
        .filter(|&id| id > 1)
        .and_then(|id| fills.get(usize::try_from(id).ok()?));
    if let Some(fill) = fill {
        if fill.solid {
            style.fill_color = fill.color.clone();
        }
    }

    style
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><sz val="14"/><color rgb="FFFF0000"/></font>
    <font><i/><color theme="1"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" xfId="0" applyFont="1" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="0" xfId="0" applyAlignment="1"><alignment wrapText="1"/></xf>
    <xf numFmtId="0" fontId="2" fillId="1" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles() {
        let styles = parse_styles(STYLES.as_bytes());
        assert_eq!(styles.len(), 4);

        assert!(styles[0].is_plain());

        assert!(styles[1].bold);
        assert!(!styles[1].italic);
        assert_eq!(styles[1].font_size, Some(14.0));
        assert_eq!(styles[1].font_color.as_deref(), Some("FF0000"));
        assert_eq!(styles[1].fill_color.as_deref(), Some("FFFF00"));

        assert!(styles[2].wrap_text);
        assert!(!styles[2].has_font());

        assert!(styles[3].italic);
        assert_eq!(styles[3].font_color, None);
        assert_eq!(styles[3].fill_color, None);
    }

    #[test]
    fn test_empty_stylesheet() {
        assert!(parse_styles(&b"<styleSheet/>"[..]).is_empty());
    }
}
