//! Workbook reader
//!
//! Reads the first sheet of an XLSX package into [`GridCell`]s: display text,
//! pass-through style, and resolved hyperlink target.

mod relationships;
pub(crate) mod styles;
mod worksheet;

use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::{BufReader, Cursor};
use zip::ZipArchive;

use crate::cell_ref::CellAddress;
use crate::error::{ArchiveError, ArchiveResult};
use crate::hyperlinks::{parse_hyperlink_rels, resolve_hyperlinks};
use crate::types::GridCell;

use relationships::{
    first_sheet_path, parse_shared_strings, parse_stylesheet, parse_workbook_relationships,
};
use worksheet::parse_sheet;

/// Parse an XLSX package and return the first sheet's cells in row-major order.
///
/// Hyperlinks are attached to their cells; a hyperlink on a cell with no value
/// yields a cell whose text is the hyperlink's display text.
pub fn read_workbook(data: &[u8]) -> ArchiveResult<Vec<GridCell>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let rels = parse_workbook_relationships(&mut archive);
    let sheet_path = first_sheet_path(&mut archive, &rels.worksheets)?;
    let shared_strings = parse_shared_strings(&mut archive, rels.shared_strings.as_deref());
    let styles = parse_stylesheet(&mut archive, rels.styles.as_deref());

    let content = {
        let file = archive.by_name(&sheet_path).map_err(|_| {
            ArchiveError::MalformedWorkbook(format!("{sheet_path} is missing"))
        })?;
        let mut xml = Reader::from_reader(BufReader::new(file));
        parse_sheet(&mut xml, &shared_strings)?
    };

    let link_rels = parse_hyperlink_rels(&mut archive, &sheet_path);
    let hyperlinks = resolve_hyperlinks(&content.hyperlinks, &link_rels);

    let mut grid: BTreeMap<CellAddress, GridCell> = BTreeMap::new();
    for cell in content.cells {
        let style = cell
            .style_idx
            .and_then(|idx| styles.get(usize::try_from(idx).ok()?))
            .filter(|s| !s.is_plain())
            .cloned();
        grid.insert(
            cell.address,
            GridCell {
                address: cell.address,
                text: cell.text,
                hyperlink: None,
                style,
            },
        );
    }

    for (addr, link) in hyperlinks {
        let entry = grid
            .entry(addr)
            .or_insert_with(|| GridCell::text(addr, String::new()));
        if entry.text.is_empty() {
            entry.text = link.display.clone().unwrap_or_default();
        }
        entry.hyperlink = Some(link.target);
    }

    Ok(grid.into_values().collect())
}
