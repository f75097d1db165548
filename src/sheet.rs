//! The narrow contract through which evidence code talks to a spreadsheet engine,
//! plus an in-memory engine used by the CLI and tests.

use std::collections::{BTreeMap, BTreeSet};

use crate::cell_ref::CellAddress;
use crate::types::CellStyle;

/// Read/write access to a host spreadsheet.
///
/// Only visible cell text is exchanged. Formatting and visibility are optional
/// extras with inert defaults.
pub trait Spreadsheet {
    /// Visible text of a cell; empty when the cell is blank.
    fn cell_text(&self, addr: CellAddress) -> String;

    /// Replace the visible text of a cell. Empty text clears it.
    fn set_cell_text(&mut self, addr: CellAddress, text: &str);

    /// The cell the user currently has selected, if any.
    fn current_selection(&self) -> Option<CellAddress>;

    fn cell_style(&self, _addr: CellAddress) -> Option<CellStyle> {
        None
    }

    fn set_cell_style(&mut self, _addr: CellAddress, _style: &CellStyle) {}

    /// Whether the document is on screen. Polling pauses while hidden.
    fn is_visible(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MemoryCell {
    text: String,
    style: Option<CellStyle>,
}

/// A spreadsheet held entirely in memory.
///
/// Tracks which cells have been written since the last [`MemorySheet::take_dirty`].
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    cells: BTreeMap<CellAddress, MemoryCell>,
    selection: Option<CellAddress>,
    visible: bool,
    dirty_cells: BTreeSet<CellAddress>,
}

impl MemorySheet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    /// Build a sheet from `(address, text)` pairs without marking anything dirty.
    #[must_use]
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = (CellAddress, &'a str)>) -> Self {
        let mut sheet = Self::new();
        for (addr, text) in cells {
            sheet.write(addr, text);
        }
        sheet
    }

    pub fn select(&mut self, addr: Option<CellAddress>) {
        self.selection = addr;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Non-empty cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.cells.iter().map(|(addr, cell)| (*addr, cell.text.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Addresses written since the last call.
    pub fn take_dirty(&mut self) -> BTreeSet<CellAddress> {
        std::mem::take(&mut self.dirty_cells)
    }

    fn write(&mut self, addr: CellAddress, text: &str) {
        if text.is_empty() {
            // Clearing drops the cell along with its formatting.
            self.cells.remove(&addr);
            return;
        }
        self.cells.entry(addr).or_default().text = text.to_string();
    }
}

impl Spreadsheet for MemorySheet {
    fn cell_text(&self, addr: CellAddress) -> String {
        self.cells
            .get(&addr)
            .map(|c| c.text.clone())
            .unwrap_or_default()
    }

    fn set_cell_text(&mut self, addr: CellAddress, text: &str) {
        self.write(addr, text);
        self.dirty_cells.insert(addr);
    }

    fn current_selection(&self) -> Option<CellAddress> {
        self.selection
    }

    fn cell_style(&self, addr: CellAddress) -> Option<CellStyle> {
        self.cells.get(&addr).and_then(|c| c.style.clone())
    }

    fn set_cell_style(&mut self, addr: CellAddress, style: &CellStyle) {
        if let Some(cell) = self.cells.get_mut(&addr) {
            cell.style = if style.is_plain() {
                None
            } else {
                Some(style.clone())
            };
            self.dirty_cells.insert(addr);
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_clears_cell() {
        let a1 = CellAddress::ORIGIN;
        let mut sheet = MemorySheet::new();
        sheet.set_cell_text(a1, "hello");
        assert_eq!(sheet.cell_text(a1), "hello");
        sheet.set_cell_text(a1, "");
        assert_eq!(sheet.cell_text(a1), "");
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_text_is_stored_verbatim() {
        let a1 = CellAddress::ORIGIN;
        let mut sheet = MemorySheet::new();
        sheet.set_cell_text(a1, "  007 ");
        assert_eq!(sheet.cell_text(a1), "  007 ");
    }

    #[test]
    fn test_style_needs_a_cell() {
        let a1 = CellAddress::ORIGIN;
        let bold = CellStyle {
            bold: true,
            ..CellStyle::default()
        };
        let mut sheet = MemorySheet::new();
        sheet.set_cell_style(a1, &bold);
        assert!(sheet.cell_style(a1).is_none());
        sheet.set_cell_text(a1, "x");
        sheet.set_cell_style(a1, &bold);
        assert_eq!(sheet.cell_style(a1), Some(bold));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut sheet = MemorySheet::from_cells([(CellAddress::ORIGIN, "seed")]);
        assert!(sheet.take_dirty().is_empty());
        sheet.set_cell_text(CellAddress::new(2, 2), "x");
        let dirty = sheet.take_dirty();
        assert_eq!(dirty.into_iter().collect::<Vec<_>>(), [CellAddress::new(2, 2)]);
    }

    #[test]
    fn test_defaults() {
        let sheet = MemorySheet::new();
        assert!(sheet.is_visible());
        assert!(sheet.current_selection().is_none());
    }
}
