//! Detects out-of-band deletions and moves of evidence cells.
//!
//! The spreadsheet engine can clear, overwrite or cut-and-paste cells without
//! telling us. Each run reads cell text through the [`Spreadsheet`] contract,
//! then a pure planning step compares that scan against a snapshot of the link
//! table and produces a [`LinkDiff`].
//!
//! Matching is by exact visible text (`📌 <label>`), so two links with the same
//! label can be swapped when both move at once. That ambiguity is accepted.

use crate::cell_ref::CellAddress;
use crate::config::Window;
use crate::links::{LinkDiff, LinkMove, LinkTable};
use crate::sheet::Spreadsheet;
use crate::types::{marker_text, EvidenceLink, MARKER};

/// Raw cell text gathered for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellScan {
    /// Current text of every linked cell, in link-table order.
    pub linked: Vec<(CellAddress, String)>,
    /// Unlinked cells inside the window whose text contains the marker, row-major.
    pub unmatched_markers: Vec<(CellAddress, String)>,
}

/// Read the cells a reconciliation run needs.
///
/// Linked cells are read wherever they are; discovery is bounded to `window`.
pub fn scan<S: Spreadsheet + ?Sized>(sheet: &S, links: &LinkTable, window: Window) -> CellScan {
    let linked = links
        .iter()
        .map(|(addr, _)| (addr, sheet.cell_text(addr)))
        .collect();

    let unmatched_markers = window
        .addresses()
        .filter(|addr| !links.contains(*addr))
        .filter_map(|addr| {
            let text = sheet.cell_text(addr);
            text.contains(MARKER).then_some((addr, text))
        })
        .collect();

    CellScan {
        linked,
        unmatched_markers,
    }
}

/// Plan the link-table changes implied by a scan.
///
/// A linked cell that is empty or lost its marker is a deletion candidate. Each
/// unmatched marker cell, in row-major order, claims the first remaining
/// candidate whose expected text equals the cell text exactly; that link moves.
/// Unclaimed candidates are removed.
#[must_use]
pub fn plan(snapshot: &[(CellAddress, EvidenceLink)], scan: &CellScan) -> LinkDiff {
    let mut candidates: Vec<(CellAddress, String)> = snapshot
        .iter()
        .filter(|(addr, _)| {
            let text = scan
                .linked
                .iter()
                .find(|(a, _)| a == addr)
                .map_or("", |(_, t)| t.as_str());
            !text.contains(MARKER)
        })
        .map(|(addr, link)| (*addr, marker_text(&link.label)))
        .collect();

    let mut diff = LinkDiff::default();
    for (to, text) in &scan.unmatched_markers {
        if let Some(pos) = candidates.iter().position(|(_, expected)| expected == text) {
            let (from, _) = candidates.remove(pos);
            diff.moves.push(LinkMove { from, to: *to });
        }
    }
    diff.removals = candidates.into_iter().map(|(addr, _)| addr).collect();
    diff
}

/// Scan, plan and apply in one step. Returns the applied diff.
pub fn reconcile<S: Spreadsheet + ?Sized>(sheet: &S, links: &mut LinkTable, window: Window) -> LinkDiff {
    if links.is_empty() {
        return LinkDiff::default();
    }
    let scan = scan(sheet, links, window);
    let diff = plan(&links.snapshot(), &scan);
    for m in &diff.moves {
        tracing::info!(from = %m.from, to = %m.to, "evidence moved");
    }
    for addr in &diff.removals {
        tracing::info!(cell = %addr, "evidence removed; marker cleared");
    }
    links.apply(&diff);
    diff
}
