//! The evidence link table: the single source of truth for which cell carries
//! which evidence. Cell text is derived from it, never the other way round.

use std::collections::BTreeMap;

use crate::cell_ref::CellAddress;
use crate::types::EvidenceLink;

/// A relocation of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMove {
    pub from: CellAddress,
    pub to: CellAddress,
}

/// Changes to apply to a [`LinkTable`] in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDiff {
    pub moves: Vec<LinkMove>,
    pub removals: Vec<CellAddress>,
}

impl LinkDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.removals.is_empty()
    }
}

/// Address → evidence mapping, iterated in row-major order.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    links: BTreeMap<CellAddress, EvidenceLink>,
}

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the link at `addr`.
    pub fn set(&mut self, addr: CellAddress, link: EvidenceLink) {
        self.links.insert(addr, link);
    }

    #[must_use]
    pub fn get(&self, addr: CellAddress) -> Option<&EvidenceLink> {
        self.links.get(&addr)
    }

    #[must_use]
    pub fn contains(&self, addr: CellAddress) -> bool {
        self.links.contains_key(&addr)
    }

    pub fn remove(&mut self, addr: CellAddress) -> Option<EvidenceLink> {
        self.links.remove(&addr)
    }

    /// Re-key the link at `from` to `to`, replacing anything already at `to`.
    ///
    /// Returns `false` and changes nothing when `from` has no link.
    pub fn move_link(&mut self, from: CellAddress, to: CellAddress) -> bool {
        match self.links.remove(&from) {
            Some(link) => {
                self.links.insert(to, link);
                true
            }
            None => false,
        }
    }

    /// Borrowing iteration; the table cannot be mutated while this is alive.
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &EvidenceLink)> {
        self.links.iter().map(|(addr, link)| (*addr, link))
    }

    /// Owned copy of every entry, safe to hold across mutations.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(CellAddress, EvidenceLink)> {
        self.links
            .iter()
            .map(|(addr, link)| (*addr, link.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Replace every entry with `entries`.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = (CellAddress, EvidenceLink)>) {
        self.links = entries.into_iter().collect();
    }

    /// Apply a diff: moves first, in order, then removals.
    pub fn apply(&mut self, diff: &LinkDiff) {
        for m in &diff.moves {
            self.move_link(m.from, m.to);
        }
        for addr in &diff.removals {
            self.links.remove(addr);
        }
    }
}
