//! Cell addresses and the A1-style address codec.
//!
//! Two parsers live here. [`decode`] is the strict codec used for link-table keys:
//! it only accepts `[A-Z]+[0-9]+` and falls back to the origin on anything else.
//! [`parse_cell_ref`] is the lenient reader for references found inside XLSX parts,
//! where `$` anchors, lowercase letters and `A1:B2` ranges all occur.

use std::fmt;

/// A zero-based (row, column) coordinate.
///
/// Ordering is row-major, which is the order scans and exports visit cells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// `A1`.
    pub const ORIGIN: CellAddress = CellAddress { row: 0, col: 0 };

    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1-style string for this address.
    #[must_use]
    pub fn to_a1(self) -> String {
        encode(self.row, self.col)
    }

    /// Strict parse; `None` for anything that is not `[A-Z]+[0-9]+`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        parse_strict(s)
    }

    /// The (up to) eight cells surrounding this one, in row-major order.
    pub fn neighbours(self) -> impl Iterator<Item = CellAddress> {
        let rows = self.row.saturating_sub(1)..=self.row.saturating_add(1);
        rows.flat_map(move |r| {
            let cols = self.col.saturating_sub(1)..=self.col.saturating_add(1);
            cols.map(move |c| CellAddress::new(r, c))
        })
        .filter(move |a| *a != self)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            col_to_letter(self.col),
            u64::from(self.row) + 1
        )
    }
}

impl serde::Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Encode a zero-based (row, col) pair as an address like `"B3"`.
#[must_use]
pub fn encode(row: u32, col: u32) -> String {
    CellAddress::new(row, col).to_string()
}

/// Decode an address string into a zero-based (row, col) pair.
///
/// Malformed input decodes to the origin rather than failing.
#[must_use]
pub fn decode(s: &str) -> CellAddress {
    parse_strict(s).unwrap_or(CellAddress::ORIGIN)
}

/// Convert a zero-based column index to its bijective base-26 letters.
#[must_use]
pub fn col_to_letter(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = u64::from(col) + 1; // Convert to 1-based
    while n > 0 {
        n -= 1;
        #[allow(clippy::cast_possible_truncation)]
        let c = char::from(b'A' + (n % 26) as u8);
        result.push(c);
        n /= 26;
    }
    result.iter().rev().collect()
}

fn parse_strict(s: &str) -> Option<CellAddress> {
    let split = s.find(|c: char| !c.is_ascii_uppercase())?;
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // 1-based accumulators are one wider than the zero-based result.
    let mut col: u64 = 0;
    for b in letters.bytes() {
        col = col.checked_mul(26)?.checked_add(u64::from(b - b'A') + 1)?;
        if col > u64::from(u32::MAX) + 1 {
            return None;
        }
    }

    let row: u64 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some(CellAddress::new(
        u32::try_from(row - 1).ok()?,
        u32::try_from(col - 1).ok()?,
    ))
}

/// Parse a cell reference like "A1" or "$b$7" into an address.
///
/// Used for references read out of XLSX parts.
pub fn parse_cell_ref(cell_ref: &str) -> Option<CellAddress> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() && !saw_row {
            let upper = ch.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(upper as u32 - 'A' as u32 + 1)?;
            saw_col = true;
        } else if ch.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(ch as u32 - '0' as u32)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some(CellAddress::new(row - 1, col - 1))
}

/// Parse the top-left cell of a range like "A1:B10" (or a single "A1").
pub fn parse_range_start(range: &str) -> Option<CellAddress> {
    match range.split_once(':') {
        Some((start, _)) => parse_cell_ref(start),
        None => parse_cell_ref(range),
    }
}
