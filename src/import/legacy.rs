//! Inline `[[evidence/<name>]]` markers written by older exports.

const OPEN: &str = "[[evidence/";
const CLOSE: &str = "]]";

/// A legacy marker found in cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMarker {
    pub file_name: String,
    /// Cell text with the marker removed and surrounding whitespace trimmed.
    pub cleaned: String,
}

/// Find the first legacy marker in `text`.
///
/// Returns `None` when there is no complete marker with a non-empty name.
#[must_use]
pub fn find_marker(text: &str) -> Option<LegacyMarker> {
    let start = text.find(OPEN)?;
    let after = text.get(start + OPEN.len()..)?;
    let name_len = after.find(CLOSE)?;
    let file_name = after.get(..name_len)?;
    if file_name.is_empty() || file_name.contains(']') {
        return None;
    }
    let head = text.get(..start)?;
    let tail = after.get(name_len + CLOSE.len()..)?;
    Some(LegacyMarker {
        file_name: file_name.to_string(),
        cleaned: format!("{head}{tail}").trim().to_string(),
    })
}
