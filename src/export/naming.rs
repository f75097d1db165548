//! Evidence file naming inside the archive.

use std::collections::HashSet;

use crate::types::extension_for_mime;

/// Replace characters that are unsafe in archive entry names with `_`.
///
/// Names made only of dots (`.`, `..`) come back empty.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    if name.chars().all(|c| c == '.') {
        return String::new();
    }
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Hands out collision-free file names: `scan.pdf`, `scan_1.pdf`, `scan_2.pdf`, …
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique name derived from an evidence label.
    ///
    /// An empty label becomes `evidence` plus an extension for `mime_type`.
    pub fn claim(&mut self, label: &str, mime_type: &str) -> String {
        let mut base = sanitize_file_name(label.trim());
        if base.is_empty() {
            base = format!("evidence{}", extension_for_mime(mime_type));
        }

        let mut candidate = base.clone();
        let mut counter = 1u32;
        while self.used.contains(&candidate) {
            candidate = match base.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}_{counter}.{ext}"),
                None => format!("{base}_{counter}"),
            };
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
