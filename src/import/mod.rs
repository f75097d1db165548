//! Project archive import.
//!
//! Import runs in two phases. [`read_project`] parses the whole archive into an
//! [`ImportPlan`] without touching any session state, so a broken archive
//! aborts cleanly. [`ImportPlan::apply`] then writes cells and replaces the
//! link table in one step.

mod csv;
pub mod legacy;

pub use csv::parse_csv;

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use serde::Serialize;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::cell_ref::CellAddress;
use crate::error::{ArchiveError, ArchiveResult};
use crate::export::{EVIDENCE_DIR, WORKBOOK_NAME};
use crate::links::LinkTable;
use crate::sheet::Spreadsheet;
use crate::types::{marker_text, mime_for_file_name, ContentLocator, EvidenceLink, GridCell, MARKER};

/// Legacy spreadsheet artifact accepted on import.
pub const CSV_WORKBOOK_NAME: &str = "workbook.csv";

/// A hyperlinked or marked cell whose evidence file is not in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLink {
    pub address: CellAddress,
    pub file_name: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub evidence_files: usize,
    pub links_restored: usize,
    pub cells_written: usize,
    pub skipped: Vec<SkippedLink>,
}

/// A fully parsed archive, ready to be applied.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub cells: Vec<GridCell>,
    pub links: Vec<(CellAddress, EvidenceLink)>,
    pub report: ImportReport,
}

impl ImportPlan {
    /// Write every cell into `sheet` and replace the link table.
    pub fn apply<S: Spreadsheet + ?Sized>(self, sheet: &mut S, links: &mut LinkTable) -> ImportReport {
        for cell in &self.cells {
            sheet.set_cell_text(cell.address, &cell.text);
            if let Some(ref style) = cell.style {
                sheet.set_cell_style(cell.address, style);
            }
        }
        links.replace_all(self.links);

        tracing::info!(
            evidence = self.report.evidence_files,
            links = self.report.links_restored,
            cells = self.report.cells_written,
            skipped = self.report.skipped.len(),
            "imported project archive"
        );
        self.report
    }
}

/// Parse and apply a project archive.
///
/// On error nothing has been written to `sheet` or `links`.
pub fn import_project<S: Spreadsheet + ?Sized>(
    bytes: &[u8],
    sheet: &mut S,
    links: &mut LinkTable,
) -> ArchiveResult<ImportReport> {
    let plan = read_project(bytes)?;
    Ok(plan.apply(sheet, links))
}

/// Parse a project archive into an [`ImportPlan`].
pub fn read_project(bytes: &[u8]) -> ArchiveResult<ImportPlan> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let evidence = load_evidence(&mut archive)?;

    let cells = if let Some(xlsx) = read_entry(&mut archive, WORKBOOK_NAME)? {
        crate::parser::read_workbook(&xlsx)?
    } else if let Some(csv) = read_entry(&mut archive, CSV_WORKBOOK_NAME)? {
        csv::parse_csv(&csv)
    } else {
        return Err(ArchiveError::MissingWorkbook);
    };

    let mut plan = ImportPlan {
        cells: Vec::with_capacity(cells.len()),
        links: Vec::new(),
        report: ImportReport {
            evidence_files: evidence.len(),
            ..ImportReport::default()
        },
    };

    for mut cell in cells {
        let addr = cell.address;
        if let Some(target) = cell.hyperlink.take() {
            if let Some(file_name) = evidence_file_name(&target) {
                let label = match marker_label(&cell.text) {
                    Some(label) => label.to_string(),
                    None if cell.text.trim().is_empty() => file_name.clone(),
                    None => cell.text.trim().to_string(),
                };
                // The cell must read exactly `📌 <label>` or a later move is lost.
                cell.text = marker_text(&label);
                plan.restore(addr, &file_name, &label, &evidence);
            } else if let Some(label) = marker_label(&cell.text).map(str::to_string) {
                cell.text = marker_text(&label);
                plan.links.push((
                    addr,
                    EvidenceLink::new(ContentLocator::external(target.as_str()), label),
                ));
                plan.report.links_restored += 1;
            } else if cell.text.is_empty() {
                cell.text = target;
            }
        } else if let Some(marker) = legacy::find_marker(&cell.text) {
            let label = if marker.cleaned.is_empty() {
                marker.file_name.clone()
            } else {
                marker.cleaned.clone()
            };
            cell.text = marker_text(&label);
            plan.restore(addr, &marker.file_name, &label, &evidence);
        }
        plan.cells.push(cell);
    }

    plan.report.cells_written = plan.cells.len();
    Ok(plan)
}

impl ImportPlan {
    fn restore(
        &mut self,
        addr: CellAddress,
        file_name: &str,
        label: &str,
        evidence: &HashMap<String, ContentLocator>,
    ) {
        let found = evidence.get(file_name).or_else(|| {
            let decoded = percent_decode(file_name)?;
            evidence.get(decoded.as_str())
        });
        match found {
            Some(locator) => {
                self.links.push((addr, EvidenceLink::new(locator.clone(), label)));
                self.report.links_restored += 1;
            }
            None => {
                tracing::warn!(cell = %addr, file = file_name, "evidence file not found in archive");
                self.report.skipped.push(SkippedLink {
                    address: addr,
                    file_name: file_name.to_string(),
                });
            }
        }
    }
}

/// Load every file under `evidence/`, keyed by file name.
fn load_evidence<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> ArchiveResult<HashMap<String, ContentLocator>> {
    let mut evidence = HashMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().replace('\\', "/");
        let Some(relative) = path.strip_prefix(EVIDENCE_DIR) else {
            continue;
        };
        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        if file_name.is_empty() {
            continue;
        }
        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)?;
        let mime = mime_for_file_name(file_name);
        tracing::debug!(file = file_name, mime, size = bytes.len(), "loaded evidence file");
        evidence.insert(file_name.to_string(), ContentLocator::inline(mime, &bytes));
    }
    Ok(evidence)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> ArchiveResult<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Ok(Some(bytes))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Label carried by marker text: whatever follows `📌 `.
///
/// `None` when the text has no leading marker or nothing after it.
fn marker_label(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(MARKER)?;
    let label = rest.strip_prefix(' ').unwrap_or(rest);
    (!label.trim().is_empty()).then_some(label)
}

/// File name referenced by a hyperlink into the evidence folder.
///
/// Accepts backslash separators and a leading `./`.
fn evidence_file_name(target: &str) -> Option<String> {
    let normalized = target.replace('\\', "/");
    let mut rest = normalized.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    let idx = rest.rfind(EVIDENCE_DIR)?;
    let file_name = rest.get(idx + EVIDENCE_DIR.len()..)?;
    if file_name.is_empty() || file_name.contains('/') {
        return None;
    }
    Some(file_name.to_string())
}

/// Decode `%XX` escapes. Returns `None` when nothing changes or the result is not UTF-8.
fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return None;
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        if b == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8(out).ok().filter(|decoded| decoded != s)
}
