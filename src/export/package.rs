//! ZIP packaging for the workbook artifact and the outer project archive.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::ArchiveResult;
use crate::types::GridCell;

use super::sheet_writer::{write_sheet_xml, StyleTable};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

fn deflated() -> FileOptions {
    FileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Build a single-sheet XLSX from cells in row-major order.
pub(crate) fn write_workbook(cells: &[GridCell]) -> ArchiveResult<Vec<u8>> {
    let mut styles = StyleTable::default();
    let sheet = write_sheet_xml(cells, &mut styles);

    let mut entries: Vec<(&str, Vec<u8>)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", ROOT_RELS.as_bytes().to_vec()),
        ("xl/workbook.xml", WORKBOOK.as_bytes().to_vec()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes().to_vec()),
        ("xl/styles.xml", styles.to_xml().into_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.sheet.into_bytes()),
    ];
    if let Some(rels) = sheet.rels {
        entries.push(("xl/worksheets/_rels/sheet1.xml.rels", rels.into_bytes()));
    }

    write_zip(entries.iter().map(|(name, bytes)| (*name, bytes.as_slice())))
}

/// Write named entries into a deflated ZIP, in the given order.
pub(crate) fn write_zip<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> ArchiveResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(name, deflated())?;
        writer.write_all(bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
