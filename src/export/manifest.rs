//! `README.txt` manifest. Written for people; never parsed back.

use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) fn readme(project_name: &str, evidence_count: usize, created_at: DateTime<Utc>) -> String {
    let evidence_line = if evidence_count > 0 {
        format!("This project contains {evidence_count} evidence files.")
    } else {
        "No evidence files attached.".to_string()
    };

    format!(
        "# {project_name}

## Contents
- workbook.xlsx: The spreadsheet with hyperlinks to evidence
- evidence/: Folder containing all evidence files

## Evidence Files
{evidence_line}

## Instructions
1. Extract this ZIP file to a folder
2. Open workbook.xlsx in Excel
3. Click on cells with 📌 to open linked evidence files
4. Keep the evidence folder in the same location as the workbook

## Created
{}
",
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
