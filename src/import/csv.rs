//! Minimal CSV reader for the legacy `workbook.csv` artifact.

use crate::cell_ref::CellAddress;
use crate::types::GridCell;

/// Parse CSV bytes into non-empty cells in row-major order.
///
/// Blank and whitespace-only lines are dropped without taking a row, so the
/// next line lands directly below. Field values are kept verbatim; fields that
/// are only whitespace produce no cell.
pub fn parse_csv(data: &[u8]) -> Vec<GridCell> {
    let text = String::from_utf8_lossy(data);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut cells = Vec::new();
    let lines = text.lines().filter(|line| !line.trim().is_empty());
    for (row_idx, line) in lines.enumerate() {
        let Ok(row) = u32::try_from(row_idx) else {
            break;
        };
        for (col_idx, field) in split_csv_line(line, ',').into_iter().enumerate() {
            let Ok(col) = u32::try_from(col_idx) else {
                break;
            };
            if field.trim().is_empty() {
                continue;
            }
            cells.push(GridCell::text(CellAddress::new(row, col), field));
        }
    }
    cells
}

/// Split a CSV line respecting quoted fields.
fn split_csv_line(line: &str, sep: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == sep {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    fn texts(cells: &[GridCell]) -> Vec<(String, &str)> {
        cells
            .iter()
            .map(|c| (c.address.to_a1(), c.text.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_csv_basic() {
        let cells = parse_csv(b"Name,Age\nAlice,30\n\nBob,25");
        assert_eq!(
            texts(&cells),
            [
                ("A1".to_string(), "Name"),
                ("B1".to_string(), "Age"),
                ("A2".to_string(), "Alice"),
                ("B2".to_string(), "30"),
                ("A3".to_string(), "Bob"),
                ("B3".to_string(), "25"),
            ]
        );
    }

    #[test]
    fn test_quoted_csv() {
        let cells = parse_csv(b"\"Hello, World\",42\n\"She said \"\"hi\"\"\",,x");
        assert_eq!(cells[0].text, "Hello, World");
        assert_eq!(cells[2].text, "She said \"hi\"");
        assert_eq!(cells[3].address.to_a1(), "C2");
    }

    #[test]
    fn test_bom_and_crlf() {
        let cells = parse_csv("\u{feff}a,b\r\nc".as_bytes());
        assert_eq!(texts(&cells)[0], ("A1".to_string(), "a"));
        assert_eq!(cells[1].text, "b");
        assert_eq!(cells[2].address.to_a1(), "A2");
    }

    #[test]
    fn test_whitespace_lines_take_no_row_and_values_are_verbatim() {
        let cells = parse_csv(b"a\n   \n\t\n  padded ,  \nz");
        assert_eq!(
            texts(&cells),
            [
                ("A1".to_string(), "a"),
                ("A2".to_string(), "  padded "),
                ("A3".to_string(), "z"),
            ]
        );
    }

    #[test]
    fn test_empty_csv() {
        assert!(parse_csv(b"").is_empty());
    }
}
