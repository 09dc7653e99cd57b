use std::path::Path;

use crate::calc::*;

/// A table as read from a file: a header and rows of cells, all as strings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, column: &str) -> CalcResult<usize> {
        self.header
            .iter()
            .position(|h| h.trim() == column.trim())
            .context(MissingColumnSnafu {
                column,
                path: self.path.clone(),
            })
    }

    /// The content of a cell. Missing cells at the end of a row are empty.
    pub fn cell<'a>(&self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(|s| s.as_str()).unwrap_or("")
    }

    /// The line number in the file of a row, the header being the first line.
    pub fn lineno(&self, row_idx: usize) -> usize {
        row_idx + 2
    }

    pub fn read_id(&self, row: &[String], idx: usize, lineno: usize) -> CalcResult<u32> {
        let content = self.cell(row, idx);
        let column = self.header.get(idx).cloned().unwrap_or_default();
        let x = parse_count(content, &self.path, lineno, &column)?;
        u32::try_from(x).ok().context(ParsingNumberSnafu {
            content,
            path: self.path.clone(),
            lineno,
            column,
        })
    }
}

/// Reads a count of votes or seats.
///
/// Spaces used as thousands separators are accepted, and empty cells count as zero.
/// Spreadsheets may store integers as floating point numbers: they are accepted as
/// long as they have no fractional part.
pub fn parse_count(content: &str, path: &str, lineno: usize, column: &str) -> CalcResult<u64> {
    let cleaned: String = content
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if cleaned.is_empty() {
        return Ok(0);
    }
    if let Ok(x) = cleaned.parse::<u64>() {
        return Ok(x);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => {
            Ok(f as u64)
        }
        _ => ParsingNumberSnafu {
            content,
            path,
            lineno,
            column,
        }
        .fail(),
    }
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable {
            path: "t.csv".to_string(),
            header: vec!["Numer okręgu".to_string(), " Siedziba OKW ".to_string()],
            rows: vec![vec!["12".to_string()]],
        }
    }

    #[test]
    fn counts() {
        assert_eq!(parse_count("1234", "t", 2, "c").unwrap(), 1234);
        assert_eq!(parse_count(" 1 234 567 ", "t", 2, "c").unwrap(), 1234567);
        assert_eq!(parse_count("12\u{a0}000", "t", 2, "c").unwrap(), 12000);
        assert_eq!(parse_count("", "t", 2, "c").unwrap(), 0);
        assert_eq!(parse_count("  ", "t", 2, "c").unwrap(), 0);
        assert_eq!(parse_count("41.0", "t", 2, "c").unwrap(), 41);
        assert!(parse_count("41.5", "t", 2, "c").is_err());
        assert!(parse_count("-3", "t", 2, "c").is_err());
        assert!(parse_count("abc", "t", 2, "c").is_err());
    }

    #[test]
    fn columns_and_cells() {
        let t = table();
        assert_eq!(t.column_index("Siedziba OKW").unwrap(), 1);
        assert!(t.column_index("Liczba mandatów").is_err());
        let row = &t.rows[0];
        assert_eq!(t.cell(row, 0), "12");
        assert_eq!(t.cell(row, 1), "");
        assert_eq!(t.read_id(row, 0, 2).unwrap(), 12);
        assert_eq!(t.lineno(0), 2);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/okregi_sejm.csv"), "okregi_sejm");
        assert_eq!(simplify_file_name("wyniki.xlsx"), "wyniki");
    }
}
