// Primitives for reading CSV files.

use crate::calc::{io_common::RawTable, *};

/// Reads a CSV file with a header line. Rows may have different lengths.
pub fn read_csv_table(path: String, cfs: &FileSource) -> CalcResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(cfs.delimiter()?)
        .flexible(true)
        .from_path(&path)
        .context(OpeningCsvSnafu { path: path.clone() })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineSnafu {
            path: path.clone(),
            lineno: 1_usize,
        })?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    debug!("read_csv_table: header: {:?}", header);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineSnafu {
            path: path.clone(),
            lineno,
        })?;
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    info!("read_csv_table: {} rows in {}", rows.len(), path);
    Ok(RawTable { path, header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_districts_fixture() {
        let path = format!(
            "{}/tests/fixtures/sejm_mini/districts.csv",
            env!("CARGO_MANIFEST_DIR")
        );
        let table = read_csv_table(path, &FileSource::new("csv", "districts.csv")).unwrap();
        assert_eq!(table.header[0], "Numer okręgu");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][1], "Wałbrzych");
    }

    #[test]
    fn missing_file() {
        let res = read_csv_table(
            "/nonexistent/districts.csv".to_string(),
            &FileSource::new("csv", "districts.csv"),
        );
        assert!(matches!(res, Err(CalcError::OpeningCsv { .. })));
    }
}
