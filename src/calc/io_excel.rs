// Primitives for reading Excel (.xlsx) files.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::calc::{io_common::RawTable, *};

fn get_range(path: &str, cfs: &FileSource) -> CalcResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    wrange
        .context(MissingWorksheetSnafu { path })?
        .context(OpeningExcelSnafu { path })
}

fn read_cell(cell: &DataType, path: &str, lineno: usize) -> CalcResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{:.0}", f)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok(String::new()),
        _ => ExcelWrongCellTypeSnafu {
            path,
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

/// Reads a worksheet: the first row is the header.
pub fn read_excel_table(path: String, cfs: &FileSource) -> CalcResult<RawTable> {
    let wrange = get_range(&path, cfs)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .map(|c| read_cell(c, &path, 1).map(|s| s.trim().to_string()))
            .collect::<CalcResult<Vec<String>>>()?,
        None => whatever!("Empty worksheet in {}", path),
    };
    debug!("read_excel_table: header: {:?}", header);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells = row
            .iter()
            .map(|c| read_cell(c, &path, lineno))
            .collect::<CalcResult<Vec<String>>>()?;
        rows.push(cells);
    }
    info!("read_excel_table: {} rows in {}", rows.len(), path);
    Ok(RawTable { path, header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        let s = |c: DataType| read_cell(&c, "t.xlsx", 2).unwrap();
        assert_eq!(s(DataType::String("KOMITET".to_string())), "KOMITET");
        assert_eq!(s(DataType::Int(12)), "12");
        assert_eq!(s(DataType::Float(1234.0)), "1234");
        assert_eq!(s(DataType::Empty), "");
        assert!(read_cell(&DataType::Bool(true), "t.xlsx", 2).is_err());
    }

    #[test]
    fn reads_a_worksheet_by_name() {
        let path = format!(
            "{}/tests/fixtures/sejm_mini/sejm_mini.xlsx",
            env!("CARGO_MANIFEST_DIR")
        );
        let mut cfs = FileSource::new("xlsx", "sejm_mini.xlsx");
        cfs.excel_worksheet_name = Some("wyniki".to_string());
        let table = read_excel_table(path.clone(), &cfs).unwrap();
        assert_eq!(table.header.len(), 8);
        assert_eq!(table.header[3], "KOMITET WYBORCZY A");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][1], "Wałbrzych");
        assert_eq!(table.rows[1][4], "350");

        // The first worksheet holds the districts.
        let table = read_excel_table(path.clone(), &FileSource::new("xlsx", "x")).unwrap();
        assert_eq!(table.header[2], "Liczba mandatów");
        assert_eq!(table.rows[0][2], "4");

        cfs.excel_worksheet_name = Some("missing".to_string());
        assert!(matches!(
            read_excel_table(path, &cfs),
            Err(CalcError::MissingWorksheet { .. })
        ));
    }

    #[test]
    fn missing_file() {
        let res = read_excel_table(
            "/nonexistent/results.xlsx".to_string(),
            &FileSource::new("xlsx", "results.xlsx"),
        );
        assert!(matches!(res, Err(CalcError::OpeningExcel { .. })));
    }
}
