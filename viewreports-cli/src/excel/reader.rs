//! Read workbooks and CSV files into raw cell grids

use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::table::{CellValue, Table, header_names};

/// One worksheet (or CSV body) as an untyped grid, no header assumed
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Read every sheet of a workbook, in workbook order
///
/// The format (xlsx, xlsm, xlsb, xls, ods) is detected from the bytes.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<RawSheet>> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).context("Failed to open workbook")?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet: {}", name))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        sheets.push(RawSheet { name, rows });
    }

    Ok(sheets)
}

/// Read the first sheet of a workbook, using its first row as the header
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table> {
    let sheet = read_workbook(bytes)?
        .into_iter()
        .next()
        .context("Workbook has no sheets")?;

    let mut rows = sheet.rows.into_iter();
    let header = rows.next().unwrap_or_default();

    Ok(Table::new(header_names(&header), rows.collect()))
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::DateTime(naive),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

/// Field values read as missing in CSV files
const CSV_NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Read a CSV file: the first record is the header, the rest are data rows
///
/// A column whose non-missing values all parse as numbers becomes numeric;
/// any other column keeps its values as text.
pub fn read_csv(bytes: &[u8]) -> Result<(Vec<CellValue>, Vec<Vec<CellValue>>)> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
        records.push(record.iter().map(str::to_string).collect());
    }

    let mut records = records.into_iter();
    let header = records
        .next()
        .map(|fields| fields.into_iter().map(CellValue::text).collect())
        .unwrap_or_default();

    let raw: Vec<Vec<Option<String>>> = records
        .map(|fields| {
            fields
                .into_iter()
                .map(|f| (!f.is_empty() && !CSV_NA_VALUES.contains(&f.as_str())).then_some(f))
                .collect()
        })
        .collect();

    let width = raw.iter().map(Vec::len).max().unwrap_or(0);
    let numeric: Vec<bool> = (0..width)
        .map(|col| {
            raw.iter()
                .filter_map(|row| row.get(col).and_then(Option::as_deref))
                .all(|f| parse_number(f).is_some())
        })
        .collect();

    let rows = raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(col, field)| match field {
                    None => CellValue::Empty,
                    Some(f) if numeric[col] => parse_number(&f)
                        .map(CellValue::Number)
                        .unwrap_or(CellValue::Text(f)),
                    Some(f) => CellValue::Text(f),
                })
                .collect()
        })
        .collect();

    Ok((header, rows))
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_read_workbook_all_sheets() {
        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Summary").unwrap();
        first.write_string(0, 0, "total").unwrap();
        first.write_number(0, 1, 12.0).unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Data").unwrap();
        second.write_string(1, 2, "x").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheets = read_workbook(&bytes).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Summary");
        assert_eq!(sheets[0].rows[0], vec![CellValue::text("total"), CellValue::Number(12.0)]);
        assert_eq!(sheets[1].name, "Data");
    }

    #[test]
    fn test_read_workbook_rejects_garbage() {
        assert!(read_workbook(b"definitely not a spreadsheet").is_err());
    }

    #[test]
    fn test_read_first_sheet_header() {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, " HOUSE_NUMBER ").unwrap();
        ws.write_string(0, 1, "name").unwrap();
        ws.write_number(1, 0, 100.0).unwrap();
        ws.write_string(1, 1, "Show").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = read_first_sheet(&bytes).unwrap();
        assert_eq!(table.columns, vec!["HOUSE_NUMBER", "name"]);
        assert_eq!(table.cell(0, 0), &CellValue::Number(100.0));
    }

    #[test]
    fn test_read_csv_column_types() {
        let data = "\u{feff}name,views,code\nA,10,x1\nB,NA,22\n,,\nC,3.5,7\n";
        let (header, rows) = read_csv(data.as_bytes()).unwrap();

        assert_eq!(header[0], CellValue::text("name"));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][1], CellValue::Number(10.0));
        assert_eq!(rows[1][1], CellValue::Empty);
        assert_eq!(rows[3][1], CellValue::Number(3.5));
        // mixed column stays text
        assert_eq!(rows[1][2], CellValue::text("22"));
        assert!(rows[2].iter().all(CellValue::is_empty));
    }

    #[test]
    fn test_read_csv_invalid_utf8_is_error() {
        assert!(read_csv(b"a,b\n\xff\xfe,1\n").is_err());
    }
}
