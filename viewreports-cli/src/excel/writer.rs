//! Write tables to xlsx or CSV bytes

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::table::{CellValue, Table};

/// Write a table to a single-sheet workbook: header row, then data rows
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Sheet1")?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, column_number(col)?, name)
            .with_context(|| format!("Failed to write header '{}'", name))?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1).context("Too many rows for a worksheet")?;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_num, column_number(col)?, value)
                .with_context(|| format!("Failed to write row {}", row_num + 1))?;
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to serialize workbook")
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col).with_context(|| format!("Column {} is out of range for a worksheet", col + 1))
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) if n.is_finite() => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        other => {
            ws.write_string(row, col, other.to_text())?;
        }
    }
    Ok(())
}

/// Write a table as CSV with a header record
pub fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(&table.columns)
        .context("Failed to write CSV header")?;

    for row in &table.rows {
        wtr.write_record(row.iter().map(CellValue::to_text))
            .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV buffer: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::read_first_sheet;

    fn sample() -> Table {
        Table::new(
            vec!["name".into(), "views".into()],
            vec![
                vec![CellValue::text("Show, Part 1"), CellValue::Number(12.0)],
                vec![CellValue::Empty, CellValue::Bool(true)],
            ],
        )
    }

    #[test]
    fn test_write_xlsx_readable() {
        let bytes = write_xlsx(&sample()).unwrap();
        let table = read_first_sheet(&bytes).unwrap();

        assert_eq!(table.columns, vec!["name", "views"]);
        assert_eq!(table.cell(0, 0), &CellValue::text("Show, Part 1"));
        assert_eq!(table.cell(0, 1), &CellValue::Number(12.0));
        assert_eq!(table.cell(1, 1), &CellValue::Bool(true));
    }

    #[test]
    fn test_write_xlsx_rejects_oversized_text() {
        let table = Table::new(vec!["name".into()], vec![vec![CellValue::text("x".repeat(40_000))]]);
        assert!(write_xlsx(&table).is_err());
    }

    #[test]
    fn test_write_xlsx_rejects_too_many_columns() {
        let columns: Vec<String> = (0..70_000).map(|i| format!("c{}", i)).collect();
        assert!(write_xlsx(&Table::new(columns, Vec::new())).is_err());
    }

    #[test]
    fn test_write_csv_quotes_fields() {
        let bytes = write_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "name,views\n\"Show, Part 1\",12\n,TRUE\n");
    }
}
