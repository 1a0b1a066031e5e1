//! Spreadsheet I/O: reading vendor exports and reference workbooks, writing
//! intermediate tables

mod address;
mod reader;
mod writer;

pub use address::{CellRange, CellRef, column_letters};
pub use reader::{RawSheet, read_csv, read_first_sheet, read_workbook};
pub use writer::{write_csv, write_xlsx};
