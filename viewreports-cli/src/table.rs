//! Cell values and header-named tables shared by every pipeline stage

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;

/// A single spreadsheet cell
#[derive(Debug, Clone, Default)]
pub enum CellValue {
    /// Blank cell
    #[default]
    Empty,
    /// Text value
    Text(String),
    /// Any numeric value (integers are stored as floats)
    Number(f64),
    /// Boolean
    Bool(bool),
    /// Date and time
    DateTime(NaiveDateTime),
    /// Spreadsheet error such as `#N/A`
    Error(String),
}

impl CellValue {
    /// Build a text cell, mapping the empty string to [`CellValue::Empty`]
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// Check if the cell holds no value
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text of a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell as display text; whole numbers print without a fraction
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }

    /// Canonical bit pattern for numeric equality and hashing
    fn number_bits(n: f64) -> u64 {
        if n == 0.0 {
            0.0f64.to_bits()
        } else if n.is_nan() {
            f64::NAN.to_bits()
        } else {
            n.to_bits()
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_empty() && b.is_empty() => true,
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Number(a), CellValue::Number(b)) => {
                Self::number_bits(*a) == Self::number_bits(*b)
            }
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            (CellValue::Error(a), CellValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_empty() {
            0u8.hash(state);
            return;
        }
        match self {
            CellValue::Empty => 0u8.hash(state),
            CellValue::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            CellValue::Number(n) => {
                2u8.hash(state);
                Self::number_bits(*n).hash(state);
            }
            CellValue::Bool(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            CellValue::DateTime(dt) => {
                4u8.hash(state);
                dt.hash(state);
            }
            CellValue::Error(e) => {
                5u8.hash(state);
                e.hash(state);
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

static EMPTY: CellValue = CellValue::Empty;

/// Rectangular table with named columns
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create a table from already-named columns, padding or truncating rows to fit
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Create a table from a raw header row and data rows
    ///
    /// Columns that are empty in every data row are dropped, then the
    /// remaining header cells become column names (see [`header_names`]).
    pub fn from_raw(header: Vec<CellValue>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let keep: Vec<usize> = (0..width)
            .filter(|&col| {
                rows.iter()
                    .any(|row| row.get(col).is_some_and(|c| !c.is_empty()))
            })
            .collect();

        let header: Vec<CellValue> = keep
            .iter()
            .map(|&col| header.get(col).cloned().unwrap_or_default())
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                keep.iter()
                    .map(|&col| row.get(col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self::new(header_names(&header), rows)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, col), empty when out of bounds
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Replace a column's values, appending the column when it does not exist
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(CellValue::Empty);
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[col] = value;
        }
    }

    /// Remove the named columns; names that are not present are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        let drop: Vec<bool> = self
            .columns
            .iter()
            .map(|c| names.contains(&c.as_str()))
            .collect();
        if !drop.contains(&true) {
            return;
        }

        let mut i = 0;
        self.columns.retain(|_| {
            let keep = !drop[i];
            i += 1;
            keep
        });
        for row in &mut self.rows {
            let mut i = 0;
            row.retain(|_| {
                let keep = !drop[i];
                i += 1;
                keep
            });
        }
    }

    /// Drop rows where every cell is empty
    pub fn drop_empty_rows(&mut self) {
        self.rows.retain(|row| row.iter().any(|c| !c.is_empty()));
    }

    /// Remove exact duplicate rows, keeping the first occurrence
    pub fn dedup_rows(&mut self) {
        let mut seen: HashSet<Vec<CellValue>> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }
}

/// Turn raw header cells into unique column names
///
/// Names are trimmed. Blank headers become `Unnamed: {index}` and repeated
/// names get `.1`, `.2`, ... suffixes in order of appearance.
pub fn header_names(header: &[CellValue]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    let mut used: HashSet<String> = HashSet::new();

    for (idx, cell) in header.iter().enumerate() {
        let base = cell.to_text().trim().to_string();
        let base = if base.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            base
        };

        let mut name = base.clone();
        let mut n = 1;
        while used.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}
