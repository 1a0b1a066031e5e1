//! A1-style cell addresses and ranges

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Last worksheet column (`XFD`)
pub const MAX_COLUMN: u32 = 16_384;

/// 1-based cell position, e.g. `B2` is row 2, column 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Convert a 1-based column number into letters (1 -> A, 27 -> AA)
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .with_context(|| format!("Cell reference '{}' has no row number", s))?;
        let (letters, digits) = s.split_at(split);
        let letters = letters.trim_start_matches('$').trim_end_matches('$');

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("Cell reference '{}' has an invalid column", s);
        }

        let col = letters
            .bytes()
            .try_fold(0u32, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add(u32::from(c.to_ascii_uppercase() - b'A') + 1)
            })
            .filter(|&col| col <= MAX_COLUMN)
            .with_context(|| format!("Cell reference '{}' is beyond column XFD", s))?;
        let row: u32 = digits
            .parse()
            .with_context(|| format!("Cell reference '{}' has an invalid row", s))?;

        if row == 0 {
            bail!("Cell reference '{}' has row 0", s);
        }

        Ok(CellRef { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl TryFrom<String> for CellRef {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CellRef> for String {
    fn from(r: CellRef) -> Self {
        r.to_string()
    }
}

/// Inclusive rectangular range such as `P5:P16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Every cell in the range, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellRef { row, col }))
    }
}

impl FromStr for CellRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = match s.split_once(':') {
            Some((a, b)) => (a.parse::<CellRef>()?, b.parse::<CellRef>()?),
            None => {
                let single = s.parse::<CellRef>()?;
                (single, single)
            }
        };

        Ok(CellRange {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl TryFrom<String> for CellRange {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CellRange> for String {
    fn from(r: CellRange) -> Self {
        r.to_string()
    }
}
