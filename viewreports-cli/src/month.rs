//! Report month (`MM/YYYY`)

use std::fmt;

use anyhow::{Result, bail};
use chrono::{Datelike, Local, NaiveDate};

/// The month a report covers, always formatted `MM/YYYY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMonth {
    month: u32,
    year: i32,
}

impl ReportMonth {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Month must be between 01 and 12, got {}", month);
        }
        if !(1000..=9999).contains(&year) {
            bail!("Year must have four digits, got {}", year);
        }
        Ok(Self { month, year })
    }

    /// Parse a strict `MM/YYYY` string
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some((mm, yyyy)) = s.split_once('/') else {
            bail!("Invalid month '{}': expected MM/YYYY", s);
        };
        if mm.len() != 2
            || yyyy.len() != 4
            || !mm.bytes().all(|b| b.is_ascii_digit())
            || !yyyy.bytes().all(|b| b.is_ascii_digit())
        {
            bail!("Invalid month '{}': expected MM/YYYY", s);
        }

        // Both halves are all digits, so parsing cannot fail
        let month: u32 = mm.parse()?;
        let year: i32 = yyyy.parse()?;
        Self::new(month, year)
    }

    /// The calendar month before the one containing `today`
    pub fn previous(today: NaiveDate) -> Self {
        let (month, year) = if today.month() == 1 {
            (12, today.year() - 1)
        } else {
            (today.month() - 1, today.year())
        };
        Self { month, year }
    }

    /// The calendar month before the current local date
    pub fn previous_from_now() -> Self {
        Self::previous(Local::now().date_naive())
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}
