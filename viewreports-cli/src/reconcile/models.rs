use std::fmt;

use crate::table::Table;

/// Which reconciliation strategy ran for a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchBranch {
    /// Program names joined against canonical and vendor names
    ByName { column: String },
    /// Vendor house keys joined against `HOUSE_NUMBER`
    ByHouseKey { column: String },
    /// No vendor rule matched the file name
    NoRule,
    /// A rule matched but its column is not in the table
    MissingColumn { column: String },
}

impl MatchBranch {
    pub fn label(&self) -> String {
        match self {
            MatchBranch::ByName { column } => format!("[Name: {}]", column),
            MatchBranch::ByHouseKey { column } => format!("[House key: {}]", column),
            MatchBranch::NoRule => "[Passthrough]".to_string(),
            MatchBranch::MissingColumn { column } => format!("[Missing column: {}]", column),
        }
    }
}

/// Where a row's `HOUSE_NUMBER` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Canonical,
    Vendor,
    DashSwap,
    HouseKey,
    Unmatched,
}

/// Per-table match counts, taken before duplicate rows are removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub canonical: usize,
    pub vendor: usize,
    pub dash_swap: usize,
    pub house_key: usize,
    pub unmatched: usize,
}

impl MatchStats {
    pub fn record(&mut self, source: MatchSource) {
        match source {
            MatchSource::Canonical => self.canonical += 1,
            MatchSource::Vendor => self.vendor += 1,
            MatchSource::DashSwap => self.dash_swap += 1,
            MatchSource::HouseKey => self.house_key += 1,
            MatchSource::Unmatched => self.unmatched += 1,
        }
    }

    pub fn matched(&self) -> usize {
        self.canonical + self.vendor + self.dash_swap + self.house_key
    }
}

impl fmt::Display for MatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matched {} (canonical {}, vendor {}, dash swap {}, house key {}), unmatched {}",
            self.matched(),
            self.canonical,
            self.vendor,
            self.dash_swap,
            self.house_key,
            self.unmatched
        )
    }
}

/// A table after reconciliation
#[derive(Debug, Clone)]
pub struct ReconciledTable {
    pub identity: String,
    pub table: Table,
    pub branch: MatchBranch,
    pub stats: MatchStats,
}
