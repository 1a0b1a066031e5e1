//! Reference map loading and the lookup tables derived from it

use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use super::dash::normalize_dash;
use crate::config::ReferenceColumns;
use crate::excel::read_first_sheet;
use crate::table::{CellValue, Table};

/// One canonical program record
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub house_number: CellValue,
    pub canonical_name: CellValue,
    pub vendor_name: CellValue,
}

/// The trusted mapping table, in workbook order
#[derive(Debug, Clone)]
pub struct ReferenceMap {
    pub records: Vec<ReferenceRecord>,
    pub columns: ReferenceColumns,
}

impl ReferenceMap {
    /// Load the first sheet of the reference workbook
    pub fn from_bytes(bytes: &[u8], columns: &ReferenceColumns) -> Result<Self> {
        let table = read_first_sheet(bytes).context("Failed to read reference workbook")?;
        Self::from_table(&table, columns)
    }

    /// Build from an already-read table; all three configured columns must exist
    pub fn from_table(table: &Table, columns: &ReferenceColumns) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            match table.column_index(name) {
                Some(idx) => Ok(idx),
                None => bail!(
                    "Reference workbook is missing required column '{}' (found: {})",
                    name,
                    table.columns.join(", ")
                ),
            }
        };

        let house_col = find(&columns.house_number)?;
        let canonical_col = find(&columns.canonical_name)?;
        let vendor_col = find(&columns.vendor_name)?;

        let records = table
            .rows
            .iter()
            .map(|row| ReferenceRecord {
                house_number: row[house_col].clone(),
                canonical_name: row[canonical_col].clone(),
                vendor_name: row[vendor_col].clone(),
            })
            .collect();

        Ok(Self {
            records,
            columns: columns.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Deduplicated lookup tables, built once per run
///
/// Values are indices into [`ReferenceMap::records`].
#[derive(Debug, Clone)]
pub struct ReferenceLookups<'a> {
    map: &'a ReferenceMap,
    /// Exact canonical name, first occurrence wins
    by_canonical: HashMap<&'a CellValue, usize>,
    /// Exact vendor name, first occurrence wins
    by_vendor: HashMap<&'a CellValue, usize>,
    /// Dash-normalized canonical name, longest vendor name wins
    by_normalized_canonical: HashMap<String, usize>,
    /// House number, longest vendor name wins
    by_house_number: HashMap<&'a CellValue, usize>,
}

impl<'a> ReferenceLookups<'a> {
    pub fn build(map: &'a ReferenceMap) -> Self {
        let records = &map.records;

        let mut by_canonical = HashMap::new();
        let mut by_vendor = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if !record.canonical_name.is_empty() {
                by_canonical.entry(&record.canonical_name).or_insert(idx);
            }
            if !record.vendor_name.is_empty() {
                by_vendor.entry(&record.vendor_name).or_insert(idx);
            }
        }

        // Stable sort: equal lengths keep workbook order
        let mut longest_first: Vec<usize> = (0..records.len()).collect();
        longest_first.sort_by_key(|&idx| std::cmp::Reverse(vendor_name_len(&records[idx])));

        let mut by_normalized_canonical = HashMap::new();
        let mut by_house_number = HashMap::new();
        for &idx in &longest_first {
            let record = &records[idx];
            if let Some(name) = record.canonical_name.as_text() {
                let key = normalize_dash(name);
                if !key.is_empty() {
                    by_normalized_canonical.entry(key).or_insert(idx);
                }
            }
            if !record.house_number.is_empty() {
                by_house_number.entry(&record.house_number).or_insert(idx);
            }
        }

        log::debug!(
            "Reference lookups: {} canonical, {} vendor, {} normalized, {} house numbers",
            by_canonical.len(),
            by_vendor.len(),
            by_normalized_canonical.len(),
            by_house_number.len()
        );

        Self {
            map,
            by_canonical,
            by_vendor,
            by_normalized_canonical,
            by_house_number,
        }
    }

    pub fn columns(&self) -> &ReferenceColumns {
        &self.map.columns
    }

    pub fn by_canonical(&self, name: &CellValue) -> Option<&'a ReferenceRecord> {
        self.by_canonical.get(name).map(|&idx| &self.map.records[idx])
    }

    pub fn by_vendor(&self, name: &CellValue) -> Option<&'a ReferenceRecord> {
        self.by_vendor.get(name).map(|&idx| &self.map.records[idx])
    }

    /// Look up an already dash-normalized canonical name
    pub fn by_normalized_canonical(&self, key: &str) -> Option<&'a ReferenceRecord> {
        self.by_normalized_canonical
            .get(key)
            .map(|&idx| &self.map.records[idx])
    }

    pub fn by_house_number(&self, house: &CellValue) -> Option<&'a ReferenceRecord> {
        self.by_house_number.get(house).map(|&idx| &self.map.records[idx])
    }
}

/// Character length of the vendor name; missing names count as zero
fn vendor_name_len(record: &ReferenceRecord) -> usize {
    record.vendor_name.to_text().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn record(house: f64, canonical: &str, vendor: &str) -> ReferenceRecord {
        ReferenceRecord {
            house_number: CellValue::Number(house),
            canonical_name: text(canonical),
            vendor_name: text(vendor),
        }
    }

    fn map(records: Vec<ReferenceRecord>) -> ReferenceMap {
        ReferenceMap {
            records,
            columns: ReferenceColumns::default(),
        }
    }

    #[test]
    fn test_from_table_requires_columns() {
        let columns = ReferenceColumns::default();
        let table = Table::new(
            vec!["HOUSE_NUMBER".into(), columns.canonical_name.clone()],
            vec![],
        );
        let err = ReferenceMap::from_table(&table, &columns).unwrap_err();
        assert!(err.to_string().contains(&columns.vendor_name));
    }

    #[test]
    fn test_from_table_reads_records() {
        let columns = ReferenceColumns::default();
        let table = Table::new(
            vec![
                columns.vendor_name.clone(),
                "notes".into(),
                "HOUSE_NUMBER".into(),
                columns.canonical_name.clone(),
            ],
            vec![vec![text("Show HD"), text("x"), CellValue::Number(7.0), text("Show")]],
        );
        let map = ReferenceMap::from_table(&table, &columns).unwrap();
        assert_eq!(map.records, vec![record(7.0, "Show", "Show HD")]);
    }

    #[test]
    fn test_canonical_lookup_first_seen_wins() {
        let map = map(vec![
            record(1.0, "Show", "S"),
            record(2.0, "Show", "Show - Extended Name"),
        ]);
        let lookups = ReferenceLookups::build(&map);

        let hit = lookups.by_canonical(&text("Show")).unwrap();
        assert_eq!(hit.house_number, CellValue::Number(1.0));
    }

    #[test]
    fn test_normalized_lookup_longest_vendor_name_wins() {
        let map = map(vec![
            record(1.0, "Show", "S"),
            record(2.0, "Show", "Show - Extended Name"),
        ]);
        let lookups = ReferenceLookups::build(&map);

        let hit = lookups.by_normalized_canonical("Show").unwrap();
        assert_eq!(hit.house_number, CellValue::Number(2.0));
    }

    #[test]
    fn test_longest_tie_keeps_workbook_order() {
        let map = map(vec![record(1.0, "A-B", "xx"), record(2.0, "A - B", "yy")]);
        let lookups = ReferenceLookups::build(&map);
        assert_eq!(
            lookups.by_normalized_canonical("A - B").unwrap().house_number,
            CellValue::Number(1.0)
        );
    }

    #[test]
    fn test_house_number_collapse_prefers_longest() {
        let map = map(vec![
            record(5.0, "One", "short"),
            record(5.0, "Two", "much longer name"),
        ]);
        let lookups = ReferenceLookups::build(&map);
        assert_eq!(
            lookups.by_house_number(&CellValue::Number(5.0)).unwrap().canonical_name,
            text("Two")
        );
    }

    #[test]
    fn test_empty_names_not_indexed() {
        let map = map(vec![ReferenceRecord {
            house_number: CellValue::Number(9.0),
            canonical_name: CellValue::Empty,
            vendor_name: CellValue::Empty,
        }]);
        let lookups = ReferenceLookups::build(&map);
        assert!(lookups.by_canonical(&CellValue::Empty).is_none());
        assert!(lookups.by_normalized_canonical("").is_none());
    }
}
