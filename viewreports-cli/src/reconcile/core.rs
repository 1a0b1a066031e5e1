//! Per-table reconciliation against the reference lookups

use super::dash::{normalize_dash, swap_dash};
use super::models::{MatchBranch, MatchSource, MatchStats, ReconciledTable};
use super::reference::ReferenceLookups;
use crate::extract::ExtractedTable;
use crate::table::CellValue;
use crate::vendors::{self, HOUSE_KEY_COLUMNS, RECONCILE_PROGRAM_COLUMNS};

/// Attach `HOUSE_NUMBER` to one extracted table
///
/// The program-name rule is checked first; only when no program rule matches
/// the identity is the house-key rule tried. A rule whose column is missing
/// leaves the table unchanged.
pub fn reconcile_table(extracted: ExtractedTable, lookups: &ReferenceLookups<'_>) -> ReconciledTable {
    let ExtractedTable {
        identity,
        mut table,
        ..
    } = extracted;

    let columns = lookups.columns();
    let name_columns = [columns.canonical_name.as_str(), columns.vendor_name.as_str()];
    let mut stats = MatchStats::default();

    let branch = if let Some(rule) = vendors::first_match(RECONCILE_PROGRAM_COLUMNS, &identity) {
        match table.column_index(rule.value) {
            Some(col) => {
                let houses: Vec<CellValue> = table
                    .rows
                    .iter()
                    .map(|row| {
                        let (house, source) = match_by_name(&row[col], lookups);
                        stats.record(source);
                        house
                    })
                    .collect();

                table.set_column(&columns.house_number, houses);
                table.drop_columns(&name_columns);
                table.dedup_rows();
                MatchBranch::ByName {
                    column: rule.value.to_string(),
                }
            }
            None => MatchBranch::MissingColumn {
                column: rule.value.to_string(),
            },
        }
    } else if let Some(rule) = vendors::first_match(HOUSE_KEY_COLUMNS, &identity) {
        match table.column_index(rule.value) {
            Some(col) => {
                for row in &table.rows {
                    let source = match lookups.by_house_number(&row[col]) {
                        Some(_) => MatchSource::HouseKey,
                        None => MatchSource::Unmatched,
                    };
                    stats.record(source);
                }

                table.drop_columns(&name_columns);
                table.dedup_rows();
                MatchBranch::ByHouseKey {
                    column: rule.value.to_string(),
                }
            }
            None => MatchBranch::MissingColumn {
                column: rule.value.to_string(),
            },
        }
    } else {
        MatchBranch::NoRule
    };

    match &branch {
        MatchBranch::ByName { .. } | MatchBranch::ByHouseKey { .. } => {
            log::info!("{} {}: {}", identity, branch.label(), stats);
        }
        MatchBranch::MissingColumn { column } => {
            log::warn!(
                "{}: column '{}' not found, passing table through unchanged",
                identity,
                column
            );
        }
        MatchBranch::NoRule => {
            log::debug!("{}: no vendor rule matched, passing table through", identity);
        }
    }

    ReconciledTable {
        identity,
        table,
        branch,
        stats,
    }
}

/// Resolve a program name to a house number
///
/// Exact canonical name first, then exact vendor name, then the
/// "A - B" to "B - A" swap against dash-normalized canonical names.
fn match_by_name(value: &CellValue, lookups: &ReferenceLookups<'_>) -> (CellValue, MatchSource) {
    if let Some(record) = lookups.by_canonical(value) {
        if !record.house_number.is_empty() {
            return (record.house_number.clone(), MatchSource::Canonical);
        }
    }
    if let Some(record) = lookups.by_vendor(value) {
        if !record.house_number.is_empty() {
            return (record.house_number.clone(), MatchSource::Vendor);
        }
    }

    let swapped = value
        .as_text()
        .and_then(swap_dash)
        .map(|s| normalize_dash(&s))
        .and_then(|key| lookups.by_normalized_canonical(&key));
    if let Some(record) = swapped {
        if !record.house_number.is_empty() {
            return (record.house_number.clone(), MatchSource::DashSwap);
        }
    }

    (CellValue::Empty, MatchSource::Unmatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceColumns;
    use crate::extract::SourceFormat;
    use crate::reconcile::reference::{ReferenceMap, ReferenceRecord};
    use crate::table::Table;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn reference() -> ReferenceMap {
        let record = |house: f64, canonical: &str, vendor: &str| ReferenceRecord {
            house_number: CellValue::Number(house),
            canonical_name: text(canonical),
            vendor_name: text(vendor),
        };
        ReferenceMap {
            records: vec![
                record(100.0, "Morning Show", "Morning Show HD"),
                record(200.0, "News - Evening", "Evening News"),
                record(300.0, "Drama", "D"),
                record(301.0, "Drama", "Drama Extended Cut"),
                record(400.0, "Kids", "Kids Channel"),
            ],
            columns: ReferenceColumns::default(),
        }
    }

    fn extracted(identity: &str, columns: &[&str], rows: Vec<Vec<CellValue>>) -> ExtractedTable {
        ExtractedTable {
            identity: identity.to_string(),
            sheet: None,
            format: SourceFormat::Workbook,
            table: Table::new(columns.iter().map(|c| c.to_string()).collect(), rows),
        }
    }

    #[test]
    fn test_name_branch_match_order() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let input = extracted(
            "פרטנר_ינואר_Sheet1",
            &["שם תוכן", "views"],
            vec![
                vec![text("Morning Show"), CellValue::Number(10.0)],
                vec![text("Evening News"), CellValue::Number(11.0)],
                vec![text("Evening - News"), CellValue::Number(12.0)],
                vec![text("Unknown"), CellValue::Number(13.0)],
            ],
        );

        let out = reconcile_table(input, &lookups);

        assert_eq!(
            out.branch,
            MatchBranch::ByName {
                column: "שם תוכן".into()
            }
        );
        assert_eq!(out.table.columns, vec!["שם תוכן", "views", "HOUSE_NUMBER"]);
        assert_eq!(out.table.cell(0, 2), &CellValue::Number(100.0));
        assert_eq!(out.table.cell(1, 2), &CellValue::Number(200.0));
        assert_eq!(out.table.cell(2, 2), &CellValue::Number(200.0));
        assert_eq!(out.table.cell(3, 2), &CellValue::Empty);
        assert_eq!(out.stats.canonical, 1);
        assert_eq!(out.stats.vendor, 1);
        assert_eq!(out.stats.dash_swap, 1);
        assert_eq!(out.stats.unmatched, 1);
    }

    #[test]
    fn test_canonical_duplicate_uses_first_record() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let input = extracted("פרטנר", &["שם תוכן"], vec![vec![text("Drama")]]);

        let out = reconcile_table(input, &lookups);
        assert_eq!(out.table.cell(0, 1), &CellValue::Number(300.0));
    }

    #[test]
    fn test_swapped_name_prefers_longest_vendor_name() {
        let record = |house: f64, vendor: &str| ReferenceRecord {
            house_number: CellValue::Number(house),
            canonical_name: text("B - A"),
            vendor_name: text(vendor),
        };
        let map = ReferenceMap {
            records: vec![record(500.0, "B-A"), record(501.0, "B - A full title")],
            columns: ReferenceColumns::default(),
        };
        let lookups = ReferenceLookups::build(&map);
        let input = extracted("פרטנר", &["שם תוכן"], vec![vec![text("A—B")]]);

        let out = reconcile_table(input, &lookups);
        assert_eq!(out.table.cell(0, 1), &CellValue::Number(501.0));
        assert_eq!(out.stats.dash_swap, 1);
    }

    #[test]
    fn test_name_branch_dedups_rows() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let input = extracted(
            "סטינג ליניארי",
            &["תוכן", "views"],
            vec![
                vec![text("Kids"), CellValue::Number(5.0)],
                vec![text("Kids"), CellValue::Number(5.0)],
                vec![text("Kids"), CellValue::Number(6.0)],
            ],
        );

        let out = reconcile_table(input, &lookups);
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.stats.canonical, 3);
    }

    #[test]
    fn test_house_key_branch_keeps_columns() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let input = extracted(
            "סלקום_ינואר",
            &["קוד מזהה", "שם פריט", "כמות הזמנות"],
            vec![
                vec![CellValue::Number(301.0), text("Drama"), CellValue::Number(3.0)],
                vec![CellValue::Number(999.0), text("Other"), CellValue::Number(4.0)],
                vec![CellValue::Number(301.0), text("Drama"), CellValue::Number(3.0)],
            ],
        );

        let out = reconcile_table(input, &lookups);
        assert_eq!(
            out.branch,
            MatchBranch::ByHouseKey {
                column: "קוד מזהה".into()
            }
        );
        assert_eq!(out.table.columns, vec!["קוד מזהה", "שם פריט", "כמות הזמנות"]);
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.stats.house_key, 2);
        assert_eq!(out.stats.unmatched, 1);
    }

    #[test]
    fn test_missing_program_column_passes_through() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let rows = vec![vec![text("Kids")], vec![text("Kids")]];
        let input = extracted("יס_ינואר", &["something else"], rows.clone());

        let out = reconcile_table(input, &lookups);
        assert_eq!(
            out.branch,
            MatchBranch::MissingColumn {
                column: "תאור אירוע".into()
            }
        );
        assert_eq!(out.table.rows, rows);
    }

    #[test]
    fn test_unknown_vendor_passes_through() {
        let map = reference();
        let lookups = ReferenceLookups::build(&map);
        let input = extracted("export_2025", &["a"], vec![vec![text("x")]]);

        let out = reconcile_table(input, &lookups);
        assert_eq!(out.branch, MatchBranch::NoRule);
        assert_eq!(out.table.columns, vec!["a"]);
        assert_eq!(out.stats, MatchStats::default());
    }
}
