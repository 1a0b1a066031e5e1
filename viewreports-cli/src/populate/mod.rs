//! Template population
//!
//! Each reconciled table becomes one filled copy of the report template:
//! month and platform in the header cells, the matching legend entries
//! highlighted, and one data row per source row that carries any of the
//! program, house number or viewer count.

mod styles;
mod template;
mod xml;

use std::collections::HashMap;

use anyhow::Result;

pub use template::TemplateWorkbook;

use crate::config::{ReferenceColumns, TemplateLayout};
use crate::excel::CellRef;
use crate::month::ReportMonth;
use crate::reconcile::ReconciledTable;
use crate::vendors::{
    self, HOUSE_KEY_COLUMNS, PLATFORM_LABELS, REPORT_PROGRAM_COLUMNS, REPORT_VIEWER_COLUMNS,
};

/// Source columns and platform label for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRoles {
    pub program: String,
    pub house: String,
    pub viewers: String,
    pub platform: String,
}

impl ReportRoles {
    /// Resolve every role from the table identity
    ///
    /// The house column falls back to the reference house-number column;
    /// the other roles have no fallback.
    pub fn resolve(identity: &str, reference: &ReferenceColumns) -> Option<Self> {
        let program = vendors::resolve(REPORT_PROGRAM_COLUMNS, identity)?;
        let viewers = vendors::resolve(REPORT_VIEWER_COLUMNS, identity)?;
        let platform = vendors::resolve(PLATFORM_LABELS, identity)?;
        let house = vendors::resolve(HOUSE_KEY_COLUMNS, identity).unwrap_or(reference.house_number.as_str());

        Some(Self {
            program: program.to_string(),
            house: house.to_string(),
            viewers: viewers.to_string(),
            platform: platform.to_string(),
        })
    }
}

/// Fill one copy of the template from a reconciled table
///
/// Returns `Ok(None)` when the table cannot be mapped to the report: no
/// vendor rule, a source column missing or a template header missing.
pub fn populate_table(
    reconciled: &ReconciledTable,
    template: &TemplateWorkbook,
    month: &ReportMonth,
    layout: &TemplateLayout,
    reference: &ReferenceColumns,
) -> Result<Option<Vec<u8>>> {
    let identity = &reconciled.identity;
    let table = &reconciled.table;

    let Some(roles) = ReportRoles::resolve(identity, reference) else {
        log::info!("{}: no report rules for this platform, skipping", identity);
        return Ok(None);
    };

    let source = [&roles.program, &roles.house, &roles.viewers].map(|name| table.column_index(name));
    let [Some(program_col), Some(house_col), Some(viewers_col)] = source else {
        let missing: Vec<&str> = [&roles.program, &roles.house, &roles.viewers]
            .iter()
            .zip(source)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.as_str())
            .collect();
        log::info!("{}: missing columns {}, skipping", identity, missing.join(", "));
        return Ok(None);
    };

    let headers: HashMap<String, u32> = template
        .row_texts(layout.header_row)
        .into_iter()
        .map(|(col, text)| (text.trim().to_string(), col))
        .collect();
    let targets = [
        &layout.program_header,
        &layout.house_header,
        &layout.viewers_header,
        &layout.date_header,
    ]
    .map(|label| headers.get(label.as_str()).copied());
    let [Some(t_program), Some(t_house), Some(t_viewers), Some(t_date)] = targets else {
        log::warn!(
            "{}: template row {} is missing a required header, skipping",
            identity,
            layout.header_row
        );
        return Ok(None);
    };

    let month_text = month.to_string();
    let mut report = template.clone();

    report.set_text(layout.month_cell, &month_text);
    report.set_text(layout.platform_cell, &roles.platform);
    let platform_hits = report.highlight_matching(&layout.platform_legend, &roles.platform, &layout.highlight_rgb)?;
    let month_hits = report.highlight_matching(&layout.month_legend, &month_text, &layout.highlight_rgb)?;
    log::debug!(
        "{}: highlighted {} platform and {} month legend cells",
        identity,
        platform_hits,
        month_hits
    );

    let mut row = layout.header_row + 1;
    for r in 0..table.len() {
        let program = table.cell(r, program_col);
        let house = table.cell(r, house_col);
        let viewers = table.cell(r, viewers_col);
        if program.is_empty() && house.is_empty() && viewers.is_empty() {
            continue;
        }

        if !program.is_empty() {
            report.set_text(CellRef::new(row, t_program), &program.to_text());
        }
        report.set_value(CellRef::new(row, t_house), house);
        report.set_value(CellRef::new(row, t_viewers), viewers);
        report.set_text(CellRef::new(row, t_date), &month_text);
        row += 1;
    }

    let written = row - layout.header_row - 1;
    log::info!("{}: populated {} rows for {}", identity, written, roles.platform);

    report.to_bytes().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{MatchBranch, MatchStats};
    use crate::table::{CellValue, Table};
    use calamine::{Data, Reader, Xlsx};
    use quick_xml::events::Event;
    use rust_xlsxwriter::Workbook;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn template(layout: &TemplateLayout) -> TemplateWorkbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "חודש").unwrap();
        sheet.write_string(1, 0, "פלטפורמה").unwrap();
        let headers = [
            &layout.program_header,
            &layout.house_header,
            &layout.viewers_header,
            &layout.date_header,
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(3, col as u16, format!(" {} ", header)).unwrap();
        }
        for (i, label) in [" פרטנר ", "YES", "HOT"].iter().enumerate() {
            sheet.write_string(4 + i as u32, 16, *label).unwrap();
        }
        for m in 1..=12u32 {
            sheet
                .write_string(3 + m, 15, format!("{:02}/2025", m))
                .unwrap();
        }
        TemplateWorkbook::from_bytes(&workbook.save_to_buffer().unwrap()).unwrap()
    }

    fn reconciled(identity: &str, columns: &[&str], rows: Vec<Vec<CellValue>>) -> ReconciledTable {
        ReconciledTable {
            identity: identity.to_string(),
            table: Table::new(columns.iter().map(|c| c.to_string()).collect(), rows),
            branch: MatchBranch::NoRule,
            stats: MatchStats::default(),
        }
    }

    fn read(bytes: &[u8]) -> calamine::Range<Data> {
        let mut xlsx = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
        xlsx.worksheet_range("Sheet1").unwrap()
    }

    fn zip_part(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut out = Vec::new();
        zip.by_name(name).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    /// Foreground fill colour of every written cell, by address
    fn cell_fills(bytes: &[u8]) -> HashMap<String, Option<String>> {
        let styles = xml::parse_events(&zip_part(bytes, "xl/styles.xml"), "xl/styles.xml").unwrap();
        let mut fills: Vec<Option<String>> = Vec::new();
        let mut xf_fills: Vec<usize> = Vec::new();
        let mut in_cell_xfs = false;
        for event in &styles {
            match event {
                Event::Start(e) | Event::Empty(e) => {
                    let attrs = xml::attributes(e).unwrap();
                    match xml::local_name(e).as_slice() {
                        b"cellXfs" => in_cell_xfs = true,
                        b"fill" => fills.push(None),
                        b"fgColor" => {
                            if let Some(last) = fills.last_mut() {
                                *last = xml::attr(&attrs, "rgb").map(str::to_string);
                            }
                        }
                        b"xf" if in_cell_xfs => {
                            xf_fills.push(xml::attr(&attrs, "fillId").and_then(|v| v.parse().ok()).unwrap_or(0));
                        }
                        _ => {}
                    }
                }
                Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                _ => {}
            }
        }

        let part = "xl/worksheets/sheet1.xml";
        let sheet = xml::parse_events(&zip_part(bytes, part), part).unwrap();
        sheet
            .iter()
            .filter_map(|event| match event {
                Event::Start(e) | Event::Empty(e) if xml::local_name(e) == b"c" => {
                    let attrs = xml::attributes(e).unwrap();
                    let at = xml::attr(&attrs, "r")?.to_string();
                    let xf: usize = xml::attr(&attrs, "s").and_then(|v| v.parse().ok()).unwrap_or(0);
                    Some((at, fills[xf_fills[xf]].clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_roles_fall_back_to_house_number() {
        let reference = ReferenceColumns::default();
        let roles = ReportRoles::resolve("פרטנר_ינואר", &reference).unwrap();
        assert_eq!(roles.program, "שם תוכן");
        assert_eq!(roles.house, "HOUSE_NUMBER");
        assert_eq!(roles.viewers, "סה\"כ צפיות");
        assert_eq!(roles.platform, "פרטנר");

        let roles = ReportRoles::resolve("NEXT_jan", &reference).unwrap();
        assert_eq!(roles.house, "מזהה ייחודי קשת NP");
        assert!(ReportRoles::resolve("unknown", &reference).is_none());
    }

    #[test]
    fn test_populate_writes_rows_without_gaps() {
        let layout = TemplateLayout::default();
        let reference = ReferenceColumns::default();
        let base = template(&layout);
        let month = ReportMonth::new(3, 2025).unwrap();
        let input = reconciled(
            "פרטנר_מרץ",
            &["שם תוכן", "סה\"כ צפיות", "HOUSE_NUMBER"],
            vec![
                vec![text("Show A"), CellValue::Number(10.0), CellValue::Number(100.0)],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec![text("Show B"), CellValue::Number(20.0), CellValue::Empty],
            ],
        );

        let bytes = populate_table(&input, &base, &month, &layout, &reference)
            .unwrap()
            .unwrap();
        let range = read(&bytes);

        assert_eq!(range.get_value((0, 1)), Some(&Data::String("03/2025".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("פרטנר".into())));
        assert_eq!(range.get_value((4, 0)), Some(&Data::String("Show A".into())));
        assert_eq!(range.get_value((4, 1)), Some(&Data::Float(100.0)));
        assert_eq!(range.get_value((4, 2)), Some(&Data::Float(10.0)));
        assert_eq!(range.get_value((4, 3)), Some(&Data::String("03/2025".into())));
        assert_eq!(range.get_value((5, 0)), Some(&Data::String("Show B".into())));
        assert_eq!(range.get_value((5, 1)), Some(&Data::Empty));
        assert_eq!(range.get_value((6, 0)), Some(&Data::Empty));

        // the template itself is untouched
        assert_eq!(base.cell_text(CellRef::new(1, 2)), None);
    }

    #[test]
    fn test_populate_highlights_matching_legends() {
        let layout = TemplateLayout::default();
        let reference = ReferenceColumns::default();
        let base = template(&layout);
        let month = ReportMonth::new(3, 2025).unwrap();
        let input = reconciled(
            "פרטנר_מרץ",
            &["שם תוכן", "סה\"כ צפיות", "HOUSE_NUMBER"],
            vec![vec![text("Show A"), CellValue::Number(10.0), CellValue::Number(100.0)]],
        );

        let bytes = populate_table(&input, &base, &month, &layout, &reference)
            .unwrap()
            .unwrap();
        let fills = cell_fills(&bytes);
        let yellow = Some("FFFFFF00".to_string());

        // platform legend matches on trimmed text
        assert_eq!(fills["Q5"], yellow);
        assert_eq!(fills["Q6"], None);
        assert_eq!(fills["Q7"], None);

        assert_eq!(fills["P7"], yellow);
        for other in ["P5", "P6", "P8", "P16"] {
            assert_eq!(fills[other], None, "{} should keep its fill", other);
        }

        assert_eq!(fills["B1"], None);
        assert_eq!(fills["A5"], None);
    }

    #[test]
    fn test_missing_source_column_skips() {
        let layout = TemplateLayout::default();
        let reference = ReferenceColumns::default();
        let base = template(&layout);
        let month = ReportMonth::new(1, 2025).unwrap();
        let input = reconciled("פרטנר", &["שם תוכן", "HOUSE_NUMBER"], vec![vec![text("x"), text("1")]]);

        let out = populate_table(&input, &base, &month, &layout, &reference).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_missing_template_header_skips() {
        let layout = TemplateLayout {
            date_header: "not in template".to_string(),
            ..TemplateLayout::default()
        };
        let reference = ReferenceColumns::default();
        let base = template(&TemplateLayout::default());
        let month = ReportMonth::new(1, 2025).unwrap();
        let input = reconciled(
            "פרטנר",
            &["שם תוכן", "סה\"כ צפיות", "HOUSE_NUMBER"],
            vec![vec![text("x"), CellValue::Number(1.0), CellValue::Number(2.0)]],
        );

        let out = populate_table(&input, &base, &month, &layout, &reference).unwrap();
        assert!(out.is_none());
    }
}
