//! Report template workbook
//!
//! The template is loaded once as raw zip parts. Each populated report is a
//! clone with its active worksheet and stylesheet rewritten; every other part
//! (drawings, defined names, print settings) is copied through untouched.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesStart, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::styles::StyleSheet;
use super::xml::{self, Attrs};
use crate::excel::{CellRange, CellRef, column_letters};
use crate::table::{CellValue, format_number};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

#[derive(Debug, Clone)]
struct ZipPart {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// A parsed template, cloned once per populated report
#[derive(Debug, Clone)]
pub struct TemplateWorkbook {
    parts: Vec<ZipPart>,
    sheet_part: String,
    sheet: Worksheet,
    styles: StyleSheet,
    shared_strings: Vec<String>,
}

impl TemplateWorkbook {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Template is not a valid xlsx archive")?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .with_context(|| format!("Failed to read template entry {}", i))?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)
                    .with_context(|| format!("Failed to read template entry {}", file.name()))?;
            }
            parts.push(ZipPart {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        let find = |name: &str| parts.iter().find(|p| p.name == name).map(|p| p.data.as_slice());

        let workbook = find(WORKBOOK_PART).context("Template has no xl/workbook.xml")?;
        let rels = find(WORKBOOK_RELS_PART).context("Template has no workbook relationships")?;
        let sheet_part = active_sheet_part(workbook, rels)?;

        let sheet_bytes = find(&sheet_part)
            .with_context(|| format!("Template worksheet {} is missing", sheet_part))?;
        let sheet = Worksheet::parse(sheet_bytes, &sheet_part)?;

        let styles_bytes = find(STYLES_PART).context("Template has no xl/styles.xml")?;
        let styles = StyleSheet::parse(styles_bytes)?;

        let shared_strings = match find(SHARED_STRINGS_PART) {
            Some(bytes) => parse_shared_strings(bytes)?,
            None => Vec::new(),
        };

        log::debug!(
            "Template loaded: {} parts, active sheet {}, {} shared strings",
            parts.len(),
            sheet_part,
            shared_strings.len()
        );

        Ok(Self {
            parts,
            sheet_part,
            sheet,
            styles,
            shared_strings,
        })
    }

    /// Displayed text of a cell, `None` for blank or missing cells
    pub fn cell_text(&self, cell: CellRef) -> Option<String> {
        let c = self.sheet.cell(cell)?;
        let text = match c.kind() {
            Some("s") => {
                let idx: usize = c.value_text()?.trim().parse().ok()?;
                self.shared_strings.get(idx)?.clone()
            }
            Some("inlineStr") => c.inline_text(),
            _ => c.value_text()?,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Non-empty cell texts of one row, by column
    pub fn row_texts(&self, row: u32) -> Vec<(u32, String)> {
        self.sheet
            .columns_in_row(row)
            .into_iter()
            .filter_map(|col| {
                let cell = CellRef::new(row, col);
                self.cell_text(cell).map(|t| (col, t))
            })
            .collect()
    }

    /// Write a value, keeping the cell's style. Empty values are ignored.
    pub fn set_value(&mut self, cell: CellRef, value: &CellValue) {
        let prefix = self.sheet.prefix.clone();
        let (kind, body) = match value {
            CellValue::Empty => return,
            CellValue::Text(s) if s.is_empty() => return,
            CellValue::Number(n) if n.is_finite() => (None, value_body(&prefix, &format_number(*n))),
            CellValue::Bool(b) => (Some("b"), value_body(&prefix, if *b { "1" } else { "0" })),
            other => (Some("inlineStr"), inline_body(&prefix, &other.to_text())),
        };

        let target = self.sheet.cell_mut(cell);
        match kind {
            Some(k) => xml::set_attr(&mut target.attrs, "t", k),
            None => xml::remove_attr(&mut target.attrs, "t"),
        }
        target.body = body;
    }

    /// Write text, keeping the cell's style
    pub fn set_text(&mut self, cell: CellRef, text: &str) {
        self.set_value(cell, &CellValue::text(text));
    }

    /// Give a cell a solid fill on top of its current format
    pub fn highlight(&mut self, cell: CellRef, rgb: &str) -> Result<()> {
        let base = self.sheet.style_of(cell);
        let xf = self.styles.highlight(base, rgb)?;
        let target = self.sheet.cell_mut(cell);
        xml::set_attr(&mut target.attrs, "s", xf.to_string());
        Ok(())
    }

    /// Highlight every cell in `range` whose trimmed text equals `text`
    pub fn highlight_matching(&mut self, range: &CellRange, text: &str, rgb: &str) -> Result<usize> {
        let hits: Vec<CellRef> = range
            .cells()
            .filter(|&c| self.cell_text(c).is_some_and(|t| t.trim() == text))
            .collect();
        for &cell in &hits {
            self.highlight(cell, rgb)?;
        }
        Ok(hits.len())
    }

    /// Serialize into a complete xlsx file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let sheet = self.sheet.to_bytes()?;
        let styles = self.styles.to_bytes()?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            let options = SimpleFileOptions::default().compression_method(part.compression);
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)
                    .with_context(|| format!("Failed to add {}", part.name))?;
                continue;
            }

            let data: &[u8] = if part.name == self.sheet_part {
                &sheet
            } else if part.name == STYLES_PART {
                &styles
            } else {
                &part.data
            };
            zip.start_file(part.name.as_str(), options)
                .with_context(|| format!("Failed to add {}", part.name))?;
            zip.write_all(data)
                .with_context(|| format!("Failed to write {}", part.name))?;
        }

        let cursor = zip.finish().context("Failed to finish xlsx archive")?;
        Ok(cursor.into_inner())
    }
}

/// Zip path of the worksheet shown when the workbook opens
fn active_sheet_part(workbook: &[u8], rels: &[u8]) -> Result<String> {
    let mut active_tab = 0usize;
    let mut sheet_ids: Vec<String> = Vec::new();

    for event in xml::parse_events(workbook, WORKBOOK_PART)? {
        if let Event::Start(e) | Event::Empty(e) = &event {
            match xml::local_name(e).as_slice() {
                b"workbookView" => {
                    let attrs = xml::attributes(e)?;
                    if let Some(tab) = xml::attr(&attrs, "activeTab") {
                        active_tab = tab.trim().parse().unwrap_or(0);
                    }
                }
                b"sheet" => {
                    let attrs = xml::attributes(e)?;
                    if let Some(id) = xml::attr_local(&attrs, "id") {
                        sheet_ids.push(id.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    let Some(rel_id) = sheet_ids.get(active_tab).or_else(|| sheet_ids.first()) else {
        bail!("Template workbook has no worksheets");
    };

    for event in xml::parse_events(rels, WORKBOOK_RELS_PART)? {
        if let Event::Start(e) | Event::Empty(e) = &event {
            if xml::local_name(e) != b"Relationship" {
                continue;
            }
            let attrs = xml::attributes(e)?;
            if xml::attr(&attrs, "Id") == Some(rel_id.as_str()) {
                let target = xml::attr(&attrs, "Target").unwrap_or_default();
                return Ok(match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                });
            }
        }
    }

    bail!("Template worksheet relationship {} not found", rel_id)
}

/// Plain text of every `<si>` entry, rich-text runs joined, phonetic runs skipped
fn parse_shared_strings(bytes: &[u8]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    for event in xml::parse_events(bytes, SHARED_STRINGS_PART)? {
        match &event {
            Event::Start(e) => match xml::local_name(e).as_slice() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if xml::local_name(e) == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            other if in_text && !in_phonetic => {
                if let (Some(s), Some(text)) = (current.as_mut(), xml::event_text(other)?) {
                    s.push_str(&text);
                }
            }
            _ => {}
        }
    }

    Ok(strings)
}

fn value_body(prefix: &str, value: &str) -> Vec<Event<'static>> {
    let v = format!("{}v", prefix);
    vec![
        Event::Start(BytesStart::new(v.clone())),
        xml::text(value),
        xml::end(&v),
    ]
}

fn inline_body(prefix: &str, value: &str) -> Vec<Event<'static>> {
    let is = format!("{}is", prefix);
    let t = format!("{}t", prefix);
    let preserve: Attrs = vec![("xml:space".to_string(), "preserve".to_string())];
    vec![
        Event::Start(BytesStart::new(is.clone())),
        Event::Start(xml::start(&t, &preserve)),
        xml::text(value),
        xml::end(&t),
        xml::end(&is),
    ]
}

#[derive(Debug, Clone, Default)]
struct SheetCell {
    /// Attributes other than `r`
    attrs: Attrs,
    body: Vec<Event<'static>>,
}

impl SheetCell {
    fn kind(&self) -> Option<&str> {
        xml::attr(&self.attrs, "t")
    }

    fn style(&self) -> Option<u32> {
        xml::attr(&self.attrs, "s").and_then(|s| s.trim().parse().ok())
    }

    /// Text inside `<v>`
    fn value_text(&self) -> Option<String> {
        self.collect_text(b"v")
    }

    /// Text of every `<t>` inside `<is>`
    fn inline_text(&self) -> String {
        self.collect_text(b"t").unwrap_or_default()
    }

    fn collect_text(&self, element: &[u8]) -> Option<String> {
        let mut inside = false;
        let mut found = false;
        let mut out = String::new();
        for event in &self.body {
            match event {
                Event::Start(e) if xml::local_name(e) == element => {
                    inside = true;
                    found = true;
                }
                Event::End(e) if e.local_name().as_ref() == element => inside = false,
                other if inside => {
                    if let Ok(Some(text)) = xml::event_text(other) {
                        out.push_str(&text);
                    }
                }
                _ => {}
            }
        }
        found.then_some(out)
    }
}

#[derive(Debug, Clone, Default)]
struct SheetRow {
    /// Attributes other than `r` and `spans`
    attrs: Attrs,
    cells: BTreeMap<u32, SheetCell>,
}

/// Worksheet split around `<sheetData>` with the cell grid held as a map
#[derive(Debug, Clone)]
struct Worksheet {
    head: Vec<Event<'static>>,
    rows: BTreeMap<u32, SheetRow>,
    tail: Vec<Event<'static>>,
    /// Element prefix used by the part, e.g. `x:`
    prefix: String,
    /// (min, max, style) from `<cols>`
    column_styles: Vec<(u32, u32, u32)>,
}

impl Worksheet {
    fn parse(bytes: &[u8], part: &str) -> Result<Self> {
        let events = xml::parse_events(bytes, part)?;

        let mut head = Vec::new();
        let mut tail = Vec::new();
        let mut rows: BTreeMap<u32, SheetRow> = BTreeMap::new();
        let mut prefix = String::new();
        let mut column_styles = Vec::new();

        #[derive(PartialEq)]
        enum Stage {
            Head,
            Data,
            Tail,
        }
        let mut stage = Stage::Head;
        let mut row_num = 0u32;
        let mut col_num = 0u32;
        let mut cell: Option<(u32, SheetCell)> = None;

        for event in events {
            match stage {
                Stage::Head => match &event {
                    Event::Start(e) if xml::local_name(e) == b"sheetData" => {
                        prefix = xml::name_prefix(e);
                        stage = Stage::Data;
                    }
                    Event::Empty(e) if xml::local_name(e) == b"sheetData" => {
                        prefix = xml::name_prefix(e);
                        stage = Stage::Tail;
                    }
                    Event::Start(e) | Event::Empty(e) if xml::local_name(e) == b"col" => {
                        let attrs = xml::attributes(e)?;
                        let num = |k: &str| xml::attr(&attrs, k).and_then(|v| v.trim().parse().ok());
                        if let (Some(min), Some(max), Some(style)) = (num("min"), num("max"), num("style")) {
                            column_styles.push((min, max, style));
                        }
                        head.push(event);
                    }
                    _ => head.push(event),
                },
                Stage::Data => {
                    if cell.is_some() {
                        let closes = matches!(&event, Event::End(e) if e.local_name().as_ref() == b"c");
                        if closes {
                            if let Some((col, c)) = cell.take() {
                                rows.entry(row_num).or_default().cells.insert(col, c);
                            }
                        } else if let Some((_, c)) = cell.as_mut() {
                            c.body.push(event);
                        }
                        continue;
                    }

                    match &event {
                        Event::Start(e) | Event::Empty(e) if xml::local_name(e) == b"row" => {
                            let mut attrs = xml::attributes(e)?;
                            row_num = match xml::attr(&attrs, "r").and_then(|r| r.trim().parse().ok()) {
                                Some(r) => r,
                                None => row_num + 1,
                            };
                            col_num = 0;
                            xml::remove_attr(&mut attrs, "r");
                            xml::remove_attr(&mut attrs, "spans");
                            rows.entry(row_num).or_default().attrs = attrs;
                        }
                        Event::Start(e) | Event::Empty(e) if xml::local_name(e) == b"c" => {
                            let mut attrs = xml::attributes(e)?;
                            let pos = xml::attr(&attrs, "r").and_then(|r| r.parse::<CellRef>().ok());
                            col_num = match pos {
                                Some(p) => p.col,
                                None => col_num + 1,
                            };
                            xml::remove_attr(&mut attrs, "r");
                            let c = SheetCell {
                                attrs,
                                body: Vec::new(),
                            };
                            if matches!(event, Event::Start(_)) {
                                cell = Some((col_num, c));
                            } else {
                                rows.entry(row_num).or_default().cells.insert(col_num, c);
                            }
                        }
                        Event::End(e) if e.local_name().as_ref() == b"sheetData" => stage = Stage::Tail,
                        _ => {}
                    }
                }
                Stage::Tail => tail.push(event),
            }
        }

        if stage == Stage::Head {
            bail!("{} has no <sheetData>", part);
        }

        Ok(Self {
            head,
            rows,
            tail,
            prefix,
            column_styles,
        })
    }

    fn cell(&self, at: CellRef) -> Option<&SheetCell> {
        self.rows.get(&at.row)?.cells.get(&at.col)
    }

    /// Existing cell, or a new one styled like its row or column
    fn cell_mut(&mut self, at: CellRef) -> &mut SheetCell {
        let inherited = self.inherited_style(at);
        let row = self.rows.entry(at.row).or_default();
        row.cells.entry(at.col).or_insert_with(|| {
            let mut c = SheetCell::default();
            if let Some(style) = inherited {
                xml::set_attr(&mut c.attrs, "s", style.to_string());
            }
            c
        })
    }

    fn inherited_style(&self, at: CellRef) -> Option<u32> {
        let row_style = self.rows.get(&at.row).and_then(|r| {
            let custom = xml::attr(&r.attrs, "customFormat").is_some_and(|v| v == "1" || v == "true");
            custom
                .then(|| xml::attr(&r.attrs, "s").and_then(|s| s.trim().parse().ok()))
                .flatten()
        });
        row_style.or_else(|| {
            self.column_styles
                .iter()
                .find(|(min, max, _)| (*min..=*max).contains(&at.col))
                .map(|(_, _, style)| *style)
        })
    }

    fn style_of(&self, at: CellRef) -> u32 {
        self.cell(at)
            .and_then(SheetCell::style)
            .or_else(|| self.inherited_style(at))
            .unwrap_or(0)
    }

    fn columns_in_row(&self, row: u32) -> Vec<u32> {
        self.rows
            .get(&row)
            .map(|r| r.cells.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Used range as `A1:Q30`, or `A1` for an empty sheet
    fn dimension(&self) -> String {
        let cells = || {
            self.rows
                .iter()
                .flat_map(|(&r, row)| row.cells.keys().map(move |&c| (r, c)))
        };
        let (Some(min_row), Some(max_row)) = (cells().map(|(r, _)| r).min(), cells().map(|(r, _)| r).max())
        else {
            return "A1".to_string();
        };
        let min_col = cells().map(|(_, c)| c).min().unwrap_or(1);
        let max_col = cells().map(|(_, c)| c).max().unwrap_or(1);
        let start = CellRef::new(min_row, min_col);
        let end = CellRef::new(max_row, max_col);
        if start == end {
            start.to_string()
        } else {
            format!("{}:{}", start, end)
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let p = &self.prefix;
        let mut out: Vec<Event<'static>> = Vec::new();

        for event in &self.head {
            match event {
                Event::Empty(e) if xml::local_name(e) == b"dimension" => {
                    let mut attrs = xml::attributes(e)?;
                    xml::set_attr(&mut attrs, "ref", self.dimension());
                    out.push(Event::Empty(xml::start(&String::from_utf8_lossy(e.name().as_ref()), &attrs)));
                }
                other => out.push(other.clone()),
            }
        }

        let sheet_data = format!("{}sheetData", p);
        let row_name = format!("{}row", p);
        let cell_name = format!("{}c", p);

        out.push(Event::Start(BytesStart::new(sheet_data.clone())));
        for (&r, row) in &self.rows {
            let mut attrs: Attrs = vec![("r".to_string(), r.to_string())];
            attrs.extend(row.attrs.iter().cloned());
            if row.cells.is_empty() {
                out.push(Event::Empty(xml::start(&row_name, &attrs)));
                continue;
            }

            out.push(Event::Start(xml::start(&row_name, &attrs)));
            for (&col, c) in &row.cells {
                let mut attrs: Attrs = vec![("r".to_string(), format!("{}{}", column_letters(col), r))];
                attrs.extend(c.attrs.iter().cloned());
                if c.body.is_empty() {
                    out.push(Event::Empty(xml::start(&cell_name, &attrs)));
                } else {
                    out.push(Event::Start(xml::start(&cell_name, &attrs)));
                    out.extend(c.body.iter().cloned());
                    out.push(xml::end(&cell_name));
                }
            }
            out.push(xml::end(&row_name));
        }
        out.push(xml::end(&sheet_data));

        out.extend(self.tail.iter().cloned());
        xml::write_events(&out)
    }
}
