//! `xl/styles.xml` patching for legend highlights
//!
//! A highlighted cell keeps its font, border and number format; only the fill
//! changes. That needs one extra solid fill plus a copy of each base cell
//! format pointing at it.

use std::collections::HashMap;

use anyhow::{Result, bail};
use quick_xml::events::{BytesStart, Event};

use super::xml::{self, Attrs};

#[derive(Debug, Clone)]
pub struct StyleSheet {
    events: Vec<Event<'static>>,
    fill_count: usize,
    /// Events of each `<xf>` under `<cellXfs>`, by index
    cell_xfs: Vec<Vec<Event<'static>>>,
    prefix: String,
    added_fills: Vec<Vec<Event<'static>>>,
    added_xfs: Vec<Vec<Event<'static>>>,
    /// (base xf, rgb) → highlighted xf
    highlighted: HashMap<(u32, String), u32>,
    /// rgb → fill id
    fills_by_rgb: HashMap<String, usize>,
}

impl StyleSheet {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let events = xml::parse_events(bytes, "xl/styles.xml")?;

        let mut fill_count = None;
        let mut cell_xfs: Option<Vec<Vec<Event<'static>>>> = None;
        let mut prefix = String::new();
        let mut depth = 0usize;
        // depth of the open <fills> or <cellXfs>
        let mut in_fills: Option<usize> = None;
        let mut in_xfs: Option<usize> = None;
        let mut current_xf: Option<Vec<Event<'static>>> = None;

        for event in &events {
            if let Some(xf) = current_xf.as_mut() {
                xf.push(event.clone());
            }

            match event {
                Event::Start(e) => {
                    depth += 1;
                    match xml::local_name(e).as_slice() {
                        b"fills" => {
                            in_fills = Some(depth);
                            fill_count = Some(0);
                            prefix = xml::name_prefix(e);
                        }
                        b"cellXfs" => {
                            in_xfs = Some(depth);
                            cell_xfs = Some(Vec::new());
                        }
                        b"fill" if in_fills == Some(depth - 1) => {
                            fill_count = fill_count.map(|n| n + 1);
                        }
                        b"xf" if in_xfs == Some(depth - 1) => {
                            current_xf = Some(vec![event.clone()]);
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) => match xml::local_name(e).as_slice() {
                    b"fill" if in_fills == Some(depth) => {
                        fill_count = fill_count.map(|n| n + 1);
                    }
                    b"xf" if in_xfs == Some(depth) => {
                        if let Some(xfs) = cell_xfs.as_mut() {
                            xfs.push(vec![event.clone()]);
                        }
                    }
                    _ => {}
                },
                Event::End(_) => {
                    if in_xfs == Some(depth - 1) {
                        if let (Some(xf), Some(xfs)) = (current_xf.take(), cell_xfs.as_mut()) {
                            xfs.push(xf);
                        }
                    }
                    if in_fills == Some(depth) {
                        in_fills = None;
                    }
                    if in_xfs == Some(depth) {
                        in_xfs = None;
                    }
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }

        let Some(fill_count) = fill_count else {
            bail!("styles.xml has no <fills> section");
        };
        let Some(cell_xfs) = cell_xfs else {
            bail!("styles.xml has no <cellXfs> section");
        };
        if cell_xfs.is_empty() {
            bail!("styles.xml has no cell formats");
        }

        Ok(Self {
            events,
            fill_count,
            cell_xfs,
            prefix,
            added_fills: Vec::new(),
            added_xfs: Vec::new(),
            highlighted: HashMap::new(),
            fills_by_rgb: HashMap::new(),
        })
    }

    /// Number of cell formats including added ones
    pub fn cell_format_count(&self) -> usize {
        self.cell_xfs.len() + self.added_xfs.len()
    }

    /// Index of a cell format equal to `base` but with a solid `rgb` fill
    pub fn highlight(&mut self, base: u32, rgb: &str) -> Result<u32> {
        if let Some(&idx) = self.highlighted.get(&(base, rgb.to_string())) {
            return Ok(idx);
        }

        let fill_id = self.solid_fill(rgb);
        let source = self.xf_events(base)?;

        let mut xf = Vec::with_capacity(source.len());
        for (i, event) in source.into_iter().enumerate() {
            if i > 0 {
                xf.push(event);
                continue;
            }
            let patched = match event {
                Event::Start(e) => Event::Start(with_fill(&e, fill_id)?),
                Event::Empty(e) => Event::Empty(with_fill(&e, fill_id)?),
                other => other,
            };
            xf.push(patched);
        }

        let idx = self.cell_format_count() as u32;
        self.added_xfs.push(xf);
        self.highlighted.insert((base, rgb.to_string()), idx);
        Ok(idx)
    }

    fn xf_events(&self, idx: u32) -> Result<Vec<Event<'static>>> {
        let idx = idx as usize;
        let original = self.cell_xfs.len();
        let events = if idx < original {
            self.cell_xfs.get(idx)
        } else {
            self.added_xfs.get(idx - original)
        };
        match events {
            Some(events) => Ok(events.clone()),
            None => bail!("Cell format {} does not exist", idx),
        }
    }

    fn solid_fill(&mut self, rgb: &str) -> usize {
        if let Some(&id) = self.fills_by_rgb.get(rgb) {
            return id;
        }

        let p = &self.prefix;
        let color: Attrs = vec![("rgb".to_string(), rgb.to_string())];
        let pattern: Attrs = vec![("patternType".to_string(), "solid".to_string())];
        let fill = vec![
            Event::Start(xml::start(&format!("{}fill", p), &Vec::new())),
            Event::Start(xml::start(&format!("{}patternFill", p), &pattern)),
            Event::Empty(xml::start(&format!("{}fgColor", p), &color)),
            Event::Empty(xml::start(&format!("{}bgColor", p), &color)),
            xml::end(&format!("{}patternFill", p)),
            xml::end(&format!("{}fill", p)),
        ];

        let id = self.fill_count + self.added_fills.len();
        self.added_fills.push(fill);
        self.fills_by_rgb.insert(rgb.to_string(), id);
        id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out: Vec<Event<'static>> = Vec::with_capacity(self.events.len());

        for event in &self.events {
            match event {
                Event::Start(e) if xml::local_name(e) == b"fills" => {
                    out.push(Event::Start(with_count(e, self.fill_count + self.added_fills.len())?));
                }
                Event::Start(e) if xml::local_name(e) == b"cellXfs" => {
                    out.push(Event::Start(with_count(e, self.cell_format_count())?));
                }
                Event::End(e) if e.local_name().as_ref() == b"fills" => {
                    out.extend(self.added_fills.iter().flatten().cloned());
                    out.push(event.clone());
                }
                Event::End(e) if e.local_name().as_ref() == b"cellXfs" => {
                    out.extend(self.added_xfs.iter().flatten().cloned());
                    out.push(event.clone());
                }
                other => out.push(other.clone()),
            }
        }

        xml::write_events(&out)
    }
}

fn rebuild(e: &BytesStart<'_>, attrs: &Attrs) -> BytesStart<'static> {
    xml::start(&String::from_utf8_lossy(e.name().as_ref()), attrs)
}

fn with_count(e: &BytesStart<'_>, count: usize) -> Result<BytesStart<'static>> {
    let mut attrs = xml::attributes(e)?;
    xml::set_attr(&mut attrs, "count", count.to_string());
    Ok(rebuild(e, &attrs))
}

fn with_fill(e: &BytesStart<'_>, fill_id: usize) -> Result<BytesStart<'static>> {
    let mut attrs = xml::attributes(e)?;
    xml::set_attr(&mut attrs, "fillId", fill_id.to_string());
    xml::set_attr(&mut attrs, "applyFill", "1");
    Ok(rebuild(e, &attrs))
}
