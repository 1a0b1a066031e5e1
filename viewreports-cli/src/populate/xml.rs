//! Small helpers over quick-xml events shared by the template parts

use anyhow::{Context, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

pub type Attrs = Vec<(String, String)>;

/// Parse a whole part into owned events
pub fn parse_events(xml: &[u8], part: &str) -> Result<Vec<Event<'static>>> {
    let text = std::str::from_utf8(xml).with_context(|| format!("{} is not valid UTF-8", part))?;
    let mut reader = Reader::from_str(text);
    let mut events = Vec::new();

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("Failed to parse {} at byte {}", part, reader.buffer_position()))?;
        match event {
            Event::Eof => break,
            other => events.push(other.into_owned()),
        }
    }

    Ok(events)
}

/// Serialize events back into a part
pub fn write_events<'a>(events: impl IntoIterator<Item = &'a Event<'static>>) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer
            .write_event(event.clone())
            .context("Failed to write XML event")?;
    }
    Ok(writer.into_inner())
}

/// Local part of a possibly prefixed element name
pub fn local_name(e: &BytesStart<'_>) -> Vec<u8> {
    e.local_name().as_ref().to_vec()
}

/// Namespace prefix of an element name including the colon, or empty
pub fn name_prefix(e: &BytesStart<'_>) -> String {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    match name.find(':') {
        Some(idx) => name[..=idx].to_string(),
        None => String::new(),
    }
}

/// All attributes, keys as written and values unescaped
pub fn attributes(e: &BytesStart<'_>) -> Result<Attrs> {
    let mut out = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.context("Malformed XML attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = std::str::from_utf8(&attr.value).context("Attribute value is not UTF-8")?;
        let value = unescape(raw).context("Bad escape in attribute value")?;
        out.push((key, value.into_owned()));
    }
    Ok(out)
}

/// Attribute value matched by local name, so `r:id` matches `id`
pub fn attr_local<'a>(attrs: &'a Attrs, local: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.rsplit(':').next() == Some(local))
        .map(|(_, v)| v.as_str())
}

pub fn attr<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Replace or append an attribute, keeping its position when it exists
pub fn set_attr(attrs: &mut Attrs, key: &str, value: impl Into<String>) {
    let value = value.into();
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => attrs.push((key.to_string(), value)),
    }
}

pub fn remove_attr(attrs: &mut Attrs, key: &str) {
    attrs.retain(|(k, _)| k != key);
}

pub fn start(name: &str, attrs: &Attrs) -> BytesStart<'static> {
    let mut e = BytesStart::new(name.to_string());
    for (k, v) in attrs {
        e.push_attribute((k.as_str(), v.as_str()));
    }
    e
}

pub fn end(name: &str) -> Event<'static> {
    Event::End(BytesEnd::new(name.to_string()))
}

pub fn text(value: &str) -> Event<'static> {
    Event::Text(BytesText::new(value).into_owned())
}

/// Text content of a text or entity-reference event
///
/// Entity references arrive as separate events and are resolved here.
pub fn event_text(event: &Event<'_>) -> Result<Option<String>> {
    match event {
        Event::Text(t) => {
            let raw = std::str::from_utf8(t).context("Text is not UTF-8")?;
            Ok(Some(unescape(raw).context("Bad escape in text")?.into_owned()))
        }
        Event::CData(t) => Ok(Some(String::from_utf8_lossy(t).into_owned())),
        Event::GeneralRef(r) => {
            let name = std::str::from_utf8(r).context("Entity name is not UTF-8")?;
            let entity = format!("&{};", name);
            let resolved = unescape(&entity)
                .with_context(|| format!("Unknown entity: {}", name))?;
            Ok(Some(resolved.into_owned()))
        }
        _ => Ok(None),
    }
}
