//! A small owned XML tree for reading individual WordprocessingML blocks.
//!
//! Names keep their prefix (`w:p`); lookups go by local name so documents using a
//! different prefix for the main namespace still read correctly.

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XNode {
    Element(XElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XNode>,
}

impl XElement {
    pub fn local(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute lookup by local name (`w:val` matches `val`).
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_part(k) == local)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XElement> {
        self.children.iter().filter_map(|c| match c {
            XNode::Element(e) => Some(e),
            XNode::Text(_) => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XElement> {
        self.elements().find(|e| e.local() == local)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                XNode::Text(t) => out.push_str(t),
                XNode::Element(e) => out.push_str(&e.text()),
            }
        }
        out
    }
}

pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, l)| l)
}

/// Parses the first element of `xml` (and everything inside it).
pub fn parse_fragment(xml: &str) -> Result<XElement> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut stack: Vec<XElement> = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("malformed XML at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let el = start_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XNode::Element(el)),
                    None => return Ok(el),
                }
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| anyhow!("unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XNode::Element(el)),
                    None => return Ok(el),
                }
            }
            Event::Text(t) => {
                if let Some(parent) = stack.last_mut() {
                    let text = t.unescape()?;
                    push_text(parent, &text);
                }
            }
            Event::CData(t) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &String::from_utf8_lossy(&t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(anyhow!("no complete element in fragment"))
}

fn push_text(parent: &mut XElement, text: &str) {
    match parent.children.last_mut() {
        Some(XNode::Text(prev)) => prev.push_str(text),
        _ => parent.children.push(XNode::Text(text.to_string())),
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<XElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| anyhow!("bad attribute on <{name}>: {err}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(XElement {
        name,
        attrs,
        children: Vec::new(),
    })
}
