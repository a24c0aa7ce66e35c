//! Renders concrete body blocks as HTML.

use super::document::{Block, BlockKind};
use super::rels::Relationships;
use super::styles::{DEFAULT_PARAGRAPH_STYLE, StyleSheet};
use super::xml::{XElement, XNode, parse_fragment};
use crate::html::css::CssProperties;
use crate::html::{Element, Node, PLACEHOLDER_CLASS, TAB_CLASS};
use anyhow::{Context, Result};

pub struct Renderer<'a> {
    pub styles: &'a StyleSheet,
    pub rels: &'a Relationships,
    pub id_prefix: &'a str,
}

impl Renderer<'_> {
    pub fn block_id(&self, seq: usize) -> String {
        format!("{}{}", self.id_prefix, seq)
    }

    /// Parses `id` back into a block sequence number.
    pub fn block_seq(&self, id: &str) -> Option<usize> {
        id.strip_prefix(self.id_prefix)?.parse().ok()
    }

    pub fn render_block(&self, block: &Block) -> Result<Element> {
        let mut el = match block.kind {
            BlockKind::Paragraph => {
                let p = parse_fragment(&block.raw)
                    .with_context(|| format!("reading paragraph {}", block.seq))?;
                self.render_paragraph(&p)
            }
            BlockKind::Table => {
                let tbl = parse_fragment(&block.raw)
                    .with_context(|| format!("reading table {}", block.seq))?;
                self.render_table(&tbl)
            }
            BlockKind::Other => Element::new("div").with_attr("class", PLACEHOLDER_CLASS),
        };
        el.set_attr("id", self.block_id(block.seq));
        Ok(el)
    }

    /// Tag and class a paragraph with this style id renders as.
    pub fn paragraph_shape(&self, style: Option<&str>) -> (String, Option<String>) {
        match style {
            Some(id) => match self.styles.heading_level(id) {
                Some(level) => (format!("h{level}"), None),
                None if id == DEFAULT_PARAGRAPH_STYLE => ("p".to_string(), None),
                None => ("p".to_string(), Some(id.to_string())),
            },
            None => ("p".to_string(), None),
        }
    }

    pub fn render_paragraph(&self, p: &XElement) -> Element {
        let (tag, class) = self.paragraph_shape(paragraph_style(p));
        let mut el = Element::new(tag);
        if let Some(class) = class {
            el.set_attr("class", class);
        }
        self.render_inline(p, &mut el.children);
        if el.children.is_empty() {
            el.children.push(Node::Element(Element::new("br")));
        }
        el
    }

    fn render_inline(&self, parent: &XElement, dest: &mut Vec<Node>) {
        for child in parent.elements() {
            match child.local() {
                "r" => render_run(child, dest),
                "hyperlink" => {
                    // the relationship id is the only `id` a hyperlink carries
                    let href = child
                        .attr("id")
                        .and_then(|id| self.rels.hyperlink_target(id))
                        .map(str::to_string)
                        .or_else(|| child.attr("anchor").map(|a| format!("#{a}")));
                    match href {
                        Some(href) => {
                            let mut a = Element::new("a").with_attr("href", href);
                            self.render_inline(child, &mut a.children);
                            dest.push(Node::Element(a));
                        }
                        None => self.render_inline(child, dest),
                    }
                }
                "ins" | "smartTag" | "fldSimple" | "customXml" | "sdtContent" | "moveTo" => {
                    self.render_inline(child, dest)
                }
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        self.render_inline(content, dest);
                    }
                }
                _ => {}
            }
        }
    }

    /// Rows go inside an explicit `<tbody>`, matching what an HTML parser builds from
    /// the saved file.
    pub fn render_table(&self, tbl: &XElement) -> Element {
        let mut tbody = Element::new("tbody");
        for row in tbl.elements().filter(|e| e.local() == "tr") {
            let mut tr = Element::new("tr");
            for cell in row.elements().filter(|e| e.local() == "tc") {
                let mut td = Element::new("td");
                if let Some(span) = cell
                    .child("tcPr")
                    .and_then(|p| p.child("gridSpan"))
                    .and_then(|g| g.attr("val"))
                    .filter(|v| *v != "1")
                {
                    td.set_attr("colspan", span);
                }
                for content in cell.elements() {
                    match content.local() {
                        "p" => td.children.push(self.render_paragraph(content).into()),
                        "tbl" => td.children.push(self.render_table(content).into()),
                        _ => {}
                    }
                }
                tr.children.push(td.into());
            }
            tbody.children.push(tr.into());
        }
        Element::new("table").with_child(tbody)
    }
}

pub fn paragraph_style(p: &XElement) -> Option<&str> {
    p.child("pPr")
        .and_then(|ppr| ppr.child("pStyle"))
        .and_then(|s| s.attr("val"))
}

/// CSS for the run properties the lens understands: bold, italic and underline.
pub fn run_properties(r: &XElement) -> CssProperties {
    let mut props = CssProperties::default();
    let Some(rpr) = r.child("rPr") else {
        return props;
    };
    if rpr.child("b").is_some_and(toggle_on) {
        props.set("font-weight", "bold");
    }
    if rpr.child("i").is_some_and(toggle_on) {
        props.set("font-style", "italic");
    }
    if rpr
        .child("u")
        .is_some_and(|u| !matches!(u.attr("val"), Some("none")))
    {
        props.set("text-decoration", "underline");
    }
    props
}

fn toggle_on(el: &XElement) -> bool {
    !matches!(el.attr("val"), Some("0") | Some("false") | Some("off"))
}

fn render_run(r: &XElement, dest: &mut Vec<Node>) {
    let props = run_properties(r);
    let mut text = String::new();

    for child in &r.children {
        let XNode::Element(el) = child else {
            continue;
        };
        match el.local() {
            "t" => text.push_str(&el.text()),
            "noBreakHyphen" => text.push('\u{2011}'),
            "tab" => {
                flush_text(&mut text, &props, dest);
                dest.push(
                    Element::new("span")
                        .with_attr("class", TAB_CLASS)
                        .with_child(Node::text("\t"))
                        .into(),
                );
            }
            "br" | "cr" => {
                flush_text(&mut text, &props, dest);
                dest.push(leaf_span(&props).with_child(Element::new("br")).into());
            }
            // drawings, field codes and note references have no rendering
            _ => {}
        }
    }
    flush_text(&mut text, &props, dest);
}

fn flush_text(text: &mut String, props: &CssProperties, dest: &mut Vec<Node>) {
    if text.is_empty() {
        return;
    }
    let span = leaf_span(props).with_child(Node::text(std::mem::take(text)));
    dest.push(span.into());
}

fn leaf_span(props: &CssProperties) -> Element {
    let mut span = Element::new("span");
    if !props.is_empty() {
        span.set_attr("style", props.to_css());
    }
    span
}
