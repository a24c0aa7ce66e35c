//! Writes an edited HTML body back into the concrete document body.
//!
//! Blocks are matched by the ids `get` stamped on them. A block whose HTML did not
//! change keeps its original XML verbatim; everything else is regenerated from the
//! HTML, which only knows paragraph styles, bold, italic, underline, tabs, breaks,
//! links and tables.

use super::document::{Block, BlockKind, Body, scan_element};
use super::get::Renderer;
use super::rels::Relationships;
use super::styles::StyleSheet;
use crate::html::css::CssProperties;
use crate::html::{
    Document, Element, Node, PLACEHOLDER_CLASS, TAB_CLASS, heading_level, is_paragraph_tag,
    normalize_document,
};
use anyhow::Result;
use quick_xml::escape::escape;
use std::collections::HashSet;
use tracing::debug;

pub const RELATIONSHIPS_DOC_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const DEFAULT_TABLE_PROPERTIES: &str =
    r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblLook w:val="04A0"/></w:tblPr>"#;

pub struct Updater<'a> {
    styles: &'a StyleSheet,
    rels: Relationships,
    id_prefix: &'a str,
    /// Set when the document root lacks `xmlns:r`, so new hyperlinks declare it themselves.
    declare_r: bool,
}

impl<'a> Updater<'a> {
    pub fn new(
        styles: &'a StyleSheet,
        rels: Relationships,
        id_prefix: &'a str,
        declare_r: bool,
    ) -> Self {
        Self {
            styles,
            rels,
            id_prefix,
            declare_r,
        }
    }

    pub fn into_relationships(self) -> Relationships {
        self.rels
    }

    fn renderer(&self) -> Renderer<'_> {
        Renderer {
            styles: self.styles,
            rels: &self.rels,
            id_prefix: self.id_prefix,
        }
    }

    /// Builds the new `document.xml` from `body` and the normalized HTML `<body>`.
    pub fn update_body(&mut self, body: &Body, html_body: &Element) -> Result<String> {
        let mut used: HashSet<usize> = HashSet::new();
        let mut out: Vec<String> = Vec::new();
        let mut reused = 0usize;

        for el in html_body.child_elements() {
            let matched = el
                .attr("id")
                .and_then(|id| self.renderer().block_seq(id))
                .filter(|seq| !used.contains(seq))
                .and_then(|seq| body.block(seq));
            match matched {
                Some(block) => {
                    used.insert(block.seq);
                    let xml = self.update_block(block, el)?;
                    if xml == block.raw {
                        reused += 1;
                    }
                    out.push(xml);
                }
                None => self.fresh_blocks(el, &mut out)?,
            }
        }

        debug!(
            "put blocks: {} written, {} unchanged, {} removed",
            out.len(),
            reused,
            body.blocks.len() - used.len()
        );
        Ok(body.assemble(out.iter().map(String::as_str)))
    }

    fn update_block(&mut self, block: &Block, el: &Element) -> Result<String> {
        if el.tag == "div" && el.has_class(PLACEHOLDER_CLASS) {
            return Ok(block.raw.clone());
        }

        let current = normalize_block(self.renderer().render_block(block)?);
        if current.as_ref().map(Element::canonical) == Some(el.canonical()) {
            return Ok(block.raw.clone());
        }

        match block.kind {
            BlockKind::Paragraph if is_paragraph_tag(&el.tag) => {
                let same_style = current
                    .as_ref()
                    .is_some_and(|c| c.tag == el.tag && c.attr("class") == el.attr("class"));
                let ppr = if same_style {
                    child_raw(&block.raw, b"p", "pPr")?
                } else {
                    None
                };
                self.paragraph_xml(el, ppr.as_deref())
            }
            BlockKind::Table if el.tag == "table" => {
                let tbl_pr = child_raw(&block.raw, b"tbl", "tblPr")?;
                self.table_xml(el, tbl_pr.as_deref())
            }
            _ => {
                let mut out = Vec::new();
                self.fresh_blocks(el, &mut out)?;
                Ok(out.concat())
            }
        }
    }

    /// Generates XML for an HTML block that has no concrete counterpart.
    pub fn fresh_blocks(&mut self, el: &Element, out: &mut Vec<String>) -> Result<()> {
        match el.tag.as_str() {
            tag if is_paragraph_tag(tag) || tag == "caption" || tag == "figcaption" => {
                out.push(self.paragraph_xml(el, None)?)
            }
            "table" => out.push(self.table_xml(el, None)?),
            // nothing left to restore
            "div" if el.has_class(PLACEHOLDER_CLASS) => {}
            "head" | "script" | "style" => {}
            _ => {
                for child in el.child_elements() {
                    self.fresh_blocks(child, out)?;
                }
            }
        }
        Ok(())
    }

    fn paragraph_xml(&mut self, p: &Element, ppr: Option<&str>) -> Result<String> {
        let mut out = String::from("<w:p>");
        match ppr {
            Some(raw) => out.push_str(raw),
            None => {
                if let Some(style) = self.paragraph_style(p) {
                    out.push_str(&format!(
                        "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>",
                        escape(style.as_str())
                    ));
                }
            }
        }

        let count = p.children.len();
        for (index, child) in p.children.iter().enumerate() {
            // a bare trailing <br> only marks the paragraph as empty
            if index + 1 == count && matches!(child, Node::Element(e) if e.tag == "br") {
                continue;
            }
            self.inline_xml(child, &CssProperties::default(), &mut out)?;
        }
        out.push_str("</w:p>");
        Ok(out)
    }

    fn paragraph_style(&self, p: &Element) -> Option<String> {
        if let Some(level) = heading_level(&p.tag) {
            return Some(self.styles.heading_style(level));
        }
        p.attr("class")
            .and_then(|c| c.split_ascii_whitespace().next())
            .map(str::to_string)
    }

    fn inline_xml(&mut self, node: &Node, props: &CssProperties, out: &mut String) -> Result<()> {
        let el = match node {
            Node::Text(t) => {
                push_text_run(t, props, out);
                return Ok(());
            }
            Node::Element(el) => el,
        };

        match el.tag.as_str() {
            "span" if el.has_class(TAB_CLASS) => push_run(props, "<w:tab/>", out),
            "br" => push_run(props, "<w:br/>", out),
            // deleted text and images are not written back
            "del" | "img" => {}
            "a" => {
                let href = el.attr("href").unwrap_or_default();
                let open = if let Some(anchor) = href.strip_prefix('#') {
                    format!("<w:hyperlink w:anchor=\"{}\">", escape(anchor))
                } else if href.is_empty() {
                    String::new()
                } else {
                    let id = self.rels.add_hyperlink(href)?;
                    let ns = if self.declare_r {
                        format!(" xmlns:r=\"{RELATIONSHIPS_DOC_NS}\"")
                    } else {
                        String::new()
                    };
                    format!("<w:hyperlink{ns} r:id=\"{id}\">")
                };
                out.push_str(&open);
                for child in &el.children {
                    self.inline_xml(child, props, out)?;
                }
                if !open.is_empty() {
                    out.push_str("</w:hyperlink>");
                }
            }
            tag => {
                let mut props = props.clone();
                if let Some(style) = el.attr("style") {
                    props.merge_str(style);
                }
                match tag {
                    "b" | "strong" => props.set("font-weight", "bold"),
                    "i" | "em" => props.set("font-style", "italic"),
                    "u" => props.set("text-decoration", "underline"),
                    _ => {}
                }
                for child in &el.children {
                    self.inline_xml(child, &props, out)?;
                }
            }
        }
        Ok(())
    }

    fn table_xml(&mut self, table: &Element, tbl_pr: Option<&str>) -> Result<String> {
        let rows = table_rows(table);
        let columns = rows
            .iter()
            .map(|r| r.child_elements().filter(|c| is_cell(c)).map(colspan).sum::<usize>())
            .max()
            .unwrap_or(1)
            .max(1);

        let mut out = String::from("<w:tbl>");
        out.push_str(tbl_pr.unwrap_or(DEFAULT_TABLE_PROPERTIES));
        out.push_str("<w:tblGrid>");
        for _ in 0..columns {
            out.push_str("<w:gridCol/>");
        }
        out.push_str("</w:tblGrid>");

        for row in rows {
            out.push_str("<w:tr>");
            for cell in row.child_elements().filter(|c| is_cell(c)) {
                out.push_str("<w:tc><w:tcPr><w:tcW w:w=\"0\" w:type=\"auto\"/>");
                let span = colspan(cell);
                if span > 1 {
                    out.push_str(&format!("<w:gridSpan w:val=\"{span}\"/>"));
                }
                out.push_str("</w:tcPr>");

                let mut content = Vec::new();
                for child in cell.child_elements() {
                    self.fresh_blocks(child, &mut content)?;
                }
                // a cell must end with a paragraph
                let ends_with_paragraph = content
                    .last()
                    .is_some_and(|b| b.starts_with("<w:p>") || b.starts_with("<w:p "));
                out.push_str(&content.concat());
                if !ends_with_paragraph {
                    out.push_str("<w:p/>");
                }
                out.push_str("</w:tc>");
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
        Ok(out)
    }
}

/// Runs a single block through the normalizer, as if it were the only child of `<body>`.
pub fn normalize_block(el: Element) -> Option<Element> {
    let mut doc = Document::empty();
    doc.body_mut()?.children.push(el.into());
    normalize_document(&mut doc);
    match doc.body_mut()?.children.pop()? {
        Node::Element(el) => Some(el),
        Node::Text(_) => None,
    }
}

/// Raw XML of the first direct child named `child` of the element `root` in `xml`.
fn child_raw(xml: &str, root: &[u8], child: &str) -> Result<Option<String>> {
    let Some(scan) = scan_element(xml, root)? else {
        return Ok(None);
    };
    Ok(scan
        .children
        .iter()
        .find(|c| c.name == child)
        .map(|c| xml[c.start..c.end].to_string()))
}

fn table_rows(table: &Element) -> Vec<&Element> {
    let mut rows = Vec::new();
    for child in table.child_elements() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child.child_elements().filter(|r| r.tag == "tr"))
            }
            _ => {}
        }
    }
    rows
}

fn is_cell(el: &Element) -> bool {
    matches!(el.tag.as_str(), "td" | "th")
}

fn colspan(cell: &Element) -> usize {
    cell.attr("colspan")
        .and_then(|v| v.trim().parse().ok())
        .filter(|n| *n > 1)
        .unwrap_or(1)
}

fn push_text_run(text: &str, props: &CssProperties, out: &mut String) {
    if text.is_empty() {
        return;
    }
    let mut content = String::new();
    for (i, part) in text.split('\t').enumerate() {
        if i > 0 {
            content.push_str("<w:tab/>");
        }
        if !part.is_empty() {
            content.push_str("<w:t xml:space=\"preserve\">");
            content.push_str(&escape(part));
            content.push_str("</w:t>");
        }
    }
    push_run(props, &content, out);
}

fn push_run(props: &CssProperties, content: &str, out: &mut String) {
    out.push_str("<w:r>");
    if props.is_bold() || props.is_italic() || props.is_underline() {
        out.push_str("<w:rPr>");
        if props.is_bold() {
            out.push_str("<w:b/>");
        }
        if props.is_italic() {
            out.push_str("<w:i/>");
        }
        if props.is_underline() {
            out.push_str("<w:u w:val=\"single\"/>");
        }
        out.push_str("</w:rPr>");
    }
    out.push_str(content);
    out.push_str("</w:r>");
}
