use super::{Document, Element, Node, XHTML_NAMESPACE};
use anyhow::{Context, Result};
use scraper::{ElementRef, Html};
use std::path::Path;
use tracing::debug;

pub fn parse_html_file(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading HTML: {}", path.display()))?;
    Ok(parse_html(&raw))
}

/// Parses with html5ever's tree builder, so implied end tags, misnested formatting
/// and the full named-entity table behave the way a browser would handle them.
/// The result always has an `<html>` root holding `<head>` and `<body>`.
pub fn parse_html(src: &str) -> Document {
    let parsed = Html::parse_document(src);
    if !parsed.errors.is_empty() {
        debug!(count = parsed.errors.len(), first = %parsed.errors[0], "html parse errors recovered");
    }

    let mut root = convert(parsed.root_element());
    if root.attr("xmlns").is_none() {
        root.set_attr("xmlns", XHTML_NAMESPACE);
    }
    if let Some(body) = root.find_mut("body") {
        // text after </body> is reparented into it by the tree builder
        while body.children.last().is_some_and(Node::is_whitespace) {
            body.children.pop();
        }
    }
    Document { root }
}

fn convert(src: ElementRef<'_>) -> Element {
    let value = src.value();
    let mut el = Element::new(value.name().to_ascii_lowercase());
    // attributes come out in name order whatever the source order was
    let mut attrs: Vec<(String, &str)> = value
        .attrs()
        .map(|(name, v)| (name.to_ascii_lowercase(), v))
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, v) in attrs {
        el.set_attr(&name, v);
    }

    // whitespace between the document's structural elements carries nothing
    let drop_blank = matches!(el.tag.as_str(), "html" | "head");
    for child in src.children() {
        match child.value() {
            scraper::Node::Text(t) => {
                let text: &str = t;
                if text.is_empty() || (drop_blank && text.chars().all(char::is_whitespace)) {
                    continue;
                }
                el.children.push(Node::text(text));
            }
            scraper::Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    el.children.push(Node::Element(convert(child)));
                }
            }
            _ => {}
        }
    }
    el
}
