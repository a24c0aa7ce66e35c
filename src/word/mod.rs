//! The Word lens: `.docx` packages rendered as HTML and edited HTML written back.

pub mod document;
pub mod get;
pub mod package;
pub mod put;
pub mod rels;
pub mod styles;
pub mod templates;
pub mod xml;

use crate::config::Conversion;
use crate::html::{Document, Node, indent::safe_indent, normalize_document};
use anyhow::{Context, Result, anyhow};
use document::Body;
use get::Renderer;
use package::{DOCUMENT_PART, DOCUMENT_RELS_PART, Package, STYLES_PART};
use put::Updater;
use rels::Relationships;
use styles::StyleSheet;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LensOptions {
    /// Prefix of the block ids `get` writes and `put` reads back.
    pub id_prefix: String,
    pub indent: bool,
}

impl Default for LensOptions {
    fn default() -> Self {
        Self::from_config(&Conversion::default())
    }
}

impl LensOptions {
    pub fn from_config(cfg: &Conversion) -> Self {
        Self {
            id_prefix: cfg.id_prefix.clone(),
            indent: cfg.indent,
        }
    }
}

/// Renders the package body as an HTML document.
pub fn get(pkg: &Package, opts: &LensOptions) -> Result<Document> {
    let body = Body::parse(&pkg.require_str(DOCUMENT_PART)?).context("reading document body")?;
    let styles = load_styles(pkg)?;
    let rels = load_relationships(pkg)?;
    let renderer = Renderer {
        styles: &styles,
        rels: &rels,
        id_prefix: &opts.id_prefix,
    };

    let mut doc = Document::empty();
    let html_body = doc
        .body_mut()
        .ok_or_else(|| anyhow!("empty document has no body"))?;
    for block in &body.blocks {
        html_body.children.push(Node::Element(renderer.render_block(block)?));
    }
    debug!("get rendered {} blocks", body.blocks.len());

    if opts.indent {
        safe_indent(&mut doc.root, 0);
    }
    Ok(doc)
}

/// Updates the package from an HTML document previously produced by [`get`].
pub fn put(pkg: &mut Package, html: &Document, opts: &LensOptions) -> Result<()> {
    let xml = pkg.require_str(DOCUMENT_PART)?;
    let body = Body::parse(&xml).context("reading document body")?;
    let styles = load_styles(pkg)?;
    let rels = load_relationships(pkg)?;

    let mut html = html.clone();
    normalize_document(&mut html);
    let html_body = html
        .body()
        .ok_or_else(|| anyhow!("HTML document has no <body>"))?;

    let declare_r = !body.head.contains("xmlns:r=");
    let mut updater = Updater::new(&styles, rels, &opts.id_prefix, declare_r);
    let new_xml = updater.update_body(&body, html_body)?;
    let rels = updater.into_relationships();

    pkg.put(DOCUMENT_PART, new_xml.into_bytes());
    if rels.is_changed() {
        pkg.put(DOCUMENT_RELS_PART, rels.to_xml().into_bytes());
    }
    Ok(())
}

/// Builds a new package whose body holds the content of `html`.
pub fn create(html: &Document, opts: &LensOptions) -> Result<Package> {
    let mut pkg = templates::blank_package();
    put(&mut pkg, html, opts)?;
    Ok(pkg)
}

fn load_styles(pkg: &Package) -> Result<StyleSheet> {
    match pkg.get_str(STYLES_PART)? {
        Some(xml) => StyleSheet::parse(&xml).context("reading styles"),
        None => Ok(StyleSheet::default()),
    }
}

fn load_relationships(pkg: &Package) -> Result<Relationships> {
    match pkg.get_str(DOCUMENT_RELS_PART)? {
        Some(xml) => Relationships::parse(&xml).context("reading document relationships"),
        None => Ok(Relationships::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_html, to_xhtml};

    #[test]
    fn create_then_get_renders_the_same_blocks() {
        let html = parse_html(
            "<html><body><h1>Title</h1><p>Body <b>bold</b></p><p class=\"Quote\">q</p></body></html>",
        );
        let opts = LensOptions::default();
        let pkg = create(&html, &opts).unwrap();
        let out = to_xhtml(&get(&pkg, &opts).unwrap());

        assert!(out.contains("<h1 id=\"word0\"><span>Title</span></h1>"));
        assert!(out.contains(
            "<p id=\"word1\"><span>Body </span><span style=\"font-weight: bold\">bold</span></p>"
        ));
        assert!(out.contains("<p class=\"Quote\" id=\"word2\"><span>q</span></p>"));
    }

    #[test]
    fn get_then_put_leaves_the_document_untouched() {
        let opts = LensOptions::default();
        let html = parse_html("<html><body><p>a</p><table><tr><td>b</td></tr></table></body></html>");
        let mut pkg = create(&html, &opts).unwrap();
        let before = pkg.require_str(DOCUMENT_PART).unwrap();

        let rendered = get(&pkg, &opts).unwrap();
        let reparsed = parse_html(&to_xhtml(&rendered));
        put(&mut pkg, &reparsed, &opts).unwrap();
        assert_eq!(pkg.require_str(DOCUMENT_PART).unwrap(), before);
    }
}
