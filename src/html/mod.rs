//! Minimal HTML document model used as the abstract side of every conversion.
//!
//! The tree is owned (`Vec<Node>` children) rather than linked; the normalizer and the
//! lenses rebuild child lists instead of splicing siblings in place.

pub mod css;
pub mod indent;
pub mod normalize;
pub mod parse;
pub mod serialize;

pub use normalize::normalize_document;
pub use parse::{parse_html, parse_html_file};
pub use serialize::to_xhtml;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub const PLACEHOLDER_CLASS: &str = "placeholder";
pub const CONTAINER_CLASS: &str = "container";
pub const TAB_CLASS: &str = "tab";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// True for text nodes made only of collapsible whitespace. NBSP does not count.
    pub fn is_whitespace(&self) -> bool {
        match self {
            Node::Text(s) => s.chars().all(is_collapsible_space),
            Node::Element(_) => false,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(idx).1)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.tag == tag)
    }

    pub fn find_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|el| el.tag == tag)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Copy with attributes sorted by name at every level, for order-insensitive comparison.
    pub fn canonical(&self) -> Element {
        let mut attrs = self.attrs.clone();
        attrs.sort();
        Element {
            tag: self.tag.clone(),
            attrs,
            children: self
                .children
                .iter()
                .map(|n| match n {
                    Node::Element(el) => Node::Element(el.canonical()),
                    Node::Text(t) => Node::Text(t.clone()),
                })
                .collect(),
        }
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// `<html><head><meta charset/><title/></head><body/></html>`
    pub fn empty() -> Self {
        let head = Element::new("head")
            .with_child(Element::new("meta").with_attr("charset", "utf-8"))
            .with_child(Element::new("title"));
        let root = Element::new("html")
            .with_attr("xmlns", XHTML_NAMESPACE)
            .with_child(head)
            .with_child(Element::new("body"));
        Self { root }
    }

    pub fn body(&self) -> Option<&Element> {
        self.root.find("body")
    }

    pub fn body_mut(&mut self) -> Option<&mut Element> {
        self.root.find_mut("body")
    }
}

pub fn is_collapsible_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0c}')
}

pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

pub fn is_paragraph_tag(tag: &str) -> bool {
    matches!(tag, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

pub fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

pub fn is_block_level_tag(tag: &str) -> bool {
    is_paragraph_tag(tag)
        || matches!(
            tag,
            "address"
                | "article"
                | "aside"
                | "blockquote"
                | "body"
                | "caption"
                | "dd"
                | "div"
                | "dl"
                | "dt"
                | "figcaption"
                | "figure"
                | "footer"
                | "head"
                | "header"
                | "hr"
                | "html"
                | "li"
                | "nav"
                | "ol"
                | "pre"
                | "section"
                | "table"
                | "tbody"
                | "td"
                | "tfoot"
                | "th"
                | "thead"
                | "tr"
                | "ul"
        )
}

pub fn is_inline_tag(tag: &str) -> bool {
    !is_block_level_tag(tag)
        && !matches!(
            tag,
            "meta" | "title" | "style" | "script" | "link" | "base" | "colgroup" | "col"
        )
}
