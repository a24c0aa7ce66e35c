use super::{Document, Element, Node, is_void_tag};
use quick_xml::escape::escape;

/// Serializes as XHTML that HTML parsers also accept: void elements self-close,
/// every other element gets an explicit end tag.
pub fn to_xhtml(doc: &Document) -> String {
    let mut out = String::from("<!DOCTYPE html>\n");
    write_element(&doc.root, &mut out);
    out.push('\n');
    out
}

pub fn element_to_string(el: &Element) -> String {
    let mut out = String::new();
    write_element(el, &mut out);
    out
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if el.children.is_empty() && is_void_tag(&el.tag) {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) => out.push_str(&escape(t.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}
