use super::{Element, Node, is_inline_tag};

const STRUCTURAL: &[&str] = &[
    "html", "head", "body", "div", "ul", "ol", "li", "nav", "figure", "table", "colgroup",
    "thead", "tbody", "tfoot", "tr", "th", "td",
];

/// Inserts newline-and-indent text between the children of structural elements.
///
/// Only elements whose content is purely block-level are touched, so inline text is
/// never altered. Existing whitespace-only children are replaced rather than added to,
/// which keeps the pass idempotent.
pub fn safe_indent(el: &mut Element, depth: usize) {
    if matches!(el.tag.as_str(), "script" | "style") {
        return;
    }

    if STRUCTURAL.contains(&el.tag.as_str()) && is_block_only(el) && has_elements(el) {
        let old = std::mem::take(&mut el.children);
        for child in old {
            if child.is_whitespace() {
                continue;
            }
            el.children.push(Node::Text(indent_text(depth + 1)));
            el.children.push(child);
        }
        el.children.push(Node::Text(indent_text(depth)));
    }

    for child in el.children.iter_mut() {
        if let Node::Element(e) = child
            && !is_inline_tag(&e.tag)
        {
            safe_indent(e, depth + 1);
        }
    }
}

fn is_block_only(el: &Element) -> bool {
    el.children.iter().all(|child| match child {
        Node::Text(_) => child.is_whitespace(),
        Node::Element(e) => !is_inline_tag(&e.tag),
    })
}

fn has_elements(el: &Element) -> bool {
    el.children.iter().any(|c| matches!(c, Node::Element(_)))
}

fn indent_text(depth: usize) -> String {
    format!("\n{}", "  ".repeat(depth))
}
