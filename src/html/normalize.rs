//! Rewrites an HTML document into the canonical shape the Word lens reads.
//!
//! After normalization every paragraph holds only leaf `<span>`s (each wrapping one
//! text node, image or line break and carrying the accumulated inline style), plus
//! links and change-tracking elements whose content is normalized the same way.
//! Containers hold only paragraphs, tables and lists.

use super::css::CssProperties;
use super::{
    CONTAINER_CLASS, Document, Element, Node, PLACEHOLDER_CLASS, TAB_CLASS, is_block_level_tag,
    is_collapsible_space,
};

pub fn normalize_document(doc: &mut Document) {
    merge_adjacent_text(&mut doc.root);
    normalize_container(&mut doc.root);
}

fn merge_adjacent_text(el: &mut Element) {
    let old = std::mem::take(&mut el.children);
    for child in old {
        match child {
            Node::Text(t) => match el.children.last_mut() {
                Some(Node::Text(prev)) => prev.push_str(&t),
                _ => el.children.push(Node::Text(t)),
            },
            Node::Element(mut e) => {
                merge_adjacent_text(&mut e);
                el.children.push(Node::Element(e));
            }
        }
    }
}

fn normalize_container(container: &mut Element) {
    let old = std::mem::take(&mut container.children);
    let mut out = Vec::with_capacity(old.len());

    for child in old {
        let Node::Element(mut el) = child else {
            // stray text at container level has no paragraph to live in
            continue;
        };
        match el.tag.as_str() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "caption" | "figcaption" => {
                normalize_paragraph(&mut el);
                out.push(Node::Element(el));
            }
            "body" | "td" | "th" | "li" | "figure" => {
                wrap_anonymous_paragraphs(&mut el);
                remove_whitespace_text(&mut el);
                normalize_container(&mut el);
                out.push(Node::Element(el));
            }
            "table" | "thead" | "tbody" | "tfoot" | "tr" | "ul" | "ol" => {
                remove_whitespace_text(&mut el);
                normalize_container(&mut el);
                out.push(Node::Element(el));
            }
            "head" => out.push(Node::Element(el)),
            "div" if el.has_class(PLACEHOLDER_CLASS) => out.push(Node::Element(el)),
            "nav"
                if el.has_class("tableofcontents")
                    || el.has_class("listoffigures")
                    || el.has_class("listoftables") =>
            {
                normalize_container(&mut el);
                out.push(Node::Element(el));
            }
            _ => {
                // unknown container: normalize like a body, then splice its children in
                wrap_anonymous_paragraphs(&mut el);
                remove_whitespace_text(&mut el);
                normalize_container(&mut el);
                out.extend(el.children);
            }
        }
    }

    container.children = out;
}

/// Wraps each run of non-block children in a `<p>`, unless the run is only whitespace.
fn wrap_anonymous_paragraphs(el: &mut Element) {
    let old = std::mem::take(&mut el.children);
    let mut run: Vec<Node> = Vec::new();

    for child in old {
        let is_block = matches!(&child, Node::Element(e) if is_block_level_tag(&e.tag));
        if is_block {
            flush_anonymous(&mut run, &mut el.children);
            el.children.push(child);
        } else {
            run.push(child);
        }
    }
    flush_anonymous(&mut run, &mut el.children);
}

fn flush_anonymous(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    if run.is_empty() {
        return;
    }
    if run.iter().all(Node::is_whitespace) {
        out.append(run);
    } else {
        let mut p = Element::new("p");
        p.children = std::mem::take(run);
        out.push(Node::Element(p));
    }
}

fn remove_whitespace_text(el: &mut Element) {
    el.children.retain(|c| !c.is_whitespace());
}

fn normalize_paragraph(p: &mut Element) {
    let mut skip_space = true;
    collapse_forward(p, &mut skip_space);
    let mut at_end = true;
    trim_backward(p, &mut at_end);
    remove_empty_text(p);

    let children = std::mem::take(&mut p.children);
    let mut out = Vec::with_capacity(children.len());
    let mut ctx = InlineCtx::default();
    normalize_inline(
        children,
        &mut out,
        &CssProperties::default(),
        None,
        true,
        &mut ctx,
    );
    p.children = merge_spans(out);
}

/// Collapses whitespace runs to one space, dropping spaces at the start of a line and
/// spaces that follow one already emitted by an earlier leaf.
fn collapse_forward(el: &mut Element, skip_space: &mut bool) {
    for child in el.children.iter_mut() {
        match child {
            Node::Text(t) => *t = collapse(t, skip_space),
            Node::Element(e) if e.tag == "br" => *skip_space = true,
            Node::Element(e) if e.tag == "img" || is_tab_span(e) => *skip_space = false,
            Node::Element(e) => collapse_forward(e, skip_space),
        }
    }
}

fn collapse(text: &str, skip_space: &mut bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_collapsible_space(c) {
            if !*skip_space {
                out.push(' ');
                *skip_space = true;
            }
        } else {
            out.push(c);
            *skip_space = false;
        }
    }
    out
}

/// Trims trailing spaces at the end of the paragraph and before each `<br>`.
fn trim_backward(el: &mut Element, at_end: &mut bool) {
    for child in el.children.iter_mut().rev() {
        match child {
            Node::Text(t) => {
                if *at_end {
                    let keep = t.trim_end_matches(is_collapsible_space).len();
                    t.truncate(keep);
                }
                if !t.is_empty() {
                    *at_end = false;
                }
            }
            Node::Element(e) if e.tag == "br" => *at_end = true,
            Node::Element(e) if e.tag == "img" || is_tab_span(e) => *at_end = false,
            Node::Element(e) => trim_backward(e, at_end),
        }
    }
}

fn remove_empty_text(el: &mut Element) {
    el.children.retain(|c| !matches!(c, Node::Text(t) if t.is_empty()));
    for child in el.children.iter_mut() {
        if let Node::Element(e) = child {
            remove_empty_text(e);
        }
    }
}

#[derive(Default)]
struct InlineCtx {
    /// Id of a span being flattened, handed to the first leaf it produces.
    span_id: Option<String>,
}

fn normalize_inline(
    children: Vec<Node>,
    dest: &mut Vec<Node>,
    props: &CssProperties,
    class: Option<&str>,
    in_paragraph: bool,
    ctx: &mut InlineCtx,
) {
    let count = children.len();
    for (index, node) in children.into_iter().enumerate() {
        let mut el = match node {
            Node::Text(_) => {
                add_leaf(Some(node), dest, props, class, ctx);
                continue;
            }
            Node::Element(el) => el,
        };

        let node_class = el.attr("class").map(str::to_string);
        let container = node_class.as_deref() == Some(CONTAINER_CLASS);
        let placeholder = node_class.as_deref() == Some(PLACEHOLDER_CLASS);
        let class_here = match &node_class {
            Some(c) if !container && !placeholder => Some(c.clone()),
            _ => class.map(str::to_string),
        };
        let mut props_here = props.clone();
        if let Some(style) = el.attr("style") {
            props_here.merge_str(style);
        }
        let inner = std::mem::take(&mut el.children);

        match el.tag.as_str() {
            "b" | "strong" => {
                props_here.set("font-weight", "bold");
                let class_here = class_here.as_deref();
                normalize_inline(inner, dest, &props_here, class_here, false, ctx);
            }
            "i" | "em" => {
                props_here.set("font-style", "italic");
                let class_here = class_here.as_deref();
                normalize_inline(inner, dest, &props_here, class_here, false, ctx);
            }
            "u" => {
                props_here.set("text-decoration", "underline");
                let class_here = class_here.as_deref();
                normalize_inline(inner, dest, &props_here, class_here, false, ctx);
            }
            "span" if matches!(node_class.as_deref(), Some("footnote") | Some("endnote")) => {
                let mut own = InlineCtx::default();
                normalize_inline(inner, &mut el.children, &props_here, None, false, &mut own);
                dest.push(Node::Element(el));
            }
            "span" if node_class.as_deref() == Some(TAB_CLASS) => {
                // tab spans keep their literal tab; whitespace rules never reach inside
                el.children = inner;
                dest.push(Node::Element(el));
            }
            "span" if placeholder => {
                el.children = inner;
                let class_here = class_here.as_deref();
                add_leaf(Some(Node::Element(el)), dest, &props_here, class_here, ctx);
            }
            "span" => {
                let this_id = el.attr("id").map(str::to_string);
                // the outermost pending id wins until a leaf claims it
                if ctx.span_id.is_none() && !container {
                    ctx.span_id = this_id.clone();
                }
                let class_here = class_here.as_deref();
                normalize_inline(inner, dest, &props_here, class_here, false, ctx);
                // An empty span with an id still marks a run on the Word side; keep it.
                if this_id.is_some() && ctx.span_id == this_id {
                    add_leaf(None, dest, &props_here, class_here, ctx);
                }
            }
            "br" if in_paragraph && index + 1 == count => {
                // a trailing <br> only keeps an empty paragraph visible
                dest.push(Node::Element(el));
            }
            "br" | "img" => {
                el.children = inner;
                let class_here = class_here.as_deref();
                add_leaf(Some(Node::Element(el)), dest, &props_here, class_here, ctx);
            }
            _ => {
                // a, ins, del and unknown inline elements stay, with their content flattened
                let class_here = class_here.as_deref();
                normalize_inline(
                    inner,
                    &mut el.children,
                    &props_here,
                    class_here,
                    false,
                    ctx,
                );
                dest.push(Node::Element(el));
            }
        }
    }
}

fn add_leaf(
    node: Option<Node>,
    dest: &mut Vec<Node>,
    props: &CssProperties,
    class: Option<&str>,
    ctx: &mut InlineCtx,
) {
    let mut span = Element::new("span");
    if !props.is_empty() {
        span.set_attr("style", props.to_css());
    }
    if let Some(class) = class {
        span.set_attr("class", class);
    }
    if let Some(id) = ctx.span_id.take() {
        let node_id = node
            .as_ref()
            .and_then(Node::as_element)
            .and_then(|e| e.attr("id"));
        if node_id != Some(id.as_str()) {
            span.set_attr("id", id);
        }
    }
    if let Some(node) = node {
        span.children.push(node);
    }
    dest.push(Node::Element(span));
}

fn merge_spans(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Node::Element(mut el) = node else {
            out.push(node);
            continue;
        };
        if el.tag != "span" || contains_image(&el) || is_special_span(&el) {
            out.push(Node::Element(el));
            continue;
        }

        let prev = match out.last_mut() {
            Some(Node::Element(prev)) if mergeable_with(prev, &el) => Some(prev),
            _ => None,
        };

        match prev {
            Some(prev) if el.attr("id").is_none() => {
                append_merging_text(&mut prev.children, el.children);
            }
            Some(prev) if prev.attr("id").is_none() => {
                // the id-carrying span absorbs its anonymous predecessor
                let mut merged = std::mem::take(&mut prev.children);
                append_merging_text(&mut merged, std::mem::take(&mut el.children));
                el.children = merged;
                out.pop();
                out.push(Node::Element(el));
            }
            _ => out.push(Node::Element(el)),
        }
    }
    out
}

fn mergeable_with(prev: &Element, el: &Element) -> bool {
    prev.tag == "span"
        && !contains_image(prev)
        && !is_special_span(prev)
        && attrs_without_id(prev) == attrs_without_id(el)
}

fn attrs_without_id(el: &Element) -> Vec<(&str, &str)> {
    let mut attrs: Vec<(&str, &str)> = el
        .attrs
        .iter()
        .filter(|(k, _)| k != "id")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    attrs.sort();
    attrs
}

fn append_merging_text(dest: &mut Vec<Node>, more: Vec<Node>) {
    for node in more {
        match (dest.last_mut(), node) {
            (Some(Node::Text(prev)), Node::Text(t)) => prev.push_str(&t),
            (_, node) => dest.push(node),
        }
    }
}

fn contains_image(el: &Element) -> bool {
    el.child_elements().any(|c| c.tag == "img")
}

fn is_tab_span(el: &Element) -> bool {
    el.tag == "span" && el.has_class(TAB_CLASS)
}

fn is_special_span(el: &Element) -> bool {
    ["footnote", "endnote", PLACEHOLDER_CLASS, TAB_CLASS]
        .iter()
        .any(|c| el.has_class(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_html, serialize::element_to_string};

    fn normalized_body(src: &str) -> String {
        let mut doc = parse_html(src);
        normalize_document(&mut doc);
        let body = doc.body().unwrap();
        body.children
            .iter()
            .map(|n| match n {
                Node::Element(e) => element_to_string(e),
                Node::Text(t) => t.clone(),
            })
            .collect()
    }

    fn assert_idempotent(src: &str) {
        let mut doc = parse_html(src);
        normalize_document(&mut doc);
        let once = doc.clone();
        normalize_document(&mut doc);
        assert_eq!(once, doc, "second pass changed {src}");
    }

    #[test]
    fn flattens_inline_formatting_into_spans() {
        let out = normalized_body("<body><p>plain <b>bold <i>both</i></b></p></body>");
        assert_eq!(
            out,
            "<p><span>plain </span><span style=\"font-weight: bold\">bold </span>\
             <span style=\"font-style: italic; font-weight: bold\">both</span></p>"
        );
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        let out = normalized_body("<body><p>  a   b <span> c</span>  </p></body>");
        assert_eq!(out, "<p><span>a b c</span></p>");
    }

    #[test]
    fn keeps_nbsp() {
        let out = normalized_body("<body><p>a\u{a0}\u{a0}b</p></body>");
        assert_eq!(out, "<p><span>a\u{a0}\u{a0}b</span></p>");
    }

    #[test]
    fn wraps_loose_body_text_in_paragraphs() {
        let out = normalized_body("<body>\n  loose <b>text</b>\n<p>x</p>\n</body>");
        assert_eq!(
            out,
            "<p><span>loose </span><span style=\"font-weight: bold\">text</span></p><p><span>x</span></p>"
        );
    }

    #[test]
    fn unwraps_unknown_containers() {
        let out = normalized_body("<body><section><div><p>x</p></div></section></body>");
        assert_eq!(out, "<p><span>x</span></p>");
    }

    #[test]
    fn keeps_placeholders_and_trailing_break() {
        let out = normalized_body(
            "<body><div class=\"placeholder\" id=\"word3\"></div><p><br/></p></body>",
        );
        assert_eq!(out, "<div class=\"placeholder\" id=\"word3\"></div><p><br/></p>");
    }

    #[test]
    fn span_id_moves_to_first_leaf() {
        let out = normalized_body("<body><p><span id=\"r1\">a<b>b</b></span></p></body>");
        assert_eq!(
            out,
            "<p><span id=\"r1\">a</span><span style=\"font-weight: bold\">b</span></p>"
        );
    }

    #[test]
    fn span_ids_inside_links_and_formatting_survive() {
        let out = normalized_body("<body><p><a href=\"#x\"><span id=\"r1\">t</span></a></p></body>");
        assert_eq!(out, "<p><a href=\"#x\"><span id=\"r1\">t</span></a></p>");

        let out = normalized_body("<body><p>a <b><span id=\"r2\">b</span></b></p></body>");
        assert_eq!(
            out,
            "<p><span>a </span><span style=\"font-weight: bold\" id=\"r2\">b</span></p>"
        );
    }

    #[test]
    fn links_keep_their_element() {
        let out = normalized_body("<body><p>see <a href=\"http://x\">the <b>site</b></a></p></body>");
        assert_eq!(
            out,
            "<p><span>see </span><a href=\"http://x\"><span>the </span>\
             <span style=\"font-weight: bold\">site</span></a></p>"
        );
    }

    #[test]
    fn tab_spans_survive_whitespace_collapsing() {
        let out = normalized_body("<body><p><span class=\"tab\">\t</span>a <span class=\"tab\">\t</span></p></body>");
        assert_eq!(
            out,
            "<p><span class=\"tab\">\t</span><span>a </span><span class=\"tab\">\t</span></p>"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for src in [
            "<body><p>plain <b>bold <i>both</i></b> <u>u</u></p></body>",
            "<body>loose <em>t</em><div><p> x </p>y</div></body>",
            "<body><p><span id=\"a\"></span>text<br/>more <br/></p></body>",
            "<body><table><tr><td>cell <b>b</b></td></tr></table></body>",
            "<body><p><span class=\"footnote\"> note <b>x</b></span> after</p></body>",
            "<body><p>a <a href=\"#x\">b  c</a> d</p><ul><li>item</li></ul></body>",
            "<body><p><span class=\"tab\">\t</span> x <span class=\"tab\">\t</span></p></body>",
        ] {
            assert_idempotent(src);
        }
    }
}
