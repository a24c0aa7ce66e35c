mod common;

use common::{BODY, read_part, write_docx};
use dfconvert::Adapter;
use dfconvert::config::Config;
use dfconvert::html::{Element, Node, parse_html_file, to_xhtml};

fn adapter() -> Adapter {
    Adapter::from_config(&Config::default()).unwrap()
}

fn remove_block(body: &mut Element, id: &str) {
    body.children
        .retain(|n| n.as_element().and_then(|e| e.attr("id")) != Some(id));
}

fn insert_after(body: &mut Element, id: &str, el: Element) {
    let pos = body
        .children
        .iter()
        .position(|n| n.as_element().and_then(|e| e.attr("id")) == Some(id))
        .unwrap();
    body.children.insert(pos + 1, Node::Element(el));
}

#[test]
fn get_renders_every_block_with_an_id() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    let html = dir.path().join("report.html");
    write_docx(&docx, BODY);

    assert!(adapter().get(&docx, &html));
    let out = std::fs::read_to_string(&html).unwrap();

    assert!(out.starts_with("<!DOCTYPE html>"));
    assert!(out.contains("<meta charset=\"utf-8\"/>"));
    assert!(out.contains("<h1 id=\"word0\"><span>Quarterly report</span></h1>"));
    assert!(out.contains(
        "<p id=\"word1\"><span>Revenue grew </span><span style=\"font-weight: bold\">12%</span><span> this quarter.</span></p>"
    ));
    assert!(out.contains("<a href=\"https://example.com/\"><span>the site</span></a>"));
    assert!(out.contains("<table id=\"word3\">"));
    assert!(out.contains("<div class=\"placeholder\" id=\"word4\"></div>"));
    assert!(out.contains("<p id=\"word5\"><br/></p>"));
}

#[test]
fn unmodified_round_trip_keeps_the_document_part() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    let html = dir.path().join("report.html");
    write_docx(&docx, BODY);
    let before = read_part(&docx, "word/document.xml").unwrap();
    let rels_before = read_part(&docx, "word/_rels/document.xml.rels").unwrap();

    let adapter = adapter();
    adapter.try_get(&docx, &html).unwrap();
    adapter.try_put(&docx, &html).unwrap();

    assert_eq!(read_part(&docx, "word/document.xml").unwrap(), before);
    assert_eq!(
        read_part(&docx, "word/_rels/document.xml.rels").unwrap(),
        rels_before
    );
    assert_eq!(
        read_part(&docx, "docProps/custom.xml").as_deref(),
        Some("<Properties/>")
    );
}

#[test]
fn editing_one_paragraph_rewrites_only_that_block() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    let html = dir.path().join("report.html");
    write_docx(&docx, BODY);

    let adapter = adapter();
    adapter.try_get(&docx, &html).unwrap();
    let edited = std::fs::read_to_string(&html)
        .unwrap()
        .replace("this quarter.", "this year.");
    std::fs::write(&html, edited).unwrap();
    adapter.try_put(&docx, &html).unwrap();

    let xml = read_part(&docx, "word/document.xml").unwrap();
    assert!(xml.contains("this year."));
    assert!(!xml.contains("this quarter."));
    // paragraph properties of the edited block survive
    assert!(xml.contains("<w:p><w:pPr><w:jc w:val=\"both\"/></w:pPr>"));
    assert!(xml.contains("<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">12%</w:t></w:r>"));
    // untouched blocks keep their exact XML
    assert!(xml.contains(r#"<w:p w:rsidR="001F2A"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>"#));
    assert!(xml.contains(r#"<w:tblStyle w:val="TableGrid"/>"#));
}

#[test]
fn deleted_and_inserted_blocks_follow_the_html() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    let html = dir.path().join("report.html");
    write_docx(&docx, BODY);

    let adapter = adapter();
    adapter.try_get(&docx, &html).unwrap();

    let mut doc = parse_html_file(&html).unwrap();
    let body = doc.body_mut().unwrap();
    remove_block(body, "word3");
    insert_after(
        body,
        "word0",
        Element::new("p")
            .with_child(Node::text("Inserted "))
            .with_child(
                Element::new("a")
                    .with_attr("href", "https://rust-lang.org/")
                    .with_child(Node::text("link")),
            ),
    );
    std::fs::write(&html, to_xhtml(&doc)).unwrap();
    adapter.try_put(&docx, &html).unwrap();

    let xml = read_part(&docx, "word/document.xml").unwrap();
    assert!(!xml.contains("Region"));
    let title = xml.find("Quarterly report").unwrap();
    let inserted = xml.find("Inserted ").unwrap();
    let revenue = xml.find("Revenue grew").unwrap();
    assert!(title < inserted && inserted < revenue);
    assert!(xml.contains(r#"<w:hyperlink r:id="rId10">"#));
    assert!(xml.contains(r#"<w:bookmarkStart w:id="0" w:name="end"/>"#));
    assert!(xml.ends_with(
        r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    ));

    let rels = read_part(&docx, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains(r#"Id="rId10""#));
    assert!(rels.contains(r#"Target="https://rust-lang.org/" TargetMode="External""#));
    assert!(rels.contains(r#"Id="rId9""#));
}

#[test]
fn create_builds_a_document_that_get_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("draft.html");
    let docx = dir.path().join("draft.docx");
    let html = dir.path().join("draft-out.html");
    std::fs::write(
        &src,
        "<html><body><h2>Plan</h2><p>Ship <i>soon</i>\tor later</p><ul><li>one</li><li>two</li></ul></body></html>",
    )
    .unwrap();

    let adapter = adapter();
    assert!(adapter.create(&docx, &src));
    let xml = read_part(&docx, "word/document.xml").unwrap();
    assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/>"#));
    assert!(xml.contains("<w:rPr><w:i/></w:rPr>"));
    assert!(read_part(&docx, "word/styles.xml").is_some());

    assert!(adapter.get(&docx, &html));
    let out = std::fs::read_to_string(&html).unwrap();
    assert!(out.contains("<h2 id=\"word0\"><span>Plan</span></h2>"));
    assert!(out.contains("<span>one</span>"));
    assert!(out.contains("<span>two</span>"));
}
