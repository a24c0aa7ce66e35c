mod common;

use common::{BODY, read_part, write_docx};
use dfconvert::config::Config;
use dfconvert::engine::NativeEngine;
use dfconvert::{Adapter, ErrorKind};

fn adapter() -> Adapter {
    Adapter::from_config(&Config::default()).unwrap()
}

#[test]
fn missing_input_is_reported_and_collapses_to_false() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("missing.docx");
    let html = dir.path().join("out.html");

    let adapter = adapter();
    let err = adapter.try_get(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
    assert!(!adapter.get(&docx, &html));
    assert!(!html.exists());

    let err = adapter.try_normalize(&dir.path().join("nope.html")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
}

#[test]
fn get_never_overwrites_an_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    let html = dir.path().join("out.html");
    write_docx(&docx, BODY);
    std::fs::write(&html, "keep me").unwrap();

    let err = adapter().try_get(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputExists);
    assert_eq!(std::fs::read_to_string(&html).unwrap(), "keep me");
}

#[test]
fn create_refuses_an_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    let html = dir.path().join("in.html");
    write_docx(&docx, BODY);
    std::fs::write(&html, "<html><body><p>x</p></body></html>").unwrap();

    let err = adapter().try_create(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputExists);
}

#[test]
fn put_needs_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    write_docx(&docx, BODY);

    let err = adapter()
        .try_put(&docx, &dir.path().join("in.html"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
}

#[test]
fn every_operation_fails_on_a_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    let html = dir.path().join("in.html");
    let adapter = adapter();

    let err = adapter.try_create(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
    assert!(!adapter.create(&docx, &html));
    assert!(!docx.exists());

    std::fs::write(&html, "<p>x</p>").unwrap();
    let err = adapter.try_put(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
    assert!(!adapter.put(&docx, &html));
    assert!(!docx.exists());

    let err = adapter.try_normalized(&dir.path().join("gone.html")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);

    // a directory is not an input file
    let err = adapter.try_normalize(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputNotFound);
}

#[test]
fn create_reads_real_world_html() {
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("page.html");
    let docx = dir.path().join("page.docx");
    std::fs::write(
        &html,
        "<!doctype html><title>x</title><p>Caf&eacute; &amp; co<p>second &hellip; para",
    )
    .unwrap();

    adapter().try_create(&docx, &html).unwrap();
    let xml = read_part(&docx, "word/document.xml").unwrap();
    assert!(xml.contains("Caf\u{e9} &amp; co"), "{xml}");
    assert!(!xml.contains("&amp;amp;"));
    assert!(!xml.contains("eacute"));
    assert_eq!(xml.matches("<w:p>").count() + xml.matches("<w:p ").count(), 2, "{xml}");
    assert!(xml.contains("second \u{2026} para"));
}

#[test]
fn packages_that_expand_past_the_limit_fail() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    let html = dir.path().join("out.html");
    write_docx(&docx, BODY);

    let mut cfg = Config::default();
    cfg.limits.max_expanded_bytes = 64;
    let adapter = Adapter::from_config(&cfg).unwrap();
    let err = adapter.try_get(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    assert!(err.to_string().contains("expands past"), "{err}");
    assert!(!html.exists());
}

#[test]
fn wrong_extensions_are_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let odt = dir.path().join("in.odt");
    std::fs::write(&odt, "not really").unwrap();
    let docx = dir.path().join("in.docx");
    write_docx(&docx, BODY);

    let adapter = adapter();
    let err = adapter
        .try_get(&odt, &dir.path().join("out.html"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    let err = adapter
        .try_get(&docx, &dir.path().join("out.md"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn corrupt_package_fails_without_leaving_output() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("broken.docx");
    let html = dir.path().join("broken.html");
    std::fs::write(&docx, b"PK\x03\x04 truncated").unwrap();

    let err = adapter().try_get(&docx, &html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    assert!(!html.exists());
}

#[test]
fn oversized_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("in.docx");
    write_docx(&docx, BODY);

    let adapter = Adapter::new(Box::new(NativeEngine::new(&Config::default())), 16);
    let err = adapter
        .try_get(&docx, &dir.path().join("out.html"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
}

#[test]
fn unreadable_html_fails_normalize() {
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("bad.html");
    std::fs::write(&html, [0xff, 0xfe, 0x00, 0x3c]).unwrap();

    let adapter = adapter();
    assert!(!adapter.normalize(&html));
    let err = adapter.try_normalize(&html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
}
