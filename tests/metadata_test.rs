//! Metadata extraction contract tests.

use multimark::{Engine, Format, Options, extract_metadata};

#[test]
fn key_lookup_is_case_and_whitespace_invariant() {
    let meta = extract_metadata("Author: A\n\nbody", &Options::new());
    assert_eq!(meta.get("Author"), Some("A"));
    assert_eq!(meta.get("author"), Some("A"));
    assert_eq!(meta.get(" AU thor "), Some("A"));
}

#[test]
fn values_keep_internal_whitespace() {
    let meta = extract_metadata("Title: A  Spaced   Title\n\nbody", &Options::new());
    assert_eq!(meta.get("title"), Some("A  Spaced   Title"));
}

#[test]
fn continuation_lines_append_with_single_space() {
    let meta = extract_metadata(
        "Abstract: line one\n    line two\n\tline three\n\nbody",
        &Options::new(),
    );
    assert_eq!(meta.get("abstract"), Some("line one line two line three"));
}

#[test]
fn duplicate_normalized_keys_last_wins() {
    let meta = extract_metadata("Author: first\nAU THOR: second\n\nbody", &Options::new());
    assert_eq!(meta.get("author"), Some("second"));
    assert_eq!(meta.len(), 1);
}

#[test]
fn stripping_metadata_is_structurally_idempotent() {
    let source = "Author: A\nDate: D\n---\n# Book\n\ntext\n";
    let engine = Engine::new(source, Options::new()).unwrap();
    assert_eq!(engine.metadata().len(), 2);

    // Re-extracting from the round-tripped body yields nothing new:
    // convert to mmd, strip the re-emitted block, extract again.
    let mmd = engine.convert(Format::Mmd).unwrap();
    let body_start = mmd.find("# Book").unwrap();
    let body = &mmd[body_start..];
    let again = extract_metadata(body, &Options::new());
    assert!(again.is_empty());
}

#[test]
fn no_metadata_option_treats_header_as_body() {
    let mut options = Options::new();
    options.no_metadata = true;
    let engine = Engine::new("Title: T\n\nbody\n", options).unwrap();
    assert!(engine.metadata().is_empty());
    let html = engine.convert(Format::Html).unwrap();
    assert!(html.contains("Title: T"));
}

#[test]
fn malformed_header_line_ends_the_block() {
    let meta = extract_metadata("Title: T\njust a sentence here\n\nbody", &Options::new());
    assert_eq!(meta.get("title"), Some("T"));
    assert_eq!(meta.len(), 1);
}

#[test]
fn metadata_feeds_the_html_head() {
    let source = "Title: Doc Title\nAuthor: Someone\n\n# H\n";
    let html = Engine::new(source, Options::new())
        .unwrap()
        .convert(Format::Html)
        .unwrap();
    assert!(html.contains("<title>Doc Title</title>"));
    assert!(html.contains("content=\"Someone\""));
}

#[test]
fn metadata_reemitted_by_mmd_in_original_order() {
    let source = "Title: T\nAuthor: A\nDate: D\n\nbody\n";
    let mmd = Engine::new(source, Options::new())
        .unwrap()
        .convert(Format::Mmd)
        .unwrap();
    assert!(mmd.starts_with("Title: T\nAuthor: A\nDate: D\n"));
}
