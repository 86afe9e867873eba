//! End-to-end conversion tests over the public API.
//!
//! Exercises the contract properties: determinism, envelope behavior,
//! graceful degradation on unresolved references, and the format scenarios
//! from the design contract.

use multimark::{Engine, Format, Options, convert};

const MANUAL: &str = include_str!("fixtures/manual.txt");

// ============================================================================
// Pure-function properties
// ============================================================================

#[test]
fn conversion_is_deterministic() {
    let options = Options::standard();
    for format in [Format::Html, Format::Latex] {
        let a = convert(MANUAL, format, &options).unwrap();
        let b = convert(MANUAL, format, &options).unwrap();
        assert_eq!(a, b, "{} output differs between runs", format.name());
    }
}

#[test]
fn independent_engines_do_not_interfere() {
    let one = Engine::new("# One\n", Options::new()).unwrap();
    let two = Engine::new("# Two\n", Options::new()).unwrap();
    assert!(one.convert(Format::Html).unwrap().contains("One"));
    assert!(two.convert(Format::Html).unwrap().contains("Two"));
}

// ============================================================================
// Envelope behavior
// ============================================================================

#[test]
fn complete_option_adds_html_envelope() {
    let options = Options::new().with_complete();
    let out = convert("abc", Format::Html, &options).unwrap();
    assert!(out.contains("<html"));

    let out = convert("abc", Format::Html, &Options::new()).unwrap();
    assert!(!out.contains("<html"));
}

#[test]
fn complete_and_snippet_resolve_to_complete() {
    let options = Options::new().with_complete().with_snippet();
    let out = convert("abc", Format::Html, &options).unwrap();
    assert!(out.contains("<html"));
}

#[test]
fn latex_envelope_markers() {
    let complete = convert("# H\n", Format::Latex, &Options::new().with_complete()).unwrap();
    assert!(complete.contains("\\documentclass"));

    let snippet = convert("# H\n", Format::Latex, &Options::new().with_snippet()).unwrap();
    assert!(!snippet.contains("\\documentclass"));
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn heading_renders_in_both_families() {
    let html = convert("# Header\ntext", Format::Html, &Options::new()).unwrap();
    assert!(html.contains("</h1>"));

    let latex = convert("# Header\ntext", Format::Latex, &Options::new()).unwrap();
    assert!(latex.contains("\\section{Header}"));
}

#[test]
fn front_matter_scenario() {
    let source = "Author: A\nDate: D\n---\n# Book";
    let engine = Engine::new(source, Options::new()).unwrap();
    assert_eq!(engine.metadata().get("author"), Some("A"));
    assert_eq!(engine.metadata().get("date"), Some("D"));

    let html = engine.convert(Format::Html).unwrap();
    assert!(html.contains("Book</h1>"));
    // The metadata lines must not leak into the body.
    assert!(!html.contains("<p>Author"));
}

#[test]
fn unresolved_footnote_is_not_a_crash() {
    let out = convert("ref [^missing] here\n", Format::Html, &Options::standard()).unwrap();
    assert!(out.contains("[^missing]"));
}

#[test]
fn manual_converts_to_every_format() {
    let engine = Engine::new(MANUAL, Options::standard()).unwrap();
    for format in Format::ALL {
        let bytes = engine.convert_bytes(format).unwrap();
        assert!(
            !bytes.is_empty(),
            "{} produced empty output",
            format.name()
        );
    }
}

#[test]
fn binary_formats_fail_convert_with_not_utf8() {
    let engine = Engine::new(MANUAL, Options::standard()).unwrap();
    let err = engine.convert(Format::Epub).unwrap_err();
    assert!(matches!(err, multimark::Error::OutputNotUtf8));
}

#[test]
fn manual_html_spot_checks() {
    let html = Engine::new(MANUAL, Options::standard())
        .unwrap()
        .convert(Format::Html)
        .unwrap();

    // Metadata-bearing document renders complete by default.
    assert!(html.contains("<html"));
    assert!(html.contains("<title>The Field Guide</title>"));

    // Structure
    assert!(html.contains("Introduction</h1>"));
    assert!(html.contains("Capturing Notes</h2>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<pre><code class=\"language-rust\">"));

    // Smart typography
    assert!(html.contains("\u{201C}smart\u{201D}"));
    assert!(html.contains('\u{2026}'));

    // References
    assert!(html.contains("class=\"footnote\""));
    assert!(html.contains("https://example.com/archive"));

    // Manual heading label
    assert!(html.contains("id=\"appendix\""));
}

#[test]
fn compatibility_mode_disables_extensions() {
    let mut options = Options::standard();
    options.compatibility = true;
    let source = "Title: T\n\n| a |\n|---|\n| 1 |\n\nfact[^x]\n\n[^x]: note\n";
    let html = convert(source, Format::Html, &options).unwrap();
    assert!(!html.contains("<table>"));
    assert!(!html.contains("class=\"footnote\""));
    // Metadata is off too, so the first line is body text.
    assert!(html.contains("Title: T"));
}

#[test]
fn version_looks_like_semver() {
    let version = multimark::version();
    assert_eq!(version.split('.').count(), 3);
}

#[test]
fn legacy_format_codes_cover_all_formats() {
    for (i, format) in Format::ALL.iter().enumerate() {
        assert_eq!(format.legacy_code(), i as i16);
        assert_eq!(Format::from_legacy_code(i as i16), Some(*format));
    }
}
