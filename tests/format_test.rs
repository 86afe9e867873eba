//! Per-format output checks, including reading packaged formats back.

use std::io::{Cursor, Read};

use multimark::{Engine, Format, Options};

const SOURCE: &str = "Title: Guide\nAuthor: A\n\n# One\n\nfirst section\n\n## Two\n\nsecond\n";

fn engine() -> Engine {
    Engine::new(SOURCE, Options::standard()).unwrap()
}

fn read_zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn html_with_assets_matches_html_without_assets() {
    // With no assets configured the two HTML formats agree.
    let engine = engine();
    let plain = engine.convert(Format::Html).unwrap();
    let with_assets = engine.convert(Format::HtmlWithAssets).unwrap();
    assert_eq!(plain, with_assets);
}

#[test]
fn latex_family_shares_structure() {
    let engine = engine();
    let latex = engine.convert(Format::Latex).unwrap();
    let memoir = engine.convert(Format::Memoir).unwrap();
    let beamer = engine.convert(Format::Beamer).unwrap();

    assert!(latex.contains("\\documentclass{article}"));
    assert!(memoir.contains("\\documentclass{memoir}"));
    assert!(beamer.contains("\\documentclass{beamer}"));

    assert!(latex.contains("\\section{One}"));
    assert!(memoir.contains("\\chapter{One}"));
    assert!(beamer.contains("\\section{One}"));
}

#[test]
fn opml_contains_nested_outline() {
    let out = engine().convert(Format::Opml).unwrap();
    assert!(out.contains("<opml version=\"1.0\">"));
    assert!(out.contains("outline text=\"One\""));
    assert!(out.contains("outline text=\"Two\""));
}

#[test]
fn fodt_is_flat_xml() {
    let out = engine().convert(Format::Fodt).unwrap();
    assert!(out.starts_with("<?xml"));
    assert!(out.contains("office:document"));
    assert!(out.contains("<text:h text:outline-level=\"1\">One</text:h>"));
}

#[test]
fn odf_package_reads_back() {
    let bytes = engine().convert_bytes(Format::Odf).unwrap();
    let content = read_zip_entry(&bytes, "content.xml");
    assert!(content.contains("office:document-content"));
    assert!(content.contains("One"));
    assert_eq!(
        read_zip_entry(&bytes, "mimetype"),
        "application/vnd.oasis.opendocument.text"
    );
}

#[test]
fn epub_package_reads_back() {
    let bytes = engine().convert_bytes(Format::Epub).unwrap();
    assert_eq!(read_zip_entry(&bytes, "mimetype"), "application/epub+zip");
    let opf = read_zip_entry(&bytes, "OEBPS/content.opf");
    assert!(opf.contains("<dc:title>Guide</dc:title>"));
    assert!(opf.contains("<dc:creator>A</dc:creator>"));
    let xhtml = read_zip_entry(&bytes, "OEBPS/main.xhtml");
    assert!(xhtml.contains("first section"));
}

#[test]
fn textbundle_reads_back() {
    let bytes = engine().convert_bytes(Format::TextBundle).unwrap();
    let info = read_zip_entry(&bytes, "info.json");
    let parsed: serde_json::Value = serde_json::from_str(&info).unwrap();
    assert_eq!(parsed["version"], 2);
    let text = read_zip_entry(&bytes, "text.md");
    assert!(text.contains("# One"));
}

#[test]
fn itmz_reads_back() {
    let bytes = engine().convert_bytes(Format::Itmz).unwrap();
    let xml = read_zip_entry(&bytes, "mapdata.xml");
    assert!(xml.contains("topic text=\"One\""));
}

#[test]
fn mmd_round_trip_preserves_structure() {
    let mmd = engine().convert(Format::Mmd).unwrap();
    let reparsed = Engine::new(&mmd, Options::standard()).unwrap();
    let html_a = engine().convert(Format::Html).unwrap();
    let html_b = reparsed.convert(Format::Html).unwrap();
    assert_eq!(html_a, html_b);
}

#[test]
fn epub_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.epub");
    let bytes = engine().convert_bytes(Format::Epub).unwrap();
    std::fs::write(&path, &bytes).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    assert!(archive.by_name("OEBPS/main.xhtml").is_ok());
}

#[test]
fn opml_import_export_round_trip() {
    let opml = engine().convert(Format::Opml).unwrap();
    let mut options = Options::standard();
    options.parse_opml = true;
    let reimported = Engine::new(&opml, options).unwrap();
    let html = reimported.convert(Format::Html).unwrap();
    assert!(html.contains("One"));
    assert!(html.contains("first section"));
}
