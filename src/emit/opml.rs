//! OPML outline and iThoughts (ITMZ) emitters.
//!
//! Both map the section tree to a nested element structure: `<outline>`
//! elements for OPML, `<topic>` elements inside a zip-packaged
//! `mapdata.xml` for ITMZ. Section body content travels in the `_note` /
//! `note` attribute as markdown text.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;
use crate::inline::plain_text;
use crate::tree::Section;

use super::mmd::blocks_to_markdown;
use super::{EmitContext, Emitter, escape_xml};

/// Emitter for OPML outlines.
#[derive(Debug, Clone, Default)]
pub struct OpmlEmitter;

impl OpmlEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for OpmlEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let xml = render_opml(ctx);
        out.extend_from_slice(xml.as_bytes());
        Ok(())
    }
}

fn render_opml(ctx: &EmitContext) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<opml version=\"1.0\">\n");

    let title = ctx.metadata.get("title").unwrap_or("");
    out.push_str(&format!(
        "<head><title>{}</title></head>\n",
        escape_xml(title)
    ));
    out.push_str("<body>\n");

    if !ctx.document.preamble.is_empty() {
        let note = blocks_to_markdown(&ctx.document.preamble);
        out.push_str(&format!(
            "<outline text=\"\" _note=\"{}\"/>\n",
            escape_attr(&note)
        ));
    }
    for section in &ctx.document.sections {
        write_outline(&mut out, section, 0);
    }

    // Metadata rides along as its own outline so a round trip can
    // restore it.
    if !ctx.metadata.is_empty() {
        out.push_str("<outline text=\"Metadata\">\n");
        for (key, value) in ctx.metadata.iter() {
            out.push_str(&format!(
                "<outline text=\"{}\" _note=\"{}\"/>\n",
                escape_attr(key),
                escape_attr(value)
            ));
        }
        out.push_str("</outline>\n");
    }

    out.push_str("</body>\n</opml>\n");
    out
}

fn write_outline(out: &mut String, section: &Section, depth: usize) {
    let indent = "  ".repeat(depth);
    let text = plain_text(&section.heading);
    let note = blocks_to_markdown(&section.content);

    out.push_str(&format!("{indent}<outline text=\"{}\"", escape_attr(&text)));
    if !note.is_empty() {
        out.push_str(&format!(" _note=\"{}\"", escape_attr(&note)));
    }

    if section.children.is_empty() {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
        for child in &section.children {
            write_outline(out, child, depth + 1);
        }
        out.push_str(&format!("{indent}</outline>\n"));
    }
}

/// Emitter for iThoughts map packages.
#[derive(Debug, Clone, Default)]
pub struct ItmzEmitter;

impl ItmzEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for ItmzEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let xml = render_mapdata(ctx);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("mapdata.xml", options)?;
        zip.write_all(xml.as_bytes())?;
        let cursor = zip.finish()?;
        out.extend_from_slice(&cursor.into_inner());
        Ok(())
    }
}

fn render_mapdata(ctx: &EmitContext) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<itmz version=\"2\">\n<topics>\n");

    // A single root topic titled after the document holds everything.
    let title = ctx.metadata.get("title").unwrap_or("Document");
    out.push_str(&format!("<topic text=\"{}\"", escape_attr(title)));
    let preamble = blocks_to_markdown(&ctx.document.preamble);
    if !preamble.is_empty() {
        out.push_str(&format!(" note=\"{}\"", escape_attr(&preamble)));
    }
    out.push_str(">\n");

    for section in &ctx.document.sections {
        write_topic(&mut out, section);
    }

    out.push_str("</topic>\n</topics>\n</itmz>\n");
    out
}

fn write_topic(out: &mut String, section: &Section) {
    let text = plain_text(&section.heading);
    let note = blocks_to_markdown(&section.content);

    out.push_str(&format!("<topic text=\"{}\"", escape_attr(&text)));
    if !note.is_empty() {
        out.push_str(&format!(" note=\"{}\"", escape_attr(&note)));
    }

    if section.children.is_empty() {
        out.push_str("/>\n");
    } else {
        out.push_str(">\n");
        for child in &section.children {
            write_topic(out, child);
        }
        out.push_str("</topic>\n");
    }
}

/// Escape attribute values; newlines become character references so they
/// survive attribute-value normalization.
fn escape_attr(s: &str) -> String {
    escape_xml(s).replace('\n', "&#10;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::options::{Format, Options};

    #[test]
    fn opml_outline_structure() {
        let out = Engine::new("# One\n\ntext\n\n## Sub\n", Options::new())
            .unwrap()
            .convert(Format::Opml)
            .unwrap();
        assert!(out.starts_with("<?xml"));
        assert!(out.contains("<outline text=\"One\""));
        assert!(out.contains("_note=\"text\""));
        assert!(out.contains("<outline text=\"Sub\""));
    }

    #[test]
    fn opml_metadata_outline() {
        let out = Engine::new("Title: Doc\n\n# H\n", Options::new())
            .unwrap()
            .convert(Format::Opml)
            .unwrap();
        assert!(out.contains("<title>Doc</title>"));
        assert!(out.contains("<outline text=\"Metadata\">"));
        assert!(out.contains("<outline text=\"Title\" _note=\"Doc\"/>"));
    }

    #[test]
    fn opml_escapes_attribute_text() {
        let out = Engine::new("# A & B \"quoted\"\n", Options::new())
            .unwrap()
            .convert(Format::Opml)
            .unwrap();
        assert!(out.contains("A &amp; B &quot;quoted&quot;"));
    }

    #[test]
    fn opml_round_trips_through_import() {
        let source = "# Chapter\n\nBody text.\n\n## Inner\n";
        let opml = Engine::new(source, Options::new())
            .unwrap()
            .convert(Format::Opml)
            .unwrap();
        let markdown = crate::import::opml_to_markdown(&opml);
        assert!(markdown.contains("# Chapter"));
        assert!(markdown.contains("Body text."));
        assert!(markdown.contains("## Inner"));
    }

    #[test]
    fn itmz_is_a_zip_with_mapdata() {
        let bytes = Engine::new("# Idea\n\nnote text\n", Options::new())
            .unwrap()
            .convert_bytes(Format::Itmz)
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("mapdata.xml").unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut file, &mut xml).unwrap();
        assert!(xml.contains("<topic text=\"Idea\""));
        assert!(xml.contains("note text"));
    }
}
