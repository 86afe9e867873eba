//! OpenDocument text emitters: flat FODT and the zip-packaged ODF form.
//!
//! Both share one body walker; FODT wraps it in a single flat
//! `office:document`, while ODF packages `content.xml` with the `mimetype`
//! entry stored first. Footnotes and citations become inline `text:note`
//! elements (footnote / endnote classes), so no end-of-document list is
//! needed.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;
use crate::inline::{Inline, LinkTarget};
use crate::tree::{Block, BlockKind, Section, Table};

use super::{EmitContext, Emitter, NoteOrder, escape_xml};

const OFFICE_NS: &str = concat!(
    " xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\"",
    " xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\"",
    " xmlns:table=\"urn:oasis:names:tc:opendocument:xmlns:table:1.0\"",
    " xmlns:xlink=\"http://www.w3.org/1999/xlink\"",
    " xmlns:dc=\"http://purl.org/dc/elements/1.1/\"",
    " office:version=\"1.2\""
);

/// Emitter for flat OpenDocument text (single XML file).
#[derive(Debug, Clone, Default)]
pub struct FodtEmitter;

impl FodtEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for FodtEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<office:document{OFFICE_NS} office:mimetype=\"application/vnd.oasis.opendocument.text\">\n"
        ));
        xml.push_str(&render_meta(ctx));
        xml.push_str(&render_body(ctx));
        xml.push_str("</office:document>\n");
        out.extend_from_slice(xml.as_bytes());
        Ok(())
    }
}

/// Emitter for packaged OpenDocument text (zip).
#[derive(Debug, Clone, Default)]
pub struct OdfEmitter;

impl OdfEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for OdfEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let mut content = String::new();
        content.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        content.push_str(&format!("<office:document-content{OFFICE_NS}>\n"));
        content.push_str(&render_body(ctx));
        content.push_str("</office:document-content>\n");

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // The mimetype entry must be first and uncompressed.
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/vnd.oasis.opendocument.text")?;

        zip.start_file("META-INF/manifest.xml", deflated)?;
        zip.write_all(MANIFEST_XML.as_bytes())?;

        zip.start_file("content.xml", deflated)?;
        zip.write_all(content.as_bytes())?;

        let cursor = zip.finish()?;
        out.extend_from_slice(&cursor.into_inner());
        Ok(())
    }
}

const MANIFEST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
  <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/>
  <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#;

fn render_meta(ctx: &EmitContext) -> String {
    let mut out = String::from("<office:meta>\n");
    if let Some(title) = ctx.metadata.get("title") {
        out.push_str(&format!("<dc:title>{}</dc:title>\n", escape_xml(title)));
    }
    if let Some(author) = ctx.metadata.get("author") {
        out.push_str(&format!("<dc:creator>{}</dc:creator>\n", escape_xml(author)));
    }
    if let Some(date) = ctx.metadata.get("date") {
        out.push_str(&format!("<dc:date>{}</dc:date>\n", escape_xml(date)));
    }
    out.push_str("</office:meta>\n");
    out
}

fn render_body(ctx: &EmitContext) -> String {
    let mut writer = OdfWriter {
        ctx,
        notes: NoteOrder::collect(ctx.document),
        out: String::new(),
    };
    writer.out.push_str("<office:body>\n<office:text>\n");
    let doc = ctx.document;
    for block in &doc.preamble {
        writer.block(block);
    }
    for section in &doc.sections {
        writer.section(section);
    }
    writer.out.push_str("</office:text>\n</office:body>\n");
    writer.out
}

struct OdfWriter<'a> {
    ctx: &'a EmitContext<'a>,
    notes: NoteOrder,
    out: String,
}

impl<'a> OdfWriter<'a> {
    fn section(&mut self, section: &Section) {
        let level = self.ctx.heading_level(section.level);
        self.out
            .push_str(&format!("<text:h text:outline-level=\"{level}\">"));
        self.inlines(&section.heading);
        self.out.push_str("</text:h>\n");
        for block in &section.content {
            self.block(block);
        }
        for child in &section.children {
            self.section(child);
        }
    }

    fn block(&mut self, block: &Block) {
        match &block.kind {
            BlockKind::Paragraph { content } => {
                self.out.push_str("<text:p>");
                self.inlines(content);
                self.out.push_str("</text:p>\n");
            }
            BlockKind::Heading { level, content, .. } => {
                let level = self.ctx.heading_level(*level);
                self.out
                    .push_str(&format!("<text:h text:outline-level=\"{level}\">"));
                self.inlines(content);
                self.out.push_str("</text:h>\n");
            }
            BlockKind::CodeBlock { code, .. } => {
                for line in code.split('\n') {
                    self.out
                        .push_str("<text:p text:style-name=\"Preformatted_20_Text\">");
                    self.out.push_str(&escape_xml(line));
                    self.out.push_str("</text:p>\n");
                }
            }
            BlockKind::BlockQuote { content } => {
                // ODF has no quote container; the Quotations style marks it.
                for inner in content {
                    if let BlockKind::Paragraph { content } = &inner.kind {
                        self.out
                            .push_str("<text:p text:style-name=\"Quotations\">");
                        self.inlines(content);
                        self.out.push_str("</text:p>\n");
                    } else {
                        self.block(inner);
                    }
                }
            }
            BlockKind::List { ordered, items, .. } => {
                let style = if *ordered { "Numbering_20_123" } else { "List_20_Bullet" };
                self.out
                    .push_str(&format!("<text:list text:style-name=\"{style}\">\n"));
                for item in items {
                    self.out.push_str("<text:list-item>\n");
                    for inner in item {
                        self.block(inner);
                    }
                    self.out.push_str("</text:list-item>\n");
                }
                self.out.push_str("</text:list>\n");
            }
            BlockKind::Table(table) => self.table(table),
            BlockKind::Rule => {
                self.out
                    .push_str("<text:p text:style-name=\"Horizontal_20_Line\"/>\n");
            }
            // Raw HTML has no ODF rendering.
            BlockKind::RawHtml { .. } => {}
        }
    }

    fn table(&mut self, table: &Table) {
        self.out.push_str("<table:table>\n");
        for row in table.header.iter().chain(table.rows.iter()) {
            self.out.push_str("<table:table-row>\n");
            for cell in row {
                self.out.push_str("<table:table-cell><text:p>");
                self.inlines(cell);
                self.out.push_str("</text:p></table:table-cell>\n");
            }
            self.out.push_str("</table:table-row>\n");
        }
        self.out.push_str("</table:table>\n");
    }

    fn inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.inline(inline);
        }
    }

    fn inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => self.out.push_str(&escape_xml(text)),
            Inline::Entity(entity) => self.out.push_str(entity),
            Inline::Code(code) => {
                self.span("Source_20_Text", &[Inline::Text(code.clone())]);
            }
            Inline::Emphasis(children) => self.span("Emphasis", children),
            Inline::Strong(children) => self.span("Strong_20_Emphasis", children),
            Inline::Link { content, target } => {
                let url = match target {
                    LinkTarget::Inline { url, .. } => Some(url.clone()),
                    LinkTarget::Reference { key } => {
                        self.ctx.resolve_link(key).map(|def| def.url.clone())
                    }
                };
                match url {
                    Some(url) => {
                        self.out.push_str(&format!(
                            "<text:a xlink:type=\"simple\" xlink:href=\"{}\">",
                            escape_xml(&url)
                        ));
                        self.inlines(content);
                        self.out.push_str("</text:a>");
                    }
                    None => {
                        self.out.push('[');
                        self.inlines(content);
                        self.out.push(']');
                    }
                }
            }
            Inline::Image { alt, .. } => {
                // Without a package to carry the bits, images degrade to
                // their alt text.
                self.out.push_str(&escape_xml(alt));
            }
            Inline::FootnoteRef { key } => self.note(key, "footnote"),
            Inline::CitationRef { key } => self.citation(key),
            Inline::CriticInsert(children) => self.span("Insertion", children),
            Inline::CriticDelete(children) => self.span("Deletion", children),
            Inline::CriticHighlight(children) => self.span("Highlight", children),
            Inline::CriticComment(_) => {}
            Inline::LineBreak => self.out.push_str("<text:line-break/>"),
            // Raw HTML has no ODF rendering.
            Inline::RawHtml(_) => {}
        }
    }

    fn span(&mut self, style: &str, children: &[Inline]) {
        self.out
            .push_str(&format!("<text:span text:style-name=\"{style}\">"));
        self.inlines(children);
        self.out.push_str("</text:span>");
    }

    fn note(&mut self, key: &str, class: &str) {
        let Some(number) = self.notes.footnote_number(key) else {
            self.out.push_str(&escape_xml(&format!("[^{key}]")));
            return;
        };
        self.out.push_str(&format!(
            "<text:note text:note-class=\"{class}\" text:id=\"fn{number}\">\
             <text:note-citation>{number}</text:note-citation><text:note-body>"
        ));
        if let Some(blocks) = self.ctx.document.footnotes.get(key) {
            for block in blocks {
                if let BlockKind::Paragraph { content } = &block.kind {
                    self.out.push_str("<text:p>");
                    self.inlines(content);
                    self.out.push_str("</text:p>");
                }
            }
        }
        self.out.push_str("</text:note-body></text:note>");
    }

    fn citation(&mut self, key: &str) {
        let Some(number) = self.notes.citation_number(key) else {
            self.out.push_str(&escape_xml(&format!("[#{key}]")));
            return;
        };
        self.out.push_str(&format!(
            "<text:note text:note-class=\"endnote\" text:id=\"cite{number}\">\
             <text:note-citation>{number}</text:note-citation><text:note-body>"
        ));
        if let Some(content) = self.ctx.document.citations.get(key) {
            self.out.push_str("<text:p>");
            self.inlines(content);
            self.out.push_str("</text:p>");
        }
        self.out.push_str("</text:note-body></text:note>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::options::{Format, Options};

    #[test]
    fn fodt_document_structure() {
        let out = Engine::new("Title: Doc\n\n# Header\n\ntext\n", Options::new())
            .unwrap()
            .convert(Format::Fodt)
            .unwrap();
        assert!(out.contains("office:mimetype=\"application/vnd.oasis.opendocument.text\""));
        assert!(out.contains("<dc:title>Doc</dc:title>"));
        assert!(out.contains("<text:h text:outline-level=\"1\">Header</text:h>"));
        assert!(out.contains("<text:p>text</text:p>"));
    }

    #[test]
    fn fodt_footnote_inline() {
        let out = Engine::new(
            "Fact.[^a]\n\n[^a]: The note.\n",
            Options::standard().with_snippet(),
        )
        .unwrap()
        .convert(Format::Fodt)
        .unwrap();
        assert!(out.contains("text:note-class=\"footnote\""));
        assert!(out.contains("The note."));
    }

    #[test]
    fn odf_package_layout() {
        let bytes = Engine::new("# Header\n", Options::new())
            .unwrap()
            .convert_bytes(Format::Odf)
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        // mimetype must be the first entry.
        assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
        assert!(archive.by_name("content.xml").is_ok());
        assert!(archive.by_name("META-INF/manifest.xml").is_ok());
    }

    #[test]
    fn odf_surfaces_as_not_utf8_through_convert() {
        let result = Engine::new("# H\n", Options::new())
            .unwrap()
            .convert(Format::Odf);
        // A zip almost never decodes as UTF-8; either way the bytes path
        // is the supported one.
        if let Err(e) = result {
            assert!(matches!(e, crate::error::Error::OutputNotUtf8));
        }
    }
}
