//! HTML emitter.
//!
//! Walks the section tree and serializes to HTML with XML-style void
//! elements (`<br />`, `<hr />`), so the same walker feeds the EPUB
//! emitter's XHTML content documents. The complete-document envelope
//! carries metadata into `<head>`; footnotes and citations collect into
//! end-of-document lists numbered by first reference.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::error::Result;
use crate::inline::{Inline, LinkTarget};
use crate::tree::{Alignment, Block, BlockKind, Section, Table};
use crate::util::Lcg;

use super::{EmitContext, Emitter, Labeler, NoteOrder, escape_xml};

/// Characters percent-encoded inside href/src attributes.
const HREF_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>');

/// Emitter for HTML output.
#[derive(Debug, Clone, Default)]
pub struct HtmlEmitter {
    embed_assets: bool,
}

impl HtmlEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTML with image sources resolved from the options' asset map and
    /// embedded as base64 data URIs.
    pub fn with_embedded_assets() -> Self {
        Self { embed_assets: true }
    }
}

impl Emitter for HtmlEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let html = render_html(ctx, self.embed_assets);
        out.extend_from_slice(html.as_bytes());
        Ok(())
    }
}

/// Render the whole document to an HTML string.
pub(crate) fn render_html(ctx: &EmitContext, embed_assets: bool) -> String {
    let mut writer = HtmlWriter::new(ctx, embed_assets);
    writer.document();
    writer.out
}

/// Render only the document body (no envelope), for XHTML packaging.
pub(crate) fn render_fragment(ctx: &EmitContext, embed_assets: bool) -> String {
    let mut writer = HtmlWriter::new(ctx, embed_assets);
    writer.fragment();
    writer.out
}

struct HtmlWriter<'a> {
    ctx: &'a EmitContext<'a>,
    embed_assets: bool,
    out: String,
    notes: NoteOrder,
    labeler: Labeler,
    /// Anchor ids per footnote/citation number; random when requested.
    footnote_ids: Vec<String>,
    citation_ids: Vec<String>,
}

impl<'a> HtmlWriter<'a> {
    fn new(ctx: &'a EmitContext<'a>, embed_assets: bool) -> Self {
        let notes = NoteOrder::collect(ctx.document);
        let mut rng = ctx.options.random_footnotes.then(|| Lcg::new(ctx.seed));
        let mut make_ids = |count: usize| -> Vec<String> {
            (1..=count)
                .map(|n| match &mut rng {
                    Some(rng) => rng.next_label(),
                    None => n.to_string(),
                })
                .collect()
        };
        let footnote_ids = make_ids(notes.footnotes.len());
        let citation_ids = make_ids(notes.citations.len());
        Self {
            ctx,
            embed_assets,
            out: String::new(),
            labeler: Labeler::new(ctx.options, ctx.seed),
            notes,
            footnote_ids,
            citation_ids,
        }
    }

    fn document(&mut self) {
        let complete = self.ctx.complete();
        if complete {
            self.envelope_open();
        }
        self.fragment();
        if complete {
            self.out.push_str("</body>\n</html>\n");
        }
    }

    fn fragment(&mut self) {
        let doc = self.ctx.document;
        for block in &doc.preamble {
            self.block(block);
        }
        for section in &doc.sections {
            self.section(section);
        }
        self.notes_sections();
    }

    fn envelope_open(&mut self) {
        self.out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        self.out
            .push_str("\t<meta charset=\"utf-8\"/>\n");
        let title = self.ctx.metadata.get("title").unwrap_or("");
        self.out
            .push_str(&format!("\t<title>{}</title>\n", escape_xml(title)));
        if let Some(author) = self.ctx.metadata.get("author") {
            self.out.push_str(&format!(
                "\t<meta name=\"author\" content=\"{}\"/>\n",
                escape_xml(author)
            ));
        }
        if let Some(date) = self.ctx.metadata.get("date") {
            self.out.push_str(&format!(
                "\t<meta name=\"date\" content=\"{}\"/>\n",
                escape_xml(date)
            ));
        }
        if let Some(css) = self.ctx.metadata.get("css") {
            self.out.push_str(&format!(
                "\t<link type=\"text/css\" rel=\"stylesheet\" href=\"{}\"/>\n",
                escape_xml(css)
            ));
        }
        self.out.push_str("</head>\n<body>\n");
    }

    fn section(&mut self, section: &Section) {
        let level = self.ctx.heading_level(section.level);
        let label = self.labeler.label_for(section);
        match label {
            Some(id) => self.out.push_str(&format!("<h{level} id=\"{id}\">")),
            None => self.out.push_str(&format!("<h{level}>")),
        }
        self.inlines(&section.heading);
        self.out.push_str(&format!("</h{level}>\n\n"));

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
                self.out.push_str("<p>");
                self.inlines(content);
                self.out.push_str("</p>\n\n");
            }
            BlockKind::Heading { level, content, .. } => {
                let level = self.ctx.heading_level(*level);
                self.out.push_str(&format!("<h{level}>"));
                self.inlines(content);
                self.out.push_str(&format!("</h{level}>\n\n"));
            }
            BlockKind::CodeBlock { language, code } => {
                match language {
                    Some(lang) => self.out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_xml(lang)
                    )),
                    None => self.out.push_str("<pre><code>"),
                }
                self.out.push_str(&escape_xml(code));
                self.out.push_str("\n</code></pre>\n\n");
            }
            BlockKind::BlockQuote { content } => {
                self.out.push_str("<blockquote>\n");
                for inner in content {
                    self.block(inner);
                }
                self.out.push_str("</blockquote>\n\n");
            }
            BlockKind::List {
                ordered,
                tight,
                items,
            } => {
                let tag = if *ordered { "ol" } else { "ul" };
                self.out.push_str(&format!("<{tag}>\n"));
                for item in items {
                    self.out.push_str("<li>");
                    self.list_item(item, *tight);
                    self.out.push_str("</li>\n");
                }
                self.out.push_str(&format!("</{tag}>\n\n"));
            }
            BlockKind::Table(table) => self.table(table),
            BlockKind::Rule => self.out.push_str("<hr />\n\n"),
            BlockKind::RawHtml { html, processed } => match processed {
                Some(content) => {
                    self.inlines(content);
                    self.out.push_str("\n\n");
                }
                None => {
                    self.out.push_str(html);
                    self.out.push_str("\n\n");
                }
            },
        }
    }

    /// Tight list items drop the paragraph wrapper around their single
    /// paragraph.
    fn list_item(&mut self, item: &[Block], tight: bool) {
        if tight && item.len() == 1
            && let BlockKind::Paragraph { content } = &item[0].kind
        {
            self.inlines(content);
            return;
        }
        for block in item {
            self.block(block);
        }
    }

    fn table(&mut self, table: &Table) {
        self.out.push_str("<table>\n");
        if !table.header.is_empty() {
            self.out.push_str("<thead>\n");
            for row in &table.header {
                self.table_row(row, "th", &table.alignments);
            }
            self.out.push_str("</thead>\n");
        }
        if !table.rows.is_empty() {
            self.out.push_str("<tbody>\n");
            for row in &table.rows {
                self.table_row(row, "td", &table.alignments);
            }
            self.out.push_str("</tbody>\n");
        }
        self.out.push_str("</table>\n\n");
    }

    fn table_row(&mut self, row: &[Vec<Inline>], tag: &str, alignments: &[Alignment]) {
        self.out.push_str("<tr>\n");
        for (i, cell) in row.iter().enumerate() {
            let align = alignments.get(i).copied().unwrap_or_default();
            match align {
                Alignment::Left => self.out.push_str(&format!("\t<{tag}>")),
                Alignment::Center => self
                    .out
                    .push_str(&format!("\t<{tag} style=\"text-align:center;\">")),
                Alignment::Right => self
                    .out
                    .push_str(&format!("\t<{tag} style=\"text-align:right;\">")),
            }
            self.inlines(cell);
            self.out.push_str(&format!("</{tag}>\n"));
        }
        self.out.push_str("</tr>\n");
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
                self.out.push_str("<code>");
                self.out.push_str(&escape_xml(code));
                self.out.push_str("</code>");
            }
            Inline::Emphasis(children) => {
                self.out.push_str("<em>");
                self.inlines(children);
                self.out.push_str("</em>");
            }
            Inline::Strong(children) => {
                self.out.push_str("<strong>");
                self.inlines(children);
                self.out.push_str("</strong>");
            }
            Inline::Link { content, target } => self.link(content, target),
            Inline::Image { alt, target } => self.image(alt, target),
            Inline::FootnoteRef { key } => self.footnote_ref(key),
            Inline::CitationRef { key } => self.citation_ref(key),
            Inline::CriticInsert(children) => {
                self.out.push_str("<ins>");
                self.inlines(children);
                self.out.push_str("</ins>");
            }
            Inline::CriticDelete(children) => {
                self.out.push_str("<del>");
                self.inlines(children);
                self.out.push_str("</del>");
            }
            Inline::CriticHighlight(children) => {
                self.out.push_str("<mark>");
                self.inlines(children);
                self.out.push_str("</mark>");
            }
            Inline::CriticComment(text) => {
                self.out.push_str("<span class=\"critic comment\">");
                self.out.push_str(&escape_xml(text));
                self.out.push_str("</span>");
            }
            Inline::LineBreak => self.out.push_str("<br />\n"),
            Inline::RawHtml(html) => self.out.push_str(html),
        }
    }

    fn link(&mut self, content: &[Inline], target: &LinkTarget) {
        let resolved = match target {
            LinkTarget::Inline { url, title } => Some((url.clone(), title.clone())),
            LinkTarget::Reference { key } => self
                .ctx
                .resolve_link(key)
                .map(|def| (def.url.clone(), def.title.clone())),
        };

        let Some((url, title)) = resolved else {
            // Unresolved reference renders as its literal source text.
            let LinkTarget::Reference { key } = target else {
                unreachable!("inline targets always resolve");
            };
            self.out.push('[');
            self.inlines(content);
            self.out.push(']');
            let text = crate::inline::plain_text(content);
            if text != *key {
                self.out.push('[');
                self.out.push_str(&escape_xml(key));
                self.out.push(']');
            }
            return;
        };

        if self.ctx.options.obfuscate && url.starts_with("mailto:") {
            self.obfuscated_mailto(&url, content);
            return;
        }

        self.out.push_str(&format!(
            "<a href=\"{}\"",
            utf8_percent_encode(&escape_xml(&url), HREF_ESCAPE)
        ));
        if let Some(title) = title {
            self.out
                .push_str(&format!(" title=\"{}\"", escape_xml(&title)));
        }
        self.out.push('>');
        self.inlines(content);
        self.out.push_str("</a>");
    }

    /// Entity-encode a mailto link so address harvesters can't read it.
    fn obfuscated_mailto(&mut self, url: &str, content: &[Inline]) {
        let mut href = String::new();
        for c in url.chars() {
            href.push_str(&format!("&#{};", c as u32));
        }
        self.out.push_str(&format!("<a href=\"{href}\">"));
        let text = crate::inline::plain_text(content);
        for c in text.chars() {
            self.out.push_str(&format!("&#{};", c as u32));
        }
        self.out.push_str("</a>");
    }

    fn image(&mut self, alt: &str, target: &LinkTarget) {
        let resolved = match target {
            LinkTarget::Inline { url, title } => Some((url.clone(), title.clone())),
            LinkTarget::Reference { key } => self
                .ctx
                .resolve_link(key)
                .map(|def| (def.url.clone(), def.title.clone())),
        };

        let Some((url, title)) = resolved else {
            let LinkTarget::Reference { key } = target else {
                unreachable!("inline targets always resolve");
            };
            self.out
                .push_str(&format!("![{}][{}]", escape_xml(alt), escape_xml(key)));
            return;
        };

        let src = if self.embed_assets
            && let Some(data) = self.ctx.options.assets.get(&url)
        {
            format!(
                "data:{};base64,{}",
                asset_media_type(&url),
                BASE64.encode(data)
            )
        } else {
            utf8_percent_encode(&escape_xml(&url), HREF_ESCAPE).to_string()
        };

        self.out
            .push_str(&format!("<img src=\"{}\" alt=\"{}\"", src, escape_xml(alt)));
        if let Some(title) = title {
            self.out
                .push_str(&format!(" title=\"{}\"", escape_xml(&title)));
        }
        self.out.push_str(" />");
    }

    fn footnote_ref(&mut self, key: &str) {
        match self.notes.footnote_number(key) {
            Some(n) => {
                let id = self.footnote_ids[n - 1].clone();
                self.out.push_str(&format!(
                    "<a href=\"#fn:{id}\" id=\"fnref:{id}\" class=\"footnote\">[{n}]</a>"
                ));
            }
            None => {
                self.out
                    .push_str(&format!("[^{}]", escape_xml(key)));
            }
        }
    }

    fn citation_ref(&mut self, key: &str) {
        match self.notes.citation_number(key) {
            Some(n) => {
                let id = self.citation_ids[n - 1].clone();
                self.out.push_str(&format!(
                    "<a href=\"#cite:{id}\" id=\"citeref:{id}\" class=\"citation\">[{n}]</a>"
                ));
            }
            None => {
                self.out
                    .push_str(&format!("[#{}]", escape_xml(key)));
            }
        }
    }

    /// Footnote and citation lists at the end of the document.
    fn notes_sections(&mut self) {
        let doc = self.ctx.document;

        if !self.notes.footnotes.is_empty() {
            self.out.push_str("<div class=\"footnotes\">\n<hr />\n<ol>\n");
            let keys = self.notes.footnotes.clone();
            for (i, key) in keys.iter().enumerate() {
                let id = self.footnote_ids[i].clone();
                self.out.push_str(&format!("<li id=\"fn:{id}\">\n"));
                if let Some(blocks) = doc.footnotes.get(key) {
                    for block in blocks {
                        self.block(block);
                    }
                }
                self.out.push_str(&format!(
                    "<a href=\"#fnref:{id}\" class=\"reversefootnote\">&#8617;</a>\n</li>\n"
                ));
            }
            self.out.push_str("</ol>\n</div>\n");
        }

        if !self.notes.citations.is_empty() {
            self.out
                .push_str("<div class=\"citations\">\n<hr />\n<ol>\n");
            let keys = self.notes.citations.clone();
            for (i, key) in keys.iter().enumerate() {
                let id = self.citation_ids[i].clone();
                self.out.push_str(&format!("<li id=\"cite:{id}\">\n"));
                if let Some(content) = doc.citations.get(key) {
                    self.inlines(content);
                }
                self.out.push_str("\n</li>\n");
            }
            self.out.push_str("</ol>\n</div>\n");
        }
    }
}

/// Media type for a data URI, guessed from the asset name.
fn asset_media_type(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::options::{Format, Options};

    fn html(source: &str, options: Options) -> String {
        Engine::new(source, options)
            .unwrap()
            .convert(Format::Html)
            .unwrap()
    }

    #[test]
    fn heading_and_paragraph() {
        let out = html("# Header\ntext", Options::new());
        assert!(out.contains("<h1 id=\"header\">Header</h1>"));
        assert!(out.contains("</h1>"));
        assert!(out.contains("<p>text</p>"));
    }

    #[test]
    fn snippet_lacks_envelope() {
        let out = html("abc", Options::new());
        assert!(!out.contains("<html"));
        assert!(out.contains("<p>abc</p>"));
    }

    #[test]
    fn complete_has_envelope() {
        let out = html("abc", Options::new().with_complete());
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<html"));
        assert!(out.contains("</html>"));
    }

    #[test]
    fn metadata_title_in_head() {
        let out = html("Title: My Doc\n\n# H\n", Options::new());
        assert!(out.contains("<title>My Doc</title>"));
        assert!(out.contains("<html"));
    }

    #[test]
    fn text_is_escaped() {
        let out = html("a < b & c\n", Options::new());
        assert!(out.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn footnotes_numbered_by_reference_order() {
        let out = html(
            "See [^b] and [^a].\n\n[^a]: Second note\n[^b]: First note\n",
            Options::standard().with_snippet(),
        );
        assert!(out.contains("href=\"#fn:1\""));
        assert!(out.contains("[1]"));
        let first = out.find("First note").unwrap();
        let second = out.find("Second note").unwrap();
        assert!(first < second);
    }

    #[test]
    fn unresolved_footnote_renders_literally() {
        let out = html("See [^missing].\n", Options::standard());
        assert!(out.contains("[^missing]"));
        assert!(!out.contains("href=\"#fn:"));
    }

    #[test]
    fn unresolved_link_reference_renders_literally() {
        let out = html("See [text][nowhere].\n", Options::new());
        assert!(out.contains("[text][nowhere]"));
    }

    #[test]
    fn resolved_reference_link() {
        let out = html(
            "See [text][site].\n\n[site]: https://example.com \"Example\"\n",
            Options::new(),
        );
        assert!(out.contains("<a href=\"https://example.com\" title=\"Example\">text</a>"));
    }

    #[test]
    fn obfuscated_email() {
        let mut options = Options::new();
        options.obfuscate = true;
        let out = html("Mail <someone@example.com>.\n", options);
        assert!(!out.contains("someone@example.com"));
        assert!(out.contains("&#109;&#97;&#105;&#108;&#116;&#111;&#58;"));
    }

    #[test]
    fn unobfuscated_email_without_option() {
        let out = html("Mail <someone@example.com>.\n", Options::new());
        assert!(out.contains("mailto:someone@example.com"));
    }

    #[test]
    fn table_alignment_styles() {
        let out = html(
            "| a | b |\n|:-:|--:|\n| 1 | 2 |\n",
            Options::new(),
        );
        assert!(out.contains("<th style=\"text-align:center;\">a</th>"));
        assert!(out.contains("<td style=\"text-align:right;\">2</td>"));
    }

    #[test]
    fn tight_list_omits_paragraphs() {
        let out = html("- one\n- two\n", Options::new());
        assert!(out.contains("<li>one</li>"));
        assert!(!out.contains("<li><p>"));
    }

    #[test]
    fn no_labels_option_drops_heading_ids() {
        let mut options = Options::new();
        options.no_labels = true;
        let out = html("# Header\n", options);
        assert!(out.contains("<h1>Header</h1>"));
        assert!(!out.contains("id=\"header\""));
    }

    #[test]
    fn base_header_level_shifts_headings() {
        let out = html(
            "Base Header Level: 2\n\n# Top\n",
            Options::new().with_snippet(),
        );
        assert!(out.contains("<h2"));
        assert!(!out.contains("<h1"));
    }

    #[test]
    fn embedded_asset_data_uri() {
        let mut options = Options::new();
        options
            .assets
            .insert("logo.png".to_string(), vec![1, 2, 3]);
        let out = Engine::new("![logo](logo.png)\n", options)
            .unwrap()
            .convert(Format::HtmlWithAssets)
            .unwrap();
        assert!(out.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn plain_html_leaves_asset_reference() {
        let out = html("![logo](logo.png)\n", Options::new());
        assert!(out.contains("src=\"logo.png\""));
    }

    #[test]
    fn raw_html_block_passes_through() {
        let out = html("<div class=\"x\">\nraw\n</div>\n", Options::new());
        assert!(out.contains("<div class=\"x\">"));
    }

    #[test]
    fn critic_markup_renders_as_edit_tags() {
        let out = html(
            "{++added++} {--removed--} {==marked==}\n",
            Options::new().with_critic(),
        );
        assert!(out.contains("<ins>added</ins>"));
        assert!(out.contains("<del>removed</del>"));
        assert!(out.contains("<mark>marked</mark>"));
    }
}
