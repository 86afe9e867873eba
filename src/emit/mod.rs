//! Emitters: serialize a built document to one output format.
//!
//! Each emitter implements [`Emitter`] over a shared [`EmitContext`] and
//! must be total: no document crashes an emitter, and unresolved references
//! render as their literal source text. Configuration is held in the
//! emitter struct; `emit` writes into a byte buffer so text formats and
//! zip-packaged formats share one interface.

use std::collections::HashSet;

use crate::error::Result;
use crate::inline::{Inline, plain_text};
use crate::metadata::Metadata;
use crate::options::{Format, Options};
use crate::tree::{Block, BlockKind, Document, LinkDef, Section};
use crate::util::Lcg;

mod bundle;
mod html;
mod latex;
mod mmd;
mod odf;
mod opml;

pub use bundle::{EpubEmitter, TextBundleEmitter};
pub use html::HtmlEmitter;
pub use latex::{LatexEmitter, LatexFlavor};
pub use mmd::MmdEmitter;
pub use odf::{FodtEmitter, OdfEmitter};
pub use opml::{ItmzEmitter, OpmlEmitter};

/// Everything an emitter needs for one conversion.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub document: &'a Document,
    pub metadata: &'a Metadata,
    pub options: &'a Options,
    /// Seed for pseudo-random footnote anchors and heading labels.
    pub seed: u64,
}

impl<'a> EmitContext<'a> {
    /// Resolved complete-vs-snippet intent for this document.
    pub fn complete(&self) -> bool {
        self.options.effective_complete(!self.metadata.is_empty())
    }

    /// Heading level offset from the `Base Header Level` metadata key.
    pub fn heading_offset(&self) -> i32 {
        self.metadata
            .get("baseheaderlevel")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(|base| base - 1)
            .unwrap_or(0)
    }

    /// Apply the heading offset, clamped to 1..=6.
    pub fn heading_level(&self, level: u8) -> u8 {
        (level as i32 + self.heading_offset()).clamp(1, 6) as u8
    }

    /// Look up a link reference definition by raw key.
    pub fn resolve_link(&self, key: &str) -> Option<&'a LinkDef> {
        self.document
            .link_refs
            .get(&crate::tree::normalize_label(key))
    }
}

/// Trait for emitting documents to a specific format.
pub trait Emitter {
    /// Serialize the document into the output buffer.
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()>;
}

/// Emit a document in the requested format.
pub fn emit(format: Format, ctx: &EmitContext) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        Format::Html => HtmlEmitter::new().emit(ctx, &mut out)?,
        Format::HtmlWithAssets => HtmlEmitter::with_embedded_assets().emit(ctx, &mut out)?,
        Format::Latex => LatexEmitter::new(LatexFlavor::Article).emit(ctx, &mut out)?,
        Format::Beamer => LatexEmitter::new(LatexFlavor::Beamer).emit(ctx, &mut out)?,
        Format::Memoir => LatexEmitter::new(LatexFlavor::Memoir).emit(ctx, &mut out)?,
        Format::Mmd => MmdEmitter::new().emit(ctx, &mut out)?,
        Format::Opml => OpmlEmitter::new().emit(ctx, &mut out)?,
        Format::Itmz => ItmzEmitter::new().emit(ctx, &mut out)?,
        Format::Fodt => FodtEmitter::new().emit(ctx, &mut out)?,
        Format::Odf => OdfEmitter::new().emit(ctx, &mut out)?,
        Format::Epub => EpubEmitter::new().emit(ctx, &mut out)?,
        Format::TextBundle => TextBundleEmitter::stored().emit(ctx, &mut out)?,
        Format::TextBundleCompressed => TextBundleEmitter::deflated().emit(ctx, &mut out)?,
    }
    Ok(out)
}

// ============================================================================
// Shared walking helpers
// ============================================================================

/// Visit every block in document order: preamble, then each section's
/// content and children depth-first.
pub(crate) fn walk_blocks<'a>(doc: &'a Document, f: &mut impl FnMut(&'a Block)) {
    for block in &doc.preamble {
        walk_block(block, f);
    }
    for section in &doc.sections {
        walk_section(section, f);
    }
}

fn walk_section<'a>(section: &'a Section, f: &mut impl FnMut(&'a Block)) {
    for block in &section.content {
        walk_block(block, f);
    }
    for child in &section.children {
        walk_section(child, f);
    }
}

fn walk_block<'a>(block: &'a Block, f: &mut impl FnMut(&'a Block)) {
    f(block);
    match &block.kind {
        BlockKind::BlockQuote { content } => {
            for inner in content {
                walk_block(inner, f);
            }
        }
        BlockKind::List { items, .. } => {
            for item in items {
                for inner in item {
                    walk_block(inner, f);
                }
            }
        }
        _ => {}
    }
}

/// Visit every inline in a block, depth-first.
pub(crate) fn walk_inlines<'a>(block: &'a Block, f: &mut impl FnMut(&'a Inline)) {
    match &block.kind {
        BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
            walk_inline_seq(content, f);
        }
        BlockKind::Table(table) => {
            for row in table.header.iter().chain(table.rows.iter()) {
                for cell in row {
                    walk_inline_seq(cell, f);
                }
            }
        }
        _ => {}
    }
}

fn walk_inline_seq<'a>(inlines: &'a [Inline], f: &mut impl FnMut(&'a Inline)) {
    for inline in inlines {
        f(inline);
        match inline {
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::CriticInsert(children)
            | Inline::CriticDelete(children)
            | Inline::CriticHighlight(children)
            | Inline::Link {
                content: children, ..
            } => walk_inline_seq(children, f),
            _ => {}
        }
    }
}

/// Footnote and citation keys in first-reference order.
///
/// Only references with a matching definition participate in numbering;
/// unresolved keys render literally at the reference site.
#[derive(Debug, Default)]
pub(crate) struct NoteOrder {
    pub footnotes: Vec<String>,
    pub citations: Vec<String>,
}

impl NoteOrder {
    pub(crate) fn collect(doc: &Document) -> Self {
        let mut order = NoteOrder::default();
        walk_blocks(doc, &mut |block| {
            walk_inlines(block, &mut |inline| match inline {
                Inline::FootnoteRef { key } => {
                    if doc.footnotes.contains_key(key)
                        && !order.footnotes.iter().any(|k| k == key)
                    {
                        order.footnotes.push(key.clone());
                    }
                }
                Inline::CitationRef { key } => {
                    if doc.citations.contains_key(key)
                        && !order.citations.iter().any(|k| k == key)
                    {
                        order.citations.push(key.clone());
                    }
                }
                _ => {}
            });
        });
        order
    }

    pub(crate) fn footnote_number(&self, key: &str) -> Option<usize> {
        self.footnotes.iter().position(|k| k == key).map(|i| i + 1)
    }

    pub(crate) fn citation_number(&self, key: &str) -> Option<usize> {
        self.citations.iter().position(|k| k == key).map(|i| i + 1)
    }
}

// ============================================================================
// Heading labels
// ============================================================================

/// Assigns unique heading labels: manual labels win, then either slugs or
/// seeded random identifiers depending on the options.
pub(crate) struct Labeler {
    no_labels: bool,
    rng: Option<Lcg>,
    used: HashSet<String>,
}

impl Labeler {
    pub(crate) fn new(options: &Options, seed: u64) -> Self {
        Self {
            no_labels: options.no_labels,
            rng: options.random_labels.then(|| Lcg::new(seed)),
            used: HashSet::new(),
        }
    }

    pub(crate) fn label_for(&mut self, section: &Section) -> Option<String> {
        if self.no_labels {
            return None;
        }
        // Manual labels always win, even with random labels requested.
        if let Some(label) = &section.label {
            self.used.insert(label.clone());
            return Some(label.clone());
        }
        if let Some(rng) = &mut self.rng {
            let label = format!("h{}", rng.next_label());
            self.used.insert(label.clone());
            return Some(label);
        }
        let base = slugify(&plain_text(&section.heading));
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        let mut label = base.clone();
        let mut n = 1;
        while self.used.contains(&label) {
            n += 1;
            label = format!("{base}-{n}");
        }
        self.used.insert(label.clone());
        Some(label)
    }
}

/// Generate a slug from heading text.
///
/// Lowercases ASCII alphanumerics, turns whitespace and separators into
/// hyphens, and collapses consecutive hyphens.
pub(crate) fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape text for HTML/XML element and attribute content.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn note_order_follows_first_reference() {
        let source = "uses [^b] then [^a]\n\n[^a]: A\n[^b]: B\n";
        let engine = Engine::new(source, Options::standard()).unwrap();
        let order = NoteOrder::collect(engine.document());
        assert_eq!(order.footnotes, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(order.footnote_number("b"), Some(1));
        assert_eq!(order.footnote_number("a"), Some(2));
    }

    #[test]
    fn undefined_references_not_numbered() {
        let source = "uses [^missing]\n";
        let engine = Engine::new(source, Options::standard()).unwrap();
        let order = NoteOrder::collect(engine.document());
        assert!(order.footnotes.is_empty());
    }

    #[test]
    fn labeler_uniquifies_slugs() {
        let options = Options::new();
        let mut labeler = Labeler::new(&options, 1);
        let engine = Engine::new("# Same\n\n# Same\n", Options::new()).unwrap();
        let a = labeler.label_for(&engine.document().sections[0]);
        let b = labeler.label_for(&engine.document().sections[1]);
        assert_eq!(a.as_deref(), Some("same"));
        assert_eq!(b.as_deref(), Some("same-2"));
    }

    #[test]
    fn no_labels_option() {
        let mut options = Options::new();
        options.no_labels = true;
        let mut labeler = Labeler::new(&options, 1);
        let engine = Engine::new("# Title\n", Options::new()).unwrap();
        assert_eq!(labeler.label_for(&engine.document().sections[0]), None);
    }

    #[test]
    fn escape_xml_basics() {
        assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_xml("\"q\""), "&quot;q&quot;");
    }
}
