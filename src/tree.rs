//! Document tree builder.
//!
//! Consumes the scanner's flat span sequence and produces a [`Document`]:
//! blocks nested by structural rules, headings grouped into a section tree
//! by level, and footnote / citation / link-reference definitions collected
//! into per-document tables (last definition wins for a shared key).
//! Building never fails; malformed nesting degrades to flat structure.

use std::collections::HashMap;

use crate::inline::{self, Inline, InlineContext};
use crate::options::Options;
use crate::scanner::{self, BlockSpan, LineSpan, SpanKind};

/// A fully built document: section tree plus cross-reference tables.
///
/// Built once per conversion and owned by it; immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Content before the first heading.
    pub preamble: Vec<Block>,
    /// Top-level sections, nested by heading level.
    pub sections: Vec<Section>,
    /// Footnote definitions by key.
    pub footnotes: HashMap<String, Vec<Block>>,
    /// Citation definitions by key.
    pub citations: HashMap<String, Vec<Inline>>,
    /// Link reference definitions by normalized key.
    pub link_refs: HashMap<String, LinkDef>,
}

/// A link reference definition.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDef {
    pub url: String,
    pub title: Option<String>,
}

/// A section: a heading and everything under it.
#[derive(Debug, Clone)]
pub struct Section {
    /// Heading level (1-6).
    pub level: u8,
    pub heading: Vec<Inline>,
    /// Manually assigned label (`# Heading [label]`), if any.
    pub label: Option<String>,
    pub lines: LineSpan,
    /// Content blocks before any child section.
    pub content: Vec<Block>,
    /// Subsections at a deeper level.
    pub children: Vec<Section>,
}

/// A block node with its source line range.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub lines: LineSpan,
}

#[derive(Debug, Clone)]
pub enum BlockKind {
    Paragraph {
        content: Vec<Inline>,
    },
    /// A heading inside a container (blockquote, list item). Top-level
    /// headings become [`Section`]s instead.
    Heading {
        level: u8,
        content: Vec<Inline>,
        label: Option<String>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    BlockQuote {
        content: Vec<Block>,
    },
    List {
        ordered: bool,
        tight: bool,
        items: Vec<Vec<Block>>,
    },
    Table(Table),
    Rule,
    RawHtml {
        html: String,
        /// Inline-processed form, present when `process_html` is set.
        /// Markdown spans inside the block are resolved; tags pass through
        /// as raw tokens.
        processed: Option<Vec<Inline>>,
    },
}

/// A pipe table as a structured grid.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Vec<Inline>>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Build a document from a span sequence.
pub fn build(spans: Vec<BlockSpan>, options: &Options, inline_ctx: &InlineContext) -> Document {
    let mut builder = Builder {
        options,
        inline: inline_ctx,
        footnotes: HashMap::new(),
        citations: HashMap::new(),
        link_refs: HashMap::new(),
    };
    let blocks = builder.build_blocks(&spans);
    let (preamble, sections) = nest_sections(blocks);
    Document {
        preamble,
        sections,
        footnotes: builder.footnotes,
        citations: builder.citations,
        link_refs: builder.link_refs,
    }
}

struct Builder<'a> {
    options: &'a Options,
    inline: &'a InlineContext,
    footnotes: HashMap<String, Vec<Block>>,
    citations: HashMap<String, Vec<Inline>>,
    link_refs: HashMap<String, LinkDef>,
}

impl<'a> Builder<'a> {
    /// Turn a span run into blocks, consuming definitions into the tables
    /// as they appear at any nesting depth.
    fn build_blocks(&mut self, spans: &[BlockSpan]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < spans.len() {
            let span = &spans[i];
            match &span.kind {
                SpanKind::ListItem { ordered, .. } => {
                    let ordered = *ordered;
                    let mut j = i;
                    while j < spans.len()
                        && matches!(
                            &spans[j].kind,
                            SpanKind::ListItem { ordered: o, .. } if *o == ordered
                        )
                    {
                        j += 1;
                    }
                    blocks.push(self.build_list(&spans[i..j], ordered));
                    i = j;
                    continue;
                }
                SpanKind::FootnoteDef { key } => {
                    let content = self.rescan(&span.text);
                    // Last definition wins.
                    self.footnotes.insert(key.clone(), content);
                }
                SpanKind::CitationDef { key } => {
                    let content = inline::parse(&span.text, self.inline);
                    self.citations.insert(key.clone(), content);
                }
                SpanKind::LinkDef { key } => {
                    let (url, title) = inline::parse_link_destination(&span.text);
                    self.link_refs
                        .insert(normalize_label(key), LinkDef { url, title });
                }
                _ => blocks.push(self.build_block(span)),
            }
            i += 1;
        }
        blocks
    }

    fn build_block(&mut self, span: &BlockSpan) -> Block {
        let kind = match &span.kind {
            SpanKind::Heading { level } => {
                let (text, label) = split_heading_label(&span.text);
                BlockKind::Heading {
                    level: *level,
                    content: inline::parse(text, self.inline),
                    label,
                }
            }
            SpanKind::Paragraph => BlockKind::Paragraph {
                content: inline::parse(&span.text, self.inline),
            },
            SpanKind::CodeFence { info } => BlockKind::CodeBlock {
                language: info.split_whitespace().next().map(String::from),
                code: span.text.clone(),
            },
            SpanKind::IndentedCode => BlockKind::CodeBlock {
                language: None,
                code: span.text.clone(),
            },
            SpanKind::BlockQuote => BlockKind::BlockQuote {
                content: self.rescan(&span.text),
            },
            SpanKind::Table => BlockKind::Table(self.build_table(&span.text)),
            SpanKind::Rule => BlockKind::Rule,
            SpanKind::RawHtml => BlockKind::RawHtml {
                html: span.text.clone(),
                processed: self
                    .options
                    .process_html
                    .then(|| inline::parse(&span.text, self.inline)),
            },
            // Definitions and list items are handled by build_blocks.
            SpanKind::ListItem { .. }
            | SpanKind::FootnoteDef { .. }
            | SpanKind::CitationDef { .. }
            | SpanKind::LinkDef { .. } => BlockKind::Paragraph {
                content: inline::parse(&span.text, self.inline),
            },
        };
        Block {
            kind,
            lines: span.lines,
        }
    }

    /// Scan and build a container's interior (blockquote, list item,
    /// footnote definition).
    fn rescan(&mut self, text: &str) -> Vec<Block> {
        let spans = scanner::scan(text, self.options);
        self.build_blocks(&spans)
    }

    fn build_list(&mut self, items: &[BlockSpan], ordered: bool) -> Block {
        let mut built: Vec<Vec<Block>> = Vec::new();
        for item in items {
            built.push(self.rescan(&item.text));
        }
        // A list is tight when every item is a single paragraph; nested
        // blocks or multiple paragraphs make it loose.
        let tight = built.iter().all(|blocks| {
            blocks.len() <= 1
                && blocks
                    .iter()
                    .all(|b| matches!(b.kind, BlockKind::Paragraph { .. }))
        });
        let start = items.first().map(|s| s.lines.start).unwrap_or(0);
        let end = items.last().map(|s| s.lines.end).unwrap_or(0);
        Block {
            kind: BlockKind::List {
                ordered,
                tight,
                items: built,
            },
            lines: LineSpan::new(start, end),
        }
    }

    fn build_table(&mut self, text: &str) -> Table {
        let lines: Vec<&str> = text.lines().collect();
        let separator = lines.iter().position(|l| scanner::is_table_separator(l));

        let mut table = Table::default();
        let Some(sep) = separator else {
            // No separator row survived; treat every line as a body row.
            for line in &lines {
                let row = self.parse_row(line);
                table.rows.push(row);
            }
            return table;
        };

        table.alignments = parse_alignments(lines[sep]);
        for line in &lines[..sep] {
            let row = self.parse_row(line);
            table.header.push(row);
        }
        for line in &lines[sep + 1..] {
            let row = self.parse_row(line);
            table.rows.push(row);
        }
        table
    }

    fn parse_row(&mut self, line: &str) -> Vec<Vec<Inline>> {
        split_row(line)
            .into_iter()
            .map(|cell| inline::parse(cell.trim(), self.inline))
            .collect()
    }
}

/// Nest flat blocks into a section tree. Top-level headings open a section
/// at their level, closing any open section at the same or deeper level.
fn nest_sections(blocks: Vec<Block>) -> (Vec<Block>, Vec<Section>) {
    let mut preamble = Vec::new();
    let mut iter = blocks.into_iter().peekable();

    // Content before the first heading.
    while let Some(block) = iter.next_if(|b| !matches!(b.kind, BlockKind::Heading { .. })) {
        preamble.push(block);
    }

    let rest: Vec<Block> = iter.collect();
    let (sections, _) = parse_siblings(&rest, 0, 0);
    (preamble, sections)
}

/// Parse sibling sections. Stops when a heading with level < min_level is
/// hit. Returns the sections and the next unconsumed index.
fn parse_siblings(blocks: &[Block], mut i: usize, min_level: u8) -> (Vec<Section>, usize) {
    let mut sections = Vec::new();

    while i < blocks.len() {
        match &blocks[i].kind {
            BlockKind::Heading { level, .. } if *level < min_level => break,
            BlockKind::Heading {
                level,
                content,
                label,
            } => {
                let level = *level;
                let heading = content.clone();
                let label = label.clone();
                let lines = blocks[i].lines;
                let mut section_content = Vec::new();
                i += 1;

                while i < blocks.len() {
                    if matches!(blocks[i].kind, BlockKind::Heading { .. }) {
                        break;
                    }
                    section_content.push(blocks[i].clone());
                    i += 1;
                }

                let (children, next_i) = parse_siblings(blocks, i, level + 1);
                i = next_i;

                sections.push(Section {
                    level,
                    heading,
                    label,
                    lines,
                    content: section_content,
                    children,
                });
            }
            _ => {
                // Not reachable from nest_sections: content is collected
                // under the preceding heading before recursion.
                i += 1;
            }
        }
    }

    (sections, i)
}

/// Normalize a link-reference label: case-insensitive, whitespace-collapsed.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split a manual heading label off the heading text: `Heading [label]`.
fn split_heading_label(text: &str) -> (&str, Option<String>) {
    let trimmed = text.trim_end();
    if let Some(rest) = trimmed.strip_suffix(']')
        && let Some(open) = rest.rfind('[')
        && open > 0
        && rest[..open].ends_with(' ')
    {
        let label = &rest[open + 1..];
        let before = rest[..open].trim_end();
        if !label.is_empty()
            && !label.contains(char::is_whitespace)
            && !label.contains('[')
            && !before.is_empty()
        {
            return (before, Some(label.to_string()));
        }
    }
    (text, None)
}

fn parse_alignments(line: &str) -> Vec<Alignment> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner
        .split('|')
        .map(|cell| {
            let cell = cell.trim();
            match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Alignment::Center,
                (false, true) => Alignment::Right,
                _ => Alignment::Left,
            }
        })
        .collect()
}

/// Split a table row into cells on unescaped pipes.
fn split_row(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);

    let mut cells = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '|' if !escaped => {
                cells.push(&trimmed[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    cells.push(&trimmed[start..]);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Language;

    fn build_default(source: &str) -> Document {
        let options = Options::standard();
        let ctx = InlineContext::from_options(&options, Language::English);
        let spans = scanner::scan(source, &options);
        build(spans, &options, &ctx)
    }

    #[test]
    fn preamble_only() {
        let doc = build_default("No headings here.\n");
        assert_eq!(doc.preamble.len(), 1);
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn single_section() {
        let doc = build_default("# Title\n\nContent\n");
        assert!(doc.preamble.is_empty());
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].level, 1);
        assert_eq!(doc.sections[0].content.len(), 1);
    }

    #[test]
    fn nested_sections() {
        let doc = build_default(
            "# Chapter\n\nIntro\n\n## Section A\n\nA content\n\n## Section B\n\nB content\n",
        );
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].content.len(), 1);
        assert_eq!(doc.sections[0].children.len(), 2);
        assert_eq!(
            inline::plain_text(&doc.sections[0].children[0].heading),
            "Section A"
        );
    }

    #[test]
    fn sibling_top_level() {
        let doc = build_default("# One\n\nFirst\n\n# Two\n\nSecond\n");
        assert_eq!(doc.sections.len(), 2);
    }

    #[test]
    fn skipped_levels() {
        let doc = build_default("# Top\n\n### Deep\n\nContent\n");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].children.len(), 1);
        assert_eq!(doc.sections[0].children[0].level, 3);
    }

    #[test]
    fn heading_nesting_follows_level_not_order() {
        let doc = build_default("## Deep First\n\n# Top Later\n");
        // The level-2 heading cannot nest under the later level-1 heading.
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].level, 2);
        assert_eq!(doc.sections[1].level, 1);
    }

    #[test]
    fn manual_heading_label() {
        let doc = build_default("# Introduction [intro]\n");
        assert_eq!(doc.sections[0].label.as_deref(), Some("intro"));
        assert_eq!(inline::plain_text(&doc.sections[0].heading), "Introduction");
    }

    #[test]
    fn list_building_and_tightness() {
        let doc = build_default("- one\n- two\n");
        let BlockKind::List {
            ordered,
            tight,
            items,
        } = &doc.preamble[0].kind
        else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert!(tight);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn nested_list_inside_item() {
        let doc = build_default("- outer\n    - inner\n");
        let BlockKind::List { items, .. } = &doc.preamble[0].kind else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 1);
        assert!(
            items[0]
                .iter()
                .any(|b| matches!(b.kind, BlockKind::List { .. }))
        );
    }

    #[test]
    fn loose_list_with_multiple_paragraphs() {
        let doc = build_default("- first\n\n    second paragraph\n- next\n");
        let BlockKind::List { tight, .. } = &doc.preamble[0].kind else {
            panic!("expected list");
        };
        assert!(!tight);
    }

    #[test]
    fn blockquote_interior_is_rescanned() {
        let doc = build_default("> # Quoted heading\n> text\n");
        let BlockKind::BlockQuote { content } = &doc.preamble[0].kind else {
            panic!("expected quote");
        };
        assert!(
            content
                .iter()
                .any(|b| matches!(b.kind, BlockKind::Heading { .. }))
        );
    }

    #[test]
    fn table_grid_with_alignments() {
        let doc = build_default("| a | b | c |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n");
        let BlockKind::Table(table) = &doc.preamble[0].kind else {
            panic!("expected table");
        };
        assert_eq!(
            table.alignments,
            vec![Alignment::Left, Alignment::Center, Alignment::Right]
        );
        assert_eq!(table.header.len(), 1);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(inline::plain_text(&table.rows[0][2]), "3");
    }

    #[test]
    fn footnote_definitions_collected() {
        let doc = build_default("text[^a]\n\n[^a]: first\n\n[^a]: second\n");
        assert_eq!(doc.footnotes.len(), 1);
        let content = &doc.footnotes["a"];
        let BlockKind::Paragraph { content } = &content[0].kind else {
            panic!("expected paragraph");
        };
        assert_eq!(inline::plain_text(content), "second");
    }

    #[test]
    fn citation_and_link_tables() {
        let doc =
            build_default("See [#doe] and [site].\n\n[#doe]: Doe 2001\n[site]: https://example.com \"Example\"\n");
        assert_eq!(inline::plain_text(&doc.citations["doe"]), "Doe 2001");
        let def = &doc.link_refs["site"];
        assert_eq!(def.url, "https://example.com");
        assert_eq!(def.title.as_deref(), Some("Example"));
    }

    #[test]
    fn link_ref_lookup_is_case_insensitive() {
        let doc = build_default("[x]\n\n[Foo  Bar]: https://example.com\n");
        assert!(doc.link_refs.contains_key("foo bar"));
    }

    #[test]
    fn source_line_ranges_preserved() {
        let doc = build_default("# Title\n\npara one\n\npara two\n");
        assert_eq!(doc.sections[0].lines.start, 1);
        assert_eq!(doc.sections[0].content[0].lines.start, 3);
        assert_eq!(doc.sections[0].content[1].lines.start, 5);
    }
}
