//! MultiMarkdown round-trip emitter.
//!
//! Re-emits the metadata block and renders the document tree back to
//! markdown: escaped text, dynamic code fence lengths, re-created critic
//! markup, and reference definitions gathered at the end of the document.
//! Reference tables are emitted in sorted key order so repeated conversions
//! are byte-identical.

use crate::error::Result;
use crate::inline::{Inline, LinkTarget};
use crate::tree::{Alignment, Block, BlockKind, Section, Table};

use super::{EmitContext, Emitter};

/// Emitter for MultiMarkdown output.
#[derive(Debug, Clone, Default)]
pub struct MmdEmitter;

impl MmdEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for MmdEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let mut text = String::new();

        if !ctx.metadata.is_empty() {
            for (key, value) in ctx.metadata.iter() {
                text.push_str(&format!("{key}: {value}\n"));
            }
            text.push('\n');
        }

        text.push_str(&render_body(ctx));
        out.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

fn render_body(ctx: &EmitContext) -> String {
    let mut writer = MmdWriter {
        out: String::new(),
        prefix: String::new(),
    };
    let doc = ctx.document;

    for block in &doc.preamble {
        writer.block(block);
    }
    for section in &doc.sections {
        writer.section(section);
    }

    // Reference tables, sorted for stable output.
    let mut footnote_keys: Vec<&String> = doc.footnotes.keys().collect();
    footnote_keys.sort();
    for key in footnote_keys {
        let content = blocks_to_markdown(&doc.footnotes[key]);
        let mut lines = content.lines();
        writer.push_line(&format!("[^{key}]: {}", lines.next().unwrap_or("")));
        for line in lines {
            if line.is_empty() {
                writer.push_line("");
            } else {
                writer.push_line(&format!("    {line}"));
            }
        }
        writer.blank();
    }

    let mut citation_keys: Vec<&String> = doc.citations.keys().collect();
    citation_keys.sort();
    for key in citation_keys {
        let content = inlines_to_string(&doc.citations[key]);
        writer.push_line(&format!("[#{key}]: {content}"));
    }
    if !doc.citations.is_empty() {
        writer.blank();
    }

    let mut link_keys: Vec<&String> = doc.link_refs.keys().collect();
    link_keys.sort();
    for key in link_keys {
        let def = &doc.link_refs[key];
        match &def.title {
            Some(title) => writer.push_line(&format!("[{key}]: {} \"{title}\"", def.url)),
            None => writer.push_line(&format!("[{key}]: {}", def.url)),
        }
    }

    // Collapse the trailing blank run to a single newline.
    let mut out = writer.out;
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// Render a block sequence to markdown without document-level extras
/// (used for footnote definitions and outline notes).
pub(crate) fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut writer = MmdWriter {
        out: String::new(),
        prefix: String::new(),
    };
    for block in blocks {
        writer.block(block);
    }
    let mut out = writer.out;
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

struct MmdWriter {
    out: String,
    prefix: String,
}

impl MmdWriter {
    fn push_line(&mut self, line: &str) {
        if line.is_empty() {
            self.out.push_str(self.prefix.trim_end());
        } else {
            self.out.push_str(&self.prefix);
            self.out.push_str(line);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.push_line("");
    }

    fn push_text(&mut self, text: &str) {
        for line in text.split('\n') {
            self.push_line(line);
        }
    }

    fn section(&mut self, section: &Section) {
        let hashes = "#".repeat(section.level as usize);
        let heading = inlines_to_string(&section.heading);
        match &section.label {
            Some(label) => self.push_line(&format!("{hashes} {heading} [{label}]")),
            None => self.push_line(&format!("{hashes} {heading}")),
        }
        self.blank();
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
                self.push_text(&inlines_to_string(content));
                self.blank();
            }
            BlockKind::Heading {
                level,
                content,
                label,
            } => {
                let hashes = "#".repeat(*level as usize);
                let heading = inlines_to_string(content);
                match label {
                    Some(label) => self.push_line(&format!("{hashes} {heading} [{label}]")),
                    None => self.push_line(&format!("{hashes} {heading}")),
                }
                self.blank();
            }
            BlockKind::CodeBlock { language, code } => {
                let fence = "`".repeat(fence_length(code));
                match language {
                    Some(lang) => self.push_line(&format!("{fence}{lang}")),
                    None => self.push_line(&fence),
                }
                for line in code.split('\n') {
                    self.push_line(line);
                }
                self.push_line(&fence);
                self.blank();
            }
            BlockKind::BlockQuote { content } => {
                let saved = self.prefix.clone();
                self.prefix.push_str("> ");
                for inner in content {
                    self.block(inner);
                }
                self.prefix = saved;
            }
            BlockKind::List {
                ordered,
                tight,
                items,
            } => {
                for (i, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}. ", i + 1)
                    } else {
                        "- ".to_string()
                    };
                    let rendered = blocks_to_markdown(item);
                    let indent = " ".repeat(marker.len());
                    for (n, line) in rendered.lines().enumerate() {
                        if n == 0 {
                            self.push_line(&format!("{marker}{line}"));
                        } else if line.is_empty() {
                            self.push_line("");
                        } else {
                            self.push_line(&format!("{indent}{line}"));
                        }
                    }
                    if !*tight {
                        self.blank();
                    }
                }
                if *tight {
                    self.blank();
                }
            }
            BlockKind::Table(table) => self.table(table),
            BlockKind::Rule => {
                self.push_line("---");
                self.blank();
            }
            BlockKind::RawHtml { html, .. } => {
                self.push_text(html);
                self.blank();
            }
        }
    }

    fn table(&mut self, table: &Table) {
        let columns = table
            .header
            .iter()
            .chain(table.rows.iter())
            .map(|row| row.len())
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        for row in &table.header {
            self.table_row(row);
        }
        let separator: Vec<&str> = (0..columns)
            .map(|i| match table.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => "----",
                Alignment::Center => ":--:",
                Alignment::Right => "---:",
            })
            .collect();
        self.push_line(&format!("| {} |", separator.join(" | ")));
        for row in &table.rows {
            self.table_row(row);
        }
        self.blank();
    }

    fn table_row(&mut self, row: &[Vec<Inline>]) {
        let cells: Vec<String> = row.iter().map(|cell| inlines_to_string(cell)).collect();
        self.push_line(&format!("| {} |", cells.join(" | ")));
    }
}

fn inlines_to_string(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        inline_to_string(inline, &mut out);
    }
    out
}

fn inline_to_string(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_markdown(text)),
        Inline::Entity(entity) => out.push_str(entity),
        Inline::Code(code) => {
            let ticks = "`".repeat(inline_code_ticks(code));
            let spacer = if code.starts_with('`') || code.ends_with('`') {
                " "
            } else {
                ""
            };
            out.push_str(&format!("{ticks}{spacer}{code}{spacer}{ticks}"));
        }
        Inline::Emphasis(children) => {
            out.push('*');
            out.push_str(&inlines_to_string(children));
            out.push('*');
        }
        Inline::Strong(children) => {
            out.push_str("**");
            out.push_str(&inlines_to_string(children));
            out.push_str("**");
        }
        Inline::Link { content, target } => {
            let text = inlines_to_string(content);
            match target {
                LinkTarget::Inline { url, title } => match title {
                    Some(title) => out.push_str(&format!("[{text}]({url} \"{title}\")")),
                    None => out.push_str(&format!("[{text}]({url})")),
                },
                LinkTarget::Reference { key } => {
                    if text == *key {
                        out.push_str(&format!("[{text}]"));
                    } else {
                        out.push_str(&format!("[{text}][{key}]"));
                    }
                }
            }
        }
        Inline::Image { alt, target } => match target {
            LinkTarget::Inline { url, title } => match title {
                Some(title) => out.push_str(&format!("![{alt}]({url} \"{title}\")")),
                None => out.push_str(&format!("![{alt}]({url})")),
            },
            LinkTarget::Reference { key } => out.push_str(&format!("![{alt}][{key}]")),
        },
        Inline::FootnoteRef { key } => out.push_str(&format!("[^{key}]")),
        Inline::CitationRef { key } => out.push_str(&format!("[#{key}]")),
        Inline::CriticInsert(children) => {
            out.push_str("{++");
            out.push_str(&inlines_to_string(children));
            out.push_str("++}");
        }
        Inline::CriticDelete(children) => {
            out.push_str("{--");
            out.push_str(&inlines_to_string(children));
            out.push_str("--}");
        }
        Inline::CriticHighlight(children) => {
            out.push_str("{==");
            out.push_str(&inlines_to_string(children));
            out.push_str("==}");
        }
        Inline::CriticComment(text) => {
            out.push_str("{>>");
            out.push_str(text);
            out.push_str("<<}");
        }
        Inline::LineBreak => out.push_str("\\\n"),
        Inline::RawHtml(html) => out.push_str(html),
    }
}

/// Escape markdown-significant characters in literal text.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut at_line_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '*' | '_' | '[' | ']' | '`' | '|' => {
                result.push('\\');
                result.push(c);
            }
            '#' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            '!' if chars.peek() == Some(&'[') => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
        at_line_start = c == '\n';
    }
    result
}

/// Smallest fence length (at least 3) not appearing as a backtick run in
/// the content.
fn fence_length(content: &str) -> usize {
    max_run(content, '`').max(2) + 1
}

/// Smallest backtick count (at least 1) not appearing as a run in inline
/// code content.
fn inline_code_ticks(content: &str) -> usize {
    max_run(content, '`') + 1
}

fn max_run(content: &str, target: char) -> usize {
    let mut max_run = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == target {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 0;
        }
    }
    max_run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::options::{Format, Options};

    fn mmd(source: &str, options: Options) -> String {
        Engine::new(source, options)
            .unwrap()
            .convert(Format::Mmd)
            .unwrap()
    }

    #[test]
    fn metadata_block_reemitted() {
        let out = mmd("Title: Doc\nAuthor: Jane\n\n# H\n", Options::new());
        assert!(out.starts_with("Title: Doc\nAuthor: Jane\n\n"));
    }

    #[test]
    fn heading_and_paragraph_round_trip() {
        let out = mmd("# Header\n\nSome text.\n", Options::new());
        assert!(out.contains("# Header"));
        assert!(out.contains("Some text."));
    }

    #[test]
    fn special_characters_escaped() {
        let out = mmd("literal \\*stars\\* here\n", Options::new());
        assert!(out.contains("\\*stars\\*"));
    }

    #[test]
    fn emphasis_reemitted() {
        let out = mmd("*em* and **strong**\n", Options::new());
        assert!(out.contains("*em* and **strong**"));
    }

    #[test]
    fn code_fence_grows_past_content() {
        let out = mmd("````\ncode with ``` inside\n````\n", Options::new());
        assert!(out.contains("````\ncode with ``` inside\n````"));
    }

    #[test]
    fn list_round_trip() {
        let out = mmd("- one\n- two\n", Options::new());
        assert!(out.contains("- one\n- two"));
    }

    #[test]
    fn blockquote_prefixed() {
        let out = mmd("> quoted\n", Options::new());
        assert!(out.contains("> quoted"));
    }

    #[test]
    fn footnote_definitions_at_end() {
        let out = mmd(
            "Fact.[^a]\n\n[^a]: The note.\n",
            Options::standard().with_snippet(),
        );
        assert!(out.contains("Fact.[^a]"));
        assert!(out.contains("[^a]: The note."));
    }

    #[test]
    fn link_reference_table_reemitted() {
        let out = mmd(
            "See [text][site].\n\n[site]: https://example.com \"Example\"\n",
            Options::new(),
        );
        assert!(out.contains("[text][site]"));
        assert!(out.contains("[site]: https://example.com \"Example\""));
    }

    #[test]
    fn critic_markup_round_trips() {
        let out = mmd("{++add++} {--del--}\n", Options::new().with_critic());
        assert!(out.contains("{++add++}"));
        assert!(out.contains("{--del--}"));
    }

    #[test]
    fn table_reemitted_with_alignment() {
        let out = mmd("| a | b |\n|:-:|---|\n| 1 | 2 |\n", Options::new());
        assert!(out.contains("| a | b |"));
        assert!(out.contains("| :--: | ---- |"));
        assert!(out.contains("| 1 | 2 |"));
    }

    #[test]
    fn output_is_reparseable() {
        let source = "# Top\n\ntext with *em*\n\n- a\n- b\n";
        let first = mmd(source, Options::new());
        let second = mmd(&first, Options::new());
        assert_eq!(first, second);
    }
}
