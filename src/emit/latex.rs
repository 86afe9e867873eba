//! LaTeX-family emitter: latex (article), beamer, and memoir.
//!
//! One shared walker parameterized by a [`LatexFlavor`] that supplies the
//! document class and per-level sectioning commands. Beamer maps deep
//! headings to frames instead of sectioning commands. Footnote references
//! inline their definition into `\footnote{..}`; citations become `\cite`
//! with a generated `thebibliography` environment.

use crate::error::Result;
use crate::inline::{Inline, LinkTarget, plain_text};
use crate::tree::{Alignment, Block, BlockKind, Section, Table};

use super::{EmitContext, Emitter, NoteOrder};

/// Which LaTeX document class drives the shared walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatexFlavor {
    Article,
    Beamer,
    Memoir,
}

impl LatexFlavor {
    fn document_class(self) -> &'static str {
        match self {
            LatexFlavor::Article => "article",
            LatexFlavor::Beamer => "beamer",
            LatexFlavor::Memoir => "memoir",
        }
    }

    /// Sectioning command for a heading level, or `None` when the level
    /// maps to a frame (beamer).
    fn section_command(self, level: u8) -> Option<&'static str> {
        match self {
            LatexFlavor::Article => Some(match level {
                1 => "section",
                2 => "subsection",
                3 => "subsubsection",
                4 => "paragraph",
                _ => "subparagraph",
            }),
            LatexFlavor::Memoir => Some(match level {
                1 => "chapter",
                2 => "section",
                3 => "subsection",
                4 => "subsubsection",
                5 => "paragraph",
                _ => "subparagraph",
            }),
            LatexFlavor::Beamer => match level {
                1 => Some("section"),
                2 => Some("subsection"),
                _ => None,
            },
        }
    }
}

/// Emitter for the LaTeX family.
#[derive(Debug, Clone)]
pub struct LatexEmitter {
    flavor: LatexFlavor,
}

impl LatexEmitter {
    pub fn new(flavor: LatexFlavor) -> Self {
        Self { flavor }
    }
}

impl Emitter for LatexEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let mut writer = LatexWriter {
            ctx,
            flavor: self.flavor,
            notes: NoteOrder::collect(ctx.document),
            out: String::new(),
        };
        writer.document();
        out.extend_from_slice(writer.out.as_bytes());
        Ok(())
    }
}

struct LatexWriter<'a> {
    ctx: &'a EmitContext<'a>,
    flavor: LatexFlavor,
    notes: NoteOrder,
    out: String,
}

impl<'a> LatexWriter<'a> {
    fn document(&mut self) {
        let doc = self.ctx.document;
        let complete = self.ctx.complete();
        if complete {
            self.preamble();
        }

        for block in &doc.preamble {
            self.block(block);
        }
        for section in &doc.sections {
            self.section(section);
        }
        self.bibliography();

        if complete {
            self.out.push_str("\\end{document}\n");
        }
    }

    fn preamble(&mut self) {
        self.out.push_str(&format!(
            "\\documentclass{{{}}}\n",
            self.flavor.document_class()
        ));
        self.out.push_str("\\usepackage[utf8]{inputenc}\n");
        self.out.push_str("\\usepackage{graphicx}\n");
        self.out.push_str("\\usepackage[normalem]{ulem}\n");
        self.out.push_str("\\usepackage{soul}\n");
        self.out.push_str("\\usepackage{hyperref}\n");

        let title = self.ctx.metadata.get("title");
        if let Some(title) = title {
            self.out
                .push_str(&format!("\\title{{{}}}\n", escape_latex(title)));
        }
        if let Some(author) = self.ctx.metadata.get("author") {
            self.out
                .push_str(&format!("\\author{{{}}}\n", escape_latex(author)));
        }
        if let Some(date) = self.ctx.metadata.get("date") {
            self.out
                .push_str(&format!("\\date{{{}}}\n", escape_latex(date)));
        }
        self.out.push_str("\\begin{document}\n");
        if title.is_some() {
            self.out.push_str("\\maketitle\n");
        }
        self.out.push('\n');
    }

    fn section(&mut self, section: &Section) {
        let level = self.ctx.heading_level(section.level);
        match self.flavor.section_command(level) {
            Some(command) => {
                self.out.push_str(&format!("\\{command}{{"));
                self.inlines(&section.heading);
                self.out.push_str("}\n");
                if let Some(label) = &section.label {
                    self.out.push_str(&format!("\\label{{{label}}}\n"));
                }
                self.out.push('\n');
                for block in &section.content {
                    self.block(block);
                }
                for child in &section.children {
                    self.section(child);
                }
            }
            None => self.frame(section),
        }
    }

    /// Beamer: deep headings become frames; deeper subsections flatten
    /// into the frame as bold lines.
    fn frame(&mut self, section: &Section) {
        self.out.push_str("\\begin{frame}{");
        self.inlines(&section.heading);
        self.out.push_str("}\n\n");
        for block in &section.content {
            self.block(block);
        }
        for child in &section.children {
            self.out.push_str("\\textbf{");
            self.inlines(&child.heading);
            self.out.push_str("}\n\n");
            for block in &child.content {
                self.block(block);
            }
        }
        self.out.push_str("\\end{frame}\n\n");
    }

    fn block(&mut self, block: &Block) {
        match &block.kind {
            BlockKind::Paragraph { content } => {
                self.inlines(content);
                self.out.push_str("\n\n");
            }
            BlockKind::Heading { content, .. } => {
                // Headings inside containers carry no sectioning weight.
                self.out.push_str("\\textbf{");
                self.inlines(content);
                self.out.push_str("}\n\n");
            }
            BlockKind::CodeBlock { code, .. } => {
                self.out.push_str("\\begin{verbatim}\n");
                self.out.push_str(code);
                self.out.push_str("\n\\end{verbatim}\n\n");
            }
            BlockKind::BlockQuote { content } => {
                self.out.push_str("\\begin{quote}\n");
                for inner in content {
                    self.block(inner);
                }
                self.out.push_str("\\end{quote}\n\n");
            }
            BlockKind::List { ordered, items, .. } => {
                let env = if *ordered { "enumerate" } else { "itemize" };
                self.out.push_str(&format!("\\begin{{{env}}}\n"));
                for item in items {
                    self.out.push_str("\\item ");
                    for inner in item {
                        self.block(inner);
                    }
                }
                self.out.push_str(&format!("\\end{{{env}}}\n\n"));
            }
            BlockKind::Table(table) => self.table(table),
            BlockKind::Rule => {
                self.out
                    .push_str("\\begin{center}\\rule{3in}{0.4pt}\\end{center}\n\n");
            }
            // Raw HTML has no LaTeX rendering.
            BlockKind::RawHtml { .. } => {}
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

        let spec: String = (0..columns)
            .map(|i| match table.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => 'l',
                Alignment::Center => 'c',
                Alignment::Right => 'r',
            })
            .collect();

        self.out
            .push_str(&format!("\\begin{{tabular}}{{{spec}}}\n\\hline\n"));
        for row in &table.header {
            self.table_row(row);
        }
        if !table.header.is_empty() {
            self.out.push_str("\\hline\n");
        }
        for row in &table.rows {
            self.table_row(row);
        }
        self.out.push_str("\\hline\n\\end{tabular}\n\n");
    }

    fn table_row(&mut self, row: &[Vec<Inline>]) {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                self.out.push_str(" & ");
            }
            self.inlines(cell);
        }
        self.out.push_str(" \\\\\n");
    }

    fn inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.inline(inline);
        }
    }

    fn inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => self.out.push_str(&escape_latex(text)),
            Inline::Entity(entity) => self.out.push_str(&entity_to_latex(entity)),
            Inline::Code(code) => {
                self.out
                    .push_str(&format!("\\texttt{{{}}}", escape_latex(code)));
            }
            Inline::Emphasis(children) => {
                self.out.push_str("\\emph{");
                self.inlines(children);
                self.out.push('}');
            }
            Inline::Strong(children) => {
                self.out.push_str("\\textbf{");
                self.inlines(children);
                self.out.push('}');
            }
            Inline::Link { content, target } => self.link(content, target),
            Inline::Image { target, .. } => {
                if let Some(url) = self.resolve_url(target) {
                    self.out
                        .push_str(&format!("\\includegraphics{{{}}}", escape_url(&url)));
                }
            }
            Inline::FootnoteRef { key } => self.footnote_ref(key),
            Inline::CitationRef { key } => self.citation_ref(key),
            Inline::CriticInsert(children) => {
                self.out.push_str("\\underline{");
                self.inlines(children);
                self.out.push('}');
            }
            Inline::CriticDelete(children) => {
                self.out.push_str("\\sout{");
                self.inlines(children);
                self.out.push('}');
            }
            Inline::CriticHighlight(children) => {
                self.out.push_str("\\hl{");
                self.inlines(children);
                self.out.push('}');
            }
            Inline::CriticComment(text) => {
                self.out
                    .push_str(&format!("\\marginpar{{{}}}", escape_latex(text)));
            }
            Inline::LineBreak => self.out.push_str("\\\\\n"),
            // Raw HTML has no LaTeX rendering.
            Inline::RawHtml(_) => {}
        }
    }

    fn resolve_url(&self, target: &LinkTarget) -> Option<String> {
        match target {
            LinkTarget::Inline { url, .. } => Some(url.clone()),
            LinkTarget::Reference { key } => {
                self.ctx.resolve_link(key).map(|def| def.url.clone())
            }
        }
    }

    fn link(&mut self, content: &[Inline], target: &LinkTarget) {
        match self.resolve_url(target) {
            Some(url) => {
                self.out
                    .push_str(&format!("\\href{{{}}}{{", escape_url(&url)));
                self.inlines(content);
                self.out.push('}');
            }
            None => {
                let LinkTarget::Reference { key } = target else {
                    return;
                };
                self.out.push('[');
                self.inlines(content);
                self.out.push(']');
                let text = plain_text(content);
                if text != *key {
                    self.out
                        .push_str(&format!("[{}]", escape_latex(key)));
                }
            }
        }
    }

    /// LaTeX footnotes inline their content at the reference site.
    fn footnote_ref(&mut self, key: &str) {
        match self.ctx.document.footnotes.get(key) {
            Some(blocks) => {
                self.out.push_str("\\footnote{");
                let mut first = true;
                for block in blocks {
                    if let BlockKind::Paragraph { content } = &block.kind {
                        if !first {
                            self.out.push(' ');
                        }
                        self.inlines(content);
                        first = false;
                    }
                }
                self.out.push('}');
            }
            None => self
                .out
                .push_str(&format!("[\\^{}]", escape_latex(key))),
        }
    }

    fn citation_ref(&mut self, key: &str) {
        if self.ctx.document.citations.contains_key(key) {
            self.out.push_str(&format!("\\cite{{{key}}}"));
        } else {
            self.out
                .push_str(&format!("[\\#{}]", escape_latex(key)));
        }
    }

    /// Emit a thebibliography environment for referenced citations.
    fn bibliography(&mut self) {
        if self.notes.citations.is_empty() {
            return;
        }
        let count = self.notes.citations.len();
        self.out.push_str(&format!(
            "\\begin{{thebibliography}}{{{count}}}\n"
        ));
        let keys = self.notes.citations.clone();
        for key in &keys {
            self.out.push_str(&format!("\\bibitem{{{key}}} "));
            if let Some(content) = self.ctx.document.citations.get(key) {
                self.inlines(content);
            }
            self.out.push('\n');
        }
        self.out.push_str("\\end{thebibliography}\n\n");
    }
}

/// Escape LaTeX special characters in text.
fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 10);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '#' | '$' | '%' | '&' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a URL for `\href`/`\includegraphics` arguments.
fn escape_url(url: &str) -> String {
    url.replace('%', "\\%").replace('#', "\\#")
}

/// Translate common HTML entities to their LaTeX form.
fn entity_to_latex(entity: &str) -> String {
    match entity {
        "&amp;" => "\\&".to_string(),
        "&lt;" => "<".to_string(),
        "&gt;" => ">".to_string(),
        "&quot;" => "\"".to_string(),
        "&nbsp;" => "~".to_string(),
        "&mdash;" => "---".to_string(),
        "&ndash;" => "--".to_string(),
        "&hellip;" => "\\ldots{}".to_string(),
        other => escape_latex(other.trim_start_matches('&').trim_end_matches(';')),
    }
}
