//! Block scanner: classifies raw body text into a flat span sequence.
//!
//! The scanner walks the body line by line and groups contiguous runs into
//! [`BlockSpan`]s (headings, paragraphs, fenced code, blockquote runs,
//! list items, table runs, reference definitions), each carrying its
//! source line range. Nesting is not resolved here; the tree builder
//! consumes the flat sequence. A code fence suppresses all other block
//! recognition until its closing fence or end of input, and unmarked
//! non-blank lines lazily continue the preceding paragraph.

use memchr::memchr_iter;

use crate::options::Options;

/// 1-based inclusive line range of a span in the body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Classification of one block span.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Heading { level: u8 },
    Paragraph,
    /// Fenced code block; `info` is the text after the opening fence.
    CodeFence { info: String },
    IndentedCode,
    /// Quote markers are already stripped from the span text; the interior
    /// is re-scanned by the tree builder.
    BlockQuote,
    /// One list item. `marker_col` is the column of the list marker,
    /// `content_indent` the column where item content starts; the span
    /// text has the marker and indentation stripped.
    ListItem {
        ordered: bool,
        marker_col: usize,
        content_indent: usize,
    },
    /// Contiguous pipe-table rows, raw.
    Table,
    FootnoteDef { key: String },
    CitationDef { key: String },
    /// Link reference definition; span text is `url` or `url "title"`.
    LinkDef { key: String },
    Rule,
    RawHtml,
}

/// A classified run of source lines.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpan {
    pub kind: SpanKind,
    pub lines: LineSpan,
    pub text: String,
}

/// Scan body text into a flat, ordered span sequence. Total: any input
/// produces some classification, never an error.
pub fn scan(body: &str, options: &Options) -> Vec<BlockSpan> {
    Scanner::new(body, options).run()
}

struct Scanner<'a> {
    lines: Vec<&'a str>,
    options: &'a Options,
    spans: Vec<BlockSpan>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(body: &'a str, options: &'a Options) -> Self {
        Self {
            lines: split_lines(body),
            options,
            spans: Vec::new(),
            pos: 0,
        }
    }

    fn run(mut self) -> Vec<BlockSpan> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];

            if is_blank(line) {
                self.pos += 1;
                continue;
            }

            if let Some((fence_char, fence_len, info)) = fence_start(line) {
                self.scan_code_fence(fence_char, fence_len, info);
            } else if indent_columns(line) >= 4 {
                self.scan_indented_code();
            } else if let Some((level, content)) = atx_heading(line) {
                self.push_single(SpanKind::Heading { level }, content.to_string());
            } else if is_quote_start(line) {
                self.scan_blockquote();
            } else if is_thematic_break(line) {
                self.push_single(SpanKind::Rule, String::new());
            } else if let Some(marker) = list_marker(line) {
                self.scan_list_item(marker);
            } else if self.options.tables_enabled() && self.at_table_start() {
                self.scan_table();
            } else if let Some(key) = self.footnote_def_key(line) {
                self.scan_definition(SpanKind::FootnoteDef { key }, "[^");
            } else if let Some(key) = self.citation_def_key(line) {
                self.scan_definition(SpanKind::CitationDef { key }, "[#");
            } else if let Some((key, rest)) = link_def(line) {
                self.push_single(SpanKind::LinkDef { key }, rest.to_string());
            } else if is_html_block_start(line) {
                self.scan_raw_html();
            } else {
                self.scan_paragraph();
            }
        }
        self.spans
    }

    fn push_single(&mut self, kind: SpanKind, text: String) {
        let line = self.pos + 1;
        self.spans.push(BlockSpan {
            kind,
            lines: LineSpan::new(line, line),
            text,
        });
        self.pos += 1;
    }

    fn push(&mut self, kind: SpanKind, start: usize, end: usize, text: String) {
        self.spans.push(BlockSpan {
            kind,
            lines: LineSpan::new(start + 1, end + 1),
            text,
        });
    }

    /// Consume a fenced code block. Everything until the matching close
    /// fence (or end of input) is opaque content.
    fn scan_code_fence(&mut self, fence_char: char, fence_len: usize, info: &str) {
        let start = self.pos;
        let mut content: Vec<&str> = Vec::new();
        let mut j = self.pos + 1;
        while j < self.lines.len() {
            if is_closing_fence(self.lines[j], fence_char, fence_len) {
                break;
            }
            content.push(self.lines[j]);
            j += 1;
        }
        let end = j.min(self.lines.len().saturating_sub(1));
        self.push(
            SpanKind::CodeFence {
                info: info.trim().to_string(),
            },
            start,
            end,
            content.join("\n"),
        );
        self.pos = (j + 1).min(self.lines.len());
    }

    fn scan_indented_code(&mut self) {
        let start = self.pos;
        let mut content: Vec<String> = Vec::new();
        let mut j = self.pos;
        let mut end = self.pos;
        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) {
                // Blank lines stay inside the block only when more
                // indented content follows.
                let mut k = j + 1;
                while k < self.lines.len() && is_blank(self.lines[k]) {
                    k += 1;
                }
                if k < self.lines.len() && indent_columns(self.lines[k]) >= 4 {
                    for _ in j..k {
                        content.push(String::new());
                    }
                    j = k;
                    continue;
                }
                break;
            }
            if indent_columns(line) < 4 {
                break;
            }
            content.push(strip_columns(line, 4));
            end = j;
            j += 1;
        }
        self.push(SpanKind::IndentedCode, start, end, content.join("\n"));
        self.pos = j;
    }

    /// Consume a blockquote run, stripping one level of `>` markers.
    /// Unmarked non-blank lines lazily continue the quote.
    fn scan_blockquote(&mut self) {
        let start = self.pos;
        let mut content: Vec<String> = Vec::new();
        let mut j = self.pos;
        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) {
                break;
            }
            if is_quote_start(line) {
                content.push(strip_quote_marker(line));
            } else if !self.starts_new_block(line) {
                content.push(line.to_string());
            } else {
                break;
            }
            j += 1;
        }
        self.push(SpanKind::BlockQuote, start, j - 1, content.join("\n"));
        self.pos = j;
    }

    /// Consume one list item: the marker line plus indented continuation
    /// lines (blank-separated runs included when followed by more indented
    /// content) and lazy paragraph continuations.
    fn scan_list_item(&mut self, marker: ListMarker) {
        let start = self.pos;
        let first = self.lines[self.pos];
        let mut content: Vec<String> = vec![first[marker.content_start.min(first.len())..].to_string()];
        let mut end = self.pos;
        let mut j = self.pos + 1;

        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) {
                let mut k = j + 1;
                while k < self.lines.len() && is_blank(self.lines[k]) {
                    k += 1;
                }
                if k < self.lines.len() && indent_columns(self.lines[k]) >= marker.content_indent {
                    for _ in j..k {
                        content.push(String::new());
                    }
                    j = k;
                    continue;
                }
                break;
            }
            if indent_columns(line) >= marker.content_indent {
                content.push(strip_columns(line, marker.content_indent));
                end = j;
                j += 1;
                continue;
            }
            // Lazy paragraph continuation at shallower indent.
            if !self.starts_new_block(line) {
                content.push(line.trim_start().to_string());
                end = j;
                j += 1;
                continue;
            }
            break;
        }

        self.push(
            SpanKind::ListItem {
                ordered: marker.ordered,
                marker_col: marker.marker_col,
                content_indent: marker.content_indent,
            },
            start,
            end,
            content.join("\n"),
        );
        self.pos = j;
    }

    fn at_table_start(&self) -> bool {
        let line = self.lines[self.pos];
        has_unescaped_pipe(line)
            && self
                .lines
                .get(self.pos + 1)
                .is_some_and(|next| is_table_separator(next))
    }

    fn scan_table(&mut self) {
        let start = self.pos;
        let mut j = self.pos;
        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) || !has_unescaped_pipe(line) {
                break;
            }
            j += 1;
        }
        let text = self.lines[start..j].join("\n");
        self.push(SpanKind::Table, start, j - 1, text);
        self.pos = j;
    }

    fn footnote_def_key(&self, line: &str) -> Option<String> {
        if !self.options.notes_enabled() {
            return None;
        }
        definition_key(line, "[^")
    }

    fn citation_def_key(&self, line: &str) -> Option<String> {
        if !self.options.notes_enabled() {
            return None;
        }
        definition_key(line, "[#")
    }

    /// Consume a footnote/citation definition: the first line's remainder
    /// plus indented continuation lines.
    fn scan_definition(&mut self, kind: SpanKind, prefix: &str) {
        let start = self.pos;
        let first = self.lines[self.pos];
        let rest = first
            .trim_start()
            .strip_prefix(prefix)
            .and_then(|s| s.split_once("]:"))
            .map(|(_, rest)| rest.trim_start())
            .unwrap_or("");
        let mut content: Vec<String> = vec![rest.to_string()];
        let mut end = self.pos;
        let mut j = self.pos + 1;
        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) {
                let mut k = j + 1;
                while k < self.lines.len() && is_blank(self.lines[k]) {
                    k += 1;
                }
                if k < self.lines.len() && indent_columns(self.lines[k]) >= 4 {
                    for _ in j..k {
                        content.push(String::new());
                    }
                    j = k;
                    continue;
                }
                break;
            }
            if indent_columns(line) >= 4 {
                content.push(strip_columns(line, 4));
                end = j;
                j += 1;
                continue;
            }
            break;
        }
        self.push(kind, start, end, content.join("\n"));
        self.pos = j;
    }

    fn scan_raw_html(&mut self) {
        let start = self.pos;
        let mut j = self.pos;
        while j < self.lines.len() && !is_blank(self.lines[j]) {
            j += 1;
        }
        let text = self.lines[start..j].join("\n");
        self.push(SpanKind::RawHtml, start, j - 1, text);
        self.pos = j;
    }

    /// Consume a paragraph with lazy continuation. A setext underline
    /// directly after one or more paragraph lines promotes the run to a
    /// heading instead.
    fn scan_paragraph(&mut self) {
        let start = self.pos;
        let mut end = self.pos;
        let mut j = self.pos + 1;
        while j < self.lines.len() {
            let line = self.lines[j];
            if is_blank(line) {
                break;
            }
            if let Some(level) = setext_underline(line) {
                let text = self.lines[start..j].join("\n");
                self.push(SpanKind::Heading { level }, start, j, trim_lines(&text));
                self.pos = j + 1;
                return;
            }
            if self.starts_new_block(line) {
                break;
            }
            end = j;
            j += 1;
        }
        let text = self.lines[start..=end].join("\n");
        self.push(SpanKind::Paragraph, start, end, text);
        self.pos = end + 1;
    }

    /// Whether a line interrupts a paragraph / lazy continuation.
    fn starts_new_block(&self, line: &str) -> bool {
        if fence_start(line).is_some()
            || atx_heading(line).is_some()
            || is_quote_start(line)
            || is_thematic_break(line)
            || list_marker(line).is_some()
            || is_html_block_start(line)
        {
            return true;
        }
        if self.options.notes_enabled()
            && (definition_key(line, "[^").is_some() || definition_key(line, "[#").is_some())
        {
            return true;
        }
        false
    }
}

// ============================================================================
// Line classifiers
// ============================================================================

/// Split into lines on `\n`, dropping a trailing `\r` from each.
fn split_lines(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    for nl in memchr_iter(b'\n', bytes) {
        lines.push(trim_cr(&body[start..nl]));
        start = nl + 1;
    }
    if start < body.len() {
        lines.push(trim_cr(&body[start..]));
    }
    lines
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Indentation width in columns, tabs counting to the next multiple of 4.
fn indent_columns(line: &str) -> usize {
    let mut col = 0;
    for c in line.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 4 + 1) * 4,
            _ => break,
        }
    }
    col
}

/// Remove up to `columns` columns of leading whitespace.
fn strip_columns(line: &str, columns: usize) -> String {
    let mut col = 0;
    let mut iter = line.char_indices();
    for (i, c) in iter.by_ref() {
        if col >= columns {
            return line[i..].to_string();
        }
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 4 + 1) * 4,
            _ => return line[i..].to_string(),
        }
    }
    String::new()
}

fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `# Heading` through `###### Heading`, with optional closing hashes.
fn atx_heading(line: &str) -> Option<(u8, &str)> {
    if indent_columns(line) >= 4 {
        return None;
    }
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let content = rest.trim().trim_end_matches('#').trim_end();
    Some((level as u8, content))
}

/// `===` or `---` underline promoting the previous paragraph to a heading.
fn setext_underline(line: &str) -> Option<u8> {
    if indent_columns(line) >= 4 {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        return Some(1);
    }
    if trimmed.chars().all(|c| c == '-') {
        return Some(2);
    }
    None
}

/// Opening code fence: 3+ backticks or tildes after at most 3 spaces.
fn fence_start(line: &str) -> Option<(char, usize, &str)> {
    if indent_columns(line) >= 4 {
        return None;
    }
    let trimmed = line.trim_start();
    let fence_char = match trimmed.chars().next() {
        Some(c @ ('`' | '~')) => c,
        _ => return None,
    };
    let len = trimmed.chars().take_while(|&c| c == fence_char).count();
    if len < 3 {
        return None;
    }
    let info = &trimmed[len..];
    // An info string on a backtick fence may not contain backticks.
    if fence_char == '`' && info.contains('`') {
        return None;
    }
    Some((fence_char, len, info))
}

fn is_closing_fence(line: &str, fence_char: char, min_len: usize) -> bool {
    if indent_columns(line) >= 4 {
        return false;
    }
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == fence_char)
        && trimmed.len() >= min_len
}

fn is_quote_start(line: &str) -> bool {
    indent_columns(line) < 4 && line.trim_start().starts_with('>')
}

/// Strip one `>` marker plus one optional following space.
fn strip_quote_marker(line: &str) -> String {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('>').unwrap_or(trimmed);
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}

/// 3+ of `-`, `_`, or `*` with nothing else but spaces.
fn is_thematic_break(line: &str) -> bool {
    if indent_columns(line) >= 4 {
        return false;
    }
    let trimmed = line.trim();
    let mut marker = None;
    let mut count = 0;
    for c in trimmed.chars() {
        match c {
            ' ' | '\t' => continue,
            '-' | '_' | '*' => match marker {
                Some(m) if m != c => return false,
                _ => {
                    marker = Some(c);
                    count += 1;
                }
            },
            _ => return false,
        }
    }
    count >= 3
}

struct ListMarker {
    ordered: bool,
    marker_col: usize,
    /// Column where item content aligns, for continuation lines.
    content_indent: usize,
    /// Byte offset of the content on the marker line itself.
    content_start: usize,
}

/// `- `, `* `, `+ `, or `1. `/`1) ` with at most 3 spaces of indent.
fn list_marker(line: &str) -> Option<ListMarker> {
    let marker_col = indent_columns(line);
    if marker_col >= 4 {
        return None;
    }
    let trimmed = line.trim_start();

    let after_marker = if let Some(rest) = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('+'))
    {
        if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
            return None;
        }
        Some((false, 1, rest))
    } else {
        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || digits > 9 {
            None
        } else {
            let rest = &trimmed[digits..];
            if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
                if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
                    None
                } else {
                    Some((true, digits + 1, rest))
                }
            } else {
                None
            }
        }
    }?;

    let (ordered, marker_width, rest) = after_marker;
    let spaces = rest.chars().take_while(|&c| c == ' ').count();
    let indent_bytes = line.len() - trimmed.len();
    Some(ListMarker {
        ordered,
        marker_col,
        content_indent: marker_col + marker_width + spaces.clamp(1, 4),
        content_start: indent_bytes + marker_width + spaces.min(4),
    })
}

fn has_unescaped_pipe(line: &str) -> bool {
    let mut escaped = false;
    for c in line.chars() {
        match c {
            '\\' => escaped = !escaped,
            '|' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Table separator row: cells of `---`, `:--`, `--:`, or `:-:`.
pub(crate) fn is_table_separator(line: &str) -> bool {
    if !has_unescaped_pipe(line) {
        return false;
    }
    let trimmed = line.trim();
    let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
    let mut cells = 0;
    for cell in inner.split('|') {
        let cell = cell.trim();
        if cell.is_empty() {
            return false;
        }
        let core = cell.trim_start_matches(':').trim_end_matches(':');
        if core.is_empty() || !core.chars().all(|c| c == '-') {
            return false;
        }
        cells += 1;
    }
    cells > 0
}

/// `[^key]:` or `[#key]:` at the start of a line.
fn definition_key(line: &str, prefix: &str) -> Option<String> {
    if indent_columns(line) >= 4 {
        return None;
    }
    let rest = line.trim_start().strip_prefix(prefix)?;
    let close = rest.find("]:")?;
    let key = &rest[..close];
    if key.is_empty() || key.contains('[') {
        return None;
    }
    Some(key.to_string())
}

/// `[key]: destination "title"` on one line.
fn link_def(line: &str) -> Option<(String, &str)> {
    if indent_columns(line) >= 4 {
        return None;
    }
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('[')?;
    if rest.starts_with('^') || rest.starts_with('#') {
        return None;
    }
    let close = rest.find("]:")?;
    let key = &rest[..close];
    if key.is_empty() || key.contains('[') || key.contains(']') {
        return None;
    }
    let dest = rest[close + 2..].trim();
    if dest.is_empty() {
        return None;
    }
    Some((key.to_string(), dest))
}

fn is_html_block_start(line: &str) -> bool {
    if indent_columns(line) >= 4 {
        return false;
    }
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!')
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_default(body: &str) -> Vec<BlockSpan> {
        scan(body, &Options::standard())
    }

    fn kinds(spans: &[BlockSpan]) -> Vec<&SpanKind> {
        spans.iter().map(|s| &s.kind).collect()
    }

    #[test]
    fn headings_and_paragraphs() {
        let spans = scan_default("# Title\n\nSome text\nmore text\n\n## Sub\n");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].kind, SpanKind::Heading { level: 1 });
        assert_eq!(spans[0].text, "Title");
        assert_eq!(spans[1].kind, SpanKind::Paragraph);
        assert_eq!(spans[1].text, "Some text\nmore text");
        assert_eq!(spans[2].kind, SpanKind::Heading { level: 2 });
    }

    #[test]
    fn line_ranges_are_one_based() {
        let spans = scan_default("# Title\n\ntext\n");
        assert_eq!(spans[0].lines, LineSpan::new(1, 1));
        assert_eq!(spans[1].lines, LineSpan::new(3, 3));
    }

    #[test]
    fn atx_closing_hashes_stripped() {
        let spans = scan_default("## Sub ##\n");
        assert_eq!(spans[0].text, "Sub");
    }

    #[test]
    fn setext_heading_promotes_paragraph() {
        let spans = scan_default("Title\n=====\n\nSub\n---\n");
        assert_eq!(spans[0].kind, SpanKind::Heading { level: 1 });
        assert_eq!(spans[0].text, "Title");
        assert_eq!(spans[1].kind, SpanKind::Heading { level: 2 });
        assert_eq!(spans[1].text, "Sub");
    }

    #[test]
    fn fence_suppresses_block_recognition() {
        let spans = scan_default("```rust\n# not a heading\n> not a quote\n```\nafter\n");
        assert_eq!(spans.len(), 2);
        assert_eq!(
            spans[0].kind,
            SpanKind::CodeFence {
                info: "rust".into()
            }
        );
        assert_eq!(spans[0].text, "# not a heading\n> not a quote");
        assert_eq!(spans[1].kind, SpanKind::Paragraph);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let spans = scan_default("```\ncode\nmore\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "code\nmore");
    }

    #[test]
    fn lazy_continuation_merges_into_paragraph() {
        let spans = scan_default("first line\nsecond line\nthird line\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "first line\nsecond line\nthird line");
    }

    #[test]
    fn heading_interrupts_paragraph() {
        let spans = scan_default("text\n# Heading\n");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].kind, SpanKind::Heading { level: 1 });
    }

    #[test]
    fn blockquote_markers_stripped() {
        let spans = scan_default("> quoted\n> more\nlazy\n\nafter\n");
        assert_eq!(spans[0].kind, SpanKind::BlockQuote);
        assert_eq!(spans[0].text, "quoted\nmore\nlazy");
        assert_eq!(spans[1].kind, SpanKind::Paragraph);
    }

    #[test]
    fn nested_quote_keeps_inner_marker() {
        let spans = scan_default("> outer\n> > inner\n");
        assert_eq!(spans[0].text, "outer\n> inner");
    }

    #[test]
    fn list_items_with_indent_info() {
        let spans = scan_default("- one\n- two\n    nested content\n");
        assert_eq!(spans.len(), 2);
        assert_eq!(
            spans[0].kind,
            SpanKind::ListItem {
                ordered: false,
                marker_col: 0,
                content_indent: 2
            }
        );
        assert_eq!(spans[1].text, "two\n  nested content");
    }

    #[test]
    fn ordered_list_marker() {
        let spans = scan_default("1. first\n2. second\n");
        assert!(matches!(
            spans[0].kind,
            SpanKind::ListItem { ordered: true, .. }
        ));
        assert_eq!(spans[0].text, "first");
    }

    #[test]
    fn thematic_break_beats_list_marker() {
        let spans = scan_default("- - -\n");
        assert_eq!(spans[0].kind, SpanKind::Rule);
    }

    #[test]
    fn table_requires_separator_row() {
        let spans = scan_default("| a | b |\n|---|---|\n| 1 | 2 |\n\nnot | a table\n");
        assert_eq!(spans[0].kind, SpanKind::Table);
        assert_eq!(spans[0].lines, LineSpan::new(1, 3));
        assert_eq!(spans[1].kind, SpanKind::Paragraph);
    }

    #[test]
    fn tables_disabled_in_compatibility_mode() {
        let mut options = Options::new();
        options.compatibility = true;
        let spans = scan("| a | b |\n|---|---|\n", &options);
        assert!(spans.iter().all(|s| s.kind != SpanKind::Table));
    }

    #[test]
    fn footnote_definition_with_continuation() {
        let spans = scan_default("[^note]: first line\n    second line\n\ntext\n");
        assert_eq!(
            spans[0].kind,
            SpanKind::FootnoteDef { key: "note".into() }
        );
        assert_eq!(spans[0].text, "first line\nsecond line");
    }

    #[test]
    fn citation_and_link_definitions() {
        let spans = scan_default("[#doe]: Doe, J. (2001)\n[home]: https://example.com \"Home\"\n");
        assert_eq!(spans[0].kind, SpanKind::CitationDef { key: "doe".into() });
        assert_eq!(spans[1].kind, SpanKind::LinkDef { key: "home".into() });
        assert_eq!(spans[1].text, "https://example.com \"Home\"");
    }

    #[test]
    fn footnote_syntax_off_without_notes() {
        let spans = scan("[^note]: text\n", &Options::new());
        assert_eq!(spans[0].kind, SpanKind::Paragraph);
    }

    #[test]
    fn indented_code_block() {
        let spans = scan_default("    let x = 1;\n    let y = 2;\n\ntext\n");
        assert_eq!(spans[0].kind, SpanKind::IndentedCode);
        assert_eq!(spans[0].text, "let x = 1;\nlet y = 2;");
    }

    #[test]
    fn raw_html_block() {
        let spans = scan_default("<div class=\"x\">\ncontent\n</div>\n\ntext\n");
        assert_eq!(spans[0].kind, SpanKind::RawHtml);
        assert_eq!(spans[0].text, "<div class=\"x\">\ncontent\n</div>");
        assert_eq!(kinds(&spans).len(), 2);
    }

    #[test]
    fn crlf_input() {
        let spans = scan_default("# Title\r\n\r\ntext\r\n");
        assert_eq!(spans[0].text, "Title");
        assert_eq!(spans[1].text, "text");
    }

    #[test]
    fn empty_input() {
        assert!(scan_default("").is_empty());
        assert!(scan_default("\n\n\n").is_empty());
    }
}
