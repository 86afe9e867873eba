//! Inline processor: resolves inline constructs within one block span.
//!
//! Emphasis uses delimiter-run matching with nesting; unmatched delimiters
//! degrade to literal text, never an error. Smart typography substitutes
//! directional quotes by left/right context with language-specific quote
//! pairs. Critic markup is recognized only when enabled, and the
//! accept/reject options resolve edits here rather than deferring to the
//! emitters. Footnote, citation, and link references only carry their raw
//! key; resolution against the document's reference tables happens at emit
//! time.

use crate::options::{Language, Options, QuoteStyle};

/// An inline token.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    /// An HTML entity reference (`&amp;`, `&#8212;`), passed through
    /// without re-escaping.
    Entity(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Link {
        content: Vec<Inline>,
        target: LinkTarget,
    },
    Image {
        alt: String,
        target: LinkTarget,
    },
    FootnoteRef {
        key: String,
    },
    CitationRef {
        key: String,
    },
    CriticInsert(Vec<Inline>),
    CriticDelete(Vec<Inline>),
    CriticHighlight(Vec<Inline>),
    CriticComment(String),
    LineBreak,
    RawHtml(String),
}

/// Where a link or image points.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Inline { url: String, title: Option<String> },
    /// Key into the document's link reference table. Unresolved keys
    /// render as their literal source text.
    Reference { key: String },
}

/// Per-conversion inline processing configuration.
#[derive(Debug, Clone)]
pub struct InlineContext {
    pub smart: bool,
    pub notes: bool,
    pub critic: bool,
    pub critic_accept: bool,
    pub critic_reject: bool,
    pub quotes: QuoteStyle,
}

impl InlineContext {
    pub fn from_options(options: &Options, language: Language) -> Self {
        Self {
            smart: options.smart_enabled(),
            notes: options.notes_enabled(),
            critic: options.critic_enabled(),
            critic_accept: options.critic_accept,
            critic_reject: options.critic_reject,
            quotes: language.quotes(),
        }
    }
}

/// Parse one span's text into an inline token sequence. Total.
pub fn parse(text: &str, ctx: &InlineContext) -> Vec<Inline> {
    Parser::new(text, ctx).run()
}

struct Parser<'a> {
    text: &'a str,
    ctx: &'a InlineContext,
    pos: usize,
    buf: String,
    out: Vec<Inline>,
    /// Last character emitted, for smart-quote context across tokens.
    prev_char: Option<char>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, ctx: &'a InlineContext) -> Self {
        Self {
            text,
            ctx,
            pos: 0,
            buf: String::new(),
            out: Vec::new(),
            prev_char: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.text[self.pos + offset..].chars().next()
    }

    fn run(mut self) -> Vec<Inline> {
        while let Some(c) = self.peek() {
            match c {
                '\\' => self.escape(),
                '`' => self.code_span(),
                '*' | '_' => self.emphasis(c),
                '!' if self.peek_at(1) == Some('[') => self.image(),
                '[' => self.bracket(),
                '<' => self.angle(),
                '{' if self.ctx.critic => self.critic(),
                '&' => self.entity(),
                '\n' => self.newline(),
                _ => {
                    self.buf.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        self.flush();
        self.out
    }

    // --- Token emission -----------------------------------------------------

    /// Flush accumulated literal text as a Text token, applying smart
    /// typography if enabled.
    fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.buf);
        let cooked = if self.ctx.smart {
            smart_transform(&raw, self.prev_char, &self.ctx.quotes)
        } else {
            raw
        };
        self.prev_char = cooked.chars().last();
        self.out.push(Inline::Text(cooked));
    }

    fn push_token(&mut self, token: Inline) {
        self.flush();
        // Tokens read as word boundaries for quote context.
        self.prev_char = match &token {
            Inline::LineBreak => Some('\n'),
            _ => Some('a'),
        };
        self.out.push(token);
    }

    /// Push literal text that must bypass smart typography (escapes,
    /// degraded delimiters).
    fn push_literal(&mut self, literal: &str) {
        self.flush();
        self.prev_char = literal.chars().last();
        self.out.push(Inline::Text(literal.to_string()));
    }

    // --- Construct handlers -------------------------------------------------

    fn escape(&mut self) {
        match self.peek_at(1) {
            Some(c) if c.is_ascii_punctuation() => {
                self.push_literal(&c.to_string());
                self.pos += 1 + c.len_utf8();
            }
            _ => {
                self.buf.push('\\');
                self.pos += 1;
            }
        }
    }

    fn code_span(&mut self) {
        let run = run_length(self.rest(), '`');
        let after = self.pos + run;
        // Look for a closing run of exactly the same length.
        let mut j = after;
        while j < self.text.len() {
            match self.text[j..].chars().next() {
                Some('`') => {
                    let close = run_length(&self.text[j..], '`');
                    if close == run {
                        let content = &self.text[after..j];
                        self.push_token(Inline::Code(trim_code_span(content).to_string()));
                        self.pos = j + close;
                        return;
                    }
                    j += close;
                }
                Some(c) => j += c.len_utf8(),
                None => break,
            }
        }
        // Unmatched: literal backticks.
        self.push_literal(&self.text[self.pos..after]);
        self.pos = after;
    }

    fn emphasis(&mut self, delim: char) {
        let open = run_length(self.rest(), delim);
        let after = self.pos + open * delim.len_utf8();

        if !self.can_open(delim, after) {
            self.push_literal(&self.text[self.pos..after]);
            self.pos = after;
            return;
        }

        match self.find_emphasis_close(delim, after) {
            Some((close_pos, close_len)) => {
                let take = open.min(close_len).min(3);
                // Extra opener characters degrade to literal text.
                if take < open {
                    let extra = open - take;
                    self.push_literal(&self.text[self.pos..self.pos + extra]);
                }
                let inner_start = self.pos + open;
                let inner = &self.text[inner_start..close_pos];
                let children = parse(inner, self.ctx);
                let token = match take {
                    1 => Inline::Emphasis(children),
                    2 => Inline::Strong(children),
                    _ => Inline::Strong(vec![Inline::Emphasis(children)]),
                };
                self.push_token(token);
                self.pos = close_pos + take;
            }
            None => {
                self.push_literal(&self.text[self.pos..after]);
                self.pos = after;
            }
        }
    }

    /// Whether a delimiter run starting here can open emphasis: the run is
    /// followed by a non-space, and `_` additionally requires a non-word
    /// character before it (no intraword `_`).
    fn can_open(&self, delim: char, after: usize) -> bool {
        let next = self.text[after..].chars().next();
        if !matches!(next, Some(c) if !c.is_whitespace()) {
            return false;
        }
        if delim == '_' {
            let prev = self.text[..self.pos].chars().last();
            if matches!(prev, Some(c) if c.is_alphanumeric()) {
                return false;
            }
        }
        true
    }

    /// Scan forward for a closing delimiter run, skipping escapes and code
    /// spans. Returns (byte position, run length).
    fn find_emphasis_close(&self, delim: char, from: usize) -> Option<(usize, usize)> {
        let mut j = from;
        let mut prev: Option<char> = None;
        while j < self.text.len() {
            let c = self.text[j..].chars().next()?;
            match c {
                '\\' => {
                    let mut chars = self.text[j + 1..].chars();
                    match chars.next() {
                        Some(escaped) => {
                            prev = Some(escaped);
                            j += 1 + escaped.len_utf8();
                        }
                        None => break,
                    }
                }
                '`' => {
                    let run = run_length(&self.text[j..], '`');
                    let after = j + run;
                    // Skip over a closed code span entirely.
                    let mut k = after;
                    let mut closed = None;
                    while k < self.text.len() {
                        if self.text[k..].starts_with('`') {
                            let close = run_length(&self.text[k..], '`');
                            if close == run {
                                closed = Some(k + close);
                                break;
                            }
                            k += close;
                        } else {
                            k += self.text[k..].chars().next()?.len_utf8();
                        }
                    }
                    match closed {
                        Some(end) => {
                            prev = Some('`');
                            j = end;
                        }
                        None => {
                            prev = Some('`');
                            j = after;
                        }
                    }
                }
                c if c == delim => {
                    let run = run_length(&self.text[j..], delim);
                    let can_close = matches!(prev, Some(p) if !p.is_whitespace());
                    let intraword = delim == '_'
                        && matches!(
                            self.text[j + run..].chars().next(),
                            Some(n) if n.is_alphanumeric()
                        );
                    if can_close && !intraword && j > from {
                        return Some((j, run));
                    }
                    prev = Some(delim);
                    j += run;
                }
                c => {
                    prev = Some(c);
                    j += c.len_utf8();
                }
            }
        }
        None
    }

    fn image(&mut self) {
        // Past the '!'; reuse bracket parsing on the link form.
        let start = self.pos;
        self.pos += 1;
        match self.parse_link_form() {
            Some((content, target, end)) => {
                let alt = plain_text(&content);
                self.push_token(Inline::Image { alt, target });
                self.pos = end;
            }
            None => {
                self.pos = start;
                self.buf.push('!');
                self.pos += 1;
            }
        }
    }

    fn bracket(&mut self) {
        let rest = self.rest();

        if self.ctx.notes {
            // [^key] footnote reference
            if let Some(after) = rest.strip_prefix("[^")
                && let Some(close) = after.find(']')
                && close > 0
                && !after[..close].contains('[')
            {
                let key = after[..close].to_string();
                self.push_token(Inline::FootnoteRef { key });
                self.pos += 2 + close + 1;
                return;
            }
            // [#key] citation reference
            if let Some(after) = rest.strip_prefix("[#")
                && let Some(close) = after.find(']')
                && close > 0
                && !after[..close].contains('[')
            {
                let key = after[..close].to_string();
                self.push_token(Inline::CitationRef { key });
                self.pos += 2 + close + 1;
                return;
            }
        }

        match self.parse_link_form() {
            Some((content, target, end)) => {
                self.push_token(Inline::Link { content, target });
                self.pos = end;
            }
            None => {
                self.buf.push('[');
                self.pos += 1;
            }
        }
    }

    /// Parse `[text](url "title")`, `[text][key]`, or `[text]` starting at
    /// the current `[`. Returns (content, target, end position).
    fn parse_link_form(&self) -> Option<(Vec<Inline>, LinkTarget, usize)> {
        let open = self.pos;
        let close = matching_bracket(self.text, open)?;
        let inner = &self.text[open + 1..close];
        let content = parse(inner, self.ctx);

        match self.text[close + 1..].chars().next() {
            Some('(') => {
                let paren_close = matching_paren(self.text, close + 1)?;
                let dest = &self.text[close + 2..paren_close];
                let (url, title) = parse_link_destination(dest);
                Some((
                    content,
                    LinkTarget::Inline { url, title },
                    paren_close + 1,
                ))
            }
            Some('[') => {
                let ref_close = self.text[close + 2..].find(']')? + close + 2;
                let key = self.text[close + 2..ref_close].trim();
                let key = if key.is_empty() { inner.trim() } else { key };
                Some((
                    content,
                    LinkTarget::Reference {
                        key: key.to_string(),
                    },
                    ref_close + 1,
                ))
            }
            _ => Some((
                content,
                LinkTarget::Reference {
                    key: inner.trim().to_string(),
                },
                close + 1,
            )),
        }
    }

    /// `<url>`, `<addr@host>`, or a raw HTML tag.
    fn angle(&mut self) {
        let rest = self.rest();
        if let Some(close) = rest.find('>') {
            let inner = &rest[1..close];
            if !inner.is_empty() && !inner.contains(char::is_whitespace) {
                if inner.contains("://") || inner.starts_with("mailto:") {
                    let url = inner.to_string();
                    self.push_token(Inline::Link {
                        content: vec![Inline::Text(inner.to_string())],
                        target: LinkTarget::Inline { url, title: None },
                    });
                    self.pos += close + 1;
                    return;
                }
                if inner.contains('@') && inner.contains('.') && !inner.contains('/') {
                    self.push_token(Inline::Link {
                        content: vec![Inline::Text(inner.to_string())],
                        target: LinkTarget::Inline {
                            url: format!("mailto:{inner}"),
                            title: None,
                        },
                    });
                    self.pos += close + 1;
                    return;
                }
            }
            if is_html_tag(&rest[..close + 1]) {
                let tag = rest[..close + 1].to_string();
                self.push_token(Inline::RawHtml(tag));
                self.pos += close + 1;
                return;
            }
        }
        self.buf.push('<');
        self.pos += 1;
    }

    fn critic(&mut self) {
        let rest = self.rest();
        let span = critic_span(rest);
        let Some((kind, inner, len)) = span else {
            self.buf.push('{');
            self.pos += 1;
            return;
        };

        // Accept wins when both accept and reject are requested.
        if self.ctx.critic_accept {
            match kind {
                CriticKind::Insert => self.splice(inner),
                CriticKind::Delete | CriticKind::Comment => {}
                CriticKind::Substitute => {
                    let (_, new) = split_substitution(inner);
                    self.splice(new);
                }
                CriticKind::Highlight => self.splice(inner),
            }
        } else if self.ctx.critic_reject {
            match kind {
                CriticKind::Insert | CriticKind::Comment => {}
                CriticKind::Delete => self.splice(inner),
                CriticKind::Substitute => {
                    let (old, _) = split_substitution(inner);
                    self.splice(old);
                }
                CriticKind::Highlight => self.splice(inner),
            }
        } else {
            match kind {
                CriticKind::Insert => {
                    let children = parse(inner, self.ctx);
                    self.push_token(Inline::CriticInsert(children));
                }
                CriticKind::Delete => {
                    let children = parse(inner, self.ctx);
                    self.push_token(Inline::CriticDelete(children));
                }
                CriticKind::Substitute => {
                    let (old, new) = split_substitution(inner);
                    let old = parse(old, self.ctx);
                    let new = parse(new, self.ctx);
                    self.push_token(Inline::CriticDelete(old));
                    self.push_token(Inline::CriticInsert(new));
                }
                CriticKind::Highlight => {
                    let children = parse(inner, self.ctx);
                    self.push_token(Inline::CriticHighlight(children));
                }
                CriticKind::Comment => {
                    self.push_token(Inline::CriticComment(inner.to_string()));
                }
            }
        }
        self.pos += len;
    }

    /// Inline the tokens of resolved critic content.
    fn splice(&mut self, inner: &str) {
        let children = parse(inner, self.ctx);
        for child in children {
            self.push_token(child);
        }
    }

    fn entity(&mut self) {
        let rest = self.rest();
        if let Some(semi) = rest[1..].find(';')
            && semi > 0
            && semi <= 32
            && rest[1..1 + semi]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '#')
        {
            let entity = rest[..semi + 2].to_string();
            self.push_token(Inline::Entity(entity));
            self.pos += semi + 2;
            return;
        }
        self.buf.push('&');
        self.pos += 1;
    }

    fn newline(&mut self) {
        if self.buf.ends_with("  ") {
            while self.buf.ends_with(' ') {
                self.buf.pop();
            }
            self.push_token(Inline::LineBreak);
        } else if self.buf.ends_with('\\') {
            self.buf.pop();
            self.push_token(Inline::LineBreak);
        } else {
            self.buf.push('\n');
        }
        self.pos += 1;
    }
}

// ============================================================================
// Critic markup
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CriticKind {
    Insert,
    Delete,
    Substitute,
    Highlight,
    Comment,
}

/// Match a critic span at the start of `rest`. Returns the kind, the inner
/// text, and the total consumed length.
fn critic_span(rest: &str) -> Option<(CriticKind, &str, usize)> {
    const MARKERS: [(&str, &str, CriticKind); 5] = [
        ("{++", "++}", CriticKind::Insert),
        ("{--", "--}", CriticKind::Delete),
        ("{~~", "~~}", CriticKind::Substitute),
        ("{==", "==}", CriticKind::Highlight),
        ("{>>", "<<}", CriticKind::Comment),
    ];
    for (open, close, kind) in MARKERS {
        if let Some(after) = rest.strip_prefix(open)
            && let Some(end) = after.find(close)
        {
            return Some((kind, &after[..end], open.len() + end + close.len()));
        }
    }
    None
}

/// Split `old~>new` inside a substitution span.
fn split_substitution(inner: &str) -> (&str, &str) {
    match inner.find("~>") {
        Some(i) => (&inner[..i], &inner[i + 2..]),
        None => (inner, ""),
    }
}

// ============================================================================
// Smart typography
// ============================================================================

/// Replace straight quotes, dash runs, and ellipses in literal text.
///
/// `prev` carries the character preceding this text run so quote direction
/// survives token boundaries.
fn smart_transform(raw: &str, prev: Option<char>, quotes: &QuoteStyle) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut prev = prev;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if opens_quote(prev) {
                    out.push_str(quotes.double_open);
                } else {
                    out.push_str(quotes.double_close);
                }
                prev = Some('"');
            }
            '\'' => {
                if matches!(prev, Some(p) if p.is_alphanumeric()) {
                    // Apostrophe or closing single quote.
                    out.push_str(quotes.single_close);
                } else if opens_quote(prev) {
                    out.push_str(quotes.single_open);
                } else {
                    out.push_str(quotes.single_close);
                }
                prev = Some('\'');
            }
            '-' => {
                let mut run = 1;
                while chars.peek() == Some(&'-') {
                    chars.next();
                    run += 1;
                }
                match run {
                    1 => out.push('-'),
                    2 => out.push('\u{2013}'),
                    _ => out.push('\u{2014}'),
                }
                prev = Some('-');
            }
            '.' if chars.peek() == Some(&'.') => {
                let mut run = 1;
                while chars.peek() == Some(&'.') {
                    chars.next();
                    run += 1;
                }
                if run >= 3 {
                    out.push('\u{2026}');
                    for _ in 3..run {
                        out.push('.');
                    }
                } else {
                    for _ in 0..run {
                        out.push('.');
                    }
                }
                prev = Some('.');
            }
            c => {
                out.push(c);
                prev = Some(c);
            }
        }
    }
    out
}

fn opens_quote(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | '[' | '{' | '\u{2014}' | '\u{2013}'),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Length of the run of `c` at the start of `s`, in characters.
fn run_length(s: &str, c: char) -> usize {
    s.chars().take_while(|&x| x == c).count()
}

/// Strip one leading and trailing space from code span content when both
/// are present and the content isn't all spaces.
fn trim_code_span(content: &str) -> &str {
    if content.starts_with(' ')
        && content.ends_with(' ')
        && content.len() >= 2
        && !content.chars().all(|c| c == ' ')
    {
        &content[1..content.len() - 1]
    } else {
        content
    }
}

/// Find the `]` matching the `[` at `open`, honoring nesting and escapes.
fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut j = open;
    while j < text.len() {
        let c = text[j..].chars().next()?;
        match c {
            '\\' => {
                let next = text[j + 1..].chars().next();
                j += 1 + next.map_or(0, char::len_utf8);
            }
            '[' => {
                depth += 1;
                j += 1;
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
                j += 1;
            }
            c => j += c.len_utf8(),
        }
    }
    None
}

/// Find the `)` matching the `(` at `open`, honoring nesting and escapes.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut j = open;
    while j < text.len() {
        let c = text[j..].chars().next()?;
        match c {
            '\\' => {
                let next = text[j + 1..].chars().next();
                j += 1 + next.map_or(0, char::len_utf8);
            }
            '(' => {
                depth += 1;
                j += 1;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
                j += 1;
            }
            c => j += c.len_utf8(),
        }
    }
    None
}

/// Split a link destination into url and optional quoted title.
pub(crate) fn parse_link_destination(dest: &str) -> (String, Option<String>) {
    let dest = dest.trim();
    if let Some(rest) = dest.strip_prefix('<')
        && let Some(close) = rest.find('>')
    {
        let url = rest[..close].to_string();
        let title = extract_title(rest[close + 1..].trim());
        return (url, title);
    }
    match dest.find(char::is_whitespace) {
        Some(i) => {
            let url = dest[..i].to_string();
            let title = extract_title(dest[i..].trim());
            (url, title)
        }
        None => (dest.to_string(), None),
    }
}

fn extract_title(rest: &str) -> Option<String> {
    let rest = rest.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('(', ')')] {
        if let Some(inner) = rest.strip_prefix(open)
            && let Some(inner) = inner.strip_suffix(close)
        {
            return Some(inner.to_string());
        }
    }
    None
}

/// Concatenated plain text of a token sequence (for image alt text and
/// heading labels).
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_plain_text(inlines, &mut out);
    out
}

fn collect_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) | Inline::Entity(t) => out.push_str(t),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::CriticInsert(children)
            | Inline::CriticHighlight(children)
            | Inline::Link { content: children, .. } => collect_plain_text(children, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::FootnoteRef { key } => {
                out.push_str("[^");
                out.push_str(key);
                out.push(']');
            }
            Inline::CitationRef { key } => {
                out.push_str("[#");
                out.push_str(key);
                out.push(']');
            }
            Inline::LineBreak => out.push(' '),
            Inline::CriticDelete(_) | Inline::CriticComment(_) | Inline::RawHtml(_) => {}
        }
    }
}

fn is_html_tag(s: &str) -> bool {
    let inner = s.strip_prefix('<').and_then(|s| s.strip_suffix('>'));
    let Some(inner) = inner else { return false };
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    let inner = inner.strip_suffix('/').unwrap_or(inner);
    let mut chars = inner.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
}

// ============================================================================
// Tests
// ============================================================================
