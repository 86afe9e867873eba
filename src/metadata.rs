//! Front-matter metadata extraction.
//!
//! A document may open with a run of `Key: value` lines, optionally fenced
//! by `---` markers. Keys are normalized by stripping all whitespace and
//! lowercasing, so `meta.get("Author")`, `meta.get("author")`, and
//! `meta.get(" AU thor ")` all hit the same entry. Extraction never fails:
//! a line that doesn't fit the grammar ends the block and stays in the body.

use std::collections::HashMap;

use crate::options::Options;

/// Extracted document metadata.
///
/// Lookup uses normalized keys; iteration yields the original keys in
/// insertion order so the metadata block can be re-emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

/// Normalize a metadata key: remove all whitespace, lowercase the rest.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up a value. The query key is normalized with the same rule as
    /// stored keys, so case and internal whitespace don't matter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(&normalize_key(key))
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&normalize_key(key))
    }

    /// Insert a key/value pair. A duplicate normalized key replaces the
    /// earlier value in place (last occurrence wins, position preserved).
    pub fn insert(&mut self, raw_key: impl Into<String>, value: impl Into<String>) {
        let raw_key = raw_key.into();
        let normalized = normalize_key(&raw_key);
        match self.index.get(&normalized) {
            Some(&i) => self.entries[i].1 = value.into(),
            None => {
                self.index.insert(normalized, self.entries.len());
                self.entries.push((raw_key, value.into()));
            }
        }
    }

    /// Original keys and values, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Whether a line can open or continue a metadata block as `Key: value`.
///
/// The key must start at column zero, be non-empty, and contain only
/// letters, digits, spaces, and a few separator characters. This keeps
/// ordinary prose (and URLs, whose colon follows a scheme that would
/// otherwise match) from being eaten as metadata.
fn split_key_line(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    if key.is_empty() || key.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    if !key
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '\t' | '-' | '_' | '.'))
    {
        return None;
    }
    // "http://..." has an empty-looking value starting with "//"
    let value = &line[colon + 1..];
    if value.starts_with("//") {
        return None;
    }
    Some((key, value))
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed == "..."
}

/// Extract a leading metadata block.
///
/// Returns the parsed mapping and the remaining body text. When metadata
/// is disabled by options, or the document doesn't open with a metadata
/// block, the mapping is empty and the body is the whole input.
pub fn extract<'a>(source: &'a str, options: &Options) -> (Metadata, &'a str) {
    if !options.metadata_enabled() {
        return (Metadata::new(), source);
    }
    parse_block(source)
}

fn parse_block(source: &str) -> (Metadata, &str) {
    let mut metadata = Metadata::new();
    let mut offset = 0;
    let mut lines = LineCursor::new(source);

    // Optional opening fence
    if let Some(line) = lines.peek()
        && is_fence(line)
    {
        lines.advance();
    }

    // The first content line must look like metadata, or there is no block.
    match lines.peek() {
        Some(line) if split_key_line(line).is_some() => {}
        _ => return (Metadata::new(), source),
    }

    let mut current: Option<(String, String)> = None;

    loop {
        let Some(line) = lines.peek() else {
            offset = source.len();
            break;
        };

        if line.trim().is_empty() {
            // Blank line ends the block; consume it.
            lines.advance();
            offset = lines.offset();
            break;
        }

        if is_fence(line) {
            lines.advance();
            offset = lines.offset();
            break;
        }

        if line.starts_with([' ', '\t']) && current.is_some() {
            // Continuation line: append with a single space.
            if let Some((_, value)) = current.as_mut() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
            }
            lines.advance();
            continue;
        }

        match split_key_line(line) {
            Some((key, value)) => {
                if let Some((k, v)) = current.take() {
                    metadata.insert(k, v);
                }
                current = Some((key.trim().to_string(), value.trim().to_string()));
                lines.advance();
            }
            None => {
                // Malformed line: push it back into the body.
                offset = lines.offset();
                break;
            }
        }
    }

    if let Some((k, v)) = current.take() {
        metadata.insert(k, v);
    }

    if metadata.is_empty() {
        return (Metadata::new(), source);
    }

    (metadata, &source[offset..])
}

/// Line iterator that tracks the byte offset of the next unread line.
struct LineCursor<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> LineCursor<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        if self.offset >= self.source.len() {
            return None;
        }
        let rest = &self.source[self.offset..];
        Some(rest.split('\n').next().unwrap_or(rest))
    }

    fn advance(&mut self) {
        let rest = &self.source[self.offset..];
        match rest.find('\n') {
            Some(i) => self.offset += i + 1,
            None => self.offset = self.source.len(),
        }
    }

    /// Byte offset of the next unread line.
    fn offset(&self) -> usize {
        self.offset
    }
}
