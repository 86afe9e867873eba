//! # multimark
//!
//! A fast, lightweight MultiMarkdown-style document conversion library.
//!
//! ## Features
//!
//! - Markdown-family parsing: headings, lists, tables, code fences,
//!   blockquotes, footnotes, citations, CriticMarkup, smart typography
//! - Front-matter metadata extraction with normalized key lookup
//! - Thirteen output formats from one document tree: HTML, LaTeX (article,
//!   beamer, memoir), OPML, iThoughts, flat and packaged OpenDocument,
//!   EPUB, TextBundle, and MultiMarkdown round-trip
//! - Total parsing: malformed input degrades to literal text, never errors
//!
//! ## Quick Start
//!
//! ```
//! use multimark::{convert, Format, Options};
//!
//! let html = convert("# Hello\n\nWorld.", Format::Html, &Options::standard()).unwrap();
//! assert!(html.contains("<h1"));
//! assert!(html.contains("<p>World.</p>"));
//! ```
//!
//! ## Working with an Engine
//!
//! The [`Engine`] parses once and converts many times; metadata lookup
//! normalizes keys, so case and internal whitespace don't matter:
//!
//! ```
//! use multimark::{Engine, Format, Options};
//!
//! let engine = Engine::new("Title: Demo\n\n# Intro\n", Options::standard()).unwrap();
//! assert_eq!(engine.metadata().get("TITLE"), Some("Demo"));
//!
//! let latex = engine.convert(Format::Latex).unwrap();
//! assert!(latex.contains("\\section{Intro}"));
//! ```

pub mod emit;
pub mod engine;
pub mod error;
pub mod import;
pub mod inline;
pub mod metadata;
pub mod options;
pub mod scanner;
pub mod tree;
pub mod util;

pub use engine::Engine;
pub use error::{Error, Result};
pub use metadata::Metadata;
pub use options::{Format, Language, Options};
pub use tree::Document;

/// Convert source text to the requested format.
///
/// One-shot form of [`Engine::new`] + [`Engine::convert`]. Binary formats
/// fail with [`Error::OutputNotUtf8`]; use [`convert_bytes`] for those.
pub fn convert(source: &str, format: Format, options: &Options) -> Result<String> {
    Engine::new(source, options.clone())?.convert(format)
}

/// Convert source text to raw output bytes.
pub fn convert_bytes(source: &str, format: Format, options: &Options) -> Result<Vec<u8>> {
    Engine::new(source, options.clone())?.convert_bytes(format)
}

/// Extract only the metadata block from source text.
///
/// Never fails; a document without metadata yields an empty mapping.
pub fn extract_metadata(source: &str, options: &Options) -> Metadata {
    let (metadata, _) = metadata::extract(source, options);
    metadata
}

/// The engine version, for caller compatibility diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_convert() {
        let html = convert("# T\n", Format::Html, &Options::new()).unwrap();
        assert!(html.contains("</h1>"));
    }

    #[test]
    fn extract_metadata_only() {
        let meta = extract_metadata("Author: A\n\nbody", &Options::new());
        assert_eq!(meta.get("author"), Some("A"));
    }

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
