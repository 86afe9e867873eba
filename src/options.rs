//! Conversion options, output formats, and smart-typography languages.
//!
//! The original engine drove everything through integer bitmasks and format
//! constants; here each flag is a named boolean on [`Options`] and the format
//! and language enumerations are closed enums. The legacy integer encodings
//! survive only as mapping methods for serialization boundaries.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Output format for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// HTML fragment or complete document
    Html,
    /// EPUB 3 package (zip)
    Epub,
    /// LaTeX (article-style)
    Latex,
    /// LaTeX with the beamer document class
    Beamer,
    /// LaTeX with the memoir document class
    Memoir,
    /// Flat OpenDocument text (single XML file)
    Fodt,
    /// OpenDocument text package (zip)
    Odf,
    /// TextBundle package (zip, stored entries)
    TextBundle,
    /// TextBundle package (zip, deflated entries)
    TextBundleCompressed,
    /// OPML outline
    Opml,
    /// iThoughts mind map package (zip)
    Itmz,
    /// MultiMarkdown round-trip
    Mmd,
    /// HTML with referenced assets embedded as data URIs
    HtmlWithAssets,
}

impl Format {
    /// All formats, in legacy-code order.
    pub const ALL: [Format; 13] = [
        Format::Html,
        Format::Epub,
        Format::Latex,
        Format::Beamer,
        Format::Memoir,
        Format::Fodt,
        Format::Odf,
        Format::TextBundle,
        Format::TextBundleCompressed,
        Format::Opml,
        Format::Itmz,
        Format::Mmd,
        Format::HtmlWithAssets,
    ];

    /// The integer constant the legacy engine used for this format.
    ///
    /// Only meaningful at serialization boundaries (e.g. wire protocols
    /// that speak the old encoding); nothing inside the pipeline uses it.
    pub fn legacy_code(self) -> i16 {
        Format::ALL.iter().position(|&f| f == self).unwrap_or(0) as i16
    }

    /// Look up a format from its legacy integer constant.
    pub fn from_legacy_code(code: i16) -> Option<Format> {
        Format::ALL.get(usize::try_from(code).ok()?).copied()
    }

    /// Canonical lowercase name, as accepted by the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Epub => "epub",
            Format::Latex => "latex",
            Format::Beamer => "beamer",
            Format::Memoir => "memoir",
            Format::Fodt => "fodt",
            Format::Odf => "odf",
            Format::TextBundle => "textbundle",
            Format::TextBundleCompressed => "textbundle-compressed",
            Format::Opml => "opml",
            Format::Itmz => "itmz",
            Format::Mmd => "mmd",
            Format::HtmlWithAssets => "html-with-assets",
        }
    }

    /// Parse a format name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Format> {
        let lower = name.to_ascii_lowercase();
        Format::ALL.iter().copied().find(|f| f.name() == lower)
    }

    /// Guess a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" | "xhtml" => Some(Format::Html),
            "epub" => Some(Format::Epub),
            "tex" | "latex" => Some(Format::Latex),
            "fodt" => Some(Format::Fodt),
            "odt" | "odf" => Some(Format::Odf),
            "textbundle" => Some(Format::TextBundle),
            "textpack" => Some(Format::TextBundleCompressed),
            "opml" => Some(Format::Opml),
            "itmz" => Some(Format::Itmz),
            "md" | "mmd" | "markdown" | "txt" => Some(Format::Mmd),
            _ => None,
        }
    }

    /// Preferred file extension for output files.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Html | Format::HtmlWithAssets => "html",
            Format::Epub => "epub",
            Format::Latex | Format::Beamer | Format::Memoir => "tex",
            Format::Fodt => "fodt",
            Format::Odf => "odt",
            Format::TextBundle => "textbundle",
            Format::TextBundleCompressed => "textpack",
            Format::Opml => "opml",
            Format::Itmz => "itmz",
            Format::Mmd => "md",
        }
    }

    /// Whether this format produces a binary package rather than text.
    ///
    /// Binary formats surface through [`crate::convert`] as
    /// [`Error::OutputNotUtf8`]; use [`crate::convert_bytes`] instead.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Format::Epub
                | Format::Odf
                | Format::TextBundle
                | Format::TextBundleCompressed
                | Format::Itmz
        )
    }
}

/// Smart-typography language, selecting the quotation style.
///
/// A per-conversion field on [`Options`], not process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Dutch,
    French,
    German,
    Spanish,
    Swedish,
}

/// Directional quote characters for one language.
#[derive(Debug, Clone, Copy)]
pub struct QuoteStyle {
    pub double_open: &'static str,
    pub double_close: &'static str,
    pub single_open: &'static str,
    pub single_close: &'static str,
}

impl Language {
    /// Parse a language name or ISO 639-1 code (case-insensitive).
    pub fn from_name(name: &str) -> Option<Language> {
        match name.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Some(Language::English),
            "dutch" | "nl" => Some(Language::Dutch),
            "french" | "fr" => Some(Language::French),
            "german" | "de" => Some(Language::German),
            "spanish" | "es" => Some(Language::Spanish),
            "swedish" | "sv" => Some(Language::Swedish),
            _ => None,
        }
    }

    /// Quote characters used by smart typography in this language.
    pub fn quotes(self) -> QuoteStyle {
        match self {
            Language::English => QuoteStyle {
                double_open: "\u{201C}",
                double_close: "\u{201D}",
                single_open: "\u{2018}",
                single_close: "\u{2019}",
            },
            // Low-open quotes
            Language::Dutch | Language::German => QuoteStyle {
                double_open: "\u{201E}",
                double_close: "\u{201C}",
                single_open: "\u{201A}",
                single_close: "\u{2018}",
            },
            // Guillemets
            Language::French | Language::Spanish => QuoteStyle {
                double_open: "\u{AB}",
                double_close: "\u{BB}",
                single_open: "\u{2018}",
                single_close: "\u{2019}",
            },
            // Right-side quotes on both ends
            Language::Swedish => QuoteStyle {
                double_open: "\u{201D}",
                double_close: "\u{201D}",
                single_open: "\u{2019}",
                single_close: "\u{2019}",
            },
        }
    }
}

/// Conversion options.
///
/// Each flag is independent; combination rules are checked once at engine
/// construction by [`Options::validate`]. Conflicting intent flags
/// (complete vs. snippet, accept vs. reject) resolve by documented
/// tie-breaks rather than failing.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Plain-Markdown compatibility mode: disables metadata, tables,
    /// footnotes, citations, critic markup, and smart typography.
    pub compatibility: bool,
    /// Wrap output in a complete document envelope.
    pub complete: bool,
    /// Emit a fragment only. `complete` wins when both are set.
    pub snippet: bool,
    /// Smart typography: directional quotes, dashes, ellipses.
    pub smart: bool,
    /// Footnote and citation support.
    pub notes: bool,
    /// Don't attach id labels to headings.
    pub no_labels: bool,
    /// Process markdown spans inside raw HTML blocks.
    pub process_html: bool,
    /// Skip metadata detection entirely.
    pub no_metadata: bool,
    /// Obfuscate email addresses in HTML output.
    pub obfuscate: bool,
    /// CriticMarkup support.
    pub critic: bool,
    /// Accept all proposed critic changes. Wins over `critic_reject`.
    pub critic_accept: bool,
    /// Reject all proposed critic changes.
    pub critic_reject: bool,
    /// Use pseudo-random numbers for footnote anchors.
    pub random_footnotes: bool,
    /// Use pseudo-random heading labels (unless manually defined).
    pub random_labels: bool,
    /// Expand `{{name}}` transclusions from [`Options::transclusion`].
    pub transclude: bool,
    /// Treat the source as an OPML outline and convert it first.
    pub parse_opml: bool,
    /// Treat the source as an iThoughts map and convert it first.
    pub parse_itmz: bool,
    /// Smart-typography language.
    pub language: Language,
    /// In-memory transclusion sources, name → text. The pipeline performs
    /// no file I/O; callers populate this map up front.
    pub transclusion: HashMap<String, String>,
    /// In-memory assets, name → bytes, for `html-with-assets` data URIs
    /// and bundle packaging.
    pub assets: HashMap<String, Vec<u8>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// The defaults the one-shot string conversion historically used:
    /// footnotes and smart typography enabled.
    pub fn standard() -> Self {
        Self {
            smart: true,
            notes: true,
            ..Self::default()
        }
    }

    pub fn with_complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn with_snippet(mut self) -> Self {
        self.snippet = true;
        self
    }

    pub fn with_smart(mut self) -> Self {
        self.smart = true;
        self
    }

    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    pub fn with_critic(mut self) -> Self {
        self.critic = true;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Check combination rules that the engine rejects at construction.
    pub fn validate(&self) -> Result<()> {
        if self.parse_opml && self.parse_itmz {
            return Err(Error::InvalidOptions(
                "parse_opml and parse_itmz name two different source formats".into(),
            ));
        }
        Ok(())
    }

    /// Whether metadata detection runs.
    pub fn metadata_enabled(&self) -> bool {
        !self.no_metadata && !self.compatibility
    }

    /// Whether footnote/citation syntax is recognized.
    pub fn notes_enabled(&self) -> bool {
        self.notes && !self.compatibility
    }

    /// Whether smart typography runs.
    pub fn smart_enabled(&self) -> bool {
        self.smart && !self.compatibility
    }

    /// Whether table syntax is recognized.
    pub fn tables_enabled(&self) -> bool {
        !self.compatibility
    }

    /// Whether critic markup is recognized. Accept/reject imply it.
    pub fn critic_enabled(&self) -> bool {
        (self.critic || self.critic_accept || self.critic_reject) && !self.compatibility
    }

    /// Resolve the complete-vs-snippet intent for a given document.
    ///
    /// `complete` wins over `snippet`; with neither set, documents carrying
    /// metadata get the full envelope (metadata like `Title` has nowhere
    /// else to go) and bare documents render as fragments.
    pub fn effective_complete(&self, has_metadata: bool) -> bool {
        if self.complete {
            true
        } else if self.snippet {
            false
        } else {
            has_metadata
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_round_trip() {
        for format in Format::ALL {
            assert_eq!(Format::from_legacy_code(format.legacy_code()), Some(format));
        }
        assert_eq!(Format::from_legacy_code(-1), None);
        assert_eq!(Format::from_legacy_code(13), None);
    }

    #[test]
    fn format_names_round_trip() {
        for format in Format::ALL {
            assert_eq!(Format::from_name(format.name()), Some(format));
        }
        assert_eq!(Format::from_name("HTML"), Some(Format::Html));
        assert_eq!(Format::from_name("bogus"), None);
    }

    #[test]
    fn binary_formats() {
        assert!(Format::Epub.is_binary());
        assert!(Format::TextBundle.is_binary());
        assert!(!Format::Html.is_binary());
        assert!(!Format::Opml.is_binary());
        assert!(!Format::Fodt.is_binary());
    }

    #[test]
    fn conflicting_source_formats_rejected() {
        let mut options = Options::new();
        options.parse_opml = true;
        options.parse_itmz = true;
        assert!(options.validate().is_err());

        options.parse_itmz = false;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn complete_wins_over_snippet() {
        let options = Options::new().with_complete().with_snippet();
        assert!(options.effective_complete(false));
    }

    #[test]
    fn metadata_implies_complete_by_default() {
        let options = Options::new();
        assert!(options.effective_complete(true));
        assert!(!options.effective_complete(false));
        assert!(!Options::new().with_snippet().effective_complete(true));
    }

    #[test]
    fn compatibility_masks_extensions() {
        let mut options = Options::standard();
        options.critic = true;
        options.compatibility = true;
        assert!(!options.smart_enabled());
        assert!(!options.notes_enabled());
        assert!(!options.tables_enabled());
        assert!(!options.critic_enabled());
        assert!(!options.metadata_enabled());
    }

    #[test]
    fn language_lookup() {
        assert_eq!(Language::from_name("de"), Some(Language::German));
        assert_eq!(Language::from_name("German"), Some(Language::German));
        assert_eq!(Language::from_name("xx"), None);
        assert_eq!(Language::German.quotes().double_open, "\u{201E}");
    }
}
