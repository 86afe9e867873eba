//! The conversion engine: an owned handle over one parsed document.
//!
//! Construction runs the front half of the pipeline (source preprocessing,
//! metadata extraction, block scanning, tree building), so repeated
//! `convert` calls for different formats reuse the same document.
//! Dropping the engine releases everything; there is no explicit free.

use crate::error::{Error, Result};
use crate::inline::InlineContext;
use crate::metadata::{self, Metadata};
use crate::options::{Format, Language, Options};
use crate::tree::{self, Document};
use crate::{emit, import, scanner, util};

/// A parsed document plus its conversion options.
///
/// Engines hold no shared mutable state; independent engines may run on
/// independent threads freely.
#[derive(Debug, Clone)]
pub struct Engine {
    options: Options,
    metadata: Metadata,
    document: Document,
    seed: u64,
}

impl Engine {
    /// Parse `source` under `options`.
    ///
    /// Fails only on invalid option combinations; malformed input text
    /// never fails, it degrades to literal content.
    pub fn new(source: &str, options: Options) -> Result<Self> {
        options.validate()?;

        let preprocessed = import::preprocess(source, &options);
        let (metadata, body) = metadata::extract(&preprocessed, &options);

        // A `Quotes Language` metadata key overrides the configured
        // smart-typography language for this document.
        let language = metadata
            .get("quoteslanguage")
            .and_then(Language::from_name)
            .unwrap_or(options.language);
        let inline_ctx = InlineContext::from_options(&options, language);

        let spans = scanner::scan(body, &options);
        let document = tree::build(spans, &options, &inline_ctx);

        Ok(Self {
            options,
            metadata,
            document,
            seed: util::time_seed_nanos(),
        })
    }

    /// Convert to text output.
    ///
    /// Binary formats (EPUB, ODF, TextBundle, ITMZ) fail here with
    /// [`Error::OutputNotUtf8`]; use [`Engine::convert_bytes`] for those.
    pub fn convert(&self, format: Format) -> Result<String> {
        String::from_utf8(self.convert_bytes(format)?).map_err(|_| Error::OutputNotUtf8)
    }

    /// Convert to raw output bytes.
    pub fn convert_bytes(&self, format: Format) -> Result<Vec<u8>> {
        let ctx = emit::EmitContext {
            document: &self.document,
            metadata: &self.metadata,
            options: &self.options,
            seed: self.seed,
        };
        emit::emit(format, &ctx)
    }

    /// The document's extracted metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The built document tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_invalid_options() {
        let mut options = Options::new();
        options.parse_opml = true;
        options.parse_itmz = true;
        assert!(matches!(
            Engine::new("x", options),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn repeated_conversions_reuse_the_document() {
        let engine = Engine::new("# H\n\ntext\n", Options::new()).unwrap();
        let a = engine.convert(Format::Html).unwrap();
        let b = engine.convert(Format::Html).unwrap();
        assert_eq!(a, b);
        let latex = engine.convert(Format::Latex).unwrap();
        assert!(latex.contains("\\section{H}"));
    }

    #[test]
    fn quotes_language_metadata_overrides_option() {
        let engine = Engine::new(
            "Quotes Language: german\n\n\"zitat\"\n",
            Options::standard(),
        )
        .unwrap();
        let html = engine.convert(Format::Html).unwrap();
        assert!(html.contains("\u{201E}zitat\u{201C}"));
    }

    #[test]
    fn opml_source_preprocessing() {
        let mut options = Options::new();
        options.parse_opml = true;
        let engine = Engine::new(
            "<opml><body><outline text=\"From Outline\"/></body></opml>",
            options,
        )
        .unwrap();
        let html = engine.convert(Format::Html).unwrap();
        assert!(html.contains("From Outline</h1>"));
    }

    #[test]
    fn transclusion_via_options_map() {
        let mut options = Options::new();
        options.transclude = true;
        options
            .transclusion
            .insert("chapter.md".into(), "transcluded body".into());
        let engine = Engine::new("intro\n\n{{chapter.md}}\n", options).unwrap();
        let html = engine.convert(Format::Html).unwrap();
        assert!(html.contains("transcluded body"));
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }
}
