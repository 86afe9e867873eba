//! Source preprocessing that runs before the parsing pipeline.
//!
//! Three transformations, all total: OPML outlines and iThoughts maps are
//! converted to markdown text before normal processing, and `{{name}}`
//! transclusion lines are expanded from the in-memory source map. Malformed
//! XML degrades to whatever was collected before the error; it never fails
//! the conversion.

mod itmz;
mod opml;
mod transclude;

use std::borrow::Cow;

use crate::options::Options;

pub use itmz::itmz_to_markdown;
pub use opml::opml_to_markdown;
pub use transclude::expand_transclusions;

/// Apply the preprocessing steps selected by the options.
pub fn preprocess<'a>(source: &'a str, options: &Options) -> Cow<'a, str> {
    let converted: Cow<'a, str> = if options.parse_opml {
        Cow::Owned(opml_to_markdown(source))
    } else if options.parse_itmz {
        Cow::Owned(itmz_to_markdown(source))
    } else {
        Cow::Borrowed(source)
    };

    if options.transclude && !options.transclusion.is_empty() {
        Cow::Owned(expand_transclusions(&converted, &options.transclusion))
    } else {
        converted
    }
}
