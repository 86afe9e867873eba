//! Error types for multimark operations.

use thiserror::Error;

/// Errors that can occur during engine construction or conversion.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid option combination: {0}")]
    InvalidOptions(String),

    #[error("output is not valid UTF-8 text; use convert_bytes for this format")]
    OutputNotUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML writing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
