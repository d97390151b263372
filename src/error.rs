use std::path::PathBuf;

use thiserror::Error;

use crate::locator::ParagraphPath;

/// The source document could not be opened or parsed. Never retryable.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a valid docx container: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("docx is missing required part {0}")]
    MissingPart(&'static str),
    #[error("part {part} is not valid UTF-8")]
    Utf8 { part: String },
    #[error("malformed WordprocessingML: {0}")]
    Xml(String),
    #[error("malformed document: {0}")]
    Malformed(String),
}

impl From<quick_xml::Error> for DocumentError {
    fn from(e: quick_xml::Error) -> Self {
        DocumentError::Xml(e.to_string())
    }
}

/// Substitution or save failed. The input is presumed structurally bad, so
/// the engine never retries.
#[derive(Error, Debug)]
pub enum ReplacementError {
    #[error("paragraph {0} does not exist in the document")]
    UnknownParagraph(ParagraphPath),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid instance id `{0}`")]
pub struct LocatorParseError(pub String);

/// An uploaded file is not an acceptable .docx.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("file has no extension")]
    MissingExtension,
    #[error("file type '.{0}' is not allowed. Allowed types: .docx")]
    UnsupportedExtension(String),
    #[error("file is empty")]
    Empty,
    #[error("file size ({size} bytes) exceeds maximum allowed size ({max} bytes)")]
    TooLarge { size: u64, max: u64 },
    #[error("file is not a zip container")]
    NotAZip,
    #[error("docx is missing required part {0}")]
    MissingPart(&'static str),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
