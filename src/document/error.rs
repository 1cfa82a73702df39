//! Section document error types

use thiserror::Error;

/// Errors raised while creating or parsing a section document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Section index not present in the source
    #[error("Section not found: index {0}")]
    SectionNotFound(usize),

    /// Section content is not well-formed XHTML
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Section has no <body> element
    #[error("Section {0} has no body element")]
    MissingBody(usize),

    /// IO error while loading sections
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

impl From<roxmltree::Error> for DocumentError {
    fn from(err: roxmltree::Error) -> Self {
        DocumentError::ParseError(err.to_string())
    }
}
