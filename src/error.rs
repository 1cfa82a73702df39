//! Error types for location translation and overlay sync
//!
//! Translation errors always reach the caller. Overlay errors are raised by
//! the rendering engine during annotation drains and are contained by the
//! synchronizer.

use thiserror::Error;

use crate::cfi::CfiError;
use crate::document::DocumentError;

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors surfaced by CFI <-> XPointer conversion
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Unparseable CFI or XPointer string
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Spine index outside the loaded book
    #[error("Spine index {index} out of bounds (section count: {count})")]
    OutOfBounds { index: usize, count: usize },

    /// Element path does not exist in the section document
    #[error("Element path unresolvable: {0}")]
    Unresolvable(String),

    /// The CFI algebra could not produce a CFI for the resolved position
    #[error("No CFI algebra result: {0}")]
    NoCfiResult(#[source] CfiError),

    /// Section document could not be created or parsed
    #[error("Section unavailable: {0}")]
    SectionUnavailable(#[from] DocumentError),
}

/// Errors raised by the rendering engine while drawing annotations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// The section's document range is not constructible yet
    #[error("Range not ready: {0}")]
    TransientResolution(String),

    /// Any other rendering-engine failure
    #[error("Renderer error: {0}")]
    Renderer(String),
}

impl OverlayError {
    /// Whether a later drain attempt can be expected to succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, OverlayError::TransientResolution(_))
    }
}

impl From<CfiError> for TranslateError {
    fn from(err: CfiError) -> Self {
        match err {
            CfiError::Parse(e) => TranslateError::MalformedInput(e.to_string()),
            other => TranslateError::Unresolvable(other.to_string()),
        }
    }
}
