//! Amnesia XPointer bridge
//!
//! Lets a CFI-addressed EPUB renderer take part in XPointer-based progress
//! sync, and keeps its annotation overlays in step with lazily loaded
//! sections.
//!
//! # Modules
//!
//! - `cfi`: CFI values, parser and the resolving algebra
//! - `document`: Section documents and DOM positions
//! - `xpointer`: XPointer values and the pointer path builder
//! - `translator`: CFI <-> XPointer conversion
//! - `overlay`: Annotation queue and overlay synchronizer

pub mod cfi;
pub mod config;
pub mod document;
pub mod error;
pub mod overlay;
pub mod translator;
pub mod xpointer;

pub use config::{Config, OverlayTiming};
pub use error::{OverlayError, Result, TranslateError};
pub use overlay::{
    AnnotationStyle, OverlayRenderer, OverlaySynchronizer, PendingAnnotation, SectionEvent,
    SubmitOutcome,
};
pub use translator::{LocationTranslator, XPointerLocation};
pub use xpointer::normalize_xpointer;
