//! CFI (Canonical Fragment Identifier) algebra
//!
//! The reflowable renderer names positions with EPUB CFIs. This module
//! parses them and resolves them against live section documents.
//!
//! # Example CFI
//!
//! ```text
//! epubcfi(/6/4[chapter1]!/4/2/1:42)
//!         │  │          │ │ │ │ └── character offset 42
//!         │  │          │ │ │ └──── text slot (odd = text)
//!         │  │          │ │ └────── element index
//!         │  │          │ └──────── element index (body)
//!         │  │          └────────── indirection (into content doc)
//!         │  └───────────────────── spine item: (index + 1) * 2
//!         └──────────────────────── spine element
//! ```
//!
//! The translator talks to the algebra only through [`CfiAlgebra`], so a
//! host can plug in the renderer's own implementation. [`EpubCfi`] is the
//! default.

mod parser;
mod resolver;
mod types;

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::document::DomRange;

pub use parser::{parse, CfiParseError};
pub use types::{
    CharacterOffset, Cfi, CfiPath, CfiRange, CfiStep, StepType, TextAssertion, SPINE_STEP,
};

/// Errors raised by the CFI algebra
#[derive(Debug, Error)]
pub enum CfiError {
    #[error("Invalid CFI: {0}")]
    Parse(#[from] CfiParseError),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Step /{step} at depth {depth} does not exist")]
    StepOutOfRange { step: u32, depth: usize },

    #[error("CFI resolution failed: {0}")]
    Unresolvable(String),
}

/// CFI operations the location translator depends on
pub trait CfiAlgebra: Send + Sync {
    /// Parse a CFI string
    fn parse(&self, input: &str) -> Result<Cfi, CfiError>;

    /// Collapse a range CFI to its start (or end) point
    fn collapse(&self, cfi: &Cfi, to_end: bool) -> Cfi;

    /// Resolve a CFI to a live range in `doc`
    fn to_range<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        cfi: &Cfi,
    ) -> Result<DomRange<'a, 'input>, CfiError>;

    /// Resolve a CFI to the element holding its location
    fn to_element<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        cfi: &Cfi,
    ) -> Result<Node<'a, 'input>, CfiError>;

    /// Produce a CFI for a live range
    fn from_range(&self, range: &DomRange<'_, '_>) -> Result<Cfi, CfiError>;
}

/// Default CFI algebra over `roxmltree` section documents
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubCfi;

impl CfiAlgebra for EpubCfi {
    fn parse(&self, input: &str) -> Result<Cfi, CfiError> {
        Ok(parser::parse(input)?)
    }

    fn collapse(&self, cfi: &Cfi, to_end: bool) -> Cfi {
        resolver::collapse(cfi, to_end)
    }

    fn to_range<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        cfi: &Cfi,
    ) -> Result<DomRange<'a, 'input>, CfiError> {
        resolver::to_range(doc, cfi)
    }

    fn to_element<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        cfi: &Cfi,
    ) -> Result<Node<'a, 'input>, CfiError> {
        resolver::to_element(doc, cfi)
    }

    fn from_range(&self, range: &DomRange<'_, '_>) -> Result<Cfi, CfiError> {
        resolver::from_range(range)
    }
}
