//! CFI (Canonical Fragment Identifier) types
//!
//! Format: epubcfi(/6/4[chap01ref]!/4/2/22/3:268)
//!
//! Only the first two steps (package spine + spine item) and the terminal
//! character offset are interpreted outside the algebra. Everything else is
//! resolved against a live section document by [`super::CfiAlgebra`].
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CfiError;
use crate::xpointer::{cfi_step_to_spine_index, spine_index_to_cfi_step};

/// Step of the package document that points at the `<spine>` element
pub const SPINE_STEP: u32 = 6;

/// A complete EPUB CFI, either collapsed (a point) or a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cfi {
    /// Parent path (the whole path for a collapsed CFI)
    pub path: CfiPath,
    /// Start and end sub-paths, relative to `path`
    pub range: Option<CfiRange>,
}

/// A CFI path (sequence of steps)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfiPath {
    /// Steps in this path
    pub steps: Vec<CfiStep>,
    /// Optional character offset at the end
    pub character_offset: Option<CharacterOffset>,
}

/// A CFI range (for text selections)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfiRange {
    /// Start of the range (relative path from common ancestor)
    pub start: CfiPath,
    /// End of the range (relative path from common ancestor)
    pub end: CfiPath,
}

/// A single step in a CFI path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfiStep {
    /// The step type (child index or indirection)
    pub step_type: StepType,
    /// Optional ID assertion [id]
    pub id_assertion: Option<String>,
    /// Optional text assertion (side bias)
    pub text_assertion: Option<TextAssertion>,
}

/// Type of CFI step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// Child step: even values address elements, odd values text slots
    Element(u32),
    /// Indirection step (!) - steps into a referenced document
    Indirection,
}

/// Text location assertion for disambiguation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAssertion {
    /// Text before the location
    pub prefix: Option<String>,
    /// Text after the location
    pub suffix: Option<String>,
    /// Additional parameters (e.g. `s=b` side bias)
    pub parameters: Vec<(String, String)>,
}

/// Character offset within a text slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterOffset {
    /// The character index (0-based)
    pub offset: u32,
    /// Optional text assertion for validation
    pub assertion: Option<TextAssertion>,
}

impl Cfi {
    /// Create a collapsed CFI from a path
    pub fn new(path: CfiPath) -> Self {
        Self { path, range: None }
    }

    /// Create a range CFI
    pub fn with_range(path: CfiPath, range: CfiRange) -> Self {
        Self {
            path,
            range: Some(range),
        }
    }

    /// Check if this CFI represents a range (text selection)
    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }

    /// Raw value of the spine item step (`/6/N` -> `N`)
    pub fn spine_step(&self) -> Option<u32> {
        match self.path.steps.as_slice() {
            [first, second, ..] if first.step_type == StepType::Element(SPINE_STEP) => {
                second.element_index()
            }
            _ => None,
        }
    }

    /// Zero-based spine index encoded by the spine item step
    pub fn spine_index(&self) -> Option<usize> {
        self.spine_step().and_then(cfi_step_to_spine_index)
    }

    /// Replace the package steps so the CFI points into `spine_index`.
    ///
    /// A CFI that carries no package steps (a bare content path) gets
    /// `/6/N!` prepended. Fails when the step would not fit a `u32`.
    pub fn set_spine_index(&mut self, spine_index: usize) -> Result<(), CfiError> {
        let step = spine_index_to_cfi_step(spine_index).ok_or_else(|| {
            CfiError::InvalidStep(format!("spine index {} has no step", spine_index))
        })?;
        if self.spine_step().is_some() {
            self.path.steps[1].step_type = StepType::Element(step);
            return Ok(());
        }

        let mut steps = vec![
            CfiStep::element(SPINE_STEP),
            CfiStep::element(step),
            CfiStep::indirection(),
        ];
        steps.append(&mut self.path.steps);
        self.path.steps = steps;
        Ok(())
    }

    /// Character offset at the end of the (collapsed) location
    pub fn terminal_offset(&self) -> Option<u32> {
        match &self.range {
            Some(range) => range.start.character_offset.as_ref().map(|o| o.offset),
            None => self.path.character_offset.as_ref().map(|o| o.offset),
        }
    }
}

impl CfiPath {
    /// Create a path with steps
    pub fn with_steps(steps: Vec<CfiStep>) -> Self {
        Self {
            steps,
            character_offset: None,
        }
    }

    /// Add a step to the path
    pub fn push(&mut self, step: CfiStep) {
        self.steps.push(step);
    }

    /// Set the character offset
    pub fn set_character_offset(&mut self, offset: u32) {
        self.character_offset = Some(CharacterOffset {
            offset,
            assertion: None,
        });
    }

    /// Steps inside the content document (after the last indirection)
    pub fn content_steps(&self) -> &[CfiStep] {
        match self.steps.iter().rposition(CfiStep::is_indirection) {
            Some(pos) => &self.steps[pos + 1..],
            None => &self.steps,
        }
    }
}

impl CfiStep {
    /// Create an element step
    pub fn element(index: u32) -> Self {
        Self {
            step_type: StepType::Element(index),
            id_assertion: None,
            text_assertion: None,
        }
    }

    /// Create an indirection step
    pub fn indirection() -> Self {
        Self {
            step_type: StepType::Indirection,
            id_assertion: None,
            text_assertion: None,
        }
    }

    /// Check if this is an indirection step
    pub fn is_indirection(&self) -> bool {
        matches!(self.step_type, StepType::Indirection)
    }

    /// Get the child index if this is an element step
    pub fn element_index(&self) -> Option<u32> {
        match self.step_type {
            StepType::Element(n) => Some(n),
            StepType::Indirection => None,
        }
    }
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({}", self.path)?;
        if let Some(ref range) = self.range {
            write!(f, ",{},{}", range.start, range.end)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for CfiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        if let Some(ref offset) = self.character_offset {
            write!(f, ":{}", offset.offset)?;
            if let Some(ref assertion) = offset.assertion {
                write!(f, "{}", assertion)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CfiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step_type {
            StepType::Element(n) => write!(f, "/{}", n)?,
            StepType::Indirection => write!(f, "!")?,
        }
        if let Some(ref id) = self.id_assertion {
            write!(f, "[{}]", escape_assertion(id))?;
        }
        if let Some(ref assertion) = self.text_assertion {
            write!(f, "{}", assertion)?;
        }
        Ok(())
    }
}

impl fmt::Display for TextAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(ref prefix) = self.prefix {
            write!(f, "{}", escape_assertion(prefix))?;
        }
        if self.prefix.is_some() || self.suffix.is_some() {
            write!(f, ",")?;
        }
        if let Some(ref suffix) = self.suffix {
            write!(f, "{}", escape_assertion(suffix))?;
        }
        for (key, value) in &self.parameters {
            write!(f, ";{}={}", key, value)?;
        }
        write!(f, "]")
    }
}

/// Escape CFI special characters inside an assertion with `^`
fn escape_assertion(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '^' | '[' | ']' | '(' | ')' | ',' | ';' | '=') {
            escaped.push('^');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spine_path(spine_step: u32) -> CfiPath {
        CfiPath::with_steps(vec![
            CfiStep::element(6),
            CfiStep::element(spine_step),
            CfiStep::indirection(),
            CfiStep::element(4),
            CfiStep::element(2),
        ])
    }

    #[test]
    fn test_simple_cfi_display() {
        let cfi = Cfi::new(spine_path(4));
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2)");
    }

    #[test]
    fn test_cfi_with_character_offset() {
        let mut path = spine_path(4);
        path.push(CfiStep::element(1));
        path.set_character_offset(42);

        let cfi = Cfi::new(path);
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2/1:42)");
        assert_eq!(cfi.terminal_offset(), Some(42));
    }

    #[test]
    fn test_spine_index_extraction() {
        // /6/8 -> 8/2 - 1 = 3
        let cfi = Cfi::new(spine_path(8));
        assert_eq!(cfi.spine_step(), Some(8));
        assert_eq!(cfi.spine_index(), Some(3));

        let bare = Cfi::new(CfiPath::with_steps(vec![CfiStep::element(4)]));
        assert_eq!(bare.spine_index(), None);
    }

    #[test]
    fn test_set_spine_index_rewrites_step() {
        let mut cfi = Cfi::new(spine_path(2));
        cfi.set_spine_index(3).unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/8!/4/2)");
    }

    #[test]
    fn test_set_spine_index_rejects_overflow() {
        let mut cfi = Cfi::new(spine_path(2));
        assert!(matches!(
            cfi.set_spine_index(2147483648),
            Err(CfiError::InvalidStep(_))
        ));
        assert_eq!(cfi.spine_index(), Some(0));
    }

    #[test]
    fn test_set_spine_index_prepends_package_steps() {
        let mut cfi = Cfi::new(CfiPath::with_steps(vec![
            CfiStep::element(4),
            CfiStep::element(2),
        ]));
        cfi.set_spine_index(0).unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/2!/4/2)");
    }

    #[test]
    fn test_content_steps_skip_package_path() {
        let path = spine_path(4);
        let content: Vec<_> = path
            .content_steps()
            .iter()
            .filter_map(CfiStep::element_index)
            .collect();
        assert_eq!(content, vec![4, 2]);
    }

    #[test]
    fn test_assertion_escaping() {
        let mut step = CfiStep::element(2);
        step.id_assertion = Some("a]b".to_string());
        assert_eq!(step.to_string(), "/2[a^]b]");
    }
}
