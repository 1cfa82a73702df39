//! Annotation overlay types

use serde::{Deserialize, Serialize};

/// How an annotation is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStyle {
    #[default]
    Highlight,
    Underline,
    Squiggly,
}

/// An annotation waiting to be drawn by the rendering engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAnnotation {
    /// CFI of the annotated range
    pub value: String,
    pub style: AnnotationStyle,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
}

impl PendingAnnotation {
    pub fn new(value: impl Into<String>, style: AnnotationStyle, color: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            style,
            color: color.into(),
            note: None,
            selected_text: None,
        }
    }

    /// Annotation identified only by its CFI, as used for removal
    pub fn for_value(value: impl Into<String>) -> Self {
        Self::new(value, AnnotationStyle::default(), String::new())
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }
}

/// Per-section overlay lifecycle; never goes back to `NotCreated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    #[default]
    NotCreated,
    Created,
}

/// Returned to the host when an annotation is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub accepted_section_index: usize,
}

/// What the renderer did with one apply request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// Section the annotation's CFI resolved into, if known
    pub section_index: Option<usize>,
    /// Whether the annotation is now visible; `false` when the section's
    /// overlay was not there to draw on
    pub drawn: bool,
}

/// Section lifecycle events raised by the rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SectionEvent {
    /// Content attached; the overlay may not exist yet
    Loaded { index: usize },
    /// The section's overlay is ready to draw on
    OverlayCreated { index: usize },
}

impl SectionEvent {
    pub fn index(&self) -> usize {
        match self {
            SectionEvent::Loaded { index } | SectionEvent::OverlayCreated { index } => *index,
        }
    }
}
