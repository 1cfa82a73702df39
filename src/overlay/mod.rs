//! Annotation overlay synchronization
//!
//! Annotations are keyed by CFI and drawn by the rendering engine into a
//! per-section overlay that only exists once the section has loaded. The
//! [`OverlaySynchronizer`] queues annotations per section and drains them
//! on overlay lifecycle events and staggered retries.
//!
//! ```rust,ignore
//! let sync = OverlaySynchronizer::new(renderer);
//! let outcome = sync.submit_annotation(PendingAnnotation::new(cfi, AnnotationStyle::Highlight, "#ffeb3b")).await?;
//! // later, from the rendering engine
//! sync.handle_event(SectionEvent::OverlayCreated { index: outcome.accepted_section_index });
//! ```

mod queue;
mod sync;
mod types;

pub use queue::AnnotationQueue;
pub use sync::{OverlayRenderer, OverlaySynchronizer};
pub use types::{
    AnnotationStyle, ApplyOutcome, OverlayState, PendingAnnotation, SectionEvent, SubmitOutcome,
};
