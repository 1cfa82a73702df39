//! Overlay synchronizer
//!
//! Makes sure every submitted annotation is eventually drawn once its
//! section's overlay exists, even though sections load lazily and out of
//! order relative to submissions.
//!
//! Submission protocol:
//! 1. Try to draw immediately; the renderer reports the section index.
//! 2. Queue the annotation under that index regardless of the outcome.
//! 3. If the section's overlay exists, (re)start a short debounce drain.
//!    Otherwise schedule two fallback drains, one short and one long.
//!
//! `OverlayCreated` marks the section ready and drains it after a minimal
//! delay. `Loaded` re-drains queued annotations after a short delay without
//! changing the section state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::queue::AnnotationQueue;
use super::types::{
    ApplyOutcome, OverlayState, PendingAnnotation, SectionEvent, SubmitOutcome,
};
use crate::config::OverlayTiming;
use crate::error::{OverlayError, TranslateError};

/// The rendering engine's annotation drawing layer
#[async_trait]
pub trait OverlayRenderer: Send + Sync + 'static {
    /// Draw (or with `remove`, erase) an annotation.
    ///
    /// Must be idempotent per `value`: drawing an already drawn value does
    /// not duplicate it and erasing an absent value is a no-op. Fails with
    /// [`OverlayError::TransientResolution`] while the range cannot be built.
    async fn apply(
        &self,
        annotation: &PendingAnnotation,
        remove: bool,
    ) -> Result<ApplyOutcome, OverlayError>;
}

#[async_trait]
impl<T: OverlayRenderer + ?Sized> OverlayRenderer for Arc<T> {
    async fn apply(
        &self,
        annotation: &PendingAnnotation,
        remove: bool,
    ) -> Result<ApplyOutcome, OverlayError> {
        (**self).apply(annotation, remove).await
    }
}

/// Keeps pending annotations and section overlay state for one loaded
/// document. Cloning yields another handle to the same state.
///
/// Drain timers run on the Tokio runtime current at construction, so the
/// event methods may be called from threads outside it. Built outside any
/// runtime, timers use whichever runtime is current when an event arrives;
/// with none, the event only updates state and the queue waits for the
/// next one.
pub struct OverlaySynchronizer<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for OverlaySynchronizer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R> {
    renderer: R,
    timing: OverlayTiming,
    runtime: Option<Handle>,
    state: Mutex<SyncState>,
}

#[derive(Default)]
struct SyncState {
    queue: AnnotationQueue,
    created: HashSet<usize>,
    /// Latest debounce generation per section; older timers stand down
    debounce: HashMap<usize, u64>,
    timers: Vec<JoinHandle<()>>,
    closed: bool,
}

impl<R: OverlayRenderer> OverlaySynchronizer<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_timing(renderer, OverlayTiming::default())
    }

    pub fn with_timing(renderer: R, timing: OverlayTiming) -> Self {
        Self {
            inner: Arc::new(Inner {
                renderer,
                timing,
                runtime: Handle::try_current().ok(),
                state: Mutex::new(SyncState::default()),
            }),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.inner.renderer
    }

    pub fn timing(&self) -> &OverlayTiming {
        &self.inner.timing
    }

    /// Submit an annotation for drawing.
    ///
    /// Fails with `MalformedInput` only when neither the renderer nor the
    /// CFI itself names a section.
    pub async fn submit_annotation(
        &self,
        annotation: PendingAnnotation,
    ) -> Result<SubmitOutcome, TranslateError> {
        let reported = match self.inner.renderer.apply(&annotation, false).await {
            Ok(outcome) => outcome.section_index,
            Err(err) => {
                if !err.is_transient() {
                    tracing::warn!(value = %annotation.value, error = %err, "Immediate apply failed");
                }
                None
            }
        };

        let index = reported
            .or_else(|| spine_index_of(&annotation.value))
            .ok_or_else(|| {
                TranslateError::MalformedInput(format!(
                    "annotation CFI names no section: {}",
                    annotation.value
                ))
            })?;

        let created = {
            let mut state = self.inner.state.lock();
            state.queue.enqueue(index, annotation);
            state.created.contains(&index)
        };

        if created {
            self.schedule_debounced(index);
        } else {
            self.schedule_drain(index, self.inner.timing.retry_short);
            self.schedule_drain(index, self.inner.timing.retry_long);
        }

        Ok(SubmitOutcome {
            accepted_section_index: index,
        })
    }

    /// Erase an annotation. Queued copies are left alone; drawing them
    /// later and then erasing is the renderer's concern.
    pub async fn remove_annotation(&self, value: &str) -> Result<(), OverlayError> {
        self.inner
            .renderer
            .apply(&PendingAnnotation::for_value(value), true)
            .await
            .map(|_| ())
    }

    /// Section content attached; re-apply anything queued for it
    pub fn on_section_loaded(&self, index: usize) {
        let queued = self.inner.state.lock().queue.len(index);
        tracing::debug!(section = index, queued, "Section loaded");
        if queued > 0 {
            self.schedule_drain(index, self.inner.timing.section_loaded);
        }
    }

    /// Section overlay is ready; mark it and drain its queue
    pub fn on_overlay_created(&self, index: usize) {
        let newly_created = self.inner.state.lock().created.insert(index);
        tracing::debug!(section = index, newly_created, "Overlay created");
        self.schedule_drain(index, self.inner.timing.overlay_ready);
    }

    pub fn handle_event(&self, event: SectionEvent) {
        match event {
            SectionEvent::Loaded { index } => self.on_section_loaded(index),
            SectionEvent::OverlayCreated { index } => self.on_overlay_created(index),
        }
    }

    pub fn overlay_state(&self, index: usize) -> OverlayState {
        if self.inner.state.lock().created.contains(&index) {
            OverlayState::Created
        } else {
            OverlayState::NotCreated
        }
    }

    /// Annotations still waiting for a section
    pub fn pending_count(&self, index: usize) -> usize {
        self.inner.state.lock().queue.len(index)
    }

    /// End this document instance: cancel timers and ignore further drains
    pub fn close(&self) {
        let timers = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.debounce.clear();
            std::mem::take(&mut state.timers)
        };
        for timer in timers {
            timer.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    fn schedule_debounced(&self, index: usize) {
        let generation = {
            let mut state = self.inner.state.lock();
            let generation = state.debounce.entry(index).or_insert(0);
            *generation += 1;
            *generation
        };
        self.spawn_timer(index, self.inner.timing.coalesce, Some(generation));
    }

    fn schedule_drain(&self, index: usize, delay: Duration) {
        self.spawn_timer(index, delay, None);
    }

    fn spawn_timer(&self, index: usize, delay: Duration, generation: Option<u64>) {
        if self.is_closed() {
            return;
        }
        let Some(runtime) = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            tracing::warn!(section = index, "No Tokio runtime; drain not scheduled");
            return;
        };

        let this = self.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(generation) = generation {
                let current = this.inner.state.lock().debounce.get(&index).copied();
                if current != Some(generation) {
                    return;
                }
            }
            this.drain(index).await;
        });

        let mut state = self.inner.state.lock();
        state.timers.retain(|timer| !timer.is_finished());
        state.timers.push(handle);
    }

    /// Apply everything queued for a section; undrawn items go back to the
    /// front of the queue for a later attempt
    async fn drain(&self, index: usize) {
        let annotations = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.queue.drain(index)
        };
        if annotations.is_empty() {
            return;
        }

        tracing::debug!(section = index, count = annotations.len(), "Draining annotations");

        let mut undrawn = Vec::new();
        for annotation in annotations {
            match self.inner.renderer.apply(&annotation, false).await {
                Ok(outcome) if outcome.drawn => {}
                Ok(_) => undrawn.push(annotation),
                Err(err) if err.is_transient() => undrawn.push(annotation),
                Err(err) => {
                    tracing::warn!(
                        section = index,
                        value = %annotation.value,
                        error = %err,
                        "Failed to apply annotation"
                    );
                }
            }
        }

        if !undrawn.is_empty() {
            let mut state = self.inner.state.lock();
            if !state.closed {
                state.queue.requeue_front(index, undrawn);
            }
        }
    }
}

/// Section index encoded in a CFI's spine step
fn spine_index_of(cfi: &str) -> Option<usize> {
    crate::cfi::parse(cfi).ok().and_then(|cfi| cfi.spine_index())
}
