//! Per-section queue of annotations not yet drawn

use std::collections::HashMap;

use super::types::PendingAnnotation;

/// Ordered pending annotations keyed by section index.
///
/// Entries are not deduplicated; submitting the same value twice queues it
/// twice and the renderer's apply is expected to be idempotent.
#[derive(Debug, Default)]
pub struct AnnotationQueue {
    sections: HashMap<usize, Vec<PendingAnnotation>>,
}

impl AnnotationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the end of a section's queue
    pub fn enqueue(&mut self, index: usize, annotation: PendingAnnotation) {
        self.sections.entry(index).or_default().push(annotation);
    }

    /// Take every queued annotation for a section, in submission order.
    /// An absent section yields an empty list.
    pub fn drain(&mut self, index: usize) -> Vec<PendingAnnotation> {
        self.sections.remove(&index).unwrap_or_default()
    }

    /// Put annotations back in front of anything queued since they were
    /// drained, keeping their order
    pub fn requeue_front(&mut self, index: usize, annotations: Vec<PendingAnnotation>) {
        if annotations.is_empty() {
            return;
        }
        let queue = self.sections.entry(index).or_default();
        queue.splice(0..0, annotations);
    }

    /// Drop queued copies of `value`; returns how many were removed
    pub fn remove(&mut self, index: usize, value: &str) -> usize {
        let Some(queue) = self.sections.get_mut(&index) else {
            return 0;
        };
        let before = queue.len();
        queue.retain(|a| a.value != value);
        let removed = before - queue.len();
        if queue.is_empty() {
            self.sections.remove(&index);
        }
        removed
    }

    /// Queued annotations for a section
    pub fn pending(&self, index: usize) -> &[PendingAnnotation] {
        self.sections.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of annotations queued for a section
    pub fn len(&self, index: usize) -> usize {
        self.pending(index).len()
    }

    /// Whether nothing is queued for any section
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    /// Annotations queued across all sections
    pub fn total(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::AnnotationStyle;

    fn note(value: &str) -> PendingAnnotation {
        PendingAnnotation::new(value, AnnotationStyle::Highlight, "yellow")
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = AnnotationQueue::new();
        queue.enqueue(5, note("a"));
        queue.enqueue(5, note("b"));
        queue.enqueue(2, note("c"));

        let drained: Vec<_> = queue.drain(5).into_iter().map(|a| a.value).collect();
        assert_eq!(drained, vec!["a", "b"]);
        assert_eq!(queue.len(5), 0);
        assert_eq!(queue.total(), 1);
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let mut queue = AnnotationQueue::new();
        assert!(queue.drain(3).is_empty());
        queue.enqueue(3, note("a"));
        queue.drain(3);
        assert!(queue.drain(3).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut queue = AnnotationQueue::new();
        queue.enqueue(1, note("a"));
        queue.enqueue(1, note("a"));
        assert_eq!(queue.len(1), 2);
    }

    #[test]
    fn test_requeue_front() {
        let mut queue = AnnotationQueue::new();
        queue.enqueue(1, note("a"));
        queue.enqueue(1, note("b"));
        let drained = queue.drain(1);
        queue.enqueue(1, note("c"));
        queue.requeue_front(1, drained);

        let values: Vec<_> = queue.pending(1).iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut queue = AnnotationQueue::new();
        queue.enqueue(4, note("a"));
        queue.enqueue(4, note("b"));
        queue.enqueue(4, note("a"));

        assert_eq!(queue.remove(4, "a"), 2);
        assert_eq!(queue.remove(4, "a"), 0);
        assert_eq!(queue.remove(9, "a"), 0);
        assert_eq!(queue.len(4), 1);
    }
}
