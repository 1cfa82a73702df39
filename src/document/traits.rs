//! Rendering-engine seam for section documents

use std::sync::Arc;

use async_trait::async_trait;

use super::error::Result;
use super::types::{SectionDocument, SectionInfo};

/// Source of live section documents (the rendering engine side)
///
/// Section content may need to be fetched or parsed, so document creation
/// is asynchronous.
#[async_trait]
pub trait SectionSource: Send + Sync {
    /// Number of sections in the spine
    fn section_count(&self) -> usize;

    /// Spine metadata for a section
    fn section_info(&self, index: usize) -> Option<SectionInfo>;

    /// Create the live document for a section
    async fn create_document(&self, index: usize) -> Result<SectionDocument>;
}

#[async_trait]
impl<T: SectionSource + ?Sized> SectionSource for Arc<T> {
    fn section_count(&self) -> usize {
        (**self).section_count()
    }

    fn section_info(&self, index: usize) -> Option<SectionInfo> {
        (**self).section_info(index)
    }

    async fn create_document(&self, index: usize) -> Result<SectionDocument> {
        (**self).create_document(index).await
    }
}
