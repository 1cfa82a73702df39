//! In-memory section store
//!
//! Holds the XHTML of every spine item so translations can run without a
//! live rendering engine (CLI, tests, benches).

use std::path::Path;

use async_trait::async_trait;

use super::error::{DocumentError, Result};
use super::traits::SectionSource;
use super::types::{SectionDocument, SectionInfo};

/// File extensions treated as content documents when loading a directory
const CONTENT_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xml"];

/// Spine-ordered collection of section documents
#[derive(Debug, Clone, Default)]
pub struct SectionStore {
    sections: Vec<SectionDocument>,
}

impl SectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section at the next spine index
    pub fn push(&mut self, href: impl Into<String>, content: impl Into<String>) -> usize {
        let index = self.sections.len();
        let content: String = content.into();
        self.sections
            .push(SectionDocument::new(index, href, content));
        index
    }

    /// Build a store from (href, content) pairs in spine order
    pub fn from_sections<I, H, C>(sections: I) -> Self
    where
        I: IntoIterator<Item = (H, C)>,
        H: Into<String>,
        C: Into<String>,
    {
        let mut store = Self::new();
        for (href, content) in sections {
            store.push(href, content);
        }
        store
    }

    /// Load every content document in `dir`; file names sorted ascending
    /// form the spine order.
    pub async fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_content = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| CONTENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_content {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            let content = tokio::fs::read_to_string(&path).await?;
            let href = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            store.push(href, content);
        }

        tracing::debug!(
            "Loaded {} sections from {}",
            store.len(),
            dir.as_ref().display()
        );
        Ok(store)
    }

    /// Get the number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[async_trait]
impl SectionSource for SectionStore {
    fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn section_info(&self, index: usize) -> Option<SectionInfo> {
        self.sections.get(index).map(|s| s.info().clone())
    }

    async fn create_document(&self, index: usize) -> Result<SectionDocument> {
        self.sections
            .get(index)
            .cloned()
            .ok_or(DocumentError::SectionNotFound(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_indexes_in_push_order() {
        let store = SectionStore::from_sections([
            ("a.xhtml", "<html><body/></html>"),
            ("b.xhtml", "<html><body/></html>"),
        ]);

        assert_eq!(store.section_count(), 2);
        assert_eq!(store.section_info(1).unwrap().href, "b.xhtml");
        assert_eq!(store.create_document(0).await.unwrap().href(), "a.xhtml");
        assert!(matches!(
            store.create_document(2).await,
            Err(DocumentError::SectionNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_load_dir_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02-ch2.xhtml"), "<html><body>2</body></html>").unwrap();
        std::fs::write(dir.path().join("01-ch1.xhtml"), "<html><body>1</body></html>").unwrap();
        std::fs::write(dir.path().join("style.css"), "p {}").unwrap();

        let store = SectionStore::load_dir(dir.path()).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.section_info(0).unwrap().href, "01-ch1.xhtml");
        assert_eq!(store.section_info(1).unwrap().href, "02-ch2.xhtml");
    }
}
