//! Section documents
//!
//! The rendering engine loads each spine item into its own isolated
//! document. This module models those documents as parsed XHTML trees
//! (`roxmltree`) and provides the positions ([`DomPoint`], [`DomRange`])
//! that CFI and XPointer values resolve to.
//!
//! # Usage
//!
//! ```rust,ignore
//! use amnesia_xpointer::document::{SectionSource, SectionStore};
//!
//! let store = SectionStore::load_dir("OEBPS/text").await?;
//! let section = store.create_document(2).await?;
//! let doc = section.parse()?;
//! ```

mod error;
mod store;
pub mod text;
mod traits;
mod types;

pub use error::{DocumentError, Result};
pub use store::SectionStore;
pub use traits::SectionSource;
pub use types::{section_body, DomPoint, DomRange, SectionDocument, SectionInfo};
