//! Live section documents and positions inside them

use std::sync::Arc;

use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};

use super::error::{DocumentError, Result};

/// Spine metadata for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    /// Zero-based spine index
    pub index: usize,
    /// Content document href (OPF-relative)
    pub href: String,
    /// Whether the item is part of the linear reading order
    pub linear: bool,
}

/// XHTML content of one loaded section
///
/// Cloning is cheap; the content is shared.
#[derive(Debug, Clone)]
pub struct SectionDocument {
    info: SectionInfo,
    content: Arc<str>,
}

impl SectionDocument {
    pub fn new(index: usize, href: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            info: SectionInfo {
                index,
                href: href.into(),
                linear: true,
            },
            content: content.into(),
        }
    }

    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn href(&self) -> &str {
        &self.info.href
    }

    pub fn info(&self) -> &SectionInfo {
        &self.info
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parse the content into a live tree.
    ///
    /// DOCTYPE declarations are allowed since XHTML content documents
    /// routinely carry one.
    pub fn parse(&self) -> Result<Document<'_>> {
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;

        let doc = Document::parse_with_options(&self.content, options)?;
        if section_body(&doc).is_none() {
            return Err(DocumentError::MissingBody(self.info.index));
        }
        Ok(doc)
    }
}

/// The `<body>` element of a section document
pub fn section_body<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "body")
}

/// A boundary point in a section tree.
///
/// For text nodes `offset` counts characters; for elements it counts
/// child nodes, as in a DOM range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomPoint<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub offset: usize,
}

impl<'a, 'input> DomPoint<'a, 'input> {
    pub fn new(node: Node<'a, 'input>, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The element containing this point (the node itself for elements)
    pub fn container(&self) -> Option<Node<'a, 'input>> {
        if self.node.is_element() {
            Some(self.node)
        } else {
            self.node.parent_element()
        }
    }
}

/// A (start, end) pair of boundary points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomRange<'a, 'input> {
    pub start: DomPoint<'a, 'input>,
    pub end: DomPoint<'a, 'input>,
}

impl<'a, 'input> DomRange<'a, 'input> {
    pub fn new(start: DomPoint<'a, 'input>, end: DomPoint<'a, 'input>) -> Self {
        Self { start, end }
    }

    /// Zero-length range at `point`
    pub fn collapsed(point: DomPoint<'a, 'input>) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}
