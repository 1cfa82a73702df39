//! Pointer path builder and resolver
//!
//! Builds the element path of an XPointer from a live node and resolves it
//! back. Paths start below the section `<body>`.

use roxmltree::{Document, Node};

use super::types::{PathSegment, XPointer};
use crate::document::text::{is_significant, locate_text_offset, offset_within};
use crate::document::{section_body, DomPoint};
use crate::error::{Result, TranslateError};

/// XPointer addressing `target` in section `spine_index`.
///
/// Segments carry a sibling index only when the parent has more than one
/// child with the same tag.
pub fn build_path(target: Node<'_, '_>, spine_index: usize) -> XPointer {
    let mut segments = Vec::new();
    let mut node = if target.is_element() {
        Some(target)
    } else {
        target.parent_element()
    };

    while let Some(current) = node {
        if current.tag_name().name() == "body" {
            break;
        }
        let Some(parent) = current.parent_element() else {
            // Reached the document root without meeting <body>
            break;
        };

        let tag = current.tag_name().name();
        let same_tag: Vec<Node> = parent
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == tag)
            .collect();

        let segment = if same_tag.len() > 1 {
            let position = same_tag.iter().position(|n| *n == current).unwrap_or(0);
            PathSegment::indexed(tag, position + 1)
        } else {
            PathSegment::bare(tag)
        };
        segments.push(segment);
        node = Some(parent);
    }

    segments.reverse();
    XPointer {
        spine_index,
        path: segments,
        text_offset: None,
    }
}

/// XPointer for the character at `char_offset` within `container`'s text.
///
/// The path is anchored at the nearest non-inline ancestor of the text node
/// holding the offset (never above `container`); the offset is re-based on
/// that anchor. Offsets past the end resolve to the end of the last text.
pub fn build_path_for_offset(
    container: Node<'_, '_>,
    char_offset: usize,
    spine_index: usize,
) -> XPointer {
    let Some(point) = locate_text_offset(container, char_offset) else {
        return build_path(container, spine_index);
    };

    let anchor = significant_ancestor(point.node, container);
    let local_offset = offset_within(anchor, &point);
    build_path(anchor, spine_index).with_text_offset(local_offset)
}

/// Nearest non-inline element above `node`, stopping at `container`
fn significant_ancestor<'a, 'input>(
    node: Node<'a, 'input>,
    container: Node<'a, 'input>,
) -> Node<'a, 'input> {
    let mut current = node.parent_element();
    while let Some(el) = current {
        if el == container || is_significant(el) {
            return el;
        }
        current = el.parent_element();
    }
    container
}

/// `node` itself, or its nearest non-inline ancestor when `node` is an
/// inline wrapper. Never climbs past the section `<body>`.
pub fn block_container<'a, 'input>(node: Node<'a, 'input>) -> Node<'a, 'input> {
    let mut current = if node.is_element() {
        node
    } else {
        match node.parent_element() {
            Some(parent) => parent,
            None => return node,
        }
    };
    while !is_significant(current) && current.tag_name().name() != "body" {
        match current.parent_element() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Element addressed by `path` below the section body
pub fn resolve_path<'a, 'input>(
    doc: &'a Document<'input>,
    path: &[PathSegment],
) -> Result<Node<'a, 'input>> {
    let mut node = section_body(doc)
        .ok_or_else(|| TranslateError::Unresolvable("section has no body".to_string()))?;

    for (depth, segment) in path.iter().enumerate() {
        node = node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == segment.tag)
            .nth(segment.position().saturating_sub(1))
            .ok_or_else(|| {
                TranslateError::Unresolvable(format!(
                    "no {} at depth {}",
                    segment, depth
                ))
            })?;
    }

    Ok(node)
}

/// Boundary point for a resolved element and optional text offset.
///
/// Without a text offset the point is front-biased: it lands on the first
/// child element when there is one.
pub fn anchor_point<'a, 'input>(
    element: Node<'a, 'input>,
    text_offset: Option<usize>,
) -> DomPoint<'a, 'input> {
    match text_offset {
        Some(offset) => {
            locate_text_offset(element, offset).unwrap_or_else(|| DomPoint::new(element, 0))
        }
        None => match element.first_element_child() {
            Some(child) => DomPoint::new(child, 0),
            None => DomPoint::new(element, 0),
        },
    }
}
