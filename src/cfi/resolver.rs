//! CFI resolution against live section documents
//!
//! Content-document step numbering:
//! - even step `2k` is the k-th child element (1-based)
//! - odd step `2k+1` is the text slot after the k-th child element
//!   (`/1` is the text before the first element)
//!
//! Character offsets count across every text node in a slot.

use roxmltree::{Document, Node};

use super::types::*;
use super::CfiError;
use crate::document::text::char_len;
use crate::document::{DomPoint, DomRange};

/// Join the parent path with the start (or end) sub-path of a range CFI
pub fn collapse(cfi: &Cfi, to_end: bool) -> Cfi {
    let Some(range) = &cfi.range else {
        return cfi.clone();
    };

    let tail = if to_end { &range.end } else { &range.start };
    let mut path = CfiPath::with_steps(cfi.path.steps.clone());
    path.steps.extend(tail.steps.iter().cloned());
    path.character_offset = tail
        .character_offset
        .clone()
        .or_else(|| cfi.path.character_offset.clone());
    Cfi::new(path)
}

/// Resolve a collapsed CFI to a boundary point
pub fn resolve_point<'a, 'input>(
    doc: &'a Document<'input>,
    cfi: &Cfi,
) -> Result<DomPoint<'a, 'input>, CfiError> {
    let collapsed = collapse(cfi, false);
    let steps = collapsed.path.content_steps();
    let offset = collapsed
        .path
        .character_offset
        .as_ref()
        .map(|o| o.offset as usize);

    let mut node = doc.root_element();
    for (depth, step) in steps.iter().enumerate() {
        let index = step
            .element_index()
            .ok_or_else(|| CfiError::InvalidStep(format!("indirection at depth {}", depth)))?;

        if index == 0 {
            return Err(CfiError::InvalidStep(format!("step 0 at depth {}", depth)));
        }

        if index % 2 == 1 {
            if depth + 1 != steps.len() {
                return Err(CfiError::InvalidStep(format!(
                    "text step /{} is not terminal",
                    index
                )));
            }
            return Ok(point_in_slot(node, ((index - 1) / 2) as usize, offset.unwrap_or(0)));
        }

        node = child_element(node, (index / 2) as usize)
            .or_else(|| find_by_id(doc, step.id_assertion.as_deref()))
            .ok_or(CfiError::StepOutOfRange { step: index, depth })?;
    }

    match offset {
        // An offset on an element addresses its first text slot
        Some(offset) => Ok(point_in_slot(node, 0, offset)),
        None => Ok(DomPoint::new(node, 0)),
    }
}

/// Resolve a CFI (collapsed or range) to a range
pub fn to_range<'a, 'input>(
    doc: &'a Document<'input>,
    cfi: &Cfi,
) -> Result<DomRange<'a, 'input>, CfiError> {
    let start = resolve_point(doc, &collapse(cfi, false))?;
    if !cfi.is_range() {
        return Ok(DomRange::collapsed(start));
    }
    let end = resolve_point(doc, &collapse(cfi, true))?;
    Ok(DomRange::new(start, end))
}

/// Resolve a CFI to the element holding its (start) location
pub fn to_element<'a, 'input>(
    doc: &'a Document<'input>,
    cfi: &Cfi,
) -> Result<Node<'a, 'input>, CfiError> {
    let point = resolve_point(doc, cfi)?;
    point
        .container()
        .ok_or_else(|| CfiError::Unresolvable("point has no containing element".to_string()))
}

/// Build a CFI for a range.
///
/// The section is unknown here, so package steps `/6/2!` stand in for the
/// spine item; callers rewrite them with [`Cfi::set_spine_index`].
pub fn from_range(range: &DomRange<'_, '_>) -> Result<Cfi, CfiError> {
    let (start_steps, start_offset) = point_steps(&range.start)?;

    let mut parent = CfiPath::with_steps(vec![
        CfiStep::element(SPINE_STEP),
        CfiStep::element(2),
        CfiStep::indirection(),
    ]);

    if range.is_collapsed() {
        parent.steps.extend(start_steps.into_iter().map(CfiStep::element));
        if let Some(offset) = start_offset {
            parent.set_character_offset(offset);
        }
        return Ok(Cfi::new(parent));
    }

    let (end_steps, end_offset) = point_steps(&range.end)?;
    let max_common = start_steps.len().min(end_steps.len()).saturating_sub(1);
    let common = start_steps
        .iter()
        .zip(end_steps.iter())
        .take(max_common)
        .take_while(|(a, b)| a == b)
        .count();

    parent
        .steps
        .extend(start_steps[..common].iter().copied().map(CfiStep::element));

    let relative = |steps: &[u32], offset: Option<u32>| {
        let mut path = CfiPath::with_steps(steps.iter().copied().map(CfiStep::element).collect());
        if let Some(offset) = offset {
            path.set_character_offset(offset);
        }
        path
    };

    Ok(Cfi::with_range(
        parent,
        CfiRange {
            start: relative(&start_steps[common..], start_offset),
            end: relative(&end_steps[common..], end_offset),
        },
    ))
}

/// k-th (1-based) child element of `parent`
fn child_element<'a, 'input>(parent: Node<'a, 'input>, k: usize) -> Option<Node<'a, 'input>> {
    k.checked_sub(1)
        .and_then(|i| parent.children().filter(|n| n.is_element()).nth(i))
}

fn find_by_id<'a, 'input>(
    doc: &'a Document<'input>,
    id: Option<&str>,
) -> Option<Node<'a, 'input>> {
    let id = id?;
    doc.descendants()
        .find(|n| n.is_element() && n.attribute("id") == Some(id))
}

/// Point at `offset` within text slot `slot` of `parent`
fn point_in_slot<'a, 'input>(
    parent: Node<'a, 'input>,
    slot: usize,
    offset: usize,
) -> DomPoint<'a, 'input> {
    let mut elements_seen = 0;
    let mut boundary = None;
    let mut texts = Vec::new();

    for (position, child) in parent.children().enumerate() {
        if child.is_element() {
            elements_seen += 1;
            if elements_seen > slot {
                boundary = Some(position);
                break;
            }
        } else if elements_seen == slot && child.is_text() {
            texts.push(child);
        }
    }

    let mut remaining = offset;
    for text in &texts {
        let len = char_len(*text);
        if remaining <= len {
            return DomPoint::new(*text, remaining);
        }
        remaining -= len;
    }

    match texts.last() {
        Some(last) => DomPoint::new(*last, char_len(*last)),
        None => DomPoint::new(
            parent,
            boundary.unwrap_or_else(|| parent.children().count()),
        ),
    }
}

/// Content steps and character offset addressing `point`
fn point_steps(point: &DomPoint<'_, '_>) -> Result<(Vec<u32>, Option<u32>), CfiError> {
    if point.node.is_text() {
        let parent = point
            .node
            .parent_element()
            .ok_or_else(|| CfiError::Unresolvable("detached text node".to_string()))?;
        let (slot, preceding) = text_slot(point.node);
        let mut steps = element_steps(parent);
        steps.push((slot * 2 + 1) as u32);
        return Ok((steps, Some((preceding + point.offset) as u32)));
    }

    if !point.node.is_element() {
        return Err(CfiError::Unresolvable(
            "point is neither text nor element".to_string(),
        ));
    }

    match point.node.children().nth(point.offset) {
        Some(child) if child.is_element() => Ok((element_steps(child), None)),
        Some(child) if child.is_text() => {
            let (slot, preceding) = text_slot(child);
            let mut steps = element_steps(point.node);
            steps.push((slot * 2 + 1) as u32);
            Ok((steps, Some(preceding as u32)))
        }
        _ => Ok((element_steps(point.node), None)),
    }
}

/// Even steps from the root element down to `element`
fn element_steps(element: Node<'_, '_>) -> Vec<u32> {
    let mut steps = Vec::new();
    let mut node = element;
    while let Some(parent) = node.parent_element() {
        let position = parent
            .children()
            .filter(|n| n.is_element())
            .position(|n| n == node)
            .unwrap_or(0);
        steps.push(((position + 1) * 2) as u32);
        node = parent;
    }
    steps.reverse();
    steps
}

/// Slot number of a text node and the characters preceding it in its slot
fn text_slot(text: Node<'_, '_>) -> (usize, usize) {
    let mut slot = 0;
    let mut preceding = 0;
    let mut sibling = text.prev_sibling();
    while let Some(node) = sibling {
        if node.is_element() {
            slot += 1;
        } else if slot == 0 {
            preceding += char_len(node);
        }
        sibling = node.prev_sibling();
    }
    (slot, preceding)
}
