//! Text-node helpers shared by the CFI resolver and the pointer path builder
//!
//! All offsets are counted in Unicode scalar values.

use roxmltree::Node;

use super::types::DomPoint;

/// Inline styling wrappers that never anchor an XPointer offset
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "cite", "code", "dfn", "em", "font", "i", "kbd",
    "mark", "q", "rb", "rp", "rt", "ruby", "s", "samp", "small", "span", "strike", "strong",
    "sub", "sup", "time", "tt", "u", "var",
];

/// Whether `node` is a purely inline element
pub fn is_inline(node: Node<'_, '_>) -> bool {
    node.is_element() && INLINE_TAGS.contains(&node.tag_name().name())
}

/// Block-level element eligible as a path anchor
pub fn is_significant(node: Node<'_, '_>) -> bool {
    node.is_element() && !is_inline(node)
}

/// Character length of a text node (0 for anything else)
pub fn char_len(node: Node<'_, '_>) -> usize {
    if node.is_text() {
        node.text().map(|t| t.chars().count()).unwrap_or(0)
    } else {
        0
    }
}

/// Non-empty text nodes under `element`, in document order
pub fn text_nodes<'a, 'input>(element: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    element
        .descendants()
        .filter(|n| char_len(*n) > 0)
        .collect()
}

/// Find the text node holding cumulative `offset` under `element`.
///
/// A boundary offset resolves to the end of the earlier node. Offsets past
/// the end clamp to the end of the last text node. `None` when the element
/// has no text at all.
pub fn locate_text_offset<'a, 'input>(
    element: Node<'a, 'input>,
    offset: usize,
) -> Option<DomPoint<'a, 'input>> {
    let nodes = text_nodes(element);
    let mut remaining = offset;

    for node in &nodes {
        let len = char_len(*node);
        if remaining <= len {
            return Some(DomPoint::new(*node, remaining));
        }
        remaining -= len;
    }

    nodes
        .last()
        .map(|last| DomPoint::new(*last, char_len(*last)))
}

/// Character offset of `point` relative to the text under `element`.
///
/// Text before the point (in document order) is counted; a point outside
/// `element` counts everything before it that `element` contains.
pub fn offset_within(element: Node<'_, '_>, point: &DomPoint<'_, '_>) -> usize {
    let before = |text: Node<'_, '_>| -> bool {
        if point.node.is_text() {
            return text.id().get() < point.node.id().get();
        }
        match point.node.children().nth(point.offset) {
            Some(child) => text.id().get() < child.id().get(),
            None => {
                let last = point.node.descendants().last().unwrap_or(point.node);
                text.id().get() <= last.id().get()
            }
        }
    };

    let preceding: usize = text_nodes(element)
        .into_iter()
        .filter(|n| before(*n))
        .map(char_len)
        .sum();

    let inside = point.node.is_text()
        && point.node.ancestors().any(|a| a == element);
    if inside {
        preceding + point.offset.min(char_len(point.node))
    } else {
        preceding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const XHTML: &str =
        "<html><body><p>Hello <em>brave</em> world</p><div><span>x</span></div></body></html>";

    fn paragraph<'a, 'input>(doc: &'a Document<'input>) -> Node<'a, 'input> {
        doc.descendants()
            .find(|n| n.tag_name().name() == "p")
            .unwrap()
    }

    #[test]
    fn test_inline_classification() {
        let doc = Document::parse(XHTML).unwrap();
        let em = doc.descendants().find(|n| n.tag_name().name() == "em").unwrap();
        assert!(is_inline(em));
        assert!(is_significant(paragraph(&doc)));
    }

    #[test]
    fn test_locate_inside_inline() {
        let doc = Document::parse(XHTML).unwrap();
        let point = locate_text_offset(paragraph(&doc), 8).unwrap();
        assert_eq!(point.node.text(), Some("brave"));
        assert_eq!(point.offset, 2);
    }

    #[test]
    fn test_locate_boundary_prefers_earlier_node() {
        let doc = Document::parse(XHTML).unwrap();
        let point = locate_text_offset(paragraph(&doc), 6).unwrap();
        assert_eq!(point.node.text(), Some("Hello "));
        assert_eq!(point.offset, 6);
    }

    #[test]
    fn test_locate_past_end_clamps() {
        let doc = Document::parse(XHTML).unwrap();
        let point = locate_text_offset(paragraph(&doc), 500).unwrap();
        assert_eq!(point.node.text(), Some(" world"));
        assert_eq!(point.offset, 6);
    }

    #[test]
    fn test_offset_within_roundtrips_locate() {
        let doc = Document::parse(XHTML).unwrap();
        let p = paragraph(&doc);
        for offset in [0, 3, 6, 9, 12, 17] {
            let point = locate_text_offset(p, offset).unwrap();
            assert_eq!(offset_within(p, &point), offset);
        }
    }

    #[test]
    fn test_offset_within_element_point() {
        let doc = Document::parse(XHTML).unwrap();
        let p = paragraph(&doc);
        // Before the <em> child: only "Hello " precedes
        assert_eq!(offset_within(p, &DomPoint::new(p, 1)), 6);
        // After every child
        assert_eq!(offset_within(p, &DomPoint::new(p, 3)), 17);
    }

    #[test]
    fn test_multibyte_offsets() {
        let doc = Document::parse("<html><body><p>héllo</p></body></html>").unwrap();
        let p = paragraph(&doc);
        assert_eq!(locate_text_offset(p, 2).unwrap().offset, 2);
        // Past the end clamps to the five characters, not the six bytes
        assert_eq!(locate_text_offset(p, 9).unwrap().offset, 5);
    }
}
