//! CFI <-> XPointer location translation
//!
//! The translator owns no mutable state. Each call loads the addressed
//! section from its [`SectionSource`], parses it, and resolves positions
//! through the [`CfiAlgebra`] and the pointer path builder.
//!
//! ```rust,ignore
//! let translator = LocationTranslator::new(SectionStore::load_dir("OEBPS").await?);
//! let location = translator.cfi_to_xpointer("epubcfi(/6/8!/4/2/1:12)").await?;
//! let cfi = translator.xpointer_to_cfi(&location.xpointer).await?;
//! ```

use serde::{Deserialize, Serialize};

use crate::cfi::{CfiAlgebra, EpubCfi};
use crate::document::text::offset_within;
use crate::document::{DomPoint, DomRange, SectionSource};
use crate::error::{Result, TranslateError};
use crate::xpointer::{
    anchor_point, block_container, build_path, build_path_for_offset, resolve_path, XPointer,
};

pub use crate::xpointer::normalize_xpointer;

/// Result of a CFI -> XPointer conversion.
///
/// For a range CFI `xpointer` equals `pos0` and `pos1` holds the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XPointerLocation {
    pub xpointer: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pos0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pos1: Option<String>,
}

impl XPointerLocation {
    pub fn point(xpointer: String) -> Self {
        Self {
            xpointer,
            pos0: None,
            pos1: None,
        }
    }

    pub fn range(start: String, end: String) -> Self {
        Self {
            xpointer: start.clone(),
            pos0: Some(start),
            pos1: Some(end),
        }
    }

    pub fn is_range(&self) -> bool {
        self.pos1.is_some()
    }
}

/// Converts positions between the rendering engine's CFIs and sync
/// XPointers
pub struct LocationTranslator<S, A = EpubCfi> {
    sections: S,
    cfi: A,
}

impl<S: SectionSource> LocationTranslator<S> {
    /// Translator using the built-in CFI algebra
    pub fn new(sections: S) -> Self {
        Self::with_algebra(sections, EpubCfi)
    }
}

impl<S: SectionSource, A: CfiAlgebra> LocationTranslator<S, A> {
    pub fn with_algebra(sections: S, cfi: A) -> Self {
        Self { sections, cfi }
    }

    pub fn sections(&self) -> &S {
        &self.sections
    }

    /// Convert a CFI (point or range) into an XPointer location
    pub async fn cfi_to_xpointer(&self, input: &str) -> Result<XPointerLocation> {
        let cfi = self.cfi.parse(input)?;
        let spine_index = cfi.spine_index().ok_or_else(|| {
            TranslateError::MalformedInput(format!("CFI has no spine item step: {}", input))
        })?;
        self.check_bounds(spine_index)?;

        let section = self.sections.create_document(spine_index).await?;
        let doc = section.parse()?;

        let location = if cfi.is_range() {
            let range = self.cfi.to_range(&doc, &cfi)?;
            let start = xpointer_for_point(&range.start, spine_index)?;
            let end = xpointer_for_point(&range.end, spine_index)?;
            XPointerLocation::range(start.to_string(), end.to_string())
        } else {
            let element = self.cfi.to_element(&doc, &cfi)?;
            let xpointer = if cfi.terminal_offset().is_some() {
                let start = self.cfi.to_range(&doc, &cfi)?.start;
                let container = block_container(element);
                build_path_for_offset(container, offset_within(container, &start), spine_index)
            } else {
                build_path(element, spine_index)
            };
            XPointerLocation::point(xpointer.to_string())
        };

        tracing::debug!("CFI {} -> XPointer {}", input, location.xpointer);
        Ok(location)
    }

    /// Convert an XPointer into a collapsed CFI string
    pub async fn xpointer_to_cfi(&self, input: &str) -> Result<String> {
        let xpointer: XPointer = input.parse()?;
        self.check_bounds(xpointer.spine_index)?;

        let section = self.sections.create_document(xpointer.spine_index).await?;
        let doc = section.parse()?;

        let element = resolve_path(&doc, &xpointer.path)?;
        let point = anchor_point(element, xpointer.text_offset);

        let mut cfi = self
            .cfi
            .from_range(&DomRange::collapsed(point))
            .map_err(TranslateError::NoCfiResult)?;
        // The algebra's spine step is a guess; the XPointer names the section
        cfi.set_spine_index(xpointer.spine_index)
            .map_err(TranslateError::NoCfiResult)?;

        let cfi = cfi.to_string();
        tracing::debug!("XPointer {} -> CFI {}", input, cfi);
        Ok(cfi)
    }

    fn check_bounds(&self, index: usize) -> Result<()> {
        let count = self.sections.section_count();
        if index >= count {
            return Err(TranslateError::OutOfBounds { index, count });
        }
        Ok(())
    }
}

/// XPointer for one endpoint of a resolved range
fn xpointer_for_point(point: &DomPoint<'_, '_>, spine_index: usize) -> Result<XPointer> {
    let container = point.container().map(block_container).ok_or_else(|| {
        TranslateError::Unresolvable("range endpoint has no containing element".to_string())
    })?;
    Ok(build_path_for_offset(
        container,
        offset_within(container, point),
        spine_index,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfi::{Cfi, CfiError};
    use crate::document::SectionStore;
    use roxmltree::{Document, Node};

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter</title></head><body><h1>Heading</h1><p>First paragraph</p><p>The quick brown <em>fox</em> jumps</p></body></html>"#;

    fn store(count: usize) -> SectionStore {
        SectionStore::from_sections(
            (0..count).map(|i| (format!("ch{:02}.xhtml", i + 1), CHAPTER.to_string())),
        )
    }

    fn translator() -> LocationTranslator<SectionStore> {
        LocationTranslator::new(store(6))
    }

    #[tokio::test]
    async fn test_xpointer_to_cfi_and_back() {
        let t = translator();
        let cfi = t
            .xpointer_to_cfi("/body/DocFragment[3]/body/p[2]/text().15")
            .await
            .unwrap();
        assert_eq!(cfi, "epubcfi(/6/6!/4/6/1:15)");

        let back = t.cfi_to_xpointer(&cfi).await.unwrap();
        assert_eq!(back.xpointer, "/body/DocFragment[3]/body/p[2]/text().15");
        assert_eq!(
            normalize_xpointer(&back.xpointer),
            "/body/DocFragment[3]/body/p[2]"
        );
        assert!(!back.is_range());
    }

    #[tokio::test]
    async fn test_spine_step_eight_is_section_three() {
        let t = translator();
        let location = t.cfi_to_xpointer("epubcfi(/6/8!/4/4/1:3)").await.unwrap();
        assert_eq!(location.xpointer, "/body/DocFragment[4]/body/p[1]/text().3");

        let cfi = t.xpointer_to_cfi(&location.xpointer).await.unwrap();
        assert!(cfi.starts_with("epubcfi(/6/8!"), "{}", cfi);
    }

    #[tokio::test]
    async fn test_offset_in_later_text_slot() {
        let t = translator();
        // Slot /3 is " jumps"; 16 + 3 characters precede it in the paragraph
        let location = t.cfi_to_xpointer("epubcfi(/6/2!/4/6/3:2)").await.unwrap();
        assert_eq!(location.xpointer, "/body/DocFragment[1]/body/p[2]/text().21");

        let cfi = t.xpointer_to_cfi(&location.xpointer).await.unwrap();
        assert_eq!(cfi, "epubcfi(/6/2!/4/6/3:2)");
    }

    #[tokio::test]
    async fn test_offset_inside_inline_lifts_to_paragraph() {
        let t = translator();
        // "fox" sits in <em>; 16 characters of the paragraph precede it
        let location = t.cfi_to_xpointer("epubcfi(/6/2!/4/6/2/1:1)").await.unwrap();
        assert_eq!(location.xpointer, "/body/DocFragment[1]/body/p[2]/text().17");
    }

    #[tokio::test]
    async fn test_inline_offset_roundtrip() {
        let t = translator();
        let cfi = t
            .xpointer_to_cfi("/body/DocFragment[1]/body/p[2]/text().18")
            .await
            .unwrap();
        assert_eq!(cfi, "epubcfi(/6/2!/4/6/2/1:2)");

        let back = t.cfi_to_xpointer(&cfi).await.unwrap();
        assert_eq!(back.xpointer, "/body/DocFragment[1]/body/p[2]/text().18");
    }

    #[tokio::test]
    async fn test_range_endpoint_inside_inline() {
        let t = translator();
        let location = t
            .cfi_to_xpointer("epubcfi(/6/2!/4/6,/2/1:1,/3:2)")
            .await
            .unwrap();
        assert_eq!(
            location.pos0.as_deref(),
            Some("/body/DocFragment[1]/body/p[2]/text().17")
        );
        assert_eq!(
            location.pos1.as_deref(),
            Some("/body/DocFragment[1]/body/p[2]/text().21")
        );
    }

    #[tokio::test]
    async fn test_element_cfi_without_offset() {
        let t = translator();
        let location = t.cfi_to_xpointer("epubcfi(/6/2!/4/2)").await.unwrap();
        assert_eq!(location.xpointer, "/body/DocFragment[1]/body/h1");
    }

    #[tokio::test]
    async fn test_range_cfi() {
        let t = translator();
        let location = t
            .cfi_to_xpointer("epubcfi(/6/4!/4,/4/1:1,/6/3:2)")
            .await
            .unwrap();
        assert!(location.is_range());
        assert_eq!(
            location.pos0.as_deref(),
            Some("/body/DocFragment[2]/body/p[1]/text().1")
        );
        assert_eq!(
            location.pos1.as_deref(),
            Some("/body/DocFragment[2]/body/p[2]/text().21")
        );
        assert_eq!(location.pos0.as_deref(), Some(location.xpointer.as_str()));
    }

    #[tokio::test]
    async fn test_section_start() {
        let t = translator();
        let cfi = t.xpointer_to_cfi("/body/DocFragment[2]/body").await.unwrap();
        // Front-biased onto the first heading's text
        assert_eq!(cfi, "epubcfi(/6/4!/4/2/1:0)");
    }

    #[tokio::test]
    async fn test_bare_suffix_is_ignored() {
        let t = translator();
        let cfi = t.xpointer_to_cfi("/body/DocFragment[1]/body/h1.3").await.unwrap();
        assert_eq!(cfi, "epubcfi(/6/2!/4/2/1:0)");
    }

    #[tokio::test]
    async fn test_out_of_bounds() {
        let t = translator();
        assert!(matches!(
            t.xpointer_to_cfi("/body/DocFragment[7]/body/p").await,
            Err(TranslateError::OutOfBounds { index: 6, count: 6 })
        ));
        assert!(matches!(
            t.cfi_to_xpointer("epubcfi(/6/14!/4/2)").await,
            Err(TranslateError::OutOfBounds { index: 6, count: 6 })
        ));
    }

    #[tokio::test]
    async fn test_malformed_inputs() {
        let t = translator();
        assert!(matches!(
            t.xpointer_to_cfi("/html/body/p").await,
            Err(TranslateError::MalformedInput(_))
        ));
        assert!(matches!(
            t.cfi_to_xpointer("not a cfi").await,
            Err(TranslateError::MalformedInput(_))
        ));
        assert!(matches!(
            t.cfi_to_xpointer("epubcfi(/4/2)").await,
            Err(TranslateError::MalformedInput(_))
        ));
        assert!(matches!(
            t.xpointer_to_cfi("/body/DocFragment[1]/body/p[2]/text().99999999999999999999999")
                .await,
            Err(TranslateError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_path() {
        let t = translator();
        assert!(matches!(
            t.xpointer_to_cfi("/body/DocFragment[1]/body/p[3]").await,
            Err(TranslateError::Unresolvable(_))
        ));
        assert!(matches!(
            t.cfi_to_xpointer("epubcfi(/6/2!/4/40)").await,
            Err(TranslateError::Unresolvable(_))
        ));
    }

    #[tokio::test]
    async fn test_section_without_body() {
        let t = LocationTranslator::new(SectionStore::from_sections([(
            "nav.xhtml",
            "<html><head/></html>",
        )]));
        assert!(matches!(
            t.xpointer_to_cfi("/body/DocFragment[1]/body").await,
            Err(TranslateError::SectionUnavailable(_))
        ));
    }

    /// Algebra that resolves normally but cannot produce CFIs
    struct NoFromRange;

    impl CfiAlgebra for NoFromRange {
        fn parse(&self, input: &str) -> std::result::Result<Cfi, CfiError> {
            EpubCfi.parse(input)
        }

        fn collapse(&self, cfi: &Cfi, to_end: bool) -> Cfi {
            EpubCfi.collapse(cfi, to_end)
        }

        fn to_range<'a, 'input>(
            &self,
            doc: &'a Document<'input>,
            cfi: &Cfi,
        ) -> std::result::Result<DomRange<'a, 'input>, CfiError> {
            EpubCfi.to_range(doc, cfi)
        }

        fn to_element<'a, 'input>(
            &self,
            doc: &'a Document<'input>,
            cfi: &Cfi,
        ) -> std::result::Result<Node<'a, 'input>, CfiError> {
            EpubCfi.to_element(doc, cfi)
        }

        fn from_range(&self, _range: &DomRange<'_, '_>) -> std::result::Result<Cfi, CfiError> {
            Err(CfiError::Unresolvable("no range support".to_string()))
        }
    }

    #[tokio::test]
    async fn test_no_cfi_result() {
        let t = LocationTranslator::with_algebra(store(1), NoFromRange);
        assert!(matches!(
            t.xpointer_to_cfi("/body/DocFragment[1]/body/p[1]").await,
            Err(TranslateError::NoCfiResult(_))
        ));
    }

    #[test]
    fn test_location_serializes_camel_case() {
        let point = XPointerLocation::point("/body/DocFragment[1]/body".to_string());
        assert_eq!(
            serde_json::to_string(&point).unwrap(),
            r#"{"xpointer":"/body/DocFragment[1]/body"}"#
        );

        let range = XPointerLocation::range("a".to_string(), "b".to_string());
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json["pos0"], "a");
        assert_eq!(json["pos1"], "b");
    }
}
