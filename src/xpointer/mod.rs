//! XPointer locations
//!
//! KOReader-style positions of the form
//! `/body/DocFragment[N]/body/<path>[/text().<offset>]`. The element path is
//! relative to the section `<body>` and the offset counts characters of the
//! addressed element's text.

mod path;
mod types;

pub use path::{anchor_point, block_container, build_path, build_path_for_offset, resolve_path};
pub use types::{
    cfi_step_to_spine_index, doc_fragment_to_spine_index, extract_spine_index,
    extract_text_offset, normalize_xpointer, spine_index_to_cfi_step,
    spine_index_to_doc_fragment, PathSegment, XPointer,
};
