//! XPointer values and spine-index encodings
//!
//! Format: `/body/DocFragment[N]/body[/<segment>...][/text().<offset>]`
//! where `N` is the one-based section number and each segment is `tag` or
//! `tag[k]` (k one-based among same-tag siblings).

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Prefix shared by every XPointer before the fragment number
const FRAGMENT_PREFIX: &str = "/body/DocFragment[";

/// Element every fragment path descends from
const SECTION_BODY: &str = "/body";

/// DocFragment number for a zero-based spine index
pub fn spine_index_to_doc_fragment(spine_index: usize) -> usize {
    spine_index + 1
}

/// Zero-based spine index for a DocFragment number (`None` for 0)
pub fn doc_fragment_to_spine_index(fragment: usize) -> Option<usize> {
    fragment.checked_sub(1)
}

/// CFI spine item step for a zero-based spine index (`None` past `u32`)
pub fn spine_index_to_cfi_step(spine_index: usize) -> Option<u32> {
    let step = spine_index.checked_add(1)?.checked_mul(2)?;
    u32::try_from(step).ok()
}

/// Zero-based spine index for a CFI spine item step (even and non-zero)
pub fn cfi_step_to_spine_index(step: u32) -> Option<usize> {
    if step == 0 || step % 2 != 0 {
        return None;
    }
    Some((step / 2 - 1) as usize)
}

fn trailing_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:/text\(\)\.\d+|\.\d+)+$").expect("valid regex"))
}

fn text_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/text\(\)\.(\d+)$").expect("valid regex"))
}

/// Strip trailing `/text().N` and bare `.N` tokens.
///
/// Idempotent: the whole trailing run of tokens is removed at once.
pub fn normalize_xpointer(xpointer: &str) -> String {
    trailing_offset_regex()
        .replace(xpointer.trim(), "")
        .into_owned()
}

/// Text offset carried by a trailing `/text().N` token.
///
/// `Ok(None)` when there is no such token; an offset too large for `usize`
/// is malformed.
pub fn extract_text_offset(xpointer: &str) -> Result<Option<usize>, TranslateError> {
    let Some(digits) = text_offset_regex()
        .captures(xpointer.trim())
        .and_then(|c| c.get(1))
    else {
        return Ok(None);
    };
    digits
        .as_str()
        .parse()
        .map(Some)
        .map_err(|_| malformed(xpointer, "text offset out of range"))
}

/// Zero-based spine index from the `DocFragment[N]` token
pub fn extract_spine_index(xpointer: &str) -> Result<usize, TranslateError> {
    let rest = xpointer
        .trim()
        .strip_prefix(FRAGMENT_PREFIX)
        .ok_or_else(|| malformed(xpointer, "missing /body/DocFragment[N]"))?;
    let end = rest
        .find(']')
        .ok_or_else(|| malformed(xpointer, "unclosed DocFragment index"))?;
    let fragment: usize = rest[..end]
        .parse()
        .map_err(|_| malformed(xpointer, "DocFragment index is not a number"))?;

    doc_fragment_to_spine_index(fragment)
        .ok_or_else(|| malformed(xpointer, "DocFragment index must be at least 1"))
}

fn malformed(xpointer: &str, reason: &str) -> TranslateError {
    TranslateError::MalformedInput(format!("{} ({})", reason, xpointer))
}

/// One step of an element path: `tag` or `tag[k]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub tag: String,
    /// One-based index among same-tag siblings; only present when the tag
    /// is not unique at that level
    pub index: Option<usize>,
}

impl PathSegment {
    pub fn bare(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            index: None,
        }
    }

    pub fn indexed(tag: impl Into<String>, index: usize) -> Self {
        Self {
            tag: tag.into(),
            index: Some(index),
        }
    }

    /// Sibling position to select (1 when unindexed)
    pub fn position(&self) -> usize {
        self.index.unwrap_or(1)
    }
}

impl FromStr for PathSegment {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = |reason: &str| TranslateError::MalformedInput(format!("{} ({})", reason, s));

        let (tag, index) = match s.find('[') {
            Some(open) => {
                let inner = s[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| bad("unclosed segment index"))?;
                let index: usize = inner.parse().map_err(|_| bad("segment index is not a number"))?;
                if index == 0 {
                    return Err(bad("segment index must be at least 1"));
                }
                (&s[..open], Some(index))
            }
            None => (s, None),
        };

        let valid_tag = !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if !valid_tag {
            return Err(bad("invalid tag name"));
        }

        Ok(Self {
            tag: tag.to_string(),
            index,
        })
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.tag, index),
            None => write!(f, "{}", self.tag),
        }
    }
}

/// A parsed XPointer location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XPointer {
    /// Zero-based spine index
    pub spine_index: usize,
    /// Element path below the section body (empty = section start)
    pub path: Vec<PathSegment>,
    /// Character offset into the addressed element's text
    pub text_offset: Option<usize>,
}

impl XPointer {
    /// Start of a section
    pub fn section_start(spine_index: usize) -> Self {
        Self {
            spine_index,
            path: Vec::new(),
            text_offset: None,
        }
    }

    pub fn with_text_offset(mut self, offset: usize) -> Self {
        self.text_offset = Some(offset);
        self
    }

    /// The XPointer string without its text offset
    pub fn normalized(&self) -> String {
        let mut xp = self.clone();
        xp.text_offset = None;
        xp.to_string()
    }
}

impl FromStr for XPointer {
    type Err = TranslateError;

    /// Parse an XPointer. The text offset is read from the original string,
    /// the element path from its normalized form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text_offset = extract_text_offset(s)?;
        let normalized = normalize_xpointer(s);
        let spine_index = extract_spine_index(&normalized)?;

        let after_fragment = normalized
            .find(']')
            .map(|end| &normalized[end + 1..])
            .unwrap_or_default();
        let remaining = after_fragment
            .strip_prefix(SECTION_BODY)
            .ok_or_else(|| malformed(s, "missing section /body"))?;

        let path = if remaining.is_empty() {
            Vec::new()
        } else {
            remaining
                .strip_prefix('/')
                .ok_or_else(|| malformed(s, "path must continue with '/'"))?
                .split('/')
                .map(str::parse)
                .collect::<Result<Vec<PathSegment>, _>>()?
        };

        Ok(Self {
            spine_index,
            path,
            text_offset,
        })
    }
}

impl fmt::Display for XPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}]{}",
            FRAGMENT_PREFIX,
            spine_index_to_doc_fragment(self.spine_index),
            SECTION_BODY
        )?;
        for segment in &self.path {
            write!(f, "/{}", segment)?;
        }
        if let Some(offset) = self.text_offset {
            write!(f, "/text().{}", offset)?;
        }
        Ok(())
    }
}
