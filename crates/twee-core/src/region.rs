//! Regions, typed spans, dirty regions and text edits.
//!
//! All offsets are **char offsets** (Unicode scalar values) from the start of the document,
//! consistent with [`RopeDocument`](crate::RopeDocument).

use std::fmt;

/// A range of the document expressed as `offset` + `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Region {
    /// Start offset (inclusive).
    pub offset: usize,
    /// Number of chars covered.
    pub length: usize,
}

impl Region {
    /// Create a new region.
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Returns `true` if `offset` lies inside `[self.offset, self.end())`.
    pub fn contains(&self, offset: usize) -> bool {
        self.offset <= offset && offset < self.end()
    }

    /// Returns `true` if `other` lies entirely within this region.
    pub fn includes(&self, other: &Region) -> bool {
        self.offset <= other.offset && other.end() <= self.end()
    }

    /// Position overlap test used for markers and outline entries.
    ///
    /// Empty ranges are handled specially: an empty query overlaps a non-empty region when it
    /// sits inside it, and two empty ranges overlap only when they share the same offset.
    pub fn overlaps_with(&self, offset: usize, length: usize) -> bool {
        let end = offset + length;
        let this_end = self.end();
        if length > 0 {
            if self.length > 0 {
                return self.offset < end && offset < this_end;
            }
            return offset <= self.offset && self.offset < end;
        }
        if self.length > 0 {
            return self.offset <= offset && offset < this_end;
        }
        self.offset == offset
    }

    /// Smallest region covering both `self` and `other`.
    pub fn union(&self, other: &Region) -> Region {
        let start = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Region::new(start, end - start)
    }

    /// Update this position for a text replacement.
    ///
    /// Returns `None` when the edit deletes every char of a non-empty position. Otherwise the
    /// position shifts when it lies after the edit, grows when text is inserted strictly inside
    /// it, and shrinks by the part of a deletion it overlaps.
    pub fn adapt_to_edit(&self, edit: &TextEdit) -> Option<Region> {
        let deleted_end = edit.offset + edit.deleted_len;
        if edit.deleted_len > 0
            && self.length > 0
            && edit.offset <= self.offset
            && self.end() <= deleted_end
        {
            return None;
        }

        let mut offset = self.offset;
        let mut length = self.length;

        if edit.deleted_len > 0 {
            let my_start = offset;
            let my_end = (offset + length).saturating_sub(1).max(my_start);
            let yours_start = edit.offset;
            let yours_end = (deleted_end - 1).max(yours_start);
            if my_end >= yours_start {
                if my_start <= yours_start {
                    if yours_end <= my_end {
                        length = length.saturating_sub(edit.deleted_len);
                    } else {
                        length = length.saturating_sub(my_end - yours_start + 1);
                    }
                } else if yours_end < my_start {
                    offset -= edit.deleted_len;
                } else {
                    length = length.saturating_sub(yours_end - my_start + 1);
                    offset = yours_start;
                }
            }
        }

        if edit.inserted_len > 0 {
            let my_start = offset;
            let my_end = (offset + length).saturating_sub(1).max(my_start);
            let yours_start = edit.offset;
            if my_end >= yours_start {
                if edit.deleted_len == 0 {
                    if my_start < yours_start {
                        length += edit.inserted_len;
                    } else {
                        offset += edit.inserted_len;
                    }
                } else if my_start < yours_start {
                    length += edit.inserted_len;
                } else {
                    offset += edit.inserted_len;
                }
            }
        }

        Some(Region::new(offset, length))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.offset, self.length)
    }
}

/// The content-type tag attached to a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentType {
    /// Body text not claimed by any rule.
    Default,
    /// `<!-- ... -->`
    XmlComment,
    /// `/* ... */`
    JsComment,
    /// A generic `<...>` markup tag.
    XmlTag,
    /// A `<<...>>` macro call.
    MacroCall,
    /// A whole line starting with `!`.
    MacroHeader,
    /// `{{{ ... }}}` verbatim code.
    MacroCode,
    /// `[[ ... ]]` link.
    Link,
    /// A whole line starting with `::` (passage header).
    Passage,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 9] = [
        ContentType::Default,
        ContentType::XmlComment,
        ContentType::JsComment,
        ContentType::XmlTag,
        ContentType::MacroCall,
        ContentType::MacroHeader,
        ContentType::MacroCode,
        ContentType::Link,
        ContentType::Passage,
    ];

    /// Stable string tag for this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Default => "__dftl_partition_content_type",
            ContentType::XmlComment => "__xml_comment",
            ContentType::JsComment => "__js_comment",
            ContentType::XmlTag => "__xml_tag",
            ContentType::MacroCall => "__sc_macro",
            ContentType::MacroHeader => "__sc_header",
            ContentType::MacroCode => "__sc_code",
            ContentType::Link => "__sc_link",
            ContentType::Passage => "__tw_passage",
        }
    }

    /// Look up a content type by its string tag.
    pub fn from_tag(tag: &str) -> Option<ContentType> {
        Self::ALL.into_iter().find(|ct| ct.as_str() == tag)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A region labelled with the content type that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedRegion {
    /// Start offset (inclusive).
    pub offset: usize,
    /// Number of chars covered.
    pub length: usize,
    /// Content type of the span.
    pub content_type: ContentType,
}

impl TypedRegion {
    /// Create a new typed region.
    pub const fn new(offset: usize, length: usize, content_type: ContentType) -> Self {
        Self {
            offset,
            length,
            content_type,
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The untyped extent of this span.
    pub fn region(&self) -> Region {
        Region::new(self.offset, self.length)
    }
}

impl From<TypedRegion> for Region {
    fn from(value: TypedRegion) -> Self {
        value.region()
    }
}

/// A range touched by an edit, in post-edit coordinates.
///
/// The "whole document" case is modelled as `Option::<DirtyRegion>::None` by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirtyRegion {
    /// Start offset of the changed text.
    pub offset: usize,
    /// Length of the inserted text, or of the deleted text when that is longer.
    pub length: usize,
}

impl DirtyRegion {
    /// Create a dirty region.
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The untyped extent of this dirty region.
    pub fn region(&self) -> Region {
        Region::new(self.offset, self.length)
    }
}

impl From<DirtyRegion> for Region {
    fn from(value: DirtyRegion) -> Self {
        value.region()
    }
}

/// A single buffer replacement: `deleted_len` chars at `offset` replaced by `inserted_len` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextEdit {
    /// Offset of the replacement.
    pub offset: usize,
    /// Number of chars removed.
    pub deleted_len: usize,
    /// Number of chars inserted.
    pub inserted_len: usize,
}

impl TextEdit {
    /// Create a text edit.
    pub const fn new(offset: usize, deleted_len: usize, inserted_len: usize) -> Self {
        Self {
            offset,
            deleted_len,
            inserted_len,
        }
    }

    /// End of the replaced text in pre-edit coordinates.
    pub fn old_end(&self) -> usize {
        self.offset + self.deleted_len
    }

    /// End of the inserted text in post-edit coordinates.
    pub fn new_end(&self) -> usize {
        self.offset + self.inserted_len
    }

    /// Signed length change produced by this edit.
    pub fn delta(&self) -> isize {
        self.inserted_len as isize - self.deleted_len as isize
    }

    /// The region an analyzer has to revisit after this edit.
    ///
    /// A deletion keeps its deleted length, so positions that were moved onto the edit point
    /// fall inside the region. It may reach past the end of the document.
    pub fn dirty_region(&self) -> DirtyRegion {
        DirtyRegion::new(self.offset, self.inserted_len.max(self.deleted_len))
    }
}
