//! Document accessors.
//!
//! The analysis kernel never owns the editor buffer; it reads ranges through [`TextDocument`].
//! [`RopeDocument`] is the in-memory implementation used by the CLI and the tests, and
//! [`TweeDocument`] pairs it with an incrementally-maintained [`DocumentPartitioner`].

use crate::error::DocumentError;
use crate::partition::{DocumentPartitioner, Partitioning};
use crate::region::{Region, TextEdit, TypedRegion};
use ropey::Rope;

/// Read access to a text document, addressed in char offsets.
pub trait TextDocument {
    /// Number of chars in the document.
    fn len(&self) -> usize;

    /// Returns `true` if the document is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The char at `offset`, or `None` at or past the end.
    fn char_at(&self, offset: usize) -> Option<char>;

    /// Text of `[offset, offset + length)`.
    fn text(&self, offset: usize, length: usize) -> Result<String, DocumentError>;

    /// The line containing `offset`, excluding its line delimiter.
    fn line_region(&self, offset: usize) -> Result<Region, DocumentError>;

    /// Zero-based line number of `offset`.
    fn line_of_offset(&self, offset: usize) -> Result<usize, DocumentError>;

    /// Whole document text.
    fn full_text(&self) -> String {
        self.text(0, self.len()).unwrap_or_default()
    }
}

/// A rope-backed document buffer.
#[derive(Debug, Clone, Default)]
pub struct RopeDocument {
    rope: Rope,
}

impl RopeDocument {
    /// Create a document holding `text`.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Replace `deleted_len` chars at `offset` with `text`.
    pub fn replace(
        &mut self,
        offset: usize,
        deleted_len: usize,
        text: &str,
    ) -> Result<TextEdit, DocumentError> {
        let len = self.rope.len_chars();
        if offset > len || deleted_len > len - offset {
            return Err(DocumentError::out_of_range(offset, deleted_len, len));
        }
        if deleted_len > 0 {
            self.rope.remove(offset..offset + deleted_len);
        }
        if !text.is_empty() {
            self.rope.insert(offset, text);
        }
        Ok(TextEdit::new(offset, deleted_len, text.chars().count()))
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<(), DocumentError> {
        let len = self.rope.len_chars();
        if offset > len || length > len - offset {
            return Err(DocumentError::out_of_range(offset, length, len));
        }
        Ok(())
    }
}

impl TextDocument for RopeDocument {
    fn len(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn text(&self, offset: usize, length: usize) -> Result<String, DocumentError> {
        self.check_range(offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    fn line_region(&self, offset: usize) -> Result<Region, DocumentError> {
        let line = self.line_of_offset(offset)?;
        let start = self.rope.line_to_char(line);
        let mut end = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1)
        } else {
            self.rope.len_chars()
        };
        // Strip the delimiter (`\n`, `\r\n` or `\r`).
        if end > start && self.rope.char(end - 1) == '\n' {
            end -= 1;
        }
        if end > start && self.rope.char(end - 1) == '\r' {
            end -= 1;
        }
        Ok(Region::new(start, end - start))
    }

    fn line_of_offset(&self, offset: usize) -> Result<usize, DocumentError> {
        self.check_range(offset, 0)?;
        Ok(self.rope.char_to_line(offset))
    }
}

/// A document change as seen by the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChange {
    /// The buffer replacement that was applied.
    pub edit: TextEdit,
    /// The region whose partitioning changed, in post-edit coordinates.
    pub partitioning_changed: Region,
}

/// A Twee source buffer together with its incrementally-maintained partitioning.
#[derive(Debug, Clone)]
pub struct TweeDocument {
    text: RopeDocument,
    partitioner: DocumentPartitioner,
}

impl TweeDocument {
    /// Create a document and partition it.
    pub fn new(text: &str) -> Self {
        let text = RopeDocument::new(text);
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&text);
        Self { text, partitioner }
    }

    /// Apply one replacement and update the partitioning incrementally.
    pub fn replace(
        &mut self,
        offset: usize,
        deleted_len: usize,
        text: &str,
    ) -> Result<DocumentChange, DocumentError> {
        let edit = self.text.replace(offset, deleted_len, text)?;
        let partitioning_changed = self.partitioner.document_changed(&self.text, &edit);
        Ok(DocumentChange {
            edit,
            partitioning_changed,
        })
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<DocumentChange, DocumentError> {
        self.replace(offset, 0, text)
    }

    /// Delete `length` chars at `offset`.
    pub fn delete(&mut self, offset: usize, length: usize) -> Result<DocumentChange, DocumentError> {
        self.replace(offset, length, "")
    }

    /// The text buffer.
    pub fn buffer(&self) -> &RopeDocument {
        &self.text
    }

    /// The partitioner.
    pub fn partitioner(&self) -> &DocumentPartitioner {
        &self.partitioner
    }
}

impl TextDocument for TweeDocument {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.text.char_at(offset)
    }

    fn text(&self, offset: usize, length: usize) -> Result<String, DocumentError> {
        self.text.text(offset, length)
    }

    fn line_region(&self, offset: usize) -> Result<Region, DocumentError> {
        self.text.line_region(offset)
    }

    fn line_of_offset(&self, offset: usize) -> Result<usize, DocumentError> {
        self.text.line_of_offset(offset)
    }
}

impl Partitioning for TweeDocument {
    fn compute_partitioning(&self, offset: usize, length: usize) -> Vec<TypedRegion> {
        self.partitioner.compute_partitioning(offset, length)
    }

    fn partition_at(&self, offset: usize) -> Result<TypedRegion, DocumentError> {
        self.partitioner.partition_at(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_region_excludes_delimiters() {
        let doc = RopeDocument::new("ab\r\ncd\nef");
        assert_eq!(doc.line_region(0).unwrap(), Region::new(0, 2));
        assert_eq!(doc.line_region(2).unwrap(), Region::new(0, 2));
        assert_eq!(doc.line_region(4).unwrap(), Region::new(4, 2));
        assert_eq!(doc.line_region(8).unwrap(), Region::new(7, 2));
        assert_eq!(doc.line_region(9).unwrap(), Region::new(7, 2));
        assert!(doc.line_region(10).is_err());
    }

    #[test]
    fn test_only_newline_and_return_break_lines() {
        let doc = RopeDocument::new("a\u{2028}b\u{85}c\u{c}d\re");
        assert_eq!(doc.line_of_offset(6).unwrap(), 0);
        assert_eq!(doc.line_region(3).unwrap(), Region::new(0, 7));
        assert_eq!(doc.line_of_offset(8).unwrap(), 1);
        assert_eq!(doc.line_region(8).unwrap(), Region::new(8, 1));
    }

    #[test]
    fn test_text_out_of_range() {
        let doc = RopeDocument::new("héllo");
        assert_eq!(doc.text(1, 3).unwrap(), "éll");
        assert_eq!(
            doc.text(3, 5),
            Err(DocumentError::out_of_range(3, 5, 5))
        );
    }

    #[test]
    fn test_replace_reports_char_lengths() {
        let mut doc = RopeDocument::new("abc");
        let edit = doc.replace(1, 1, "éé").unwrap();
        assert_eq!(edit, TextEdit::new(1, 1, 2));
        assert_eq!(doc.full_text(), "aééc");
        assert!(doc.replace(5, 0, "x").is_err());
    }
}
