//! Document partitioning.
//!
//! A [`DocumentPartitioner`] classifies the whole document into contiguous, non-overlapping
//! [`TypedRegion`]s using the Twee rule table, and keeps that classification current on every
//! [`TextEdit`] by re-scanning only the neighbourhood of the edit.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::document::TextDocument;
use crate::error::DocumentError;
use crate::region::{ContentType, Region, TextEdit, TypedRegion};
use crate::rules::{CharScanner, PatternRule, RuleScanner};

/// Longest distance a rule at position `p` looks ahead (start sequence plus one peeked char).
///
/// A char further than this before an edit cannot change classification unless it is an
/// unterminated start, which is tracked separately.
const MAX_RULE_LOOKAHEAD: usize = 4;

/// Read access to a document's partitioning.
pub trait Partitioning {
    /// Spans intersecting `[offset, offset + length)`, clipped to that range.
    ///
    /// A zero-length query returns the span at `offset` clipped to zero length. An invalid
    /// range yields an empty list.
    fn compute_partitioning(&self, offset: usize, length: usize) -> Vec<TypedRegion>;

    /// The whole span containing `offset` (the last span when `offset` is the document length).
    fn partition_at(&self, offset: usize) -> Result<TypedRegion, DocumentError>;

    /// Content type of the span containing `offset`.
    fn content_type_at(&self, offset: usize) -> Result<ContentType, DocumentError> {
        Ok(self.partition_at(offset)?.content_type)
    }
}

/// The Twee partition rules, in priority order.
pub fn twee_partition_rules() -> RuleScanner<ContentType> {
    RuleScanner::new(ContentType::Default)
        .with_rule(PatternRule::multi_line("<!--", "-->", ContentType::XmlComment))
        .with_rule(PatternRule::multi_line("{{{", "}}}", ContentType::MacroCode))
        .with_rule(PatternRule::multi_line("[[", "]]", ContentType::Link))
        .with_rule(PatternRule::multi_line("/*", "*/", ContentType::JsComment))
        .with_rule(PatternRule::whole_line("!", ContentType::MacroHeader))
        .with_rule(PatternRule::whole_line("::", ContentType::Passage))
        .with_rule(PatternRule::multi_line("<<", ">>", ContentType::MacroCall))
        .with_rule(
            PatternRule::multi_line("<", ">", ContentType::XmlTag).not_followed_by(&['?', '!']),
        )
}

/// Incrementally-maintained partitioning of one document.
#[derive(Clone)]
pub struct DocumentPartitioner {
    rules: Arc<RuleScanner<ContentType>>,
    spans: Vec<TypedRegion>,
    /// Positions where a multi-line rule matched its start but never found its end.
    unterminated: BTreeSet<usize>,
    doc_len: usize,
}

impl fmt::Debug for DocumentPartitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPartitioner")
            .field("spans", &self.spans)
            .field("unterminated", &self.unterminated)
            .field("doc_len", &self.doc_len)
            .finish()
    }
}

impl Default for DocumentPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentPartitioner {
    /// Create a partitioner with the Twee rule table. Call [`connect`](Self::connect) before use.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(twee_partition_rules()),
            spans: Vec::new(),
            unterminated: BTreeSet::new(),
            doc_len: 0,
        }
    }

    /// Partition `doc` from scratch.
    pub fn connect(&mut self, doc: &dyn TextDocument) {
        self.spans.clear();
        self.unterminated.clear();
        self.doc_len = doc.len();
        let mut spans = Vec::new();
        let mut unterminated = BTreeSet::new();
        self.scan(doc, 0, &mut spans, &mut unterminated, |_| false);
        self.spans = spans;
        self.unterminated = unterminated;
        tracing::debug!(spans = self.spans.len(), len = self.doc_len, "partitioned document");
    }

    /// All spans, in document order. Empty for an empty document.
    pub fn spans(&self) -> &[TypedRegion] {
        &self.spans
    }

    /// Positions of multi-line starts that currently have no end.
    pub fn unterminated_starts(&self) -> impl Iterator<Item = usize> + '_ {
        self.unterminated.iter().copied()
    }

    /// Update the partitioning after `edit` has been applied to `doc`.
    ///
    /// Returns the region (post-edit coordinates) that was re-scanned; partitions outside it
    /// are the old partitions shifted by the edit.
    pub fn document_changed(&mut self, doc: &dyn TextDocument, edit: &TextEdit) -> Region {
        let old_spans = std::mem::take(&mut self.spans);
        let old_unterminated = std::mem::take(&mut self.unterminated);
        self.doc_len = doc.len();

        let restart = Self::restart_offset(&old_spans, &old_unterminated, edit);

        let mut spans = Vec::with_capacity(old_spans.len() + 4);
        for span in &old_spans {
            if span.end() <= restart {
                spans.push(*span);
            } else {
                if span.offset < restart {
                    spans.push(TypedRegion::new(
                        span.offset,
                        restart - span.offset,
                        span.content_type,
                    ));
                }
                break;
            }
        }
        let mut unterminated: BTreeSet<usize> =
            old_unterminated.range(..restart).copied().collect();

        let delta = edit.delta();
        let new_end = edit.new_end();
        let to_old = |pos: usize| (pos as isize - delta) as usize;

        let resync = self.scan(doc, restart, &mut spans, &mut unterminated, |pos| {
            pos > new_end && Self::old_scan_visited(&old_spans, to_old(pos))
        });

        let changed_end = match resync {
            Some(pos) => {
                let old_pos = to_old(pos);
                let first = old_spans.partition_point(|s| s.end() <= old_pos);
                let shift = |offset: usize| (offset as isize + delta) as usize;
                if let Some(head) = old_spans.get(first) {
                    push_span(
                        &mut spans,
                        TypedRegion::new(pos, head.end() - old_pos, head.content_type),
                    );
                }
                for span in old_spans.iter().skip(first + 1) {
                    push_span(
                        &mut spans,
                        TypedRegion::new(shift(span.offset), span.length, span.content_type),
                    );
                }
                unterminated.extend(old_unterminated.range(old_pos..).map(|&p| shift(p)));
                pos
            }
            None => self.doc_len,
        };

        self.spans = spans;
        self.unterminated = unterminated;
        tracing::debug!(
            restart,
            changed_end,
            spans = self.spans.len(),
            "repartitioned after edit"
        );
        Region::new(restart, changed_end.saturating_sub(restart))
    }

    fn restart_offset(
        old_spans: &[TypedRegion],
        old_unterminated: &BTreeSet<usize>,
        edit: &TextEdit,
    ) -> usize {
        let window = edit.offset.saturating_sub(MAX_RULE_LOOKAHEAD);
        let mut restart = if window == 0 || old_spans.is_empty() {
            0
        } else {
            let idx = old_spans
                .partition_point(|s| s.end() <= window)
                .min(old_spans.len() - 1);
            let span = old_spans[idx];
            if span.content_type == ContentType::Default {
                window.max(span.offset)
            } else {
                span.offset
            }
        };
        if let Some(&first) = old_unterminated.range(..edit.offset).next() {
            restart = restart.min(first);
        }
        restart
    }

    /// Whether the previous scan stopped at `old_pos`, i.e. it is a span start or a char of a
    /// default span.
    fn old_scan_visited(old_spans: &[TypedRegion], old_pos: usize) -> bool {
        let idx = old_spans.partition_point(|s| s.end() <= old_pos);
        match old_spans.get(idx) {
            Some(span) => span.offset == old_pos || span.content_type == ContentType::Default,
            None => false,
        }
    }

    /// Scan from `start` to the end of the document, appending spans. Stops early at the first
    /// position for which `resync` returns `true` and returns that position.
    fn scan(
        &self,
        doc: &dyn TextDocument,
        start: usize,
        spans: &mut Vec<TypedRegion>,
        unterminated: &mut BTreeSet<usize>,
        mut resync: impl FnMut(usize) -> bool,
    ) -> Option<usize> {
        let len = doc.len();
        let mut scanner = CharScanner::new(doc, start, len.saturating_sub(start));
        loop {
            let pos = scanner.offset();
            if scanner.at_end() {
                return None;
            }
            if resync(pos) {
                return Some(pos);
            }
            let content_type = match self.rules.match_rules(&mut scanner, |p| {
                unterminated.insert(p);
            }) {
                Some(content_type) => content_type,
                None => {
                    scanner.read();
                    ContentType::Default
                }
            };
            push_span(
                spans,
                TypedRegion::new(pos, scanner.offset() - pos, content_type),
            );
        }
    }
}

/// Append `span`, merging it into a preceding adjacent default span.
fn push_span(spans: &mut Vec<TypedRegion>, span: TypedRegion) {
    if span.length == 0 {
        return;
    }
    if let Some(last) = spans.last_mut()
        && span.content_type == ContentType::Default
        && last.content_type == ContentType::Default
        && last.end() == span.offset
    {
        last.length += span.length;
        return;
    }
    spans.push(span);
}

impl Partitioning for DocumentPartitioner {
    fn compute_partitioning(&self, offset: usize, length: usize) -> Vec<TypedRegion> {
        let len = self.doc_len;
        if offset > len || length > len - offset {
            return Vec::new();
        }
        if length == 0 {
            return match self.partition_at(offset) {
                Ok(span) => vec![TypedRegion::new(offset, 0, span.content_type)],
                Err(_) => Vec::new(),
            };
        }
        let end = offset + length;
        let first = self.spans.partition_point(|s| s.end() <= offset);
        self.spans[first..]
            .iter()
            .take_while(|s| s.offset < end)
            .map(|s| {
                let start = s.offset.max(offset);
                TypedRegion::new(start, s.end().min(end) - start, s.content_type)
            })
            .collect()
    }

    fn partition_at(&self, offset: usize) -> Result<TypedRegion, DocumentError> {
        if offset > self.doc_len {
            return Err(DocumentError::out_of_range(offset, 0, self.doc_len));
        }
        let idx = self.spans.partition_point(|s| s.end() <= offset);
        match self.spans.get(idx).or(self.spans.last()) {
            Some(span) => Ok(*span),
            None => Ok(TypedRegion::new(0, 0, ContentType::Default)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RopeDocument;
    use ContentType::*;
    use pretty_assertions::assert_eq;

    fn partition(text: &str) -> Vec<(ContentType, String)> {
        let doc = RopeDocument::new(text);
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);
        partitioner
            .spans()
            .iter()
            .map(|s| (s.content_type, doc.text(s.offset, s.length).unwrap()))
            .collect()
    }

    fn t(ct: ContentType, s: &str) -> (ContentType, String) {
        (ct, s.to_string())
    }

    #[test]
    fn test_passage_and_body() {
        assert_eq!(
            partition(":: Start [tag]\nHello <<set $x to 1>> [[Next]]\n"),
            vec![
                t(Passage, ":: Start [tag]\n"),
                t(Default, "Hello "),
                t(MacroCall, "<<set $x to 1>>"),
                t(Default, " "),
                t(Link, "[[Next]]"),
                t(Default, "\n"),
            ]
        );
    }

    #[test]
    fn test_comments_code_and_tags() {
        assert_eq!(
            partition("<!-- c -->/* j */{{{ <b> }}}<i>x</i>"),
            vec![
                t(XmlComment, "<!-- c -->"),
                t(JsComment, "/* j */"),
                t(MacroCode, "{{{ <b> }}}"),
                t(XmlTag, "<i>"),
                t(Default, "x"),
                t(XmlTag, "</i>"),
            ]
        );
    }

    #[test]
    fn test_processing_instruction_is_not_a_tag() {
        assert_eq!(partition("<?xml ?>"), vec![t(Default, "<?xml ?>")]);
    }

    #[test]
    fn test_macro_header_needs_column_zero() {
        assert_eq!(
            partition("a !b\n!Header\r\nrest"),
            vec![
                t(Default, "a !b\n"),
                t(MacroHeader, "!Header\r\n"),
                t(Default, "rest"),
            ]
        );
    }

    #[test]
    fn test_whole_line_ends_at_eof() {
        assert_eq!(partition("x\n:: Last"), vec![t(Default, "x\n"), t(Passage, ":: Last")]);
    }

    #[test]
    fn test_unterminated_macro_becomes_tag_when_possible() {
        let doc = RopeDocument::new("<<if a > b");
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);
        assert_eq!(
            partitioner.spans(),
            &[
                TypedRegion::new(0, 8, XmlTag),
                TypedRegion::new(8, 2, Default),
            ]
        );
        assert_eq!(partitioner.unterminated_starts().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_compute_partitioning_clips() {
        let doc = RopeDocument::new("ab<<c>>de");
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);
        assert_eq!(
            partitioner.compute_partitioning(1, 4),
            vec![TypedRegion::new(1, 1, Default), TypedRegion::new(2, 3, MacroCall)]
        );
        assert_eq!(
            partitioner.compute_partitioning(3, 0),
            vec![TypedRegion::new(3, 0, MacroCall)]
        );
        assert_eq!(partitioner.compute_partitioning(8, 5), vec![]);
        assert_eq!(
            partitioner.partition_at(9).unwrap(),
            TypedRegion::new(7, 2, Default)
        );
        assert!(partitioner.partition_at(10).is_err());
    }

    #[test]
    fn test_empty_document() {
        let doc = RopeDocument::new("");
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);
        assert_eq!(
            partitioner.compute_partitioning(0, 0),
            vec![TypedRegion::new(0, 0, Default)]
        );
        assert_eq!(
            partitioner.partition_at(0).unwrap(),
            TypedRegion::new(0, 0, Default)
        );
    }

    #[test]
    fn test_incremental_closes_unterminated_comment() {
        let mut doc = RopeDocument::new("a /* b\nc <<x>> d");
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);
        assert_eq!(partitioner.spans()[1], TypedRegion::new(9, 5, MacroCall));

        let edit = doc.replace(16, 0, "*/").unwrap();
        let changed = partitioner.document_changed(&doc, &edit);
        assert_eq!(changed.offset, 2);
        assert_eq!(
            partitioner.spans(),
            &[
                TypedRegion::new(0, 2, Default),
                TypedRegion::new(2, 16, JsComment),
            ]
        );
    }

    #[test]
    fn test_incremental_resyncs_after_edit() {
        let text = ":: A\nab <<m>> cd\n:: B\nef [[l]]\n";
        let mut doc = RopeDocument::new(text);
        let mut partitioner = DocumentPartitioner::new();
        partitioner.connect(&doc);

        let edit = doc.replace(6, 0, "XYZ").unwrap();
        let changed = partitioner.document_changed(&doc, &edit);
        assert!(changed.end() < doc.len());

        let mut fresh = DocumentPartitioner::new();
        fresh.connect(&doc);
        assert_eq!(partitioner.spans(), fresh.spans());
    }
}
