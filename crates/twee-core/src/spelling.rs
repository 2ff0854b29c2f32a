//! Spelling-style analyzer for prose partitions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ReconcileError;
use crate::markers::{MarkerKind, MarkerModel, MarkerSeverity, ProblemCollector};
use crate::reconciler::{
    ReconcileContext, ReconcilingStrategy, StrategyCapabilities, confine_to_unit,
};
use crate::region::{ContentType, DirtyRegion, Region};

/// An external spell checking service.
pub trait SpellChecker {
    /// Check `text`, which starts at document offset `base_offset`, and report each problem
    /// with its document range.
    fn check(&self, text: &str, base_offset: usize, report: &mut dyn FnMut(Region, String));
}

/// A spell checker accepting the words of a fixed list (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct WordListChecker {
    words: HashSet<String>,
}

impl WordListChecker {
    /// Create a checker accepting `words`.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl SpellChecker for WordListChecker {
    fn check(&self, text: &str, base_offset: usize, report: &mut dyn FnMut(Region, String)) {
        let mut word = String::new();
        let mut start = 0;
        for (i, c) in text.chars().chain(std::iter::once(' ')).enumerate() {
            if c.is_alphabetic() {
                if word.is_empty() {
                    start = i;
                }
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                if !self.words.contains(&word.to_lowercase()) {
                    report(
                        Region::new(base_offset + start, i - start),
                        format!("The word '{word}' is not correctly spelled"),
                    );
                }
                word.clear();
            }
        }
    }
}

/// Content types the spelling strategy is registered for.
pub const SPELLING_CONTENT_TYPES: [ContentType; 2] =
    [ContentType::Default, ContentType::MacroHeader];

/// Checks default-text and macro-header partitions with a [`SpellChecker`] and publishes
/// [`MarkerKind::SPELLING`] markers.
pub struct SpellingStrategy<C> {
    checker: C,
    collector: ProblemCollector,
}

impl<C: SpellChecker> SpellingStrategy<C> {
    /// Create a strategy reporting into `model`.
    pub fn new(checker: C, model: Arc<dyn MarkerModel>) -> Self {
        Self {
            checker,
            collector: ProblemCollector::new(model, MarkerKind::SPELLING, MarkerSeverity::Warning),
        }
    }
}

impl<C: SpellChecker> ReconcilingStrategy for SpellingStrategy<C> {
    fn name(&self) -> &'static str {
        "spelling"
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities {
            pass_hooks: true,
            typed_initial: true,
            whole_initial: true,
        }
    }

    fn reconcile(
        &mut self,
        ctx: &ReconcileContext<'_>,
        region: Region,
    ) -> Result<(), ReconcileError> {
        let text = ctx.document.text(region.offset, region.length)?;
        let collector = &mut self.collector;
        self.checker
            .check(&text, region.offset, &mut |r, message| collector.accept(r, message));
        Ok(())
    }

    fn reconcile_dirty(
        &mut self,
        ctx: &ReconcileContext<'_>,
        dirty: &DirtyRegion,
        sub_region: Region,
    ) -> Result<(), ReconcileError> {
        let unit = confine_to_unit(ctx.document, ctx.partitioning, dirty, sub_region);
        self.reconcile(ctx, unit)
    }

    fn before_reconcile(&mut self, _ctx: &ReconcileContext<'_>, _dirty: Option<&DirtyRegion>) {
        self.collector.before_collecting();
    }

    fn after_reconcile(&mut self, _ctx: &ReconcileContext<'_>, dirty: Option<&DirtyRegion>) {
        self.collector.after_collecting(dirty.map(DirtyRegion::region));
    }

    fn initial_reconcile_for_type(
        &mut self,
        ctx: &ReconcileContext<'_>,
        content_type: ContentType,
    ) -> Result<(), ReconcileError> {
        self.collector.before_collecting();
        for span in ctx.partitioning.compute_partitioning(0, ctx.document.len()) {
            if ctx.monitor.is_canceled() {
                tracing::debug!("spelling check cancelled");
                self.collector.discard();
                return Ok(());
            }
            if span.content_type == content_type
                && let Err(err) = self.reconcile(ctx, span.region())
            {
                tracing::debug!(%err, "skipping unreadable partition");
            }
        }
        self.collector.after_collecting(None);
        Ok(())
    }

    fn initial_reconcile(&mut self, ctx: &ReconcileContext<'_>) -> Result<(), ReconcileError> {
        self.collector.before_collecting();
        let result = self.reconcile(ctx, Region::new(0, ctx.document.len()));
        self.collector.after_collecting(None);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_list_checker_reports_unknown_words() {
        let checker = WordListChecker::new(["the", "cat"]);
        let mut found = Vec::new();
        checker.check("The cat sta, héllo", 10, &mut |r, m| found.push((r, m)));
        assert_eq!(
            found,
            vec![
                (
                    Region::new(18, 3),
                    "The word 'sta' is not correctly spelled".to_string()
                ),
                (
                    Region::new(23, 5),
                    "The word 'héllo' is not correctly spelled".to_string()
                ),
            ]
        );
    }
}
