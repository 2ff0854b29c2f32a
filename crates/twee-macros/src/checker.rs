//! Reconciling strategy that validates `<<...>>` macro calls.

use std::sync::Arc;

use twee_core::{
    ConfigSource, ContentType, DirtyRegion, MarkerKind, MarkerModel, MarkerSeverity,
    ProblemCollector, ReconcileContext, ReconcileError, ReconcilingStrategy, Region,
    StrategyCapabilities,
};

use crate::dictionary::MacroDictionary;

/// Shortest span that can hold a call: `<<` plus `>>`.
const MIN_CALL_LEN: usize = 4;

/// Checks every macro-call span against a [`MacroDictionary`] and publishes
/// [`MarkerKind::MACRO_PROBLEM`] error markers.
///
/// Register it for [`ContentType::MacroCall`].
pub struct MacroChecker {
    dictionary: Arc<MacroDictionary>,
    config: Arc<dyn ConfigSource>,
    collector: ProblemCollector,
}

impl MacroChecker {
    /// Create a checker reporting into `model`.
    pub fn new(
        dictionary: Arc<MacroDictionary>,
        config: Arc<dyn ConfigSource>,
        model: Arc<dyn MarkerModel>,
    ) -> Self {
        Self {
            dictionary,
            config,
            collector: ProblemCollector::new(
                model,
                MarkerKind::MACRO_PROBLEM,
                MarkerSeverity::Error,
            ),
        }
    }

    fn check_span(
        &mut self,
        ctx: &ReconcileContext<'_>,
        span: Region,
    ) -> Result<(), ReconcileError> {
        if span.length < MIN_CALL_LEN {
            return Ok(());
        }
        let text = ctx.document.text(span.offset + 2, span.length - MIN_CALL_LEN)?;
        if let Err(err) = self.dictionary.check(text.trim()) {
            self.collector.accept(span, err.to_string());
        }
        Ok(())
    }
}

impl ReconcilingStrategy for MacroChecker {
    fn name(&self) -> &'static str {
        "macro-check"
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
        if !self.config.macro_check_enabled() || ctx.monitor.is_canceled() {
            return Ok(());
        }
        if let Err(err) = self.check_span(ctx, region) {
            tracing::debug!(%err, "macro span no longer readable");
        }
        Ok(())
    }

    fn reconcile_dirty(
        &mut self,
        ctx: &ReconcileContext<'_>,
        _dirty: &DirtyRegion,
        sub_region: Region,
    ) -> Result<(), ReconcileError> {
        // A sub-region may cover only part of the call; check the whole span.
        let span = ctx.partitioning.partition_at(sub_region.offset)?;
        if span.content_type != ContentType::MacroCall {
            return Ok(());
        }
        self.reconcile(ctx, span.region())
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
        if self.config.macro_check_enabled() {
            for span in ctx.partitioning.compute_partitioning(0, ctx.document.len()) {
                if ctx.monitor.is_canceled() {
                    tracing::debug!("macro check cancelled");
                    self.collector.discard();
                    return Ok(());
                }
                if span.content_type == content_type
                    && let Err(err) = self.check_span(ctx, span.region())
                {
                    tracing::debug!(%err, "skipping unreadable macro span");
                }
            }
        }
        self.collector.after_collecting(None);
        Ok(())
    }

    fn initial_reconcile(&mut self, ctx: &ReconcileContext<'_>) -> Result<(), ReconcileError> {
        self.initial_reconcile_for_type(ctx, ContentType::MacroCall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::parse_definitions;
    use twee_core::{MarkerStore, Preferences, ProgressMonitor, TweeDocument, TweeSettings};

    fn checker(store: &Arc<MarkerStore>, prefs: &Arc<Preferences>) -> MacroChecker {
        let table = parse_definitions(
            "test.json",
            r#"{"if": {"argumentSyntax": "EXPRESSION", "nestedMacros": ["else"]}, "else": 0}"#,
        )
        .unwrap();
        MacroChecker::new(
            Arc::new(MacroDictionary::from_table(table)),
            prefs.clone(),
            store.clone(),
        )
    }

    #[test]
    fn test_typed_initial_reports_bad_calls() {
        let doc = TweeDocument::new(":: A\n<<if>>x<<else>><</if>><<oops>>\n");
        let store = Arc::new(MarkerStore::new());
        let prefs = Preferences::new(TweeSettings::default());
        let mut checker = checker(&store, &prefs);
        let monitor = ProgressMonitor::new();
        let ctx = ReconcileContext {
            document: &doc,
            partitioning: &doc,
            monitor: &monitor,
        };
        checker
            .initial_reconcile_for_type(&ctx, ContentType::MacroCall)
            .unwrap();

        let mut found: Vec<(usize, String)> = store
            .markers_of_kind(MarkerKind::MACRO_PROBLEM)
            .into_iter()
            .map(|(_, m)| (m.position.offset, m.message))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                (5, "Missing 1 parameter(s)".to_string()),
                (27, "no macro <<oops>> defined".to_string()),
            ]
        );
    }

    #[test]
    fn test_disabled_check_reports_nothing() {
        let doc = TweeDocument::new("<<oops>>");
        let store = Arc::new(MarkerStore::new());
        let prefs = Preferences::new(TweeSettings::default());
        prefs.set_macro_check(false);
        let mut checker = checker(&store, &prefs);
        let monitor = ProgressMonitor::new();
        let ctx = ReconcileContext {
            document: &doc,
            partitioning: &doc,
            monitor: &monitor,
        };
        checker.initial_reconcile(&ctx).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancelled_initial_pass_commits_nothing() {
        let doc = TweeDocument::new("<<oops>>");
        let store = Arc::new(MarkerStore::new());
        let prefs = Preferences::new(TweeSettings::default());
        let mut checker = checker(&store, &prefs);
        let monitor = ProgressMonitor::new();
        monitor.cancel();
        let ctx = ReconcileContext {
            document: &doc,
            partitioning: &doc,
            monitor: &monitor,
        };
        checker.initial_reconcile(&ctx).unwrap();
        assert!(store.is_empty());
    }
}
