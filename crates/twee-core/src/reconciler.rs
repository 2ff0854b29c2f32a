//! Reconciliation scheduling.
//!
//! A [`Reconciler`] turns "dirty region" notifications into calls on registered
//! [`ReconcilingStrategy`]s, one per content type. Passes come in two flavours:
//!
//! - the **initial pass** runs once per distinct content type found in the document;
//! - a **partial pass** brackets the per-partition calls with `before_reconcile` /
//!   `after_reconcile` hooks so strategies can replace their results for the dirty region in
//!   one batch.
//!
//! Every strategy call is isolated: an error or a panic is logged and the pass continues.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::document::TextDocument;
use crate::error::{DocumentError, ReconcileError};
use crate::partition::Partitioning;
use crate::region::{ContentType, DirtyRegion, Region};

/// Shared cancellation flag, polled by long-running passes between partitions.
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor {
    canceled: Arc<AtomicBool>,
}

impl ProgressMonitor {
    /// Create a monitor that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running pass.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.canceled.store(false, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// What a strategy sees during one call.
pub struct ReconcileContext<'a> {
    /// The document being analyzed.
    pub document: &'a dyn TextDocument,
    /// Its current partitioning.
    pub partitioning: &'a dyn Partitioning,
    /// Cancellation flag for the running pass.
    pub monitor: &'a ProgressMonitor,
}

/// Optional hooks a strategy takes part in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyCapabilities {
    /// Receives `before_reconcile` / `after_reconcile` around every partial pass.
    pub pass_hooks: bool,
    /// Receives `initial_reconcile_for_type` once per content type in the initial pass.
    pub typed_initial: bool,
    /// Receives `initial_reconcile` in the initial pass (when `typed_initial` is off).
    pub whole_initial: bool,
}

/// An analyzer driven by the [`Reconciler`].
pub trait ReconcilingStrategy {
    /// Name used in log records.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Which optional hooks this strategy uses.
    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities::default()
    }

    /// Analyze `region` (a partition, or a part of one).
    fn reconcile(&mut self, ctx: &ReconcileContext<'_>, region: Region)
    -> Result<(), ReconcileError>;

    /// Analyze `sub_region` of a partial pass for `dirty`.
    fn reconcile_dirty(
        &mut self,
        ctx: &ReconcileContext<'_>,
        dirty: &DirtyRegion,
        sub_region: Region,
    ) -> Result<(), ReconcileError> {
        let _ = dirty;
        self.reconcile(ctx, sub_region)
    }

    /// Called before a partial pass. `None` means the whole document.
    fn before_reconcile(&mut self, ctx: &ReconcileContext<'_>, dirty: Option<&DirtyRegion>) {
        let _ = (ctx, dirty);
    }

    /// Called after a partial pass, even when a call of the pass failed.
    fn after_reconcile(&mut self, ctx: &ReconcileContext<'_>, dirty: Option<&DirtyRegion>) {
        let _ = (ctx, dirty);
    }

    /// Initial pass over every partition of `content_type`.
    fn initial_reconcile_for_type(
        &mut self,
        ctx: &ReconcileContext<'_>,
        content_type: ContentType,
    ) -> Result<(), ReconcileError> {
        let _ = (ctx, content_type);
        Ok(())
    }

    /// Initial pass without a content type.
    fn initial_reconcile(&mut self, ctx: &ReconcileContext<'_>) -> Result<(), ReconcileError> {
        let _ = ctx;
        Ok(())
    }
}

/// Handle of a registered strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyId(usize);

struct Registered {
    strategy: Box<dyn ReconcilingStrategy + Send>,
    capabilities: StrategyCapabilities,
}

/// Dispatches reconciliation passes to strategies by content type.
#[derive(Default)]
pub struct Reconciler {
    strategies: Vec<Registered>,
    by_type: HashMap<ContentType, StrategyId>,
    monitor: ProgressMonitor,
}

impl Reconciler {
    /// Create a reconciler with no strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for every type in `content_types`. A later registration for the
    /// same content type replaces the earlier one for that type.
    pub fn register(
        &mut self,
        strategy: Box<dyn ReconcilingStrategy + Send>,
        content_types: &[ContentType],
    ) -> StrategyId {
        let id = StrategyId(self.strategies.len());
        let capabilities = strategy.capabilities();
        tracing::debug!(
            strategy = strategy.name(),
            ?content_types,
            ?capabilities,
            "registered reconciling strategy"
        );
        self.strategies.push(Registered {
            strategy,
            capabilities,
        });
        for ct in content_types {
            self.by_type.insert(*ct, id);
        }
        id
    }

    /// The strategy serving `content_type`, if any.
    pub fn strategy_for(&self, content_type: ContentType) -> Option<StrategyId> {
        self.by_type.get(&content_type).copied()
    }

    /// The cancellation flag handed to strategies. Clone it to cancel from another thread.
    pub fn monitor(&self) -> &ProgressMonitor {
        &self.monitor
    }

    /// Run the initial pass over the whole document.
    pub fn initial_pass(&mut self, document: &dyn TextDocument, partitioning: &dyn Partitioning) {
        self.monitor.reset();
        let ctx = ReconcileContext {
            document,
            partitioning,
            monitor: &self.monitor,
        };
        let mut seen: Vec<ContentType> = Vec::new();
        for span in partitioning.compute_partitioning(0, document.len()) {
            let content_type = span.content_type;
            if seen.contains(&content_type) {
                continue;
            }
            seen.push(content_type);
            let Some(id) = self.by_type.get(&content_type) else {
                continue;
            };
            let entry = &mut self.strategies[id.0];
            let name = entry.strategy.name();
            if entry.capabilities.typed_initial {
                isolated(name, "initial_reconcile_for_type", || {
                    entry.strategy.initial_reconcile_for_type(&ctx, content_type)
                });
            } else if entry.capabilities.whole_initial {
                isolated(name, "initial_reconcile", || {
                    entry.strategy.initial_reconcile(&ctx)
                });
            }
        }
        tracing::debug!(types = seen.len(), "initial reconcile pass done");
    }

    /// Run a partial pass for `dirty` (`None` = the whole document).
    pub fn partial_pass(
        &mut self,
        document: &dyn TextDocument,
        partitioning: &dyn Partitioning,
        dirty: Option<&DirtyRegion>,
    ) {
        self.monitor.reset();
        let ctx = ReconcileContext {
            document,
            partitioning,
            monitor: &self.monitor,
        };

        for entry in self.strategies.iter_mut() {
            if entry.capabilities.pass_hooks {
                let name = entry.strategy.name();
                isolated(name, "before_reconcile", || {
                    entry.strategy.before_reconcile(&ctx, dirty);
                    Ok(())
                });
            }
        }

        let len = document.len();
        let region = match dirty {
            // A deletion's dirty region can reach past the end.
            Some(dirty) => {
                let offset = dirty.offset.min(len);
                Region::new(offset, dirty.length.min(len - offset))
            }
            None => Region::new(0, len),
        };
        let spans = partitioning.compute_partitioning(region.offset, region.length);
        for span in &spans {
            let Some(id) = self.by_type.get(&span.content_type) else {
                continue;
            };
            let entry = &mut self.strategies[id.0];
            let name = entry.strategy.name();
            match dirty {
                Some(dirty) => isolated(name, "reconcile", || {
                    entry.strategy.reconcile_dirty(&ctx, dirty, span.region())
                }),
                None => isolated(name, "reconcile", || {
                    entry.strategy.reconcile(&ctx, span.region())
                }),
            }
        }

        for entry in self.strategies.iter_mut() {
            if entry.capabilities.pass_hooks {
                let name = entry.strategy.name();
                isolated(name, "after_reconcile", || {
                    entry.strategy.after_reconcile(&ctx, dirty);
                    Ok(())
                });
            }
        }
        tracing::debug!(?dirty, partitions = spans.len(), "partial reconcile pass done");
    }
}

fn isolated(strategy: &str, call: &str, f: impl FnOnce() -> Result<(), ReconcileError>) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(strategy, call, %err, "reconciling strategy failed"),
        Err(_) => tracing::warn!(strategy, call, "reconciling strategy panicked"),
    }
}

/// Widen the sub-region of a partial pass to a whole unit of analysis.
///
/// Uses the partition at the start of `sub_region`, unless that partition wholly contains the
/// lines touched by `sub_region`, in which case those lines are used instead. Falls back to the
/// dirty region when the document cannot be read.
pub fn confine_to_unit(
    document: &dyn TextDocument,
    partitioning: &dyn Partitioning,
    dirty: &DirtyRegion,
    sub_region: Region,
) -> Region {
    let resolve = || -> Result<Region, DocumentError> {
        let start_line = document.line_region(sub_region.offset)?;
        let end_line =
            document.line_region(sub_region.offset + sub_region.length.saturating_sub(1))?;
        let typed = partitioning.partition_at(sub_region.offset)?;
        let line_region = if start_line.offset == end_line.offset {
            start_line
        } else {
            // The last char of the end line is left out, as the host editor does.
            Region::new(
                start_line.offset,
                end_line.offset + end_line.length.saturating_sub(1) - start_line.offset,
            )
        };
        if typed.offset <= line_region.offset && typed.end() >= line_region.end() {
            Ok(line_region)
        } else {
            Ok(typed.region())
        }
    };
    resolve().unwrap_or_else(|err| {
        tracing::debug!(%err, "cannot confine sub-region; using dirty region");
        dirty.region()
    })
}

/// Pending reconcile requests, coalesced.
#[derive(Debug, Default)]
pub struct DirtyRegionQueue {
    pending: VecDeque<Option<DirtyRegion>>,
}

impl DirtyRegionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request; `None` asks for the whole document.
    ///
    /// Forward typing (`dirty.offset == last.end()`) extends the last request. A whole-document
    /// request replaces everything queued and absorbs later requests until it is taken.
    pub fn add(&mut self, dirty: Option<DirtyRegion>) {
        match dirty {
            None => {
                self.pending.clear();
                self.pending.push_back(None);
            }
            Some(dirty) => match self.pending.back_mut() {
                Some(None) => {}
                Some(Some(last)) if dirty.offset == last.end() => {
                    last.length += dirty.length;
                }
                _ => self.pending.push_back(Some(dirty)),
            },
        }
    }

    /// Take the oldest request.
    pub fn next(&mut self) -> Option<Option<DirtyRegion>> {
        self.pending.pop_front()
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
