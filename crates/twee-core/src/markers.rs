//! Problem markers.
//!
//! Analyzers publish findings as [`Marker`]s attached to document positions. The host owns the
//! [`MarkerModel`]; [`MarkerStore`] is the in-memory implementation. A [`ProblemCollector`]
//! batches one pass worth of findings and swaps them in with a single
//! [`MarkerModel::replace_markers`] call so observers never see the old markers removed without
//! the new ones added.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::document::TextDocument;
use crate::partition::Partitioning;
use crate::region::{Region, TextEdit};

/// Identifies which analyzer produced a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerKind(pub u32);

impl MarkerKind {
    /// Problems found in macro calls.
    pub const MACRO_PROBLEM: Self = Self(1);
    /// Problems reported by the spell checker.
    pub const SPELLING: Self = Self(2);

    /// Create a marker kind from a raw numeric identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Marker severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkerSeverity {
    /// Error markers.
    Error,
    /// Warning markers.
    Warning,
    /// Informational markers.
    Info,
}

/// Handle of a marker inside a [`MarkerModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// A single problem marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Producer of the marker.
    pub kind: MarkerKind,
    /// Severity.
    pub severity: MarkerSeverity,
    /// Human readable message.
    pub message: String,
    /// Attached document range.
    pub position: Region,
}

impl Marker {
    /// Create a marker.
    pub fn new(
        kind: MarkerKind,
        severity: MarkerSeverity,
        message: impl Into<String>,
        position: Region,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            position,
        }
    }
}

/// Markers removed and added by one model update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerChange {
    /// Markers that left the model.
    pub removed: Vec<(MarkerId, Marker)>,
    /// Markers that entered the model.
    pub added: Vec<(MarkerId, Marker)>,
}

impl MarkerChange {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// The problem-marker sink an analyzer writes to.
pub trait MarkerModel: Send + Sync {
    /// Every marker of `kind`, with its id.
    fn markers_of_kind(&self, kind: MarkerKind) -> Vec<(MarkerId, Marker)>;

    /// Add one marker.
    fn add_marker(&self, marker: Marker) -> MarkerId;

    /// Remove one marker. Returns `false` if it was not present.
    fn remove_marker(&self, id: MarkerId) -> bool;

    /// Remove `remove` and add `add` as one update.
    ///
    /// The default implementation falls back to removing and then adding one at a time.
    fn replace_markers(&self, remove: &[MarkerId], add: Vec<Marker>) -> Vec<MarkerId> {
        for id in remove {
            self.remove_marker(*id);
        }
        add.into_iter().map(|m| self.add_marker(m)).collect()
    }

    /// A lock that writers hold around read-then-write sequences, if the model shares one.
    fn lock_object(&self) -> Option<Arc<Mutex<()>>> {
        None
    }
}

type MarkerListener = Box<dyn Fn(&MarkerChange) + Send + Sync>;

#[derive(Default)]
struct StoreState {
    next_id: u64,
    markers: BTreeMap<MarkerId, Marker>,
}

impl StoreState {
    fn insert(&mut self, marker: Marker) -> MarkerId {
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(id, marker);
        id
    }
}

/// In-memory [`MarkerModel`] with position tracking and change notifications.
#[derive(Default)]
pub struct MarkerStore {
    state: Mutex<StoreState>,
    lock: Arc<Mutex<()>>,
    listeners: Mutex<Vec<MarkerListener>>,
}

impl MarkerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener called after every change, outside the store's lock.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&MarkerChange) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Every marker, ordered by id.
    pub fn markers(&self) -> Vec<(MarkerId, Marker)> {
        match self.state.lock() {
            Ok(state) => state
                .markers
                .iter()
                .map(|(id, m)| (*id, m.clone()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.markers.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no markers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every marker.
    pub fn clear(&self) {
        let change = match self.state.lock() {
            Ok(mut state) => MarkerChange {
                removed: std::mem::take(&mut state.markers).into_iter().collect(),
                added: Vec::new(),
            },
            Err(_) => return,
        };
        self.notify(&change);
    }

    /// Move every marker for `edit`; markers whose text was deleted are removed.
    pub fn document_changed(&self, edit: &TextEdit) {
        let change = match self.state.lock() {
            Ok(mut state) => {
                let mut removed = Vec::new();
                let mut kept = BTreeMap::new();
                for (id, mut marker) in std::mem::take(&mut state.markers) {
                    match marker.position.adapt_to_edit(edit) {
                        Some(position) => {
                            marker.position = position;
                            kept.insert(id, marker);
                        }
                        None => removed.push((id, marker)),
                    }
                }
                state.markers = kept;
                MarkerChange {
                    removed,
                    added: Vec::new(),
                }
            }
            Err(_) => return,
        };
        if !change.is_empty() {
            self.notify(&change);
        }
    }

    /// Hover text: messages of problem markers overlapping the partition at `offset`.
    pub fn messages_at(&self, partitioning: &dyn Partitioning, offset: usize) -> Vec<String> {
        let Ok(span) = partitioning.partition_at(offset) else {
            return Vec::new();
        };
        self.messages_overlapping(span.offset, span.length)
    }

    /// Ruler hover text: messages of problem markers overlapping the line of `offset`.
    pub fn messages_on_line(&self, doc: &dyn TextDocument, offset: usize) -> Vec<String> {
        let Ok(line) = doc.line_region(offset) else {
            return Vec::new();
        };
        self.messages_overlapping(line.offset, line.length)
    }

    fn messages_overlapping(&self, offset: usize, length: usize) -> Vec<String> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        state
            .markers
            .values()
            .filter(|m| m.kind == MarkerKind::MACRO_PROBLEM || m.kind == MarkerKind::SPELLING)
            .filter(|m| m.position.overlaps_with(offset, length))
            .map(|m| m.message.clone())
            .collect()
    }

    fn notify(&self, change: &MarkerChange) {
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(change);
            }
        }
    }
}

impl MarkerModel for MarkerStore {
    fn markers_of_kind(&self, kind: MarkerKind) -> Vec<(MarkerId, Marker)> {
        match self.state.lock() {
            Ok(state) => state
                .markers
                .iter()
                .filter(|(_, m)| m.kind == kind)
                .map(|(id, m)| (*id, m.clone()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn add_marker(&self, marker: Marker) -> MarkerId {
        self.replace_markers(&[], vec![marker])
            .pop()
            .unwrap_or(MarkerId(0))
    }

    fn remove_marker(&self, id: MarkerId) -> bool {
        let removed = match self.state.lock() {
            Ok(mut state) => state.markers.remove(&id),
            Err(_) => None,
        };
        match removed {
            Some(marker) => {
                self.notify(&MarkerChange {
                    removed: vec![(id, marker)],
                    added: Vec::new(),
                });
                true
            }
            None => false,
        }
    }

    fn replace_markers(&self, remove: &[MarkerId], add: Vec<Marker>) -> Vec<MarkerId> {
        let (ids, change) = match self.state.lock() {
            Ok(mut state) => {
                let removed: Vec<(MarkerId, Marker)> = remove
                    .iter()
                    .filter_map(|id| state.markers.remove(id).map(|m| (*id, m)))
                    .collect();
                let added: Vec<(MarkerId, Marker)> = add
                    .into_iter()
                    .map(|m| (state.insert(m.clone()), m))
                    .collect();
                let ids = added.iter().map(|(id, _)| *id).collect();
                (ids, MarkerChange { removed, added })
            }
            Err(_) => return Vec::new(),
        };
        if !change.is_empty() {
            self.notify(&change);
        }
        ids
    }

    fn lock_object(&self) -> Option<Arc<Mutex<()>>> {
        Some(self.lock.clone())
    }
}

/// Batches the findings of one pass for one marker kind.
pub struct ProblemCollector {
    model: Arc<dyn MarkerModel>,
    kind: MarkerKind,
    severity: MarkerSeverity,
    pending: Option<Vec<Marker>>,
}

impl ProblemCollector {
    /// Create a collector writing `kind` markers of `severity` into `model`.
    pub fn new(model: Arc<dyn MarkerModel>, kind: MarkerKind, severity: MarkerSeverity) -> Self {
        Self {
            model,
            kind,
            severity,
            pending: None,
        }
    }

    /// Marker kind this collector owns.
    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    /// Start a new batch.
    pub fn before_collecting(&mut self) {
        self.pending = Some(Vec::new());
    }

    /// Record one problem. Ignored outside a batch.
    pub fn accept(&mut self, region: Region, message: impl Into<String>) {
        if let Some(pending) = self.pending.as_mut() {
            pending.push(Marker::new(self.kind, self.severity, message, region));
        }
    }

    /// Number of problems in the current batch.
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }

    /// Commit the batch: markers of this kind overlapping `handled` (all of them when `None`)
    /// are replaced by the collected ones.
    pub fn after_collecting(&mut self, handled: Option<Region>) {
        let Some(add) = self.pending.take() else {
            return;
        };
        let lock = self.model.lock_object();
        let _guard = lock.as_ref().and_then(|l| l.lock().ok());
        let remove: Vec<MarkerId> = self
            .model
            .markers_of_kind(self.kind)
            .into_iter()
            .filter(|(_, m)| match handled {
                None => true,
                Some(r) => m.position.overlaps_with(r.offset, r.length),
            })
            .map(|(id, _)| id)
            .collect();
        tracing::debug!(
            kind = self.kind.0,
            removed = remove.len(),
            added = add.len(),
            "replacing problem markers"
        );
        self.model.replace_markers(&remove, add);
    }

    /// Drop the current batch without touching the model.
    pub fn discard(&mut self) {
        self.pending = None;
    }
}
