//! The passage index: an ordered, position-tracking set of outline entries.
//!
//! The set is the single source of truth for the outline view. All mutation is scheduled on the
//! host's [`UiExecutor`], so observers see every batch applied as a whole, and
//! [`OutlineChange`] notifications are sent after the set's lock is released.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::executor::UiExecutor;
use crate::region::{Region, TextEdit};

/// Classification of a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassageKind {
    /// An ordinary story passage.
    Normal,
    /// A passage tagged `script`.
    Script,
    /// A passage tagged `stylesheet`.
    Style,
    /// A reserved passage such as `StoryTitle`.
    Special,
}

impl fmt::Display for PassageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassageKind::Normal => "normal",
            PassageKind::Script => "script",
            PassageKind::Style => "style",
            PassageKind::Special => "special",
        })
    }
}

/// One outline entry.
///
/// Elements are identified by position alone and ordered by offset, then length, so the index
/// holds at most one element per header extent.
#[derive(Debug, Clone)]
pub struct PassageElement {
    /// Extent of the passage header.
    pub position: Region,
    /// Passage name.
    pub name: String,
    /// Classification.
    pub kind: PassageKind,
}

impl PassageElement {
    /// Create an element.
    pub fn new(kind: PassageKind, name: impl Into<String>, position: Region) -> Self {
        Self {
            position,
            name: name.into(),
            kind,
        }
    }

    /// Search key sorting before every element at `offset`.
    fn mark(offset: usize) -> Self {
        Self {
            position: Region::new(offset, 0),
            name: String::new(),
            kind: PassageKind::Normal,
        }
    }
}

impl PartialEq for PassageElement {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for PassageElement {}

impl PartialOrd for PassageElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PassageElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

impl Hash for PassageElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

/// Elements removed and added by one index update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineChange {
    /// Elements that left the index.
    pub removed: Vec<PassageElement>,
    /// Elements that entered the index.
    pub added: Vec<PassageElement>,
}

type OutlineListener = Box<dyn Fn(&OutlineChange) + Send + Sync>;

struct IndexState {
    passages: Mutex<BTreeSet<PassageElement>>,
    executor: Arc<dyn UiExecutor>,
    listeners: Mutex<Vec<OutlineListener>>,
}

impl IndexState {
    fn apply(&self, region: Option<Region>, added: Vec<PassageElement>) {
        let change = {
            let Ok(mut passages) = self.passages.lock() else {
                return;
            };
            let removed: Vec<PassageElement> = match region {
                None => std::mem::take(&mut *passages).into_iter().collect(),
                Some(region) => {
                    let mut lower = PassageElement::mark(region.offset);
                    if let Some(prev) = passages.range(..=&lower).next_back()
                        && prev.position.overlaps_with(region.offset, region.length)
                    {
                        lower = prev.clone();
                    }
                    let upper = PassageElement::mark(region.end());
                    let doomed: Vec<PassageElement> =
                        passages.range(&lower..&upper).cloned().collect();
                    for element in &doomed {
                        passages.remove(element);
                    }
                    doomed
                }
            };
            passages.extend(added.iter().cloned());
            OutlineChange { removed, added }
        };
        self.notify(&change);
    }

    fn notify(&self, change: &OutlineChange) {
        if change.removed.is_empty() && change.added.is_empty() {
            return;
        }
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(change);
            }
        }
    }
}

/// Shared handle to the passage index.
#[derive(Clone)]
pub struct PassageIndex {
    state: Arc<IndexState>,
}

impl PassageIndex {
    /// Create an empty index whose mutations run on `executor`.
    pub fn new(executor: Arc<dyn UiExecutor>) -> Self {
        Self {
            state: Arc::new(IndexState {
                passages: Mutex::new(BTreeSet::new()),
                executor,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a listener called after each applied batch.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&OutlineChange) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.state.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Replace every element in `region` (`None` = everything) by `added`.
    ///
    /// The region is first stretched to cover every new element, then the elements at or
    /// straddling its start up to its end are removed and the batch is inserted. The work is
    /// scheduled on the UI executor; this call does not wait for it.
    pub fn replace(&self, region: Option<Region>, mut added: Vec<PassageElement>) {
        added.sort();
        let region = stretch_to_include(region, &added);
        let state = self.state.clone();
        self.state
            .executor
            .exec_async(Box::new(move || state.apply(region, added)));
    }

    /// The passage whose header contains `offset`; with `include_body`, otherwise the nearest
    /// passage before `offset`.
    pub fn get(&self, offset: usize, include_body: bool) -> Option<PassageElement> {
        let passages = self.state.passages.lock().ok()?;
        let mark = PassageElement::mark(offset);
        if let Some(next) = passages.range(&mark..).next()
            && next.position.overlaps_with(offset, 0)
        {
            return Some(next.clone());
        }
        match passages.range(..=&mark).next_back() {
            Some(prev) if include_body || prev.position.overlaps_with(offset, 0) => {
                Some(prev.clone())
            }
            _ => None,
        }
    }

    /// Every element, in order.
    pub fn elements(&self) -> Vec<PassageElement> {
        match self.state.passages.lock() {
            Ok(passages) => passages.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.state.passages.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every element (the input document was detached).
    pub fn clear(&self) {
        self.replace(None, Vec::new());
    }

    /// Move every element for `edit`; elements whose header was deleted are dropped.
    pub fn document_changed(&self, edit: TextEdit) {
        let state = self.state.clone();
        self.state.executor.exec_async(Box::new(move || {
            let change = {
                let Ok(mut passages) = state.passages.lock() else {
                    return;
                };
                let mut removed = Vec::new();
                let mut kept = BTreeSet::new();
                for mut element in std::mem::take(&mut *passages) {
                    match element.position.adapt_to_edit(&edit) {
                        Some(position) => {
                            element.position = position;
                            kept.insert(element);
                        }
                        None => removed.push(element),
                    }
                }
                *passages = kept;
                OutlineChange {
                    removed,
                    added: Vec::new(),
                }
            };
            state.notify(&change);
        }));
    }
}

/// Extend `region` so it covers the first and last of `added` (which must be sorted).
fn stretch_to_include(region: Option<Region>, added: &[PassageElement]) -> Option<Region> {
    let region = region?;
    let (Some(first), Some(last)) = (added.first(), added.last()) else {
        return Some(region);
    };
    let mut start = region.offset;
    let mut end = region.end();
    if start > first.position.offset {
        start = first.position.offset;
    }
    if end < last.position.end() {
        end = last.position.end();
    }
    Some(Region::new(start, end - start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{InlineExecutor, QueuedExecutor};
    use pretty_assertions::assert_eq;

    fn element(name: &str, offset: usize, length: usize) -> PassageElement {
        PassageElement::new(PassageKind::Normal, name, Region::new(offset, length))
    }

    fn names(index: &PassageIndex) -> Vec<String> {
        index.elements().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_replace_removes_overlapping_only() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        index.replace(None, vec![element("A", 0, 5), element("B", 10, 6)]);
        index.replace(Some(Region::new(3, 4)), vec![element("A2", 0, 8)]);
        assert_eq!(names(&index), vec!["A2", "B"]);
    }

    #[test]
    fn test_replace_with_floor_straddling_start() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        index.replace(None, vec![element("A", 0, 10), element("B", 20, 5)]);
        index.replace(Some(Region::new(5, 2)), Vec::new());
        assert_eq!(names(&index), vec!["B"]);
    }

    #[test]
    fn test_one_element_per_position() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        index.replace(None, vec![element("A", 0, 5), element("Z", 0, 5), element("B", 0, 6)]);
        assert_eq!(names(&index), vec!["A", "B"]);

        index.replace(Some(Region::new(0, 5)), vec![element("C", 0, 5)]);
        assert_eq!(names(&index), vec!["C"]);
    }

    #[test]
    fn test_get_header_and_body() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        index.replace(None, vec![element("A", 0, 5), element("B", 20, 5)]);
        for offset in 0..20 {
            assert_eq!(index.get(offset, true).unwrap().name, "A");
        }
        for offset in 20..40 {
            assert_eq!(index.get(offset, true).unwrap().name, "B");
        }
        assert_eq!(index.get(3, false).unwrap().name, "A");
        assert_eq!(index.get(7, false), None);
        assert_eq!(index.get(22, false).unwrap().name, "B");
    }

    #[test]
    fn test_get_on_empty_index() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        assert_eq!(index.get(0, true), None);
    }

    #[test]
    fn test_mutations_wait_for_executor() {
        let exec = Arc::new(QueuedExecutor::new());
        let index = PassageIndex::new(exec.clone());
        let changes = Arc::new(Mutex::new(Vec::new()));
        {
            let changes = changes.clone();
            index.subscribe(move |c| changes.lock().unwrap().push(c.clone()));
        }
        index.replace(None, vec![element("A", 0, 5)]);
        assert!(index.is_empty());
        exec.run_pending();
        assert_eq!(names(&index), vec!["A"]);

        index.clear();
        exec.run_pending();
        assert!(index.is_empty());
        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].removed, vec![element("A", 0, 5)]);
    }

    #[test]
    fn test_document_changed_tracks_positions() {
        let index = PassageIndex::new(Arc::new(InlineExecutor));
        index.replace(None, vec![element("A", 0, 5), element("B", 10, 5)]);
        index.document_changed(TextEdit::new(0, 0, 3));
        index.document_changed(TextEdit::new(13, 5, 0));
        assert_eq!(index.elements(), vec![element("A", 3, 5)]);
    }
}
