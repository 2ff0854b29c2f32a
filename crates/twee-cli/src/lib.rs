//! Reports behind the `twee` command.
//!
//! Each report runs the same analysis an editor would (a one-shot initial reconcile pass over
//! the whole document) and returns plain rows that the binary prints as text or JSON lines.

#![warn(missing_docs)]

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use twee_core::{
    ConfigSource, ContentType, InlineExecutor, MarkerKind, MarkerModel, MarkerStore,
    OutlineStrategy, PassageIndex, Partitioning, Preferences, Reconciler, TextDocument,
    TweeDocument, TweeSettings,
};
use twee_macros::{BundledResources, ErrorReporter, MacroChecker, MacroDictionary};

/// One partition of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanRow {
    /// Start offset, in chars.
    pub offset: usize,
    /// Length, in chars.
    pub length: usize,
    /// Content-type tag, such as `__sc_macro`.
    pub content_type: &'static str,
}

impl fmt::Display for SpanRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} {:>5} {}", self.offset, self.length, self.content_type)
    }
}

/// One passage of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineRow {
    /// 1-based line of the passage header.
    pub line: usize,
    /// Start offset of the header, in chars.
    pub offset: usize,
    /// `normal`, `script`, `style` or `special`.
    pub kind: String,
    /// Passage name.
    pub name: String,
}

impl fmt::Display for OutlineRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.line, self.name, self.kind)
    }
}

/// One macro problem, with a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in chars.
    pub column: usize,
    /// Length of the offending macro call, in chars.
    pub length: usize,
    /// What is wrong with the call.
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Every partition of `doc`, in order.
pub fn partitions(doc: &TweeDocument) -> Vec<SpanRow> {
    doc.compute_partitioning(0, doc.len())
        .into_iter()
        .map(|span| SpanRow {
            offset: span.offset,
            length: span.length,
            content_type: span.content_type.as_str(),
        })
        .collect()
}

/// The passage outline of `doc`.
pub fn outline(doc: &TweeDocument) -> Vec<OutlineRow> {
    let index = PassageIndex::new(Arc::new(InlineExecutor));
    let mut reconciler = Reconciler::new();
    reconciler.register(
        Box::new(OutlineStrategy::new(index.clone())),
        &[ContentType::Passage],
    );
    reconciler.initial_pass(doc, doc);
    index
        .elements()
        .into_iter()
        .map(|element| OutlineRow {
            line: line_number(doc, element.position.offset),
            offset: element.position.offset,
            kind: element.kind.to_string(),
            name: element.name,
        })
        .collect()
}

/// Macro problems in `doc`, ordered by position.
pub fn check(
    doc: &TweeDocument,
    dictionary: Arc<MacroDictionary>,
    config: Arc<dyn ConfigSource>,
) -> Vec<Problem> {
    let store = Arc::new(MarkerStore::new());
    let mut reconciler = Reconciler::new();
    reconciler.register(
        Box::new(MacroChecker::new(dictionary, config, store.clone())),
        &[ContentType::MacroCall],
    );
    reconciler.initial_pass(doc, doc);

    let mut markers = store.markers_of_kind(MarkerKind::MACRO_PROBLEM);
    markers.sort_by_key(|(_, marker)| marker.position.offset);
    markers
        .into_iter()
        .map(|(_, marker)| {
            let offset = marker.position.offset;
            let line_start = doc.line_region(offset).map_or(0, |line| line.offset);
            Problem {
                line: line_number(doc, offset),
                column: offset - line_start + 1,
                length: marker.position.length,
                message: marker.message,
            }
        })
        .collect()
}

/// Preferences from an optional settings file, with the macro path overridden by `macros`.
pub fn load_preferences(
    settings: Option<&Path>,
    macros: Option<&Path>,
) -> Result<Arc<Preferences>, twee_core::SettingsError> {
    let settings = match settings {
        Some(path) => TweeSettings::load(path)?,
        None => TweeSettings::default(),
    };
    let prefs = Preferences::new(settings);
    if let Some(path) = macros {
        prefs.set_macro_path(Some(path.to_path_buf()));
    }
    Ok(prefs)
}

/// A macro dictionary loaded from the bundled definitions and the configured user file.
pub fn load_dictionary(
    config: &dyn ConfigSource,
    reporter: Arc<dyn ErrorReporter>,
) -> Arc<MacroDictionary> {
    let dictionary = MacroDictionary::new(Arc::new(BundledResources), reporter);
    dictionary.init(config);
    Arc::new(dictionary)
}

fn line_number(doc: &TweeDocument, offset: usize) -> usize {
    doc.line_of_offset(offset).map_or(0, |line| line + 1)
}
