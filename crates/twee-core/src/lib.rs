#![warn(missing_docs)]
//! Twee Core - Incremental Analysis Kernel for Twee Documents
//!
//! # Overview
//!
//! `twee-core` keeps a live Twee (SugarCube) source buffer analyzed while it is being edited.
//! It does not render anything; the host feeds it buffer edits and reads back partitions,
//! problem markers and the passage outline.
//!
//! # Core Features
//!
//! - **Incremental Partitioning**: the buffer is split into typed regions (passage headers,
//!   macro calls, links, comments, tags, script blocks) and re-scanned only around each edit
//! - **Reconciliation**: analyzers ("strategies") are registered per content type and driven by
//!   dirty-region notifications, with an initial pass over the whole document
//! - **Problem Markers**: analyzers batch their findings and replace their markers for the
//!   re-analyzed range in one step
//! - **Passage Outline**: an ordered, position-tracking index of passage headers
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Background Reconciler Thread               │  ← Scheduling
//! ├─────────────────────────────────────────────┤
//! │  Strategies (Outline, Spelling, Macros)     │  ← Analyzers
//! ├─────────────────────────────────────────────┤
//! │  Markers & Passage Index                    │  ← Results
//! ├─────────────────────────────────────────────┤
//! │  Partitioner (Rule Scanner)                 │  ← Content Types
//! ├─────────────────────────────────────────────┤
//! │  Rope Document                              │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use twee_core::{
//!     ContentType, InlineExecutor, OutlineStrategy, PassageIndex, Partitioning, Reconciler,
//!     TweeDocument,
//! };
//!
//! let mut doc = TweeDocument::new(":: Start\nHello <<set $x to 1>>\n");
//! assert_eq!(doc.content_type_at(17).unwrap(), ContentType::MacroCall);
//!
//! let index = PassageIndex::new(Arc::new(InlineExecutor));
//! let mut reconciler = Reconciler::new();
//! reconciler.register(
//!     Box::new(OutlineStrategy::new(index.clone())),
//!     &[ContentType::Passage],
//! );
//! reconciler.initial_pass(&doc, &doc);
//! assert_eq!(index.elements()[0].name, "Start");
//!
//! let change = doc.insert(0, ":: Intro\n").unwrap();
//! index.document_changed(change.edit);
//! reconciler.partial_pass(&doc, &doc, Some(&change.edit.dirty_region()));
//! assert_eq!(index.len(), 2);
//! ```
//!
//! # Module Description
//!
//! - [`region`] - Positions, content types and edits
//! - [`document`] - Rope-backed text buffer and the partitioned Twee document
//! - [`rules`] - Character scanner and pattern rules
//! - [`partition`] - Twee partition rules and the incremental partitioner
//! - [`reconciler`] - Strategy dispatch, dirty-region queue and cancellation
//! - [`background`] - Reconciler running on a worker thread
//! - [`markers`] - Problem markers, the marker store and the batching collector
//! - [`passages`] - Passage outline index
//! - [`outline`] - Outline strategy
//! - [`spelling`] - Spelling strategy
//! - [`settings`] - Persisted settings and configuration source
//! - [`executor`] - UI-thread executor abstraction
//!
//! # Offsets
//!
//! Every offset and length is counted in `char`s (Unicode scalar values).

pub mod background;
pub mod document;
pub mod error;
pub mod executor;
pub mod markers;
pub mod outline;
pub mod partition;
pub mod passages;
pub mod reconciler;
pub mod region;
pub mod rules;
pub mod settings;
pub mod spelling;

pub use background::{ReconcilerThread, SharedDocument};
pub use document::{DocumentChange, RopeDocument, TextDocument, TweeDocument};
pub use error::{DocumentError, ReconcileError, SettingsError};
pub use executor::{InlineExecutor, QueuedExecutor, UiExecutor, UiTask};
pub use markers::{
    Marker, MarkerChange, MarkerId, MarkerKind, MarkerModel, MarkerSeverity, MarkerStore,
    ProblemCollector,
};
pub use outline::{OutlineStrategy, SPECIAL_PASSAGE_NAMES, classify_passage};
pub use partition::{DocumentPartitioner, Partitioning, twee_partition_rules};
pub use passages::{OutlineChange, PassageElement, PassageIndex, PassageKind};
pub use reconciler::{
    DirtyRegionQueue, ProgressMonitor, ReconcileContext, Reconciler, ReconcilingStrategy,
    StrategyCapabilities, StrategyId, confine_to_unit,
};
pub use region::{ContentType, DirtyRegion, Region, TextEdit, TypedRegion};
pub use rules::{
    CharScanner, PatternRule, Rule, RuleMatch, RuleScanner, ScannedToken, WhitespaceRule,
};
pub use settings::{ConfigSource, Preferences, SettingChange, SettingListener, TweeSettings};
pub use spelling::{SPELLING_CONTENT_TYPES, SpellChecker, SpellingStrategy, WordListChecker};
