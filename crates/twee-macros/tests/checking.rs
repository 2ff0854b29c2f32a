use std::sync::Arc;

use pretty_assertions::assert_eq;
use twee_core::{
    ContentType, MarkerKind, MarkerModel, MarkerSeverity, MarkerStore, Preferences, Reconciler,
    Region, TweeDocument, TweeSettings,
};
use twee_macros::{BundledResources, LogReporter, MacroChecker, MacroDictionary};

struct Fixture {
    doc: TweeDocument,
    store: Arc<MarkerStore>,
    prefs: Arc<Preferences>,
    reconciler: Reconciler,
}

impl Fixture {
    fn new(text: &str) -> Self {
        let dictionary = MacroDictionary::new(Arc::new(BundledResources), Arc::new(LogReporter));
        dictionary.reload(None);
        let store = Arc::new(MarkerStore::new());
        let prefs = Preferences::new(TweeSettings::default());
        let mut reconciler = Reconciler::new();
        reconciler.register(
            Box::new(MacroChecker::new(
                Arc::new(dictionary),
                prefs.clone(),
                store.clone(),
            )),
            &[ContentType::MacroCall],
        );
        let doc = TweeDocument::new(text);
        reconciler.initial_pass(&doc, &doc);
        Self {
            doc,
            store,
            prefs,
            reconciler,
        }
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) {
        let edit = self.doc.replace(offset, length, text).unwrap().edit;
        self.store.document_changed(&edit);
        self.reconciler
            .partial_pass(&self.doc, &self.doc, Some(&edit.dirty_region()));
    }

    fn problems(&self) -> Vec<(Region, String)> {
        let mut problems: Vec<(Region, String)> = self
            .store
            .markers_of_kind(MarkerKind::MACRO_PROBLEM)
            .into_iter()
            .map(|(_, m)| {
                assert_eq!(m.severity, MarkerSeverity::Error);
                (m.position, m.message)
            })
            .collect();
        problems.sort_by_key(|(r, _)| r.offset);
        problems
    }
}

#[test]
fn initial_pass_marks_bad_calls() {
    let fixture = Fixture::new(":: Start\n<<if $x>>Hi<</if>> <<goto>>\n");
    assert_eq!(
        fixture.problems(),
        vec![(Region::new(28, 8), "Missing 1 parameter(s)".to_string())]
    );
    assert_eq!(
        fixture.store.messages_at(&fixture.doc, 30),
        vec!["Missing 1 parameter(s)"]
    );
    assert!(fixture.store.messages_at(&fixture.doc, 12).is_empty());
}

#[test]
fn editing_a_call_updates_its_marker() {
    let mut fixture = Fixture::new(":: Start\n<<if $x>>Hi<</if>> <<goto>>\n");

    fixture.replace(34, 0, " \"A\"");
    assert_eq!(fixture.problems(), vec![]);

    fixture.replace(30, 4, "gota");
    assert_eq!(
        fixture.problems(),
        vec![(Region::new(28, 12), "no macro <<gota>> defined".to_string())]
    );
}

#[test]
fn unrelated_edits_keep_markers() {
    let mut fixture = Fixture::new(":: Start\n<<goto>> text\n<<print>>\n");
    assert_eq!(fixture.problems().len(), 2);

    fixture.replace(18, 0, "more ");
    assert_eq!(
        fixture.problems(),
        vec![
            (Region::new(9, 8), "Missing 1 parameter(s)".to_string()),
            (Region::new(28, 9), "Missing 1 parameter(s)".to_string()),
        ]
    );
}

#[test]
fn disabling_the_check_clears_markers_on_next_pass() {
    let mut fixture = Fixture::new("<<nope>>\n");
    assert_eq!(fixture.problems().len(), 1);

    fixture.prefs.set_macro_check(false);
    fixture
        .reconciler
        .partial_pass(&fixture.doc, &fixture.doc, None);
    assert!(fixture.store.is_empty());
}
