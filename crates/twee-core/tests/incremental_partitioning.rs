use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use twee_core::{ContentType, Partitioning, TextDocument, TweeDocument, TypedRegion};

const PIECES: &[&str] = &[
    "<<", ">>", "<", ">", "[[", "]]", "<!--", "-->", "/*", "*/", "{{{", "}}}", "::", "!", "\n",
    "\r\n", "?", "a", "b", " ", "-", "*", "{", "}", "é",
];

fn random_snippet(rng: &mut StdRng, max_pieces: usize) -> String {
    let count = rng.gen_range(0..=max_pieces);
    (0..count)
        .map(|_| PIECES[rng.gen_range(0..PIECES.len())])
        .collect()
}

fn assert_matches_fresh(doc: &TweeDocument, context: &str) {
    let fresh = TweeDocument::new(&doc.full_text());
    assert_eq!(
        doc.partitioner().spans(),
        fresh.partitioner().spans(),
        "spans differ after {context}"
    );
    assert_eq!(
        doc.partitioner().unterminated_starts().collect::<Vec<_>>(),
        fresh.partitioner().unterminated_starts().collect::<Vec<_>>(),
        "unterminated starts differ after {context}"
    );
}

fn assert_tiles_document(doc: &TweeDocument) {
    let mut expected = 0;
    for span in doc.partitioner().spans() {
        assert_eq!(span.offset, expected);
        assert!(span.length > 0);
        expected = span.end();
    }
    assert_eq!(expected, doc.len());
}

#[test]
fn incremental_partitioning_equals_fresh_partitioning() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut doc = TweeDocument::new(&random_snippet(&mut rng, 30));
        for step in 0..60 {
            let len = doc.len();
            let offset = rng.gen_range(0..=len);
            let deleted = rng.gen_range(0..=(len - offset).min(6));
            let text = random_snippet(&mut rng, 3);
            let change = doc.replace(offset, deleted, &text).unwrap();

            let context = format!("seed {seed} step {step}: replace({offset}, {deleted}, {text:?})");
            assert_matches_fresh(&doc, &context);
            assert_tiles_document(&doc);

            let changed = change.partitioning_changed;
            assert!(changed.offset <= offset, "{context}: changed region starts late");
            assert!(changed.end() <= doc.len(), "{context}: changed region past the end");
        }
    }
}

#[test]
fn closing_a_comment_reclassifies_the_tail() {
    let mut doc = TweeDocument::new("ab<!-- one <<x>> two");
    assert_eq!(doc.content_type_at(12).unwrap(), ContentType::MacroCall);

    let change = doc.insert(doc.len(), " -->").unwrap();
    assert_eq!(
        doc.partitioner().spans(),
        &[
            TypedRegion::new(0, 2, ContentType::Default),
            TypedRegion::new(2, 22, ContentType::XmlComment),
        ]
    );
    assert_eq!(change.partitioning_changed.offset, 2);
    assert_eq!(doc.partitioner().unterminated_starts().count(), 0);
}

#[test]
fn edit_far_from_a_change_keeps_the_rescan_local() {
    let body = "Some prose <<set $x to 1>> and a [[Link]].\n".repeat(50);
    let mut doc = TweeDocument::new(&format!(":: Start\n{body}"));
    let before = doc.partitioner().spans().len();

    let change = doc.insert(20, "word ").unwrap();
    assert_eq!(doc.partitioner().spans().len(), before);
    assert!(change.partitioning_changed.length < 40);
    assert_matches_fresh(&doc, "local insert");
}

#[test]
fn joining_lines_turns_a_header_into_text() {
    let mut doc = TweeDocument::new("intro\n:: Next\nbody");
    assert_eq!(doc.content_type_at(6).unwrap(), ContentType::Passage);

    doc.delete(5, 1).unwrap();
    assert_eq!(doc.content_type_at(6).unwrap(), ContentType::Default);
    assert_matches_fresh(&doc, "joining lines");

    doc.insert(5, "\n").unwrap();
    assert_eq!(doc.content_type_at(6).unwrap(), ContentType::Passage);
}
