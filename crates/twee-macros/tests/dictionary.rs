use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use twee_core::{Preferences, TweeSettings};
use twee_macros::{
    BundledResources, CollectingReporter, DirectoryResources, MacroCallError, MacroDictionary,
};

fn bundled(reporter: &Arc<CollectingReporter>) -> MacroDictionary {
    MacroDictionary::new(Arc::new(BundledResources), reporter.clone())
}

fn write_user_file(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("user-macros.json");
    std::fs::write(&path, text).unwrap();
    path
}

fn message(dictionary: &MacroDictionary, call: &str) -> String {
    match dictionary.check(call) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

#[test]
fn bundled_definitions_cover_common_calls() {
    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = bundled(&reporter);
    assert!(dictionary.reload(None));
    assert_eq!(reporter.take(), Vec::<String>::new());

    for call in [
        "if $x > 1",
        "elseif $x is 2",
        "else",
        "/if",
        "set $gold to $gold + 10",
        "unset $a, $b",
        "for _i to 0; _i < 3; _i++",
        "for",
        "link \"Go on\" \"Next Room\"",
        "/link",
        "textbox \"$name\" \"\"",
        "print $x",
        "= $x",
        "goto [[Start]]",
        "back",
        "/nobr",
    ] {
        assert_eq!(message(&dictionary, call), "", "call <<{call}>>");
    }

    assert_eq!(message(&dictionary, "print"), "Missing 1 parameter(s)");
    assert_eq!(
        message(&dictionary, "goto \"A\" \"B\""),
        "Extra parameter: \"B\""
    );
    assert_eq!(message(&dictionary, "/goto"), "<<goto>> does not use end tag");
    assert_eq!(message(&dictionary, "/else"), "<<else>> does not use end tag");
    assert_eq!(message(&dictionary, "/jump"), "no macro <<jump>>");
    assert_eq!(message(&dictionary, "jump 3"), "no macro <<jump>> defined");
    assert_eq!(message(&dictionary, "break now"), "Arguments not expected");
}

#[test]
fn user_file_adds_and_overrides_macros() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(
        &dir,
        r#"{"cutscene": ["skip"], "skip": {"isNested": true}, "goto": 2}"#,
    );
    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = bundled(&reporter);
    assert!(dictionary.reload(Some(path.as_path())));

    assert!(reporter.take().is_empty());
    assert!(dictionary.get("cutscene").unwrap().needs_end_tag());
    assert_eq!(dictionary.check("goto \"A\" \"B\""), Ok(()));
    assert!(dictionary.get("if").is_some());
}

#[test]
fn broken_user_file_keeps_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_user_file(&dir, r#"{"cutscene": []}"#);
    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = bundled(&reporter);
    assert!(dictionary.reload(Some(good.as_path())));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"other": [], "cutscene": {"minArgs": 1}}"#).unwrap();
    assert!(!dictionary.reload(Some(bad.as_path())));

    assert_eq!(
        reporter.take(),
        vec!["description for macro cutscene broken: bad macro syntax key 'minArgs'".to_string()]
    );
    assert!(dictionary.get("cutscene").is_some());
    assert!(dictionary.get("other").is_none());
}

#[test]
fn first_load_installs_what_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = bundled(&reporter);
    assert!(!dictionary.is_loaded());

    assert!(dictionary.reload(Some(missing.as_path())));
    let messages = reporter.take();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("trying to read "), "{messages:?}");
    assert!(dictionary.is_loaded());
    assert!(dictionary.get("if").is_some());
}

#[test]
fn missing_builtin_resource_is_reported() {
    let resources = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(&dir, r#"{"only": null}"#);
    let reporter = Arc::new(CollectingReporter::new());
    let loader = Arc::new(DirectoryResources::new(resources.path()));
    let dictionary = MacroDictionary::new(loader, reporter.clone());

    assert!(dictionary.reload(Some(path.as_path())));
    assert_eq!(
        reporter.take(),
        vec!["cannot open macro definition file: macros.json".to_string()]
    );
    assert_eq!(dictionary.table().len(), 1);
    assert_eq!(
        dictionary.check("if x"),
        Err(MacroCallError::Undefined("if".to_string()))
    );
}

#[test]
fn init_loads_once_from_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(&dir, r#"{"cutscene": []}"#);
    let prefs = Preferences::new(TweeSettings::default());
    prefs.set_macro_path(Some(path.clone()));

    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = bundled(&reporter);
    dictionary.init(&*prefs);
    assert!(dictionary.get("cutscene").is_some());

    std::fs::write(&path, r#"{"later": []}"#).unwrap();
    dictionary.init(&*prefs);
    assert!(dictionary.get("later").is_none());
}

#[test]
fn global_dictionary_is_shared() {
    let prefs = Preferences::new(TweeSettings::default());
    let global = MacroDictionary::global();
    global.init(&*prefs);
    assert!(global.is_loaded());
    assert!(Arc::ptr_eq(&global, &MacroDictionary::global()));
    assert_eq!(global.check("if $x"), Ok(()));
}

fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn watch_reloads_when_macro_path_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(&dir, r#"{"cutscene": []}"#);
    let prefs = Preferences::new(TweeSettings::default());
    let reporter = Arc::new(CollectingReporter::new());
    let dictionary = Arc::new(bundled(&reporter));
    dictionary.init(&*prefs);
    assert!(dictionary.get("cutscene").is_none());

    let handle = dictionary.watch(&*prefs).unwrap();
    prefs.set_macro_path(Some(path));
    wait_for("reload", || dictionary.get("cutscene").is_some());

    prefs.set_macro_path(None);
    wait_for("second reload", || dictionary.get("cutscene").is_none());

    drop(prefs);
    handle.join().unwrap();
    assert!(reporter.take().is_empty());
}
