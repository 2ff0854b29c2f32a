use std::io::Write;
use std::path::PathBuf;

use twee_core::{ConfigSource, Preferences, SettingsError, TweeSettings};

#[test]
fn load_settings_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "macroCheck": false, "macroPath": "story/macros.json" }}"#).unwrap();

    let settings = TweeSettings::load(file.path()).unwrap();
    assert!(!settings.macro_check);
    assert_eq!(settings.macro_path, Some(PathBuf::from("story/macros.json")));

    let prefs = Preferences::new(settings);
    assert!(!prefs.macro_check_enabled());
    assert_eq!(
        prefs.macro_definitions_path(),
        Some(PathBuf::from("story/macros.json"))
    );
}

#[test]
fn load_reports_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(TweeSettings::load(&missing), Err(SettingsError::Io(_))));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ macroCheck: ").unwrap();
    assert!(matches!(TweeSettings::load(&broken), Err(SettingsError::Json(_))));
}

#[test]
fn unknown_fields_are_ignored() {
    let settings = TweeSettings::from_json_str(r#"{"theme": "dark"}"#).unwrap();
    assert_eq!(settings, TweeSettings::default());
}
