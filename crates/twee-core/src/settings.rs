//! User settings and the configuration source analyzers read them from.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TweeSettings {
    /// Whether macro calls are validated.
    pub macro_check: bool,
    /// Optional user file with extra macro definitions.
    pub macro_path: Option<PathBuf>,
}

impl Default for TweeSettings {
    fn default() -> Self {
        Self {
            macro_check: true,
            macro_path: None,
        }
    }
}

impl TweeSettings {
    /// Parse settings from JSON text. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Which setting changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    /// The macro-check flag changed.
    MacroCheck(bool),
    /// The macro definitions path changed.
    MacroPath(Option<PathBuf>),
}

/// Callback for setting changes.
pub type SettingListener = Box<dyn Fn(&SettingChange) + Send + Sync>;

/// Read access to configuration, with change notifications.
pub trait ConfigSource: Send + Sync {
    /// Whether macro calls should be validated.
    fn macro_check_enabled(&self) -> bool;

    /// Path of the user macro definitions file, if configured.
    fn macro_definitions_path(&self) -> Option<PathBuf>;

    /// Register a listener for setting changes.
    fn subscribe(&self, listener: SettingListener);
}

/// In-memory [`ConfigSource`] backed by [`TweeSettings`].
#[derive(Default)]
pub struct Preferences {
    settings: RwLock<TweeSettings>,
    listeners: Mutex<Vec<SettingListener>>,
}

impl Preferences {
    /// Create preferences holding `settings`.
    pub fn new(settings: TweeSettings) -> Arc<Self> {
        Arc::new(Self {
            settings: RwLock::new(settings),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> TweeSettings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Enable or disable macro validation.
    pub fn set_macro_check(&self, enabled: bool) {
        let changed = match self.settings.write() {
            Ok(mut settings) if settings.macro_check != enabled => {
                settings.macro_check = enabled;
                true
            }
            _ => false,
        };
        if changed {
            self.fire(&SettingChange::MacroCheck(enabled));
        }
    }

    /// Set or clear the user macro definitions path.
    pub fn set_macro_path(&self, path: Option<PathBuf>) {
        let changed = match self.settings.write() {
            Ok(mut settings) if settings.macro_path != path => {
                settings.macro_path = path.clone();
                true
            }
            _ => false,
        };
        if changed {
            self.fire(&SettingChange::MacroPath(path));
        }
    }

    fn fire(&self, change: &SettingChange) {
        tracing::debug!(?change, "setting changed");
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(change);
            }
        }
    }
}

impl ConfigSource for Preferences {
    fn macro_check_enabled(&self) -> bool {
        self.settings.read().map(|s| s.macro_check).unwrap_or(true)
    }

    fn macro_definitions_path(&self) -> Option<PathBuf> {
        self.settings.read().ok().and_then(|s| s.macro_path.clone())
    }

    fn subscribe(&self, listener: SettingListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_camel_case() {
        let settings = TweeSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, TweeSettings::default());
        assert!(settings.macro_check);

        let settings =
            TweeSettings::from_json_str(r#"{"macroCheck": false, "macroPath": "m.json"}"#)
                .unwrap();
        assert!(!settings.macro_check);
        assert_eq!(settings.macro_path, Some(PathBuf::from("m.json")));
    }

    #[test]
    fn test_setters_fire_only_on_change() {
        let prefs = Preferences::new(TweeSettings::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            prefs.subscribe(Box::new(move |c: &SettingChange| {
                seen.lock().unwrap().push(c.clone())
            }));
        }
        prefs.set_macro_check(true);
        prefs.set_macro_check(false);
        prefs.set_macro_path(Some(PathBuf::from("a.json")));
        prefs.set_macro_path(Some(PathBuf::from("a.json")));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                SettingChange::MacroCheck(false),
                SettingChange::MacroPath(Some(PathBuf::from("a.json"))),
            ]
        );
        assert!(!prefs.macro_check_enabled());
    }
}
