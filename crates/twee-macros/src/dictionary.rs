//! The macro dictionary: macro name to declared syntax.
//!
//! The table is rebuilt off-lock and swapped in whole, so a reader always sees a complete table
//! (either the old one or the new one). The process-wide instance is reached through
//! [`MacroDictionary::global`].

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use once_cell::sync::Lazy;
use serde_json::Value;
use twee_core::{ConfigSource, SettingChange};

use crate::error::{MacroCallError, MacroConfigError};
use crate::report::{ErrorReporter, LogReporter};
use crate::resources::{BUILTIN_MACROS, BundledResources, ResourceLoader};
use crate::syntax::MacroSyntax;

/// Macro name to syntax.
pub type MacroTable = HashMap<String, MacroSyntax>;

static GLOBAL: Lazy<Arc<MacroDictionary>> = Lazy::new(|| {
    Arc::new(MacroDictionary::new(
        Arc::new(BundledResources),
        Arc::new(LogReporter),
    ))
});

/// A reloadable table of macro syntaxes.
pub struct MacroDictionary {
    table: RwLock<Arc<MacroTable>>,
    loaded: AtomicBool,
    loader: Arc<dyn ResourceLoader>,
    reporter: Arc<dyn ErrorReporter>,
}

impl MacroDictionary {
    /// Create an empty dictionary that loads its built-in definitions through `loader` and
    /// reports configuration errors to `reporter`.
    pub fn new(loader: Arc<dyn ResourceLoader>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            table: RwLock::new(Arc::new(MacroTable::new())),
            loaded: AtomicBool::new(false),
            loader,
            reporter,
        }
    }

    /// A dictionary holding exactly `table`.
    pub fn from_table(table: MacroTable) -> Self {
        let dictionary = Self::new(Arc::new(BundledResources), Arc::new(LogReporter));
        dictionary.install(table);
        dictionary
    }

    /// The process-wide dictionary (bundled definitions, errors logged).
    pub fn global() -> Arc<MacroDictionary> {
        GLOBAL.clone()
    }

    /// Load the definitions once, using the user file named by `config`.
    pub fn init(&self, config: &dyn ConfigSource) {
        if !self.is_loaded() {
            self.reload(config.macro_definitions_path().as_deref());
        }
    }

    /// Whether a table has been installed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Rebuild the table from the built-in definitions plus the optional user file.
    ///
    /// A file that fails to load is reported and contributes nothing. If any file failed, the
    /// previous table stays in effect, unless this is the first load. Returns `true` if a new
    /// table was installed.
    pub fn reload(&self, user_path: Option<&Path>) -> bool {
        tracing::debug!(?user_path, "loading macro definitions");
        let mut table = MacroTable::new();
        let mut failed = false;

        match self.loader.open_resource(BUILTIN_MACROS) {
            Some(reader) => match read_definitions(BUILTIN_MACROS, reader) {
                Ok(builtin) => table.extend(builtin),
                Err(err) => {
                    self.reporter.report(&err);
                    failed = true;
                }
            },
            None => {
                self.reporter
                    .report(&MacroConfigError::MissingResource(BUILTIN_MACROS.to_string()));
                failed = true;
            }
        }

        if let Some(path) = user_path.filter(|p| !p.as_os_str().is_empty()) {
            match load_user_definitions(path) {
                Ok(user) => table.extend(user),
                Err(err) => {
                    self.reporter.report(&err);
                    failed = true;
                }
            }
        }

        if failed && self.is_loaded() {
            tracing::warn!("macro definitions not reloaded; keeping the previous table");
            return false;
        }
        self.install(table);
        true
    }

    fn install(&self, table: MacroTable) {
        let count = table.len();
        let table = Arc::new(table);
        match self.table.write() {
            Ok(mut guard) => *guard = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
        self.loaded.store(true, Ordering::SeqCst);
        tracing::debug!(macros = count, "installed macro definitions");
    }

    /// Reload on a background thread whenever the macro-path setting of `config` changes.
    pub fn watch(self: &Arc<Self>, config: &dyn ConfigSource) -> io::Result<JoinHandle<()>> {
        let (tx, rx) = mpsc::channel::<Option<PathBuf>>();
        let dictionary = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("twee-macro-reload".to_string())
            .spawn(move || {
                for path in rx {
                    dictionary.reload(path.as_deref());
                }
            })?;
        config.subscribe(Box::new(move |change: &SettingChange| {
            if let SettingChange::MacroPath(path) = change {
                let _ = tx.send(path.clone());
            }
        }));
        Ok(handle)
    }

    /// Snapshot of the current table.
    pub fn table(&self) -> Arc<MacroTable> {
        match self.table.read() {
            Ok(table) => Arc::clone(&table),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// The syntax of macro `name`.
    pub fn get(&self, name: &str) -> Option<MacroSyntax> {
        self.table().get(name).cloned()
    }

    /// Check one macro call: the text between `<<` and `>>`, trimmed.
    pub fn check(&self, call: &str) -> Result<(), MacroCallError> {
        let table = self.table();
        let Some(first) = call.chars().next() else {
            return Err(MacroCallError::Empty);
        };
        if let Some(name) = call.strip_prefix('/') {
            return match table.get(name) {
                None => Err(MacroCallError::UnknownEndTag(name.to_string())),
                Some(syntax) if !syntax.needs_end_tag() => {
                    Err(MacroCallError::NoEndTag(name.to_string()))
                }
                Some(_) => Ok(()),
            };
        }

        let mut name_end = first.len_utf8();
        if is_identifier_start(first) {
            name_end = call
                .char_indices()
                .skip(1)
                .find(|(_, c)| !is_identifier_part(*c))
                .map_or(call.len(), |(i, _)| i);
        }
        let (name, arguments) = call.split_at(name_end);
        let Some(syntax) = table.get(name) else {
            return Err(MacroCallError::Undefined(name.to_string()));
        };
        let problems = syntax.check_arguments(arguments);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MacroCallError::Arguments(problems))
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Parse a macro definitions document.
pub fn parse_definitions(file: &str, text: &str) -> Result<MacroTable, MacroConfigError> {
    let json: Value = serde_json::from_str(text).map_err(|source| MacroConfigError::Json {
        file: file.to_string(),
        source,
    })?;
    let Value::Object(entries) = json else {
        return Err(MacroConfigError::NotAnObject(file.to_string()));
    };
    entries
        .iter()
        .map(|(name, description)| {
            MacroSyntax::from_json(description)
                .map(|syntax| (name.clone(), syntax))
                .map_err(|source| MacroConfigError::Description {
                    name: name.clone(),
                    source,
                })
        })
        .collect()
}

fn read_definitions(file: &str, mut reader: impl Read) -> Result<MacroTable, MacroConfigError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| MacroConfigError::Io {
            path: PathBuf::from(file),
            source,
        })?;
    parse_definitions(file, &text)
}

fn load_user_definitions(path: &Path) -> Result<MacroTable, MacroConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| MacroConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definitions(&path.display().to_string(), &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ArgumentSyntax;

    fn dictionary(json: &str) -> MacroDictionary {
        MacroDictionary::from_table(parse_definitions("test.json", json).unwrap())
    }

    #[test]
    fn test_if_example() {
        let md = dictionary(
            r#"{"if": {"argumentSyntax":"EXPRESSION","minArguments":1,"maxArguments":1,"nestedMacros":["else","elseif"]}}"#,
        );
        assert_eq!(
            md.check("if"),
            Err(MacroCallError::Arguments(vec![
                crate::error::ArgumentProblem::Missing(1)
            ]))
        );
        assert_eq!(md.check("if x"), Ok(()));
        assert_eq!(md.check("/if"), Ok(()));
        assert_eq!(
            md.check("/nope"),
            Err(MacroCallError::UnknownEndTag("nope".to_string()))
        );
    }

    #[test]
    fn test_call_messages() {
        let md = dictionary(r#"{"set": "EXPRESSION", "back": null, "=": "EXPRESSION"}"#);
        assert_eq!(
            md.check("").unwrap_err().to_string(),
            "empty macro call <<>> not allowed"
        );
        assert_eq!(
            md.check("/set").unwrap_err().to_string(),
            "<<set>> does not use end tag"
        );
        assert_eq!(
            md.check("goto \"x\"").unwrap_err().to_string(),
            "no macro <<goto>> defined"
        );
        assert_eq!(
            md.check("back 1").unwrap_err().to_string(),
            "Arguments not expected"
        );
        assert_eq!(md.check("=$x"), Ok(()));
        assert_eq!(md.check("set$x to 1"), Err(MacroCallError::Undefined("set$x".to_string())));
    }

    #[test]
    fn test_parse_errors_name_the_macro() {
        let err = parse_definitions("user.json", r#"{"a": 1, "b": {"max": 2}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "description for macro b broken: bad macro syntax key 'max'"
        );
        assert!(matches!(
            parse_definitions("user.json", "[1, 2]"),
            Err(MacroConfigError::NotAnObject(_))
        ));
        assert!(matches!(
            parse_definitions("user.json", "{"),
            Err(MacroConfigError::Json { .. })
        ));
    }

    #[test]
    fn test_from_table_and_get() {
        let mut table = MacroTable::new();
        table.insert(
            "link".to_string(),
            MacroSyntax::with_arguments(ArgumentSyntax::Normal, 1, 2).containing(Vec::<String>::new()),
        );
        let md = MacroDictionary::from_table(table);
        assert!(md.is_loaded());
        assert!(md.get("link").unwrap().needs_end_tag());
        assert_eq!(md.get("nope"), None);
    }
}
