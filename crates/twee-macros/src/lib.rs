#![warn(missing_docs)]
//! Twee Macros - SugarCube Macro Validation
//!
//! # Overview
//!
//! `twee-macros` knows which `<<macro>>` calls a SugarCube story may use and checks the calls
//! found by the `twee-core` partitioner. Definitions come from a bundled `macros.json` plus an
//! optional user file named in the configuration.
//!
//! # Definitions
//!
//! Each entry of a definitions file maps a macro name to a syntax description:
//!
//! | JSON | Meaning |
//! |------|---------|
//! | `null` | no arguments, no body |
//! | `2` | two whitespace-separated arguments |
//! | `"EXPRESSION"` | one argument in that syntax |
//! | `["else"]` | no arguments, needs `<</name>>`, may contain `<<else>>` |
//! | `{...}` | `argumentSyntax`, `minArguments`, `maxArguments`, `nestedMacros`, `isNested` |
//!
//! # Quick Start
//!
//! ```rust
//! use twee_macros::{MacroCallError, MacroDictionary, parse_definitions};
//!
//! let table = parse_definitions("story.json", r#"{"goto": 1, "nobr": []}"#).unwrap();
//! let dictionary = MacroDictionary::from_table(table);
//!
//! assert_eq!(dictionary.check("goto \"Start\""), Ok(()));
//! assert_eq!(dictionary.check("/nobr"), Ok(()));
//! assert_eq!(
//!     dictionary.check("/goto").unwrap_err().to_string(),
//!     "<<goto>> does not use end tag"
//! );
//! assert!(matches!(dictionary.check("jump"), Err(MacroCallError::Undefined(_))));
//! ```
//!
//! # Module Description
//!
//! - [`syntax`] - macro syntax descriptions and argument checks
//! - [`arguments`] - argument tokenizer
//! - [`dictionary`] - the reloadable name-to-syntax table
//! - [`resources`] - bundled definitions and resource loading
//! - [`report`] - configuration error reporting
//! - [`checker`] - the reconciling strategy publishing macro problem markers
//! - [`error`] - error types

pub mod arguments;
pub mod checker;
pub mod dictionary;
pub mod error;
pub mod report;
pub mod resources;
pub mod syntax;

pub use arguments::split_arguments;
pub use checker::MacroChecker;
pub use dictionary::{MacroDictionary, MacroTable, parse_definitions};
pub use error::{ArgumentProblem, MacroCallError, MacroConfigError, SyntaxDescriptionError};
pub use report::{CollectingReporter, ErrorReporter, LogReporter};
pub use resources::{BUILTIN_MACROS, BundledResources, DirectoryResources, ResourceLoader};
pub use syntax::{ArgumentSyntax, MacroSyntax};
