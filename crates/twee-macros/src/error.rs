use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// A macro syntax description that cannot be understood.
pub enum SyntaxDescriptionError {
    #[error("bad macro syntax key '{0}'")]
    /// The description object has a key other than the five known fields.
    UnknownKey(String),

    #[error("unknown argument syntax '{0}'")]
    /// An argument syntax name that is not `NORMAL`, `EXPRESSION` or `COMMASEP`.
    UnknownArgumentSyntax(String),

    #[error("{field} value is not {expected}: {value}")]
    /// A field holding a JSON value of the wrong kind.
    WrongType {
        /// Offending field (or `nestedMacros` element).
        field: &'static str,
        /// What the field should hold.
        expected: &'static str,
        /// The JSON text found instead.
        value: String,
    },

    #[error("illegal value: {0}")]
    /// A description that is not null, a count, a name, an array or an object.
    IllegalValue(String),
}

#[derive(Debug, Error)]
/// Errors loading a macro definitions file.
pub enum MacroConfigError {
    #[error("cannot open macro definition file: {0}")]
    /// The bundled resource is missing.
    MissingResource(String),

    #[error("trying to read {}: {source}", .path.display())]
    /// The user definitions file could not be read.
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    #[error("{file}: {source}")]
    /// The file is not valid JSON.
    Json {
        /// File name.
        file: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}: macro definitions must be a JSON object")]
    /// The top-level JSON value is not an object.
    NotAnObject(String),

    #[error("description for macro {name} broken: {source}")]
    /// One macro entry has a broken description.
    Description {
        /// Macro name.
        name: String,
        /// What is wrong with it.
        #[source]
        source: SyntaxDescriptionError,
    },
}

/// One problem with the arguments of a macro call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentProblem {
    /// Fewer arguments than the macro's minimum.
    Missing(usize),
    /// The first argument past the macro's maximum.
    Extra(String),
    /// Arguments given to a macro that takes none.
    NotExpected,
}

impl fmt::Display for ArgumentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentProblem::Missing(n) => write!(f, "Missing {n} parameter(s)"),
            ArgumentProblem::Extra(arg) => write!(f, "Extra parameter: {arg}"),
            ArgumentProblem::NotExpected => f.write_str("Arguments not expected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Why a macro call is invalid.
pub enum MacroCallError {
    #[error("empty macro call <<>> not allowed")]
    /// `<<>>`.
    Empty,

    #[error("no macro <<{0}>>")]
    /// A closing tag for an undefined macro.
    UnknownEndTag(String),

    #[error("<<{0}>> does not use end tag")]
    /// A closing tag for a macro without a body.
    NoEndTag(String),

    #[error("no macro <<{0}>> defined")]
    /// The macro name is not in the dictionary.
    Undefined(String),

    #[error("{}", join_problems(.0))]
    /// The arguments do not fit the macro's syntax.
    Arguments(Vec<ArgumentProblem>),
}

fn join_problems(problems: &[ArgumentProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
