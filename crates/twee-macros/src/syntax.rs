//! Macro syntax descriptions.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::arguments::split_arguments;
use crate::error::{ArgumentProblem, SyntaxDescriptionError};

/// How the arguments of a macro are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentSyntax {
    /// Whitespace-separated arguments (`NORMAL`).
    Normal,
    /// One JavaScript expression (`EXPRESSION`).
    Expression,
    /// Comma-separated arguments (`COMMASEP`).
    CommaSeparated,
}

impl ArgumentSyntax {
    /// The name used in macro definition files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentSyntax::Normal => "NORMAL",
            ArgumentSyntax::Expression => "EXPRESSION",
            ArgumentSyntax::CommaSeparated => "COMMASEP",
        }
    }
}

impl fmt::Display for ArgumentSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArgumentSyntax {
    type Err = SyntaxDescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(ArgumentSyntax::Normal),
            "EXPRESSION" => Ok(ArgumentSyntax::Expression),
            "COMMASEP" => Ok(ArgumentSyntax::CommaSeparated),
            other => Err(SyntaxDescriptionError::UnknownArgumentSyntax(other.to_string())),
        }
    }
}

const LEGAL_FIELDS: [&str; 5] = [
    "argumentSyntax",
    "minArguments",
    "maxArguments",
    "nestedMacros",
    "isNested",
];

/// The declared syntax of one macro. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSyntax {
    argument_syntax: Option<ArgumentSyntax>,
    min_arguments: usize,
    max_arguments: usize,
    nested_macros: Option<Vec<String>>,
    is_nested: bool,
}

impl MacroSyntax {
    /// A macro taking no arguments and no body.
    pub fn bare() -> Self {
        Self {
            argument_syntax: None,
            min_arguments: 0,
            max_arguments: 0,
            nested_macros: None,
            is_nested: false,
        }
    }

    /// A macro taking between `min` and `max` arguments split by `syntax`.
    pub fn with_arguments(syntax: ArgumentSyntax, min: usize, max: usize) -> Self {
        Self {
            argument_syntax: Some(syntax),
            min_arguments: min,
            max_arguments: max,
            ..Self::bare()
        }
    }

    /// Make this macro a container closed by `<</name>>`, which may hold `nested` macros.
    pub fn containing<I, S>(mut self, nested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested_macros = Some(nested.into_iter().map(Into::into).collect());
        self
    }

    /// Mark this macro as one that only appears inside another macro's body.
    pub fn nested(mut self) -> Self {
        self.is_nested = true;
        self
    }

    /// Build a syntax from its JSON description.
    ///
    /// - `null`: no arguments, no body.
    /// - a count `m`: exactly `m` `NORMAL` arguments.
    /// - a syntax name: exactly one argument of that syntax.
    /// - an array of names: no arguments; a container for those nested macros.
    /// - an object with any of `argumentSyntax`, `minArguments`, `maxArguments`,
    ///   `nestedMacros` and `isNested`.
    pub fn from_json(json: &Value) -> Result<Self, SyntaxDescriptionError> {
        match json {
            Value::Null => Ok(Self::bare()),
            Value::Number(_) => {
                let m = count(json, "count")?;
                Ok(Self::with_arguments(ArgumentSyntax::Normal, m, m))
            }
            Value::String(name) => Ok(Self::with_arguments(name.parse()?, 1, 1)),
            Value::Array(_) => Ok(Self::bare().containing(nested_macro_list(json)?)),
            Value::Object(object) => Self::from_object(object),
            Value::Bool(_) => Err(SyntaxDescriptionError::IllegalValue(json.to_string())),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, SyntaxDescriptionError> {
        if let Some(key) = object.keys().find(|k| !LEGAL_FIELDS.contains(&k.as_str())) {
            return Err(SyntaxDescriptionError::UnknownKey(key.clone()));
        }
        let mut argument_syntax = match object.get("argumentSyntax") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.parse::<ArgumentSyntax>()?),
            Some(other) => {
                return Err(SyntaxDescriptionError::WrongType {
                    field: "argumentSyntax",
                    expected: "a String",
                    value: other.to_string(),
                });
            }
        };
        let default_min = usize::from(argument_syntax == Some(ArgumentSyntax::Expression));
        let min_arguments = match object.get("minArguments") {
            None | Some(Value::Null) => default_min,
            Some(value) => count(value, "minArguments")?,
        };
        let max_arguments = match object.get("maxArguments") {
            None | Some(Value::Null) => min_arguments,
            Some(value) => count(value, "maxArguments")?,
        };
        if max_arguments > 0 && argument_syntax.is_none() {
            argument_syntax = Some(ArgumentSyntax::Normal);
        }
        let nested_macros = match object.get("nestedMacros") {
            None | Some(Value::Null) => None,
            Some(value) => Some(nested_macro_list(value)?),
        };
        let is_nested = match object.get("isNested") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(SyntaxDescriptionError::WrongType {
                    field: "isNested",
                    expected: "a Boolean",
                    value: other.to_string(),
                });
            }
        };
        Ok(Self {
            argument_syntax,
            min_arguments,
            max_arguments,
            nested_macros,
            is_nested,
        })
    }

    /// Argument syntax, `None` if the macro takes no arguments.
    pub fn argument_syntax(&self) -> Option<ArgumentSyntax> {
        self.argument_syntax
    }

    /// Fewest arguments accepted.
    pub fn min_arguments(&self) -> usize {
        self.min_arguments
    }

    /// Most arguments accepted.
    pub fn max_arguments(&self) -> usize {
        self.max_arguments
    }

    /// Names of macros allowed inside this one's body, if it has a body.
    pub fn nested_macros(&self) -> Option<&[String]> {
        self.nested_macros.as_deref()
    }

    /// Whether this macro only appears inside another macro's body.
    pub fn is_nested(&self) -> bool {
        self.is_nested
    }

    /// Whether this macro wraps content up to a matching `<</name>>`.
    pub fn needs_end_tag(&self) -> bool {
        !self.is_nested && self.nested_macros.is_some()
    }

    /// Check the argument text of a call (everything after the macro name).
    pub fn check_arguments(&self, text: &str) -> Vec<ArgumentProblem> {
        let text = text.trim();
        if text.is_empty() {
            if self.min_arguments > 0 {
                return vec![ArgumentProblem::Missing(self.min_arguments)];
            }
            return Vec::new();
        }
        let Some(syntax) = self.argument_syntax.filter(|_| self.max_arguments > 0) else {
            return vec![ArgumentProblem::NotExpected];
        };
        let args = split_arguments(syntax, text);
        if args.len() < self.min_arguments {
            vec![ArgumentProblem::Missing(self.min_arguments - args.len())]
        } else if args.len() > self.max_arguments {
            vec![ArgumentProblem::Extra(args[self.max_arguments].trim().to_string())]
        } else {
            Vec::new()
        }
    }
}

/// Renders the canonical JSON description.
impl fmt::Display for MacroSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        if let Some(syntax) = self.argument_syntax {
            fields.push(format!("\"argumentSyntax\": \"{syntax}\""));
        }
        if self.min_arguments > 0 {
            fields.push(format!("\"minArguments\": {}", self.min_arguments));
        }
        if self.max_arguments > 0 {
            fields.push(format!("\"maxArguments\": {}", self.max_arguments));
        }
        if self.is_nested {
            fields.push("\"isNested\": true".to_string());
        }
        if let Some(nested) = &self.nested_macros {
            let names: Vec<String> = nested
                .iter()
                .map(|n| Value::from(n.as_str()).to_string())
                .collect();
            fields.push(format!("\"nestedMacros\": [{}]", names.join(", ")));
        }
        write!(f, "{{{}}}", fields.join(", "))
    }
}

/// A non-negative integer; a float with no fractional part (`2.0`) counts as one.
fn count(value: &Value, field: &'static str) -> Result<usize, SyntaxDescriptionError> {
    let whole = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u64)
    });
    whole
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SyntaxDescriptionError::WrongType {
            field,
            expected: "a non-negative Integer",
            value: value.to_string(),
        })
}

fn nested_macro_list(value: &Value) -> Result<Vec<String>, SyntaxDescriptionError> {
    let Value::Array(items) = value else {
        return Err(SyntaxDescriptionError::WrongType {
            field: "nestedMacros",
            expected: "an array",
            value: value.to_string(),
        });
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(SyntaxDescriptionError::WrongType {
                field: "nestedMacros",
                expected: "a String",
                value: other.to_string(),
            }),
        })
        .collect()
}
