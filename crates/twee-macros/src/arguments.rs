//! Macro argument tokenizer.
//!
//! Splits the text after a macro name into arguments. Quoted strings (`"…"`, `'…'`, with `\`
//! escapes), template literals (`` `…` ``, which may hold quoted strings) and balanced
//! `(…)`, `[…]`, `{…}` groups are skipped as a whole, so separators inside them never split.
//! Input that ends inside one of these simply ends the current argument.

use crate::syntax::ArgumentSyntax;

/// Split `text` into arguments according to `syntax`.
///
/// The text is trimmed first; the returned slices are otherwise untrimmed.
///
/// - [`ArgumentSyntax::Normal`]: runs of whitespace separate arguments.
/// - [`ArgumentSyntax::CommaSeparated`]: top-level commas separate arguments.
/// - [`ArgumentSyntax::Expression`]: the whole text is one argument.
pub fn split_arguments(syntax: ArgumentSyntax, text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let scanner = ArgumentScanner::new(text);
    let n = scanner.chars.len();
    let mut args = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < n {
        let c = scanner.chars[i].1;
        match c {
            ',' if syntax == ArgumentSyntax::CommaSeparated => {
                args.push(scanner.slice(start, i));
                start = i + 1;
            }
            c if c.is_whitespace() && syntax == ArgumentSyntax::Normal => {
                args.push(scanner.slice(start, i));
                while i < n && scanner.chars[i].1.is_whitespace() {
                    i += 1;
                }
                start = i;
                continue;
            }
            '"' | '\'' => i = scanner.skip_string(i),
            '`' => i = scanner.skip_template(i),
            '(' | '[' | '{' => i = scanner.skip_group(i),
            _ => {}
        }
        i += 1;
    }
    if start < n {
        args.push(scanner.slice(start, n));
    }
    args
}

struct ArgumentScanner<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
}

impl<'a> ArgumentScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
        }
    }

    fn byte_offset(&self, i: usize) -> usize {
        self.chars.get(i).map_or(self.text.len(), |(b, _)| *b)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }

    fn at(&self, i: usize) -> Option<char> {
        self.chars.get(i).map(|(_, c)| *c)
    }

    /// Index of the quote closing the string opened at `i`, or the end of input.
    fn skip_string(&self, i: usize) -> usize {
        let quote = self.chars[i].1;
        let mut j = i + 1;
        while let Some(c) = self.at(j) {
            if c == quote {
                return j;
            }
            if c == '\\' {
                j += 1;
            }
            j += 1;
        }
        self.chars.len()
    }

    /// Index of the backtick closing the template opened at `i`, or the end of input.
    fn skip_template(&self, i: usize) -> usize {
        let mut j = i + 1;
        while let Some(c) = self.at(j) {
            match c {
                '`' => return j,
                '"' | '\'' => j = self.skip_string(j),
                _ => {}
            }
            j += 1;
        }
        self.chars.len()
    }

    /// Index of the delimiter closing the group opened at `i`, or the end of input.
    fn skip_group(&self, i: usize) -> usize {
        let close = match self.chars[i].1 {
            '(' => ')',
            '[' => ']',
            _ => '}',
        };
        let mut j = i + 1;
        while let Some(c) = self.at(j) {
            match c {
                c if c == close => return j,
                '"' | '\'' => j = self.skip_string(j),
                '`' => j = self.skip_template(j),
                '(' | '[' | '{' => j = self.skip_group(j),
                _ => {}
            }
            j += 1;
        }
        self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArgumentSyntax::*;

    #[test]
    fn test_normal_splits_on_whitespace_runs() {
        assert_eq!(split_arguments(Normal, "a b  c"), vec!["a", "b", "c"]);
        assert_eq!(split_arguments(Normal, "  a,b\t\nc  "), vec!["a,b", "c"]);
        assert_eq!(split_arguments(Normal, ""), Vec::<&str>::new());
    }

    #[test]
    fn test_comma_separated_keeps_spaces() {
        assert_eq!(split_arguments(CommaSeparated, "a, b ,c"), vec!["a", " b ", "c"]);
        assert_eq!(split_arguments(CommaSeparated, "f(a,b), g"), vec!["f(a,b)", " g"]);
        assert_eq!(split_arguments(CommaSeparated, "a,"), vec!["a"]);
    }

    #[test]
    fn test_expression_never_splits() {
        assert_eq!(
            split_arguments(Expression, "$x to 1, 2"),
            vec!["$x to 1, 2"]
        );
    }

    #[test]
    fn test_strings_templates_and_groups_are_opaque() {
        assert_eq!(
            split_arguments(Normal, r#""Go on" 'it\'s here' `a ${"b c"}`"#),
            vec![r#""Go on""#, r"'it\'s here'", r#"`a ${"b c"}`"#]
        );
        assert_eq!(
            split_arguments(Normal, "[[Next|Room B]] (x + [1, 2]) {a: 'b c'}"),
            vec!["[[Next|Room B]]", "(x + [1, 2])", "{a: 'b c'}"]
        );
        assert_eq!(
            split_arguments(CommaSeparated, "f(\"a,b\"), [1,[2,3]], 'x,y'"),
            vec!["f(\"a,b\")", " [1,[2,3]]", " 'x,y'"]
        );
    }

    #[test]
    fn test_unterminated_input_is_tolerated() {
        assert_eq!(split_arguments(Normal, "a \"b c"), vec!["a", "\"b c"]);
        assert_eq!(split_arguments(Normal, "a (b [c"), vec!["a", "(b [c"]);
        assert_eq!(split_arguments(CommaSeparated, "`x, 'y"), vec!["`x, 'y"]);
        assert_eq!(split_arguments(Normal, "é ü"), vec!["é", "ü"]);
    }
}
