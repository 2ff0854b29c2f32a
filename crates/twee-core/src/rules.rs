//! A small rule-based character scanner.
//!
//! Rules are tried in priority order at the scanner's current position; the first one that
//! matches consumes its token. Used by the partitioner (tokens are [`ContentType`]s) and by
//! the syntax highlighters (tokens are style ids).
//!
//! [`ContentType`]: crate::ContentType

use crate::document::TextDocument;
use crate::region::Region;

/// A bounded, rewindable cursor over a [`TextDocument`].
pub struct CharScanner<'a> {
    doc: &'a dyn TextDocument,
    offset: usize,
    range_end: usize,
}

impl<'a> CharScanner<'a> {
    /// Scan `[offset, offset + length)` of `doc`; the range is clamped to the document.
    pub fn new(doc: &'a dyn TextDocument, offset: usize, length: usize) -> Self {
        let len = doc.len();
        let offset = offset.min(len);
        let range_end = offset.saturating_add(length).min(len);
        Self {
            doc,
            offset,
            range_end,
        }
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// End of the scanned range (exclusive).
    pub fn range_end(&self) -> usize {
        self.range_end
    }

    /// Move to `offset` (clamped to the range end).
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.range_end);
    }

    /// Returns `true` when the scanner is at the end of its range.
    pub fn at_end(&self) -> bool {
        self.offset >= self.range_end
    }

    /// Read the next char, or `None` at the end of the range.
    pub fn read(&mut self) -> Option<char> {
        if self.at_end() {
            return None;
        }
        let c = self.doc.char_at(self.offset)?;
        self.offset += 1;
        Some(c)
    }

    /// Look at the next char without consuming it.
    pub fn peek(&self) -> Option<char> {
        if self.at_end() {
            return None;
        }
        self.doc.char_at(self.offset)
    }

    /// Returns `true` when the current position is the first column of a line.
    ///
    /// Looks at the document, not the range, so a range starting mid-line is not column 0.
    pub fn at_line_start(&self) -> bool {
        if self.offset == 0 {
            return true;
        }
        match self.doc.char_at(self.offset - 1) {
            Some('\n') => true,
            Some('\r') => self.doc.char_at(self.offset) != Some('\n'),
            _ => false,
        }
    }
}

/// Outcome of evaluating a rule at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch<T> {
    /// The rule consumed a token.
    Token(T),
    /// The rule does not apply here; the scanner is unchanged.
    NoMatch,
    /// The start sequence matched but the end was never found before the end of the range.
    /// The scanner is unchanged.
    Unterminated,
}

/// A scanning rule producing tokens of type `T`.
pub trait Rule<T> {
    /// Try to match at the scanner's position. On anything but [`RuleMatch::Token`] the
    /// scanner must be left where it was.
    fn evaluate(&self, scanner: &mut CharScanner<'_>) -> RuleMatch<T>;
}

/// Delimited pattern: a start sequence followed by text up to an end sequence, an end of line,
/// or the end of the range, depending on configuration.
#[derive(Debug, Clone)]
pub struct PatternRule<T> {
    start: Vec<char>,
    end: Vec<char>,
    escape: Option<char>,
    breaks_on_eol: bool,
    breaks_on_eof: bool,
    line_start: bool,
    not_followed_by: Vec<char>,
    token: T,
}

impl<T: Copy> PatternRule<T> {
    /// `start ... end`, possibly spanning lines; unterminated at end of range.
    pub fn multi_line(start: &str, end: &str, token: T) -> Self {
        Self {
            start: start.chars().collect(),
            end: end.chars().collect(),
            escape: None,
            breaks_on_eol: false,
            breaks_on_eof: false,
            line_start: false,
            not_followed_by: Vec::new(),
            token,
        }
    }

    /// `start ... end` on one line; a line delimiter also terminates the token.
    pub fn single_line(start: &str, end: &str, token: T) -> Self {
        Self {
            breaks_on_eol: true,
            ..Self::multi_line(start, end, token)
        }
    }

    /// A whole line starting with `start` at column 0, including its delimiter.
    ///
    /// The last line of a document needs no delimiter.
    pub fn whole_line(start: &str, token: T) -> Self {
        Self {
            breaks_on_eol: true,
            breaks_on_eof: true,
            line_start: true,
            ..Self::multi_line(start, "", token)
        }
    }

    /// Use `escape` to skip the following char while looking for the end.
    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Let the end of the range terminate the token instead of failing.
    pub fn breaking_on_eof(mut self) -> Self {
        self.breaks_on_eof = true;
        self
    }

    /// Reject the match when the start sequence is immediately followed by one of `chars`.
    pub fn not_followed_by(mut self, chars: &[char]) -> Self {
        self.not_followed_by = chars.to_vec();
        self
    }

    /// The token this rule produces.
    pub fn token(&self) -> T {
        self.token
    }

    fn sequence_detected(&self, scanner: &mut CharScanner<'_>, sequence: &[char]) -> bool {
        let mark = scanner.offset();
        for &expected in sequence {
            match scanner.read() {
                Some(c) if c == expected => {}
                None if self.breaks_on_eof => return true,
                _ => {
                    scanner.set_offset(mark);
                    return false;
                }
            }
        }
        true
    }
}

impl<T: Copy> Rule<T> for PatternRule<T> {
    fn evaluate(&self, scanner: &mut CharScanner<'_>) -> RuleMatch<T> {
        let mark = scanner.offset();
        if self.line_start && !scanner.at_line_start() {
            return RuleMatch::NoMatch;
        }
        for &expected in &self.start {
            if scanner.read() != Some(expected) {
                scanner.set_offset(mark);
                return RuleMatch::NoMatch;
            }
        }
        if let Some(next) = scanner.peek()
            && self.not_followed_by.contains(&next)
        {
            scanner.set_offset(mark);
            return RuleMatch::NoMatch;
        }

        while let Some(c) = scanner.read() {
            if Some(c) == self.escape {
                scanner.read();
            } else if self.end.first() == Some(&c) {
                if self.sequence_detected(scanner, &self.end[1..]) {
                    return RuleMatch::Token(self.token);
                }
            } else if self.breaks_on_eol && (c == '\n' || c == '\r') {
                if c == '\r' && scanner.peek() == Some('\n') {
                    scanner.read();
                }
                return RuleMatch::Token(self.token);
            }
        }

        if self.breaks_on_eof {
            return RuleMatch::Token(self.token);
        }
        scanner.set_offset(mark);
        RuleMatch::Unterminated
    }
}

/// Consumes a run of whitespace.
#[derive(Debug, Clone, Copy)]
pub struct WhitespaceRule<T> {
    token: T,
}

impl<T: Copy> WhitespaceRule<T> {
    /// Create a whitespace rule producing `token`.
    pub fn new(token: T) -> Self {
        Self { token }
    }
}

impl<T: Copy> Rule<T> for WhitespaceRule<T> {
    fn evaluate(&self, scanner: &mut CharScanner<'_>) -> RuleMatch<T> {
        let mut matched = false;
        while let Some(c) = scanner.peek() {
            if !c.is_whitespace() {
                break;
            }
            scanner.read();
            matched = true;
        }
        if matched {
            RuleMatch::Token(self.token)
        } else {
            RuleMatch::NoMatch
        }
    }
}

/// A scanned token: its value and extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedToken<T> {
    /// Token value.
    pub token: T,
    /// Extent in the document.
    pub region: Region,
}

/// An ordered list of rules with a fallback token for unmatched chars.
pub struct RuleScanner<T> {
    rules: Vec<Box<dyn Rule<T> + Send + Sync>>,
    default_token: T,
}

impl<T: Copy> RuleScanner<T> {
    /// Create a scanner with no rules.
    pub fn new(default_token: T) -> Self {
        Self {
            rules: Vec::new(),
            default_token,
        }
    }

    /// Append a rule (lowest priority so far).
    pub fn with_rule(mut self, rule: impl Rule<T> + Send + Sync + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Token used for chars no rule claims.
    pub fn default_token(&self) -> T {
        self.default_token
    }

    /// Try every rule at the current position.
    ///
    /// Returns the matching token, or `None` when no rule applies. `on_unterminated` is called
    /// with the position for each rule whose start matched but whose end was never found.
    pub fn match_rules(
        &self,
        scanner: &mut CharScanner<'_>,
        mut on_unterminated: impl FnMut(usize),
    ) -> Option<T> {
        for rule in &self.rules {
            match rule.evaluate(scanner) {
                RuleMatch::Token(token) => return Some(token),
                RuleMatch::Unterminated => on_unterminated(scanner.offset()),
                RuleMatch::NoMatch => {}
            }
        }
        None
    }

    /// Scan the next token; unmatched chars come back one at a time as the default token.
    pub fn next_token(&self, scanner: &mut CharScanner<'_>) -> Option<ScannedToken<T>> {
        if scanner.at_end() {
            return None;
        }
        let start = scanner.offset();
        let token = match self.match_rules(scanner, |_| {}) {
            Some(token) => token,
            None => {
                scanner.read();
                self.default_token
            }
        };
        Some(ScannedToken {
            token,
            region: Region::new(start, scanner.offset() - start),
        })
    }

    /// Scan `[offset, offset + length)` into tokens, merging adjacent default chars.
    pub fn tokenize(
        &self,
        doc: &dyn TextDocument,
        offset: usize,
        length: usize,
    ) -> Vec<ScannedToken<T>>
    where
        T: PartialEq,
    {
        let mut scanner = CharScanner::new(doc, offset, length);
        let mut out: Vec<ScannedToken<T>> = Vec::new();
        while let Some(next) = self.next_token(&mut scanner) {
            if let Some(last) = out.last_mut()
                && next.token == self.default_token
                && last.token == self.default_token
                && last.region.end() == next.region.offset
            {
                last.region.length += next.region.length;
                continue;
            }
            out.push(next);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RopeDocument;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tok {
        Text,
        Str,
        Comment,
        Line,
        Space,
    }

    fn scanner_rules() -> RuleScanner<Tok> {
        RuleScanner::new(Tok::Text)
            .with_rule(PatternRule::multi_line("/*", "*/", Tok::Comment))
            .with_rule(PatternRule::single_line("\"", "\"", Tok::Str).with_escape('\\'))
            .with_rule(PatternRule::whole_line("::", Tok::Line))
            .with_rule(WhitespaceRule::new(Tok::Space))
    }

    fn kinds(text: &str) -> Vec<(Tok, usize, usize)> {
        let doc = RopeDocument::new(text);
        scanner_rules()
            .tokenize(&doc, 0, doc.len())
            .into_iter()
            .map(|t| (t.token, t.region.offset, t.region.length))
            .collect()
    }

    #[test]
    fn test_escape_skips_end_char() {
        assert_eq!(
            kinds(r#"a"b\"c"d"#),
            vec![(Tok::Text, 0, 1), (Tok::Str, 1, 6), (Tok::Text, 7, 1)]
        );
    }

    #[test]
    fn test_single_line_stops_at_eol() {
        assert_eq!(
            kinds("\"ab\r\nx"),
            vec![(Tok::Str, 0, 5), (Tok::Text, 5, 1)]
        );
    }

    #[test]
    fn test_unterminated_multi_line_falls_through() {
        assert_eq!(kinds("/*ab"), vec![(Tok::Text, 0, 4)]);
        assert_eq!(kinds("/*a\nb*/c"), vec![(Tok::Comment, 0, 7), (Tok::Text, 7, 1)]);
    }

    #[test]
    fn test_whole_line_needs_column_zero() {
        assert_eq!(
            kinds("x::a\n::b"),
            vec![(Tok::Text, 0, 4), (Tok::Space, 4, 1), (Tok::Line, 5, 3)]
        );
    }

    #[test]
    fn test_unterminated_reports_position() {
        let doc = RopeDocument::new("ab/*cd");
        let rules = scanner_rules();
        let mut scanner = CharScanner::new(&doc, 2, 4);
        let mut failed = Vec::new();
        assert_eq!(rules.match_rules(&mut scanner, |p| failed.push(p)), None);
        assert_eq!(failed, vec![2]);
        assert_eq!(scanner.offset(), 2);
    }

    #[test]
    fn test_not_followed_by() {
        let rule = PatternRule::multi_line("<", ">", Tok::Str).not_followed_by(&['?', '!']);
        let doc = RopeDocument::new("<?x> <a>");
        let mut scanner = CharScanner::new(&doc, 0, doc.len());
        assert_eq!(rule.evaluate(&mut scanner), RuleMatch::NoMatch);
        scanner.set_offset(5);
        assert_eq!(rule.evaluate(&mut scanner), RuleMatch::Token(Tok::Str));
        assert_eq!(scanner.offset(), 8);
    }

    #[test]
    fn test_whitespace_run() {
        assert_eq!(
            kinds("a \t\nb"),
            vec![(Tok::Text, 0, 1), (Tok::Space, 1, 3), (Tok::Text, 4, 1)]
        );
    }
}
