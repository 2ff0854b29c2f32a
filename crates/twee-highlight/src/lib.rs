//! `twee-highlight` - Partition-driven syntax highlighting for Twee documents.
//!
//! Each partition produced by `twee-core` is styled by the scanner registered for its content
//! type. Comments, script blocks, links and macro-header lines are styled as one interval;
//! macro calls, passage headers, markup tags and body text are split into tokens.
//!
//! Offsets are char offsets, like everywhere in `twee-core`.

#![warn(missing_docs)]

use regex::Regex;
use twee_core::{
    ContentType, DocumentChange, PatternRule, Partitioning, Region, RuleScanner, TextDocument,
    TypedRegion, WhitespaceRule,
};

/// Style identifier. The UI/theme layer maps ids to colors.
pub type StyleId = u32;

/// A styled range `[start, end)` in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// Start offset.
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Style ID
    pub style_id: StyleId,
}

impl Interval {
    /// Create an interval styling `[start, end)` with `style_id`.
    pub fn new(start: usize, end: usize, style_id: StyleId) -> Self {
        Self {
            start,
            end,
            style_id,
        }
    }
}

/// A single regex highlighting rule, applied to the unstyled text of a token scanner.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    style_id: StyleId,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Compile `pattern`; every match is styled with `style_id`.
    pub fn new(pattern: &str, style_id: StyleId) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            style_id,
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// The style applied to matches.
    pub fn style_id(&self) -> StyleId {
        self.style_id
    }

    /// Char ranges (relative to `text`) this rule styles.
    fn ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        for caps in self.regex.captures_iter(text) {
            let m = match self.capture_group {
                Some(group) => caps.get(group),
                None => caps.get(0),
            };
            let Some(m) = m else {
                continue;
            };
            let start = text[..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            if start < end {
                ranges.push((start, end));
            }
        }
        ranges
    }
}

/// Style ids used by [`TweeHighlighter`].
#[derive(Debug, Clone, Copy)]
pub struct TweeStyles {
    /// Text no scanner rule matched.
    pub default: StyleId,
    /// Quoted strings inside macro calls, headers and tags.
    pub string: StyleId,
    /// Backtick template literals.
    pub template: StyleId,
    /// `<?...?>` processing instructions in body text.
    pub processing_instruction: StyleId,
    /// `<!-- -->` comments.
    pub xml_comment: StyleId,
    /// `/* */` comments.
    pub js_comment: StyleId,
    /// Markup tags.
    pub xml_tag: StyleId,
    /// Passage header lines.
    pub passage: StyleId,
    /// The `[...]` tag list of a passage header.
    pub passage_tag: StyleId,
    /// `<<...>>` macro calls.
    pub macro_call: StyleId,
    /// Whole `!` header lines.
    pub macro_header: StyleId,
    /// `{{{ }}}` verbatim code blocks.
    pub macro_code: StyleId,
    /// `[[...]]` links.
    pub link: StyleId,
    /// `$story` and `_temporary` variables inside macro calls.
    pub variable: StyleId,
}

impl Default for TweeStyles {
    fn default() -> Self {
        Self {
            default: TWEE_STYLE_DEFAULT,
            string: TWEE_STYLE_STRING,
            template: TWEE_STYLE_TEMPLATE,
            processing_instruction: TWEE_STYLE_PROC_INSTR,
            xml_comment: TWEE_STYLE_XML_COMMENT,
            js_comment: TWEE_STYLE_JS_COMMENT,
            xml_tag: TWEE_STYLE_XML_TAG,
            passage: TWEE_STYLE_PASSAGE,
            passage_tag: TWEE_STYLE_PASSAGE_TAG,
            macro_call: TWEE_STYLE_MACRO,
            macro_header: TWEE_STYLE_MACRO_HEADER,
            macro_code: TWEE_STYLE_MACRO_CODE,
            link: TWEE_STYLE_LINK,
            variable: TWEE_STYLE_VARIABLE,
        }
    }
}

// Default `StyleId` constants. These are only identifiers; the UI/theme layer maps them to
// actual colors.

/// Unmatched text.
pub const TWEE_STYLE_DEFAULT: StyleId = 0x0300_0000;
/// Quoted strings.
pub const TWEE_STYLE_STRING: StyleId = 0x0300_0001;
/// Template literals.
pub const TWEE_STYLE_TEMPLATE: StyleId = 0x0300_0002;
/// Processing instructions.
pub const TWEE_STYLE_PROC_INSTR: StyleId = 0x0300_0003;
/// Markup comments.
pub const TWEE_STYLE_XML_COMMENT: StyleId = 0x0300_0010;
/// Script comments.
pub const TWEE_STYLE_JS_COMMENT: StyleId = 0x0300_0011;
/// Markup tags.
pub const TWEE_STYLE_XML_TAG: StyleId = 0x0300_0012;
/// Passage headers.
pub const TWEE_STYLE_PASSAGE: StyleId = 0x0300_0020;
/// Passage tag lists.
pub const TWEE_STYLE_PASSAGE_TAG: StyleId = 0x0300_0021;
/// Macro calls.
pub const TWEE_STYLE_MACRO: StyleId = 0x0300_0030;
/// Macro header lines.
pub const TWEE_STYLE_MACRO_HEADER: StyleId = 0x0300_0031;
/// Verbatim code blocks.
pub const TWEE_STYLE_MACRO_CODE: StyleId = 0x0300_0032;
/// Links.
pub const TWEE_STYLE_LINK: StyleId = 0x0300_0033;
/// Story and temporary variables.
pub const TWEE_STYLE_VARIABLE: StyleId = 0x0300_0034;

/// SugarCube story (`$name`) and temporary (`_name`) variables.
const VARIABLE_PATTERN: &str = r"(?:^|[^\w$])([$_][A-Za-z_][\w$]*)";

/// Styles a Twee document partition by partition.
pub struct TweeHighlighter {
    styles: TweeStyles,
    macro_scanner: RuleScanner<StyleId>,
    passage_scanner: RuleScanner<StyleId>,
    tag_scanner: RuleScanner<StyleId>,
    text_scanner: RuleScanner<StyleId>,
    variables: RegexRule,
}

impl TweeHighlighter {
    /// Build the token scanners for `styles`.
    pub fn new(styles: TweeStyles) -> Result<Self, regex::Error> {
        let strings = |scanner: RuleScanner<StyleId>| {
            scanner
                .with_rule(PatternRule::single_line("\"", "\"", styles.string).with_escape('\\'))
                .with_rule(PatternRule::single_line("'", "'", styles.string).with_escape('\\'))
        };
        Ok(Self {
            macro_scanner: strings(RuleScanner::new(styles.macro_call))
                .with_rule(PatternRule::multi_line("`", "`", styles.template))
                .with_rule(WhitespaceRule::new(styles.macro_call)),
            passage_scanner: strings(RuleScanner::new(styles.passage))
                .with_rule(WhitespaceRule::new(styles.passage))
                .with_rule(PatternRule::single_line("[", "]", styles.passage_tag)),
            tag_scanner: strings(RuleScanner::new(styles.xml_tag))
                .with_rule(WhitespaceRule::new(styles.xml_tag)),
            text_scanner: RuleScanner::new(styles.default)
                .with_rule(PatternRule::single_line("<?", "?>", styles.processing_instruction))
                .with_rule(WhitespaceRule::new(styles.default)),
            variables: RegexRule::new(VARIABLE_PATTERN, styles.variable)?.with_capture_group(1),
            styles,
        })
    }

    /// The style ids in use.
    pub fn styles(&self) -> &TweeStyles {
        &self.styles
    }

    /// Style intervals for the whole document, in order, covering every char.
    pub fn highlight<D>(&self, doc: &D) -> Vec<Interval>
    where
        D: TextDocument + Partitioning,
    {
        self.highlight_region(doc, Region::new(0, doc.len()))
    }

    /// Style intervals for the partitions intersecting `region`, clipped to it.
    pub fn highlight_region<D>(&self, doc: &D, region: Region) -> Vec<Interval>
    where
        D: TextDocument + Partitioning,
    {
        let mut intervals = Vec::new();
        for span in doc.compute_partitioning(region.offset, region.length) {
            if span.length > 0 {
                self.highlight_span(doc, &span, &mut intervals);
            }
        }
        intervals
    }

    /// The region to restyle after `change`, and its new intervals.
    pub fn repair<D>(&self, doc: &D, change: &DocumentChange) -> (Region, Vec<Interval>)
    where
        D: TextDocument + Partitioning,
    {
        let damage = damage_region(doc, change);
        (damage, self.highlight_region(doc, damage))
    }

    fn highlight_span<D>(&self, doc: &D, span: &TypedRegion, out: &mut Vec<Interval>)
    where
        D: TextDocument + Partitioning,
    {
        let whole = match span.content_type {
            ContentType::XmlComment => Some(self.styles.xml_comment),
            ContentType::JsComment => Some(self.styles.js_comment),
            ContentType::MacroHeader => Some(self.styles.macro_header),
            ContentType::MacroCode => Some(self.styles.macro_code),
            ContentType::Link => Some(self.styles.link),
            _ => None,
        };
        if let Some(style_id) = whole {
            out.push(Interval::new(span.offset, span.end(), style_id));
            return;
        }

        let scanner = match span.content_type {
            ContentType::MacroCall => &self.macro_scanner,
            ContentType::Passage => &self.passage_scanner,
            ContentType::XmlTag => &self.tag_scanner,
            _ => &self.text_scanner,
        };
        for token in scanner.tokenize(doc, span.offset, span.length) {
            let start = token.region.offset;
            let end = token.region.end();
            let plain = token.token == scanner.default_token();
            if span.content_type == ContentType::MacroCall && plain {
                self.split_variables(doc, start, end, token.token, out);
            } else {
                out.push(Interval::new(start, end, token.token));
            }
        }
    }

    fn split_variables(
        &self,
        doc: &dyn TextDocument,
        start: usize,
        end: usize,
        style_id: StyleId,
        out: &mut Vec<Interval>,
    ) {
        let text = match doc.text(start, end - start) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(%err, "macro text unreadable");
                out.push(Interval::new(start, end, style_id));
                return;
            }
        };
        let mut pos = start;
        for (from, to) in self.variables.ranges(&text) {
            if start + from > pos {
                out.push(Interval::new(pos, start + from, style_id));
            }
            out.push(Interval::new(start + from, start + to, self.variables.style_id()));
            pos = start + to;
        }
        if pos < end {
            out.push(Interval::new(pos, end, style_id));
        }
    }
}

/// Region whose styling may have changed after `change`.
///
/// The union of the region whose partitioning changed and the partitions touching the
/// inserted text (including the one just before it). Falls back to the whole document if the
/// partitioning cannot be queried.
pub fn damage_region<D>(doc: &D, change: &DocumentChange) -> Region
where
    D: TextDocument + Partitioning,
{
    let edit = &change.edit;
    let first = edit.offset.saturating_sub(1);
    let last = edit.new_end().saturating_sub(1).max(edit.offset);
    match (doc.partition_at(first), doc.partition_at(last)) {
        (Ok(first), Ok(last)) => first
            .region()
            .union(&last.region())
            .union(&change.partitioning_changed),
        (Err(err), _) | (_, Err(err)) => {
            tracing::debug!(%err, "damage falls back to the whole document");
            Region::new(0, doc.len())
        }
    }
}
