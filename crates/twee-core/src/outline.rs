//! Outline analyzer: turns passage-header partitions into [`PassageElement`]s.

use crate::error::ReconcileError;
use crate::passages::{PassageElement, PassageIndex, PassageKind};
use crate::reconciler::{ReconcileContext, ReconcilingStrategy, StrategyCapabilities};
use crate::region::{ContentType, DirtyRegion, Region};

/// Passage names with a reserved meaning.
pub const SPECIAL_PASSAGE_NAMES: [&str; 2] = ["StoryTitle", "StoryData"];

/// Classify the text of a passage-header partition.
///
/// Returns `None` unless `header` starts with `::`. The name runs up to the first `[` or `{`
/// and is trimmed; a `script` or `stylesheet` tag in the bracketed tag list overrides the
/// classification by name.
pub fn classify_passage(header: &str) -> Option<(PassageKind, String)> {
    if !header.starts_with("::") {
        return None;
    }
    let chars: Vec<char> = header.chars().collect();

    let mut end = chars.len();
    if let Some(t) = chars.iter().position(|&c| c == '[') {
        end = t;
    }
    if let Some(p) = chars.iter().position(|&c| c == '{')
        && p < end
    {
        end = p;
    }
    let name: String = chars[2..end].iter().collect();
    let name = name.trim().to_string();

    let mut kind = if SPECIAL_PASSAGE_NAMES.contains(&name.as_str()) {
        PassageKind::Special
    } else {
        PassageKind::Normal
    };

    if chars.get(end) == Some(&'[') {
        let mut e = end;
        loop {
            let mut t = e + 1;
            while t < chars.len() && chars[t] == ' ' {
                t += 1;
            }
            e = t;
            while e < chars.len() {
                match chars[e] {
                    ' ' | ']' => break,
                    '\\' => e += 1,
                    _ => {}
                }
                e += 1;
            }
            if e >= chars.len() {
                break;
            }
            let tag: String = chars[t..e].iter().collect();
            match tag.as_str() {
                "script" => kind = PassageKind::Script,
                "stylesheet" => kind = PassageKind::Style,
                _ => {}
            }
            if chars[e] == ']' {
                break;
            }
        }
    }
    Some((kind, name))
}

/// Builds the passage outline, one batch per pass, and hands each batch to a [`PassageIndex`].
pub struct OutlineStrategy {
    index: PassageIndex,
    pending: Vec<PassageElement>,
}

impl OutlineStrategy {
    /// Create a strategy feeding `index`.
    pub fn new(index: PassageIndex) -> Self {
        Self {
            index,
            pending: Vec::new(),
        }
    }

    /// The index this strategy feeds.
    pub fn index(&self) -> &PassageIndex {
        &self.index
    }

    fn collect(
        &mut self,
        ctx: &ReconcileContext<'_>,
        partition: Region,
    ) -> Result<(), ReconcileError> {
        let text = ctx.document.text(partition.offset, partition.length)?;
        if let Some((kind, name)) = classify_passage(&text) {
            self.pending.push(PassageElement::new(kind, name, partition));
        }
        Ok(())
    }

    /// A header inserted right after the dirty region owns the newline ending that region, so
    /// the following passage partition belongs to this pass as well.
    fn extend_forward(&mut self, ctx: &ReconcileContext<'_>, dirty: &DirtyRegion) {
        if dirty.length == 0 {
            return;
        }
        let last = dirty.offset + dirty.length - 1;
        if last + 2 >= ctx.document.len() {
            return;
        }
        match ctx.document.text(last, 3) {
            Ok(text) if text == "\n::" => {}
            _ => return,
        }
        match ctx.partitioning.partition_at(last + 1) {
            Ok(span) if span.content_type == ContentType::Passage => {
                if let Err(err) = self.collect(ctx, span.region()) {
                    tracing::debug!(%err, "skipping passage after dirty region");
                }
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(%err, "skipping passage after dirty region"),
        }
    }
}

/// The dirty region widened to the partitions at both of its ends.
///
/// A header that stopped being one (or was pushed just past the edit) lies inside one of those
/// partitions, so its stale element is replaced with the rest of the batch.
fn replaced_region(ctx: &ReconcileContext<'_>, dirty: &DirtyRegion) -> Region {
    let len = ctx.document.len();
    let start = dirty.offset.min(len);
    let end = dirty.end().min(len);
    let mut region = Region::new(start, end - start);
    for offset in [start, end.saturating_sub(1).max(start)] {
        match ctx.partitioning.partition_at(offset) {
            Ok(span) => region = region.union(&span.region()),
            Err(err) => tracing::debug!(%err, "cannot widen outline region"),
        }
    }
    region
}

impl ReconcilingStrategy for OutlineStrategy {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities {
            pass_hooks: true,
            typed_initial: true,
            whole_initial: true,
        }
    }

    fn reconcile(
        &mut self,
        ctx: &ReconcileContext<'_>,
        region: Region,
    ) -> Result<(), ReconcileError> {
        self.collect(ctx, region)
    }

    fn reconcile_dirty(
        &mut self,
        ctx: &ReconcileContext<'_>,
        _dirty: &DirtyRegion,
        sub_region: Region,
    ) -> Result<(), ReconcileError> {
        let partition = match ctx.partitioning.partition_at(sub_region.offset) {
            Ok(span) => span.region(),
            Err(_) => sub_region,
        };
        self.collect(ctx, partition)
    }

    fn before_reconcile(&mut self, _ctx: &ReconcileContext<'_>, _dirty: Option<&DirtyRegion>) {
        self.pending.clear();
    }

    fn after_reconcile(&mut self, ctx: &ReconcileContext<'_>, dirty: Option<&DirtyRegion>) {
        if let Some(dirty) = dirty {
            self.extend_forward(ctx, dirty);
        }
        let batch = std::mem::take(&mut self.pending);
        let region = dirty.map(|dirty| replaced_region(ctx, dirty));
        self.index.replace(region, batch);
    }

    fn initial_reconcile_for_type(
        &mut self,
        ctx: &ReconcileContext<'_>,
        content_type: ContentType,
    ) -> Result<(), ReconcileError> {
        self.before_reconcile(ctx, None);
        for span in ctx.partitioning.compute_partitioning(0, ctx.document.len()) {
            if ctx.monitor.is_canceled() {
                tracing::debug!("outline build cancelled");
                self.pending.clear();
                return Ok(());
            }
            if span.content_type == content_type
                && let Err(err) = self.collect(ctx, span.region())
            {
                tracing::debug!(%err, "skipping unreadable passage");
            }
        }
        self.after_reconcile(ctx, None);
        Ok(())
    }

    fn initial_reconcile(&mut self, ctx: &ReconcileContext<'_>) -> Result<(), ReconcileError> {
        self.initial_reconcile_for_type(ctx, ContentType::Passage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_names() {
        assert_eq!(
            classify_passage(":: Start\n"),
            Some((PassageKind::Normal, "Start".to_string()))
        );
        assert_eq!(
            classify_passage("::StoryTitle\n"),
            Some((PassageKind::Special, "StoryTitle".to_string()))
        );
        assert_eq!(
            classify_passage(":: Intro {\"position\":\"100,100\"}\n"),
            Some((PassageKind::Normal, "Intro".to_string()))
        );
        assert_eq!(classify_passage("not a header"), None);
    }

    #[test]
    fn test_classify_tags() {
        assert_eq!(
            classify_passage(":: Code [widget script]\n"),
            Some((PassageKind::Script, "Code".to_string()))
        );
        assert_eq!(
            classify_passage(":: Look [ stylesheet ]\n"),
            Some((PassageKind::Style, "Look".to_string()))
        );
        assert_eq!(
            classify_passage(":: StoryData [script]\n"),
            Some((PassageKind::Script, "StoryData".to_string()))
        );
        assert_eq!(
            classify_passage(":: Esc [scr\\ipt]\n"),
            Some((PassageKind::Normal, "Esc".to_string()))
        );
        // A tag list running to the end of the text is not examined.
        assert_eq!(
            classify_passage(":: Open [script"),
            Some((PassageKind::Normal, "Open".to_string()))
        );
    }
}
