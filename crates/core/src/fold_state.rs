//! Infers which ranges a view has collapsed from the visible line intervals
//! the host reports.
//!
//! A gap between two visible intervals means the lines in between are
//! hidden; the last visible line before the gap is the first line of the
//! collapsed range (a "boundary"). The host only reports what is on screen,
//! so boundaries outside the visible span are kept as they are.

use crate::models::{FoldingRange, LineInterval};
use std::collections::BTreeSet;
use tracing::trace;

/// Collapsed-range boundaries of one view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldState {
    folded: BTreeSet<usize>,
    last_visible: Option<usize>,
}

impl FoldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a new visible-interval report.
    pub fn update(&mut self, visible: &[LineInterval]) {
        let (Some(first), Some(last)) = (visible.first(), visible.last()) else {
            return;
        };

        let current: BTreeSet<usize> = visible[..visible.len() - 1]
            .iter()
            .map(|interval| interval.end)
            .collect();

        let span = first.start..last.end;
        self.folded
            .retain(|line| !span.contains(line) || current.contains(line));
        self.folded.extend(current);
        self.last_visible = Some(last.end);

        trace!(folded = ?self.folded, last_visible = last.end, "fold state updated");
    }

    /// Whether `range` is collapsed in this view.
    ///
    /// A range reaching the last `tolerance` lines of the document counts as
    /// folded when nothing after its start line is visible: hosts do not
    /// report the empty interval that would follow such a fold.
    pub fn is_folded(&mut self, range: &FoldingRange, line_count: usize, tolerance: usize) -> bool {
        if self.folded.contains(&range.start_line) {
            return true;
        }

        let last_line = line_count.saturating_sub(1);
        let reaches_end = range.end_line + tolerance >= last_line;
        let nothing_after = self
            .last_visible
            .is_some_and(|visible| visible <= range.start_line);

        if reaches_end && nothing_after {
            self.folded.insert(range.start_line);
            return true;
        }
        self.folded.remove(&range.start_line);
        false
    }

    pub fn boundaries(&self) -> &BTreeSet<usize> {
        &self.folded
    }

    pub fn last_visible(&self) -> Option<usize> {
        self.last_visible
    }

    pub fn clear(&mut self) {
        self.folded.clear();
        self.last_visible = None;
    }
}

/// The visible intervals a host would report with `folded` ranges collapsed.
///
/// Nested ranges inside an already collapsed one are ignored. A fold that
/// runs to the end of the document leaves no trailing interval.
pub fn visible_intervals(folded: &[FoldingRange], line_count: usize) -> Vec<LineInterval> {
    if line_count == 0 {
        return Vec::new();
    }

    let mut ordered: Vec<&FoldingRange> = folded
        .iter()
        .filter(|range| range.start_line < range.end_line && range.start_line < line_count)
        .collect();
    ordered.sort_by_key(|range| (range.start_line, std::cmp::Reverse(range.end_line)));

    let mut intervals = Vec::new();
    let mut start = 0;
    for range in ordered {
        if range.start_line < start {
            continue;
        }
        intervals.push(LineInterval::new(start, range.start_line));
        start = range.end_line + 1;
    }
    if start < line_count {
        intervals.push(LineInterval::new(start, line_count - 1));
    }
    intervals
}
