//! Decoration plans for the rendering collaborator and the timer gate that
//! throttles them.

use crate::document::Document;
use crate::fold_state::FoldState;
use crate::models::{FoldingRange, Position};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Leading-edge gate: a trigger runs only when no window is pending.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending_until: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending_until: None,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Returns `true` if the trigger at `now` should run; it then opens a new window.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.pending_until.is_some_and(|until| now < until) {
            return false;
        }
        self.pending_until = Some(now + self.window);
        true
    }
}

/// The span on the start line a collapsed text is drawn over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InlineRange {
    pub start: Position,
    pub end: Position,
}

/// What the renderer should draw for one view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecorationPlan {
    /// Collapsed text to the places it is drawn
    pub folded: BTreeMap<String, Vec<InlineRange>>,
    pub unfolded: Vec<FoldingRange>,
}

impl DecorationPlan {
    /// Split `ranges` by the fold state of a view.
    pub fn build(
        document: &Document,
        ranges: &[FoldingRange],
        state: &mut FoldState,
        tolerance: usize,
    ) -> Self {
        let line_count = document.line_count();
        let mut plan = Self::default();

        for range in ranges {
            if state.is_folded(range, line_count, tolerance) {
                let line_len = document.line_len(range.start_line);
                let start = range.start_column.unwrap_or(line_len).min(line_len);
                plan.folded
                    .entry(range.collapsed_text.clone())
                    .or_default()
                    .push(InlineRange {
                        start: Position::new(range.start_line, start),
                        end: Position::new(range.start_line, line_len),
                    });
            } else {
                plan.unfolded.push(range.clone());
            }
        }
        plan
    }

    pub fn folded_count(&self) -> usize {
        self.folded.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, LineInterval};

    #[test]
    fn test_debouncer_drops_triggers_inside_window() {
        let mut gate = Debouncer::from_millis(100);
        let t0 = Instant::now();
        assert!(gate.try_fire(t0));
        assert!(!gate.try_fire(t0 + Duration::from_millis(50)));
        assert!(!gate.try_fire(t0 + Duration::from_millis(99)));
        assert!(gate.try_fire(t0 + Duration::from_millis(100)));
        assert!(!gate.try_fire(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_plan_groups_by_text() {
        let document = Document::new("a", Language::PlainText, "a {\nb\n}\nc {\nd\n}\ne");
        let ranges = vec![
            FoldingRange::new(0, 2, "{…}").with_start_column(2),
            FoldingRange::new(3, 5, "{…}"),
        ];
        let mut state = FoldState::new();
        state.update(&[LineInterval::new(0, 0), LineInterval::new(3, 3), LineInterval::new(6, 6)]);

        let plan = DecorationPlan::build(&document, &ranges, &mut state, 1);
        assert_eq!(plan.folded_count(), 2);
        assert!(plan.unfolded.is_empty());
        let spans = &plan.folded["{…}"];
        assert_eq!(spans[0].start, Position::new(0, 2));
        assert_eq!(spans[0].end, Position::new(0, 3));
        assert_eq!(spans[1].start, Position::new(3, 3));
    }

    #[test]
    fn test_plan_unfolded() {
        let document = Document::new("a", Language::PlainText, "a {\nb\n}\nc");
        let ranges = vec![FoldingRange::new(0, 2, "{…}")];
        let mut state = FoldState::new();
        state.update(&[LineInterval::new(0, 3)]);
        let plan = DecorationPlan::build(&document, &ranges, &mut state, 1);
        assert_eq!(plan.unfolded, ranges);
        assert!(plan.folded.is_empty());
    }
}
