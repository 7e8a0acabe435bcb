//! Decides, per edit event, how much of the line cache must be rebuilt.

use super::line_cache::{CacheError, LineCache};
use super::lexer::ScanInput;
use crate::document::AppliedEdit;
use tracing::debug;

/// What the controller did with an edit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RescanOutcome {
    /// Nothing to do
    NoEdits,
    /// Structure unchanged; trailing columns of `line` shifted
    Offset { line: usize, delta: isize },
    /// `line` rescanned; later lines dropped when its shape changed
    LineReplaced { line: usize },
    /// The edited line was not cached yet; it will be scanned on demand
    Deferred { line: usize },
    /// Lines from `from` dropped and the document rescanned to its end
    Rescanned { from: usize },
}

/// Bring `cache` up to date with edits already applied to the document `input` reads from.
pub fn apply_edits(
    cache: &mut LineCache,
    input: &ScanInput<'_>,
    edits: &[AppliedEdit],
) -> Result<RescanOutcome, CacheError> {
    let [edit] = edits else {
        return match edits.iter().map(|edit| edit.start.line).min() {
            Some(from) => rescan_from(cache, input, from),
            None => Ok(RescanOutcome::NoEdits),
        };
    };

    if !edit.is_single_line() || edit.inserted_chars > 1 {
        return rescan_from(cache, input, edit.start.line);
    }

    let line = edit.start.line;
    if line >= cache.len() {
        debug!(line, "edit past cached lines, deferring");
        return Ok(RescanOutcome::Deferred { line });
    }

    let rescanned = cache.rescan(input, line);
    let unchanged = cache.record(line).is_some_and(|current| {
        current.carried_out == rescanned.carried_out && current.fingerprint == rescanned.fingerprint
    });

    if !unchanged {
        cache.replace(rescanned);
        cache.invalidate_from(line + 1);
        debug!(line, "bracket shape changed, dropping later lines");
        return Ok(RescanOutcome::LineReplaced { line });
    }

    // a bracket typed over a selection has no old column to shift
    if edit.deleted_chars > 0 && edit.inserted_chars > 0 {
        cache.replace(rescanned);
        debug!(line, "text replaced, bracket shape unchanged, keeping later lines");
        return Ok(RescanOutcome::LineReplaced { line });
    }

    let delta = edit.column_delta();
    if let Some(record) = cache.record_mut(line) {
        record.offset(edit.start.character, delta);
        record.adopt_annotations(&rescanned);
    }
    debug!(line, delta, "bracket shape unchanged, offset only");
    Ok(RescanOutcome::Offset { line, delta })
}

fn rescan_from(
    cache: &mut LineCache,
    input: &ScanInput<'_>,
    from: usize,
) -> Result<RescanOutcome, CacheError> {
    if from == 0 {
        cache.clear();
    } else {
        cache.invalidate_from(from);
    }
    cache.extend_to_end(input)?;
    debug!(from, lines = cache.len(), "full forward rescan");
    Ok(RescanOutcome::Rescanned { from })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, TextEdit};
    use crate::engine::language::LanguageConfig;
    use crate::models::{Language, Position};
    use crate::parsers::NullClassifier;
    use std::sync::Arc;

    fn setup(text: &str) -> (Document, LineCache) {
        let document = Document::new("t.json", Language::Json, text);
        let mut cache = LineCache::new(Arc::new(
            LanguageConfig::for_language(Language::Json).unwrap(),
        ));
        cache
            .extend_to_end(&ScanInput::new(&document, &NullClassifier))
            .unwrap();
        (document, cache)
    }

    fn edit(
        document: &mut Document,
        cache: &mut LineCache,
        edits: &[TextEdit],
    ) -> RescanOutcome {
        let applied = document.apply_edits(edits).unwrap();
        apply_edits(cache, &ScanInput::new(document, &NullClassifier), &applied).unwrap()
    }

    #[test]
    fn test_character_in_string_offsets_only() {
        let (mut document, mut cache) = setup("{\"a\": [1, \"x\", 2],\n\"b\": {}\n}");
        let before = cache.stats().lines_scanned;

        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(0, 12), "y")],
        );
        assert_eq!(outcome, RescanOutcome::Offset { line: 0, delta: 1 });

        let columns: Vec<usize> = cache.record(0).unwrap().brackets().map(|b| b.column).collect();
        assert_eq!(columns, vec![0, 6, 17]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().lines_scanned, before);
    }

    #[test]
    fn test_replacing_over_a_bracket_keeps_new_columns() {
        let (mut document, mut cache) = setup("[\n  1\n  x]\n[\n]");
        let lines = cache.len();
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::new(Position::new(2, 2), Position::new(2, 4), "]")],
        );
        assert_eq!(outcome, RescanOutcome::LineReplaced { line: 2 });
        assert_eq!(cache.len(), lines);

        let columns: Vec<usize> = cache.record(2).unwrap().brackets().map(|b| b.column).collect();
        assert_eq!(columns, vec![2]);
        assert_eq!(cache.matched_pairs()[0].close.column, 2);
    }

    #[test]
    fn test_deleting_before_a_bracket_offsets() {
        let (mut document, mut cache) = setup("[\n  1\n  xy]\n");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::delete(Position::new(2, 2), Position::new(2, 4))],
        );
        assert_eq!(outcome, RescanOutcome::Offset { line: 2, delta: -2 });
        assert_eq!(cache.matched_pairs()[0].close.column, 2);
    }

    #[test]
    fn test_typed_bracket_replaces_and_truncates() {
        let (mut document, mut cache) = setup("{\n\"a\": 1\n}\n[]");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(1, 6), "[")],
        );
        assert_eq!(outcome, RescanOutcome::LineReplaced { line: 1 });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_comment_opener_changes_carried_state() {
        let (mut document, mut cache) = setup("[1,\n2]");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(0, 1), "\"")],
        );
        assert_eq!(outcome, RescanOutcome::Offset { line: 0, delta: 1 });

        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(0, 0), "/")],
        );
        assert_eq!(outcome, RescanOutcome::Offset { line: 0, delta: 1 });

        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(0, 1), "*")],
        );
        assert_eq!(outcome, RescanOutcome::LineReplaced { line: 0 });
    }

    #[test]
    fn test_multi_line_paste_rescans_from_min_line() {
        let (mut document, mut cache) = setup("{\n1\n}\n[\n2\n]");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(4, 0), "3,\n")],
        );
        assert_eq!(outcome, RescanOutcome::Rescanned { from: 4 });
        assert_eq!(cache.len(), document.line_count());
        assert_eq!(cache.matched_pairs().len(), 2);
    }

    #[test]
    fn test_edit_on_first_line_clears() {
        let (mut document, mut cache) = setup("{\n}");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(0, 0), "[]")],
        );
        assert_eq!(outcome, RescanOutcome::Rescanned { from: 0 });
        assert_eq!(cache.stats().clears, 1);
        assert_eq!(cache.all_brackets().len(), 4);
    }

    #[test]
    fn test_several_changes_take_minimum_line() {
        let (mut document, mut cache) = setup("[\n1\n2\n]");
        let outcome = edit(
            &mut document,
            &mut cache,
            &[
                TextEdit::insert(Position::new(2, 0), "x"),
                TextEdit::insert(Position::new(1, 0), "y"),
            ],
        );
        assert_eq!(outcome, RescanOutcome::Rescanned { from: 1 });
    }

    #[test]
    fn test_uncached_line_is_deferred() {
        let mut document = Document::new("t.json", Language::Json, "[\n]");
        let mut cache = LineCache::new(Arc::new(
            LanguageConfig::for_language(Language::Json).unwrap(),
        ));
        let outcome = edit(
            &mut document,
            &mut cache,
            &[TextEdit::insert(Position::new(1, 0), " ")],
        );
        assert_eq!(outcome, RescanOutcome::Deferred { line: 1 });
        assert!(cache.is_empty());
    }
}
