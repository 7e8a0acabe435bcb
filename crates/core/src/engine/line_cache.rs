//! Ordered per-line scan records, extended lazily and truncated on invalidation.

use super::language::LanguageConfig;
use super::lexer::{scan_line, LexState, ScanInput};
use super::stack::{BracketStack, Fingerprint};
use crate::models::{BracketToken, MatchedBracketPair, PreviewToken};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("cannot look more than one line ahead: line {requested} requested with {cached} lines cached")]
    LookAhead { requested: usize, cached: usize },
    #[error("line {requested} is past the end of a {line_count}-line document")]
    PastEnd { requested: usize, line_count: usize },
}

/// Everything known about one scanned line.
#[derive(Debug, Clone)]
pub struct LineRecord {
    pub index: usize,
    /// Continuation the previous line ended with
    pub carried_in: LexState,
    pub carried_out: LexState,
    /// Open stacks after this line, plus this line's own brackets
    pub engine: BracketStack,
    pub preview_tokens: Vec<PreviewToken>,
    pub fingerprint: Fingerprint,
}

impl LineRecord {
    pub fn brackets(&self) -> impl Iterator<Item = &BracketToken> + '_ {
        self.engine.events().iter().map(|event| &event.token)
    }

    /// Shift brackets and tokens at or after `from_column` by `delta` characters.
    pub fn offset(&mut self, from_column: usize, delta: isize) {
        self.engine.offset(from_column, delta);
        for token in &mut self.preview_tokens {
            if token.column >= from_column {
                token.column = token.column.saturating_add_signed(delta);
            }
        }
    }

    /// Take the non-structural annotations of a rescan with the same fingerprint.
    pub fn adopt_annotations(&mut self, rescanned: &LineRecord) {
        for (event, fresh) in self
            .engine
            .events_mut()
            .iter_mut()
            .zip(rescanned.engine.events())
        {
            event.token.object_literal = fresh.token.object_literal;
        }
        self.preview_tokens = rescanned.preview_tokens.clone();
    }
}

/// Counters describing how much scanning the cache has done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub lines_scanned: usize,
    pub invalidations: usize,
    pub clears: usize,
}

#[derive(Debug, Clone)]
pub struct LineCache {
    language: Arc<LanguageConfig>,
    records: Vec<LineRecord>,
    stats: CacheStats,
}

impl LineCache {
    pub fn new(language: Arc<LanguageConfig>) -> Self {
        Self {
            language,
            records: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&LineRecord> {
        self.records.get(index)
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> Option<&mut LineRecord> {
        self.records.get_mut(index)
    }

    /// Continuation and bracket stacks a line starts from.
    pub fn state_before(&self, index: usize) -> (LexState, BracketStack) {
        match index.checked_sub(1).and_then(|prev| self.records.get(prev)) {
            Some(prev) => (prev.carried_out.clone(), prev.engine.snapshot(index)),
            None => (LexState::default(), BracketStack::new(index)),
        }
    }

    /// Scan a line from the cached state before it without storing the result.
    pub fn rescan(&self, input: &ScanInput<'_>, index: usize) -> LineRecord {
        let (state, engine) = self.state_before(index);
        scan_line(
            &self.language,
            index,
            &input.text(index),
            &input.scopes(index),
            &state,
            engine,
        )
    }

    /// The record for `index`, scanning it first when it is the next uncached line.
    pub fn get(&mut self, input: &ScanInput<'_>, index: usize) -> Result<&LineRecord, CacheError> {
        let cached = self.records.len();
        if index > cached {
            return Err(CacheError::LookAhead {
                requested: index,
                cached,
            });
        }
        if index == cached {
            let line_count = input.line_count();
            if index >= line_count {
                return Err(CacheError::PastEnd {
                    requested: index,
                    line_count,
                });
            }
            let record = self.rescan(input, index);
            trace!(line = index, brackets = record.engine.events().len(), "scanned line");
            self.stats.lines_scanned += 1;
            self.records.push(record);
        }
        Ok(&self.records[index])
    }

    /// Scan forward until every line of the document is cached.
    pub fn extend_to_end(&mut self, input: &ScanInput<'_>) -> Result<(), CacheError> {
        for index in self.records.len()..input.line_count() {
            self.get(input, index)?;
        }
        Ok(())
    }

    /// Drop the record at `index` and everything after it.
    pub fn invalidate_from(&mut self, index: usize) {
        if index < self.records.len() {
            self.records.truncate(index);
            self.stats.invalidations += 1;
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.stats.clears += 1;
    }

    pub(crate) fn replace(&mut self, record: LineRecord) {
        let index = record.index;
        if let Some(slot) = self.records.get_mut(index) {
            *slot = record;
        }
    }

    pub fn all_brackets(&self) -> Vec<BracketToken> {
        self.records
            .iter()
            .flat_map(|record| record.brackets().copied())
            .collect()
    }

    pub fn all_tokens(&self) -> Vec<PreviewToken> {
        self.records
            .iter()
            .flat_map(|record| record.preview_tokens.iter().cloned())
            .collect()
    }

    /// Every matched pair, in the order their closes appear.
    pub fn matched_pairs(&self) -> Vec<MatchedBracketPair> {
        let mut pairs = Vec::new();
        for record in &self.records {
            for event in record.engine.events() {
                let Some(at) = event.partner else { continue };
                let open = self
                    .records
                    .get(at.line)
                    .and_then(|line| line.engine.events().get(at.slot));
                if let Some(open) = open {
                    pairs.push(MatchedBracketPair {
                        open: open.token,
                        close: event.token,
                    });
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::models::Language;
    use crate::parsers::NullClassifier;

    fn cache() -> LineCache {
        LineCache::new(Arc::new(
            LanguageConfig::for_language(Language::PlainText).unwrap(),
        ))
    }

    #[test]
    fn test_get_extends_one_line_at_a_time() {
        let document = Document::new("t", Language::PlainText, "(\n[\n]\n)");
        let input = ScanInput::new(&document, &NullClassifier);
        let mut cache = cache();

        assert!(cache.get(&input, 0).is_ok());
        assert_eq!(
            cache.get(&input, 2).unwrap_err(),
            CacheError::LookAhead {
                requested: 2,
                cached: 1
            }
        );
        assert!(cache.get(&input, 1).is_ok());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_past_document_end() {
        let document = Document::new("t", Language::PlainText, "x");
        let input = ScanInput::new(&document, &NullClassifier);
        let mut cache = cache();
        cache.extend_to_end(&input).unwrap();
        assert!(matches!(
            cache.get(&input, 1),
            Err(CacheError::PastEnd { requested: 1, .. })
        ));
    }

    #[test]
    fn test_matched_pairs_across_lines() {
        let document = Document::new("t", Language::PlainText, "(\n[\n]\n)\n]");
        let input = ScanInput::new(&document, &NullClassifier);
        let mut cache = cache();
        cache.extend_to_end(&input).unwrap();

        let pairs = cache.matched_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].open.line, pairs[0].close.line), (1, 2));
        assert_eq!((pairs[1].open.line, pairs[1].close.line), (0, 3));
        assert_eq!(cache.all_brackets().len(), 5);
    }

    #[test]
    fn test_invalidate_then_rescan_matches_fresh() {
        let document = Document::new("t", Language::PlainText, "{\n(\n)\n}");
        let input = ScanInput::new(&document, &NullClassifier);
        let mut cache = cache();
        cache.extend_to_end(&input).unwrap();
        let before = cache.matched_pairs();

        cache.invalidate_from(2);
        assert_eq!(cache.len(), 2);
        cache.extend_to_end(&input).unwrap();
        assert_eq!(cache.matched_pairs(), before);
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.stats().lines_scanned, 6);
    }

    #[test]
    fn test_offset_is_seen_through_partner_refs() {
        let document = Document::new("t", Language::PlainText, "a {\n}");
        let input = ScanInput::new(&document, &NullClassifier);
        let mut cache = cache();
        cache.extend_to_end(&input).unwrap();

        if let Some(record) = cache.record_mut(0) {
            record.offset(0, 3);
        }
        let pairs = cache.matched_pairs();
        assert_eq!(pairs[0].open.column, 5);
    }
}
