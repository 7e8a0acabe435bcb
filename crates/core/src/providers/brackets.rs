use crate::config::FoldingConfig;
use crate::document::{AppliedEdit, Document, DocumentId};
use crate::engine::{apply_edits, synthesize, CacheStats, LanguageConfig, LineCache, RescanOutcome, ScanInput};
use crate::models::{FoldingRange, Language};
use crate::parsers::{create_classifier, LexicalClassifier, NullClassifier};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{FoldingRangeProvider, ProviderError};

/// Scan counters of one document, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentScanStats {
    pub cache: CacheStats,
    pub cached_lines: usize,
    pub last_outcome: Option<RescanOutcome>,
    pub classifier_degraded: bool,
}

struct DocumentState {
    cache: LineCache,
    classifier: Box<dyn LexicalClassifier>,
    /// Classifier failed; scanning runs unclassified until a fresh one syncs
    degraded: bool,
    synced_version: u64,
    last_outcome: Option<RescanOutcome>,
}

impl DocumentState {
    fn open(document: &Document, language: Arc<LanguageConfig>) -> Self {
        let mut state = Self {
            cache: LineCache::new(language),
            classifier: Box::new(NullClassifier),
            degraded: false,
            synced_version: document.version(),
            last_outcome: None,
        };
        match create_classifier(document.language()) {
            Ok(mut classifier) => match classifier.sync(document, &[]) {
                Ok(()) => state.classifier = classifier,
                Err(e) => state.degrade(document, &e),
            },
            Err(e) => state.degrade(document, &e),
        }
        state
    }

    fn degrade(&mut self, document: &Document, error: &dyn std::fmt::Display) {
        warn!(document = %document.id(), error = %error, "classifier failed, scanning unclassified");
        self.classifier = Box::new(NullClassifier);
        self.degraded = true;
        self.cache.clear();
    }

    fn try_recover(&mut self, document: &Document) {
        let Ok(mut classifier) = create_classifier(document.language()) else {
            return;
        };
        if classifier.sync(document, &[]).is_ok() {
            debug!(document = %document.id(), "classifier recovered");
            self.classifier = classifier;
            self.degraded = false;
            self.cache.clear();
        }
    }
}

/// Bracket-pair ranges, kept incrementally per document
#[derive(Default)]
pub struct BracketRangesProvider {
    documents: HashMap<DocumentId, DocumentState>,
    languages: HashMap<Language, Arc<LanguageConfig>>,
}

impl BracketRangesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, id: &DocumentId) -> Option<DocumentScanStats> {
        self.documents.get(id).map(|state| DocumentScanStats {
            cache: state.cache.stats(),
            cached_lines: state.cache.len(),
            last_outcome: state.last_outcome,
            classifier_degraded: state.degraded,
        })
    }

    /// The line cache of an open document, if it has been scanned.
    pub fn line_cache(&self, id: &DocumentId) -> Option<&LineCache> {
        self.documents.get(id).map(|state| &state.cache)
    }

    fn language_config(&mut self, language: Language) -> Result<Arc<LanguageConfig>, ProviderError> {
        if let Some(config) = self.languages.get(&language) {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(LanguageConfig::for_language(language)?);
        self.languages.insert(language, Arc::clone(&config));
        Ok(config)
    }

    fn state_for(&mut self, document: &Document) -> Result<&mut DocumentState, ProviderError> {
        let language = self.language_config(document.language())?;
        let state = self
            .documents
            .entry(document.id().clone())
            .or_insert_with(|| DocumentState::open(document, language));

        if state.degraded {
            state.try_recover(document);
        }

        if state.synced_version != document.version() {
            debug!(document = %document.id(), "document changed unobserved, resyncing");
            if let Err(e) = state.classifier.sync(document, &[]) {
                state.degrade(document, &e);
            }
            state.cache.clear();
            state.synced_version = document.version();
        }
        Ok(state)
    }
}

impl FoldingRangeProvider for BracketRangesProvider {
    fn name(&self) -> &'static str {
        "brackets"
    }

    fn update_ranges(
        &mut self,
        document: &Document,
        config: &FoldingConfig,
        upstream: &[FoldingRange],
    ) -> Result<Vec<FoldingRange>, ProviderError> {
        let state = self.state_for(document)?;
        let input = ScanInput::new(document, state.classifier.as_ref());
        state.cache.extend_to_end(&input)?;

        let pairs = state.cache.matched_pairs();
        let tokens = state.cache.all_tokens();
        Ok(synthesize(document, &pairs, &tokens, upstream, config))
    }

    fn document_changed(&mut self, document: &Document, edits: &[AppliedEdit]) -> Result<(), ProviderError> {
        let Some(state) = self.documents.get_mut(document.id()) else {
            return Ok(());
        };

        if let Err(e) = state.classifier.sync(document, edits) {
            state.degrade(document, &e);
        }
        state.synced_version = document.version();

        let input = ScanInput::new(document, state.classifier.as_ref());
        match apply_edits(&mut state.cache, &input, edits) {
            Ok(outcome) => {
                state.last_outcome = Some(outcome);
                Ok(())
            }
            Err(e) => {
                state.cache.clear();
                state.last_outcome = None;
                Err(e.into())
            }
        }
    }

    fn document_closed(&mut self, id: &DocumentId) {
        self.documents.remove(id);
    }

    fn restart(&mut self) {
        self.documents.clear();
    }
}
