//! Open documents, their memoized folding ranges and the views showing them.

use crate::config::FoldingConfig;
use crate::decorator::{DecorationPlan, Debouncer};
use crate::document::{Document, DocumentError, DocumentId, TextEdit};
use crate::engine::{LineCache, RescanOutcome};
use crate::fold_state::FoldState;
use crate::models::{FoldingRange, Language, LineInterval};
use crate::providers::{
    notify_changed, run_pipeline, BracketRangesProvider, DocumentScanStats, FoldingRangeProvider,
    MarkupRangesProvider, ProviderError, RegionRangesProvider,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Unknown document: {0}")]
    UnknownDocument(DocumentId),
    #[error("Unknown view: {0}")]
    UnknownView(ViewId),
}

/// Identity of an editor view onto a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

struct Memo {
    version: u64,
    ranges: Vec<FoldingRange>,
}

struct OpenDocument {
    document: Document,
    memo: Option<Memo>,
}

struct View {
    document: DocumentId,
    state: FoldState,
    intervals: Vec<LineInterval>,
    debouncer: Debouncer,
}

fn pipeline<'a>(
    regions: &'a mut RegionRangesProvider,
    markup: &'a mut MarkupRangesProvider,
    brackets: &'a mut BracketRangesProvider,
) -> [&'a mut dyn FoldingRangeProvider; 3] {
    [regions, markup, brackets]
}

/// Event-driven front of the library: feed it document and view events, ask it for ranges.
pub struct FoldingEngine {
    config: FoldingConfig,
    documents: HashMap<DocumentId, OpenDocument>,
    views: HashMap<ViewId, View>,
    regions: RegionRangesProvider,
    markup: MarkupRangesProvider,
    brackets: BracketRangesProvider,
}

impl FoldingEngine {
    pub fn new(config: FoldingConfig) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            documents: HashMap::new(),
            views: HashMap::new(),
            regions: RegionRangesProvider::new()?,
            markup: MarkupRangesProvider::new(),
            brackets: BracketRangesProvider::new(),
        })
    }

    pub fn config(&self) -> &FoldingConfig {
        &self.config
    }

    /// Replace the configuration; every provider starts over.
    pub fn set_config(&mut self, config: FoldingConfig) {
        info!("configuration changed, restarting providers");
        for provider in pipeline(&mut self.regions, &mut self.markup, &mut self.brackets) {
            provider.restart();
        }
        for open in self.documents.values_mut() {
            open.memo = None;
        }
        for view in self.views.values_mut() {
            view.debouncer = Debouncer::from_millis(config.debounce_ms);
        }
        self.config = config;
    }

    /// Open (or reopen) a document. Reopening drops everything known about the old text.
    pub fn open_document(&mut self, id: impl Into<DocumentId>, language: Language, text: &str) -> &Document {
        let id = id.into();
        if self.documents.contains_key(&id) {
            for provider in pipeline(&mut self.regions, &mut self.markup, &mut self.brackets) {
                provider.document_closed(&id);
            }
        }
        debug!(document = %id, language = language.as_str(), "document opened");
        let open = OpenDocument {
            document: Document::new(id.clone(), language, text),
            memo: None,
        };
        let open = match self.documents.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(open);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(open),
        };
        &open.document
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id).map(|open| &open.document)
    }

    /// Apply edits in order and let providers follow them.
    pub fn apply_edits(&mut self, id: &DocumentId, edits: &[TextEdit]) -> Result<(), EngineError> {
        let open = self
            .documents
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownDocument(id.clone()))?;
        let applied = open.document.apply_edits(edits)?;
        let mut providers = pipeline(&mut self.regions, &mut self.markup, &mut self.brackets);
        notify_changed(&mut providers, &open.document, &applied);
        Ok(())
    }

    pub fn close_document(&mut self, id: &DocumentId) {
        if self.documents.remove(id).is_none() {
            return;
        }
        for provider in pipeline(&mut self.regions, &mut self.markup, &mut self.brackets) {
            provider.document_closed(id);
        }
        self.views.retain(|_, view| &view.document != id);
        debug!(document = %id, "document closed");
    }

    /// Folding ranges of a document, recomputed only when its text changed.
    pub fn folding_ranges(&mut self, id: &DocumentId) -> Result<&[FoldingRange], EngineError> {
        let open = self
            .documents
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownDocument(id.clone()))?;
        let version = open.document.version();

        if !open.memo.as_ref().is_some_and(|memo| memo.version == version) {
            let ranges = if self.config.is_excluded(open.document.language()) {
                Vec::new()
            } else {
                let mut providers = pipeline(&mut self.regions, &mut self.markup, &mut self.brackets);
                run_pipeline(&mut providers, &open.document, &self.config)
            };
            debug!(document = %id, version, ranges = ranges.len(), "ranges computed");
            open.memo = Some(Memo { version, ranges });
        }

        Ok(open
            .memo
            .as_ref()
            .map(|memo| memo.ranges.as_slice())
            .unwrap_or_default())
    }

    pub fn open_view(&mut self, view: impl Into<ViewId>, document: &DocumentId) -> Result<(), EngineError> {
        if !self.documents.contains_key(document) {
            return Err(EngineError::UnknownDocument(document.clone()));
        }
        self.views.insert(
            view.into(),
            View {
                document: document.clone(),
                state: FoldState::new(),
                intervals: Vec::new(),
                debouncer: Debouncer::from_millis(self.config.debounce_ms),
            },
        );
        Ok(())
    }

    pub fn close_view(&mut self, view: &ViewId) {
        self.views.remove(view);
    }

    /// Record what a view shows now. Fold state updates immediately; a fresh
    /// decoration plan is returned unless one was produced within the debounce window.
    pub fn visible_ranges_changed(
        &mut self,
        view: &ViewId,
        intervals: &[LineInterval],
        now: Instant,
    ) -> Result<Option<DecorationPlan>, EngineError> {
        let entry = self
            .views
            .get_mut(view)
            .ok_or_else(|| EngineError::UnknownView(view.clone()))?;
        entry.state.update(intervals);
        entry.intervals = intervals.to_vec();
        if !entry.debouncer.try_fire(now) {
            return Ok(None);
        }
        self.decorations(view).map(Some)
    }

    /// Whether `range` is collapsed in `view`.
    pub fn is_folded(&mut self, view: &ViewId, range: &FoldingRange) -> Result<bool, EngineError> {
        let entry = self
            .views
            .get_mut(view)
            .ok_or_else(|| EngineError::UnknownView(view.clone()))?;
        let open = self
            .documents
            .get(&entry.document)
            .ok_or_else(|| EngineError::UnknownDocument(entry.document.clone()))?;
        Ok(entry.state.is_folded(
            range,
            open.document.line_count(),
            self.config.end_of_document_tolerance,
        ))
    }

    /// Folded and unfolded ranges of the document shown in `view`.
    pub fn decorations(&mut self, view: &ViewId) -> Result<DecorationPlan, EngineError> {
        let document = self
            .views
            .get(view)
            .map(|entry| entry.document.clone())
            .ok_or_else(|| EngineError::UnknownView(view.clone()))?;
        self.folding_ranges(&document)?;

        let open = self
            .documents
            .get(&document)
            .ok_or_else(|| EngineError::UnknownDocument(document.clone()))?;
        let ranges = open.memo.as_ref().map(|memo| memo.ranges.as_slice()).unwrap_or_default();
        let entry = self
            .views
            .get_mut(view)
            .ok_or_else(|| EngineError::UnknownView(view.clone()))?;
        Ok(DecorationPlan::build(
            &open.document,
            ranges,
            &mut entry.state,
            self.config.end_of_document_tolerance,
        ))
    }

    pub fn fold_state(&self, view: &ViewId) -> Option<&FoldState> {
        self.views.get(view).map(|entry| &entry.state)
    }

    /// Last visible-interval report of a view.
    pub fn visible_intervals(&self, view: &ViewId) -> Option<&[LineInterval]> {
        self.views.get(view).map(|entry| entry.intervals.as_slice())
    }

    pub fn scan_stats(&self, id: &DocumentId) -> Option<DocumentScanStats> {
        self.brackets.stats(id)
    }

    pub fn last_rescan(&self, id: &DocumentId) -> Option<RescanOutcome> {
        self.brackets.stats(id).and_then(|stats| stats.last_outcome)
    }

    pub fn line_cache(&self, id: &DocumentId) -> Option<&LineCache> {
        self.brackets.line_cache(id)
    }
}
