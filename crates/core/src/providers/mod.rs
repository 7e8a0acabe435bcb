//! Folding range providers.
//!
//! Providers run as an ordered pipeline: each one receives the ranges
//! produced before it and returns the extended list.

mod brackets;
mod markup;
mod region;

pub use brackets::{BracketRangesProvider, DocumentScanStats};
pub use markup::MarkupRangesProvider;
pub use region::RegionRangesProvider;

use crate::config::FoldingConfig;
use crate::document::{AppliedEdit, Document, DocumentId};
use crate::engine::CacheError;
use crate::models::FoldingRange;
use crate::parsers::ParserError;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("classifier error: {0}")]
    Parser(#[from] ParserError),
    #[error("line cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A source of folding ranges for documents
pub trait FoldingRangeProvider: Send {
    fn name(&self) -> &'static str;

    /// Return `upstream` extended with this provider's ranges for `document`.
    fn update_ranges(
        &mut self,
        document: &Document,
        config: &FoldingConfig,
        upstream: &[FoldingRange],
    ) -> Result<Vec<FoldingRange>, ProviderError>;

    /// Observe edits already applied to `document`.
    fn document_changed(
        &mut self,
        _document: &Document,
        _edits: &[AppliedEdit],
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    fn document_closed(&mut self, _id: &DocumentId) {}

    /// Drop every cached state.
    fn restart(&mut self) {}
}

/// Run providers in order; a failing provider is logged and its input passes through.
pub fn run_pipeline(
    providers: &mut [&mut dyn FoldingRangeProvider],
    document: &Document,
    config: &FoldingConfig,
) -> Vec<FoldingRange> {
    let mut ranges = Vec::new();
    for provider in providers.iter_mut() {
        match provider.update_ranges(document, config, &ranges) {
            Ok(updated) => ranges = updated,
            Err(e) => warn!(
                provider = provider.name(),
                document = %document.id(),
                error = %e,
                "provider failed, keeping upstream ranges"
            ),
        }
    }
    ranges
}

/// Notify providers of edits; failures are logged per provider.
pub fn notify_changed(
    providers: &mut [&mut dyn FoldingRangeProvider],
    document: &Document,
    edits: &[AppliedEdit],
) {
    for provider in providers.iter_mut() {
        if let Err(e) = provider.document_changed(document, edits) {
            warn!(
                provider = provider.name(),
                document = %document.id(),
                error = %e,
                "provider could not follow edit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;

    struct Failing;

    impl FoldingRangeProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn update_ranges(
            &mut self,
            _document: &Document,
            _config: &FoldingConfig,
            _upstream: &[FoldingRange],
        ) -> Result<Vec<FoldingRange>, ProviderError> {
            Err(ProviderError::Parser(ParserError::ParseError("broken".into())))
        }
    }

    struct Fixed(FoldingRange);

    impl FoldingRangeProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn update_ranges(
            &mut self,
            _document: &Document,
            _config: &FoldingConfig,
            upstream: &[FoldingRange],
        ) -> Result<Vec<FoldingRange>, ProviderError> {
            let mut ranges = upstream.to_vec();
            ranges.push(self.0.clone());
            Ok(ranges)
        }
    }

    #[test]
    fn test_failing_provider_passes_upstream_through() {
        let document = Document::new("t", Language::PlainText, "a\nb\nc");
        let mut first = Fixed(FoldingRange::new(0, 2, "x"));
        let mut failing = Failing;
        let mut last = Fixed(FoldingRange::new(1, 2, "y"));
        let mut providers: [&mut dyn FoldingRangeProvider; 3] = [&mut first, &mut failing, &mut last];
        let ranges = run_pipeline(&mut providers, &document, &FoldingConfig::default());
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].collapsed_text, "x");
        assert_eq!(ranges[1].collapsed_text, "y");
    }
}
