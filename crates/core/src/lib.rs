//! Bracketfold Core Library
//!
//! Incremental folding ranges derived from bracket structure, with
//! collapsed-text previews and fold-state tracking for editor views.
//!
//! # Features
//!
//! - Per-line bracket cache that survives single-keystroke edits with a
//!   column offset instead of a rescan
//! - Per-type bracket stacks with structural fingerprints per line
//! - Collapsed text: ellipsis, body line counts, parameter names, object
//!   previews, and chaining of `} else {` style neighbours
//! - `#region` and JSX element ranges merged into the same list
//! - Fold state inferred from the visible line intervals a host reports
//! - Project-wide scans with JSON, YAML or summary output
//!
//! # Example
//!
//! ```no_run
//! use bracketfold_core::{DocumentId, FoldingConfig, FoldingEngine, Language, Position, TextEdit};
//!
//! let mut engine = FoldingEngine::new(FoldingConfig::default()).unwrap();
//! let id = DocumentId::new("main.js");
//! engine.open_document(id.clone(), Language::JavaScript, "if (a) {\n  b();\n}\n");
//! engine
//!     .apply_edits(&id, &[TextEdit::insert(Position::new(1, 2), "c();\n  ")])
//!     .unwrap();
//!
//! for range in engine.folding_ranges(&id).unwrap() {
//!     println!("{}-{} {}", range.start_line, range.end_line, range.collapsed_text);
//! }
//! ```

pub mod config;
pub mod decorator;
pub mod document;
pub mod engine;
pub mod fold_state;
pub mod models;
pub mod output;
pub mod parsers;
pub mod providers;
pub mod workspace;

// Re-exports for convenience
pub use config::{FoldingConfig, ScanConfig};
pub use decorator::{DecorationPlan, Debouncer};
pub use document::{Document, DocumentError, DocumentId, TextEdit};
pub use engine::{detect_language, render_file, FoldScanner, LineCache, Renderer, RescanOutcome, ScanError};
pub use fold_state::{visible_intervals, FoldState};
pub use models::*;
pub use output::{format_output, format_ranges, format_summary, FormatError, OutputFormat};
pub use parsers::{create_classifier, LexicalClassifier, ParserError};
pub use providers::{DocumentScanStats, FoldingRangeProvider, ProviderError};
pub use workspace::{EngineError, FoldingEngine, ViewId};
