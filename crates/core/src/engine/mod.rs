//! The incremental bracket engine: per-line scanning, the line cache, the
//! rescan controller and range synthesis, plus rendering and project scans
//! built on top of them.

mod language;
mod lexer;
mod line_cache;
mod renderer;
mod rescan;
mod scanner;
mod stack;
mod synthesizer;

pub use language::{BracketPairDef, LanguageConfig, ANGLE, CURLY, PAREN, SQUARE, TEMPLATE};
pub use lexer::{scan_line, LexMode, LexState, ScanInput};
pub use line_cache::{CacheError, CacheStats, LineCache, LineRecord};
pub use renderer::{render_file, Renderer};
pub use rescan::{apply_edits, RescanOutcome};
pub use scanner::{detect_language, FoldScanner, ScanError};
pub use stack::{BracketEvent, BracketRef, BracketStack, Fingerprint};
pub use synthesizer::synthesize;
