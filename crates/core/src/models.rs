use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Json,
    PlainText,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" | "tsx" => Some(Language::TypeScript),
            "py" | "pyi" => Some(Language::Python),
            "json" | "jsonc" => Some(Language::Json),
            "txt" => Some(Language::PlainText),
            _ => None,
        }
    }

    /// Map an editor language identifier onto a supported language.
    pub fn from_language_id(id: &str) -> Self {
        match id {
            "javascript" | "javascriptreact" => Language::JavaScript,
            "typescript" | "typescriptreact" => Language::TypeScript,
            "python" => Language::Python,
            "json" | "jsonc" => Language::Json,
            _ => Language::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Json => "json",
            Language::PlainText => "plaintext",
        }
    }

    /// Whether documents in this language may contain JSX markup.
    pub fn supports_markup(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

/// A zero-based `(line, character)` position; characters are Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// An inclusive range of lines the host reports as visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInterval {
    pub start: usize,
    pub end: usize,
}

impl LineInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A single bracket occurrence.
///
/// `type_id` groups characters that must match each other; `column` is the
/// only field that changes after creation (same-line edits shift it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BracketToken {
    pub type_id: u16,
    pub is_open: bool,
    pub character: &'static str,
    pub line: usize,
    pub column: usize,
    /// Opening brace classified as an object/dict literal
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub object_literal: bool,
}

impl BracketToken {
    pub fn new(type_id: u16, is_open: bool, character: &'static str, line: usize, column: usize) -> Self {
        Self {
            type_id,
            is_open,
            character,
            line,
            column,
            object_literal: false,
        }
    }

    /// Number of characters the bracket occupies.
    pub fn width(&self) -> usize {
        self.character.chars().count()
    }

    pub fn start(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    pub fn end(&self) -> (usize, usize) {
        (self.line, self.column + self.width())
    }
}

/// An open bracket and the close that popped it off its type's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchedBracketPair {
    pub open: BracketToken,
    pub close: BracketToken,
}

impl MatchedBracketPair {
    pub fn spans_lines(&self) -> bool {
        self.open.line != self.close.line
    }

    /// Nothing between the brackets, e.g. `{}`.
    pub fn is_empty(&self) -> bool {
        self.open.end() == self.close.start()
    }
}

/// A token the lexical classifier marked as a parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewToken {
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl PreviewToken {
    pub fn end_column(&self) -> usize {
        self.column + self.text.chars().count()
    }
}

/// Tag attached to folding ranges that are not plain bracket blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldingRangeKind {
    Region,
    Markup,
}

impl FoldingRangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldingRangeKind::Region => "region",
            FoldingRangeKind::Markup => "markup",
        }
    }
}

/// A foldable line span with the text shown while it is collapsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldingRange {
    /// First line (0-indexed, stays visible)
    pub start_line: usize,
    /// Last hidden line (0-indexed, inclusive)
    pub end_line: usize,
    /// Column the collapsed text starts at; end of line when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<usize>,
    pub collapsed_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FoldingRangeKind>,
}

impl FoldingRange {
    pub fn new(start_line: usize, end_line: usize, collapsed_text: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            start_column: None,
            collapsed_text: collapsed_text.into(),
            kind: None,
        }
    }

    pub fn with_start_column(mut self, column: usize) -> Self {
        self.start_column = Some(column);
        self
    }

    pub fn with_kind(mut self, kind: FoldingRangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Number of lines hidden while collapsed.
    pub fn hidden_lines(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    /// Check if this range contains another
    pub fn contains(&self, other: &FoldingRange) -> bool {
        self.start_line <= other.start_line && self.end_line >= other.end_line
    }
}

/// A source file with its folding ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative path from project root
    pub path: PathBuf,
    /// Absolute path
    pub absolute_path: PathBuf,
    /// Detected language
    pub language: Language,
    /// All folding ranges in this file
    pub ranges: Vec<FoldingRange>,
    /// Total line count
    pub line_count: usize,
    /// Whether the file was read and scanned successfully
    pub parsed: bool,
    /// Error message if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about a project scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldStats {
    pub total_files: usize,
    pub total_ranges: usize,
    pub bracket_ranges: usize,
    pub region_ranges: usize,
    pub markup_ranges: usize,
    pub javascript_files: usize,
    pub typescript_files: usize,
    pub python_files: usize,
    pub json_files: usize,
    pub other_files: usize,
    pub total_lines: usize,
    pub foldable_lines: usize,
}

impl FoldStats {
    pub fn add_file(&mut self, file: &SourceFile) {
        self.total_files += 1;
        match file.language {
            Language::JavaScript => self.javascript_files += 1,
            Language::TypeScript => self.typescript_files += 1,
            Language::Python => self.python_files += 1,
            Language::Json => self.json_files += 1,
            Language::PlainText => self.other_files += 1,
        }
        self.total_lines += file.line_count;
        for range in &file.ranges {
            self.add_range(range);
        }
    }

    pub fn add_range(&mut self, range: &FoldingRange) {
        self.total_ranges += 1;
        self.foldable_lines += range.hidden_lines();
        match range.kind {
            Some(FoldingRangeKind::Region) => self.region_ranges += 1,
            Some(FoldingRangeKind::Markup) => self.markup_ranges += 1,
            _ => self.bracket_ranges += 1,
        }
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregated scan results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldMap {
    /// Project root path
    pub root: PathBuf,
    /// All source files analyzed
    pub files: Vec<SourceFile>,
    /// Range statistics
    pub stats: FoldStats,
    /// Scan metadata
    pub metadata: ScanMetadata,
}

/// Folding ranges of one document, as listed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRanges {
    pub path: PathBuf,
    pub language: Language,
    pub line_count: usize,
    pub ranges: Vec<FoldingRange>,
}

/// Rendered output for a single document
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
    pub fold_count: usize,
    pub lines_hidden: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_extension("TSX"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("jsonc"), Some(Language::Json));
        assert_eq!(Language::from_extension("rs"), None);
        assert_eq!(
            Language::from_language_id("javascriptreact"),
            Language::JavaScript
        );
        assert_eq!(Language::from_language_id("markdown"), Language::PlainText);
    }

    #[test]
    fn test_pair_emptiness() {
        let open = BracketToken::new(2, true, "{", 0, 4);
        let close = BracketToken::new(2, false, "}", 0, 5);
        let pair = MatchedBracketPair { open, close };
        assert!(pair.is_empty());
        assert!(!pair.spans_lines());
    }

    #[test]
    fn test_kinds_are_the_produced_ones() {
        let region = FoldingRange::new(0, 2, "setup").with_kind(FoldingRangeKind::Region);
        let json = serde_json::to_string(&region).unwrap();
        assert!(json.contains("\"kind\":\"region\""));
        assert_eq!(FoldingRangeKind::Markup.as_str(), "markup");
        assert!(serde_json::from_str::<FoldingRangeKind>("\"imports\"").is_err());
        assert!(serde_json::from_str::<FoldingRangeKind>("\"comment\"").is_err());
    }

    #[test]
    fn test_stats_count_kinds() {
        let mut stats = FoldStats::default();
        stats.add_range(&FoldingRange::new(0, 3, "…"));
        stats.add_range(&FoldingRange::new(4, 9, "setup").with_kind(FoldingRangeKind::Region));
        assert_eq!(stats.total_ranges, 2);
        assert_eq!(stats.bracket_ranges, 1);
        assert_eq!(stats.region_ranges, 1);
        assert_eq!(stats.foldable_lines, 8);
    }
}
