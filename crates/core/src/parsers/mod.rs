mod javascript;
mod python;
mod syntax;

pub use javascript::JavaScriptClassifier;
pub use python::PythonClassifier;
pub use syntax::{byte_to_char_column, SyntaxTree};

use crate::document::{AppliedEdit, Document};
use crate::models::Language;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),
    #[error("Failed to parse source code: {0}")]
    ParseError(String),
    #[error("Unsupported language: {0:?}")]
    UnsupportedLanguage(Language),
}

/// What a span of a line means syntactically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// `<` opening a type parameter or argument list
    TypeParameterOpen,
    /// `>` closing a type parameter or argument list
    TypeParameterClose,
    /// `{` opening an object or dictionary literal
    ObjectLiteral,
    /// Name declared by a parameter list
    Parameter,
}

/// Character columns `[start, end)` on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSpan {
    pub start: usize,
    pub end: usize,
    pub kind: ScopeKind,
}

/// Classified spans of a single line, in no particular order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineScopes {
    spans: Vec<ScopeSpan>,
}

impl LineScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, start: usize, end: usize, kind: ScopeKind) {
        self.spans.push(ScopeSpan { start, end, kind });
    }

    /// Whether a span of `kind` starts at `column`.
    pub fn starts_at(&self, column: usize, kind: ScopeKind) -> bool {
        self.spans
            .iter()
            .any(|span| span.kind == kind && span.start == column)
    }

    /// Parameter spans ordered by column.
    pub fn parameters(&self) -> Vec<ScopeSpan> {
        let mut params: Vec<ScopeSpan> = self
            .spans
            .iter()
            .filter(|span| span.kind == ScopeKind::Parameter)
            .copied()
            .collect();
        params.sort_by_key(|span| span.start);
        params.dedup();
        params
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[ScopeSpan] {
        &self.spans
    }
}

/// Source of syntactic scope information for the line scanner
pub trait LexicalClassifier: Send {
    /// Bring the classifier up to date with `document` after `edits` were applied.
    /// An empty slice means "start over from the full text".
    fn sync(&mut self, document: &Document, edits: &[AppliedEdit]) -> Result<(), ParserError>;

    /// Scopes of one line of the last synced text.
    fn line_scopes(&self, document: &Document, line: usize) -> LineScopes;
}

/// Classifies nothing: generic brackets never match, previews fall back to ellipsis.
#[derive(Debug, Default)]
pub struct NullClassifier;

impl LexicalClassifier for NullClassifier {
    fn sync(&mut self, _document: &Document, _edits: &[AppliedEdit]) -> Result<(), ParserError> {
        Ok(())
    }

    fn line_scopes(&self, _document: &Document, _line: usize) -> LineScopes {
        LineScopes::new()
    }
}

/// JSON braces are always objects.
#[derive(Debug, Default)]
pub struct JsonClassifier;

impl LexicalClassifier for JsonClassifier {
    fn sync(&mut self, _document: &Document, _edits: &[AppliedEdit]) -> Result<(), ParserError> {
        Ok(())
    }

    fn line_scopes(&self, document: &Document, line: usize) -> LineScopes {
        let mut scopes = LineScopes::new();
        for (column, ch) in document.line(line).chars().enumerate() {
            if ch == '{' {
                scopes.push(column, column + 1, ScopeKind::ObjectLiteral);
            }
        }
        scopes
    }
}

/// Create a classifier for the given language
pub fn create_classifier(language: Language) -> Result<Box<dyn LexicalClassifier>, ParserError> {
    match language {
        Language::JavaScript => Ok(Box::new(JavaScriptClassifier::new(false)?)),
        Language::TypeScript => Ok(Box::new(JavaScriptClassifier::new(true)?)),
        Language::Python => Ok(Box::new(PythonClassifier::new()?)),
        Language::Json => Ok(Box::new(JsonClassifier)),
        Language::PlainText => Ok(Box::new(NullClassifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_braces_are_objects() {
        let document = Document::new("a.json", Language::Json, "{\"a\": {\"b\": 1}}");
        let scopes = JsonClassifier.line_scopes(&document, 0);
        assert!(scopes.starts_at(0, ScopeKind::ObjectLiteral));
        assert!(scopes.starts_at(6, ScopeKind::ObjectLiteral));
        assert!(!scopes.starts_at(1, ScopeKind::ObjectLiteral));
    }

    #[test]
    fn test_parameters_sorted() {
        let mut scopes = LineScopes::new();
        scopes.push(9, 10, ScopeKind::Parameter);
        scopes.push(2, 3, ScopeKind::Parameter);
        scopes.push(0, 1, ScopeKind::ObjectLiteral);
        let columns: Vec<usize> = scopes.parameters().iter().map(|s| s.start).collect();
        assert_eq!(columns, vec![2, 9]);
    }

    #[test]
    fn test_create_classifier_for_every_language() {
        for language in [
            Language::JavaScript,
            Language::TypeScript,
            Language::Python,
            Language::Json,
            Language::PlainText,
        ] {
            assert!(create_classifier(language).is_ok());
        }
    }
}
