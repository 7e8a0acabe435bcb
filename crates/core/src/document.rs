//! Rope-backed text documents and the edits applied to them.

use crate::models::{Language, Position};
use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("position {line}:{character} is outside the document")]
    OutOfBounds { line: usize, character: usize },
    #[error("edit range ends before it starts ({start:?} > {end:?})")]
    InvertedRange { start: Position, end: Position },
}

/// Stable identity of a document (a URI or path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A replaced range and its replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: Position,
    pub end: Position,
    pub text: String,
}

impl TextEdit {
    pub fn new(start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn delete(start: Position, end: Position) -> Self {
        Self::new(start, end, "")
    }
}

/// Byte offset plus `(row, byte column)` point, the coordinates syntax trees use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BytePoint {
    pub byte: usize,
    pub row: usize,
    pub column: usize,
}

/// An edit after it was applied, carrying both pre- and post-edit coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub start: Position,
    /// End of the replaced range, in pre-edit coordinates
    pub old_end: Position,
    /// End of the inserted text, in post-edit coordinates
    pub new_end: Position,
    pub inserted_chars: usize,
    pub deleted_chars: usize,
    pub inserted_line_break: bool,
    pub start_point: BytePoint,
    pub old_end_point: BytePoint,
    pub new_end_point: BytePoint,
}

impl AppliedEdit {
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.old_end.line && !self.inserted_line_break
    }

    /// Column shift this edit causes for text after it on the same line.
    pub fn column_delta(&self) -> isize {
        self.inserted_chars as isize - self.deleted_chars as isize
    }
}

/// An ordered sequence of text lines with a stable identity.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    language: Language,
    text: Rope,
    version: u64,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, language: Language, text: &str) -> Self {
        Self {
            id: id.into(),
            language,
            text: Rope::from_str(text),
            version: 0,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Text of a line without its line ending; empty past the end.
    pub fn line(&self, index: usize) -> String {
        if index >= self.line_count() {
            return String::new();
        }
        let mut line = self.text.line(index).to_string();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        line
    }

    /// Length of a line in characters, without its line ending.
    pub fn line_len(&self, index: usize) -> usize {
        if index >= self.line_count() {
            return 0;
        }
        let slice = self.text.line(index);
        let mut len = slice.len_chars();
        while len > 0 {
            let ch = slice.char(len - 1);
            if ch != '\n' && ch != '\r' {
                break;
            }
            len -= 1;
        }
        len
    }

    /// Column of the first non-whitespace character, or the line length.
    pub fn first_non_whitespace(&self, index: usize) -> usize {
        self.line(index)
            .chars()
            .position(|c| !c.is_whitespace())
            .unwrap_or_else(|| self.line_len(index))
    }

    pub fn position_to_char(&self, position: Position) -> Result<usize, DocumentError> {
        let out_of_bounds = DocumentError::OutOfBounds {
            line: position.line,
            character: position.character,
        };
        if position.line >= self.line_count() || position.character > self.line_len(position.line) {
            return Err(out_of_bounds);
        }
        Ok(self.text.line_to_char(position.line) + position.character)
    }

    pub fn char_to_position(&self, char_idx: usize) -> Position {
        let char_idx = char_idx.min(self.text.len_chars());
        let line = self.text.char_to_line(char_idx);
        Position::new(line, char_idx - self.text.line_to_char(line))
    }

    fn byte_point(&self, char_idx: usize) -> BytePoint {
        let byte = self.text.char_to_byte(char_idx);
        let row = self.text.char_to_line(char_idx);
        BytePoint {
            byte,
            row,
            column: byte - self.text.line_to_byte(row),
        }
    }

    /// Replace `edit`'s range with its text and bump the version.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> Result<AppliedEdit, DocumentError> {
        if edit.end < edit.start {
            return Err(DocumentError::InvertedRange {
                start: edit.start,
                end: edit.end,
            });
        }
        let start_char = self.position_to_char(edit.start)?;
        let end_char = self.position_to_char(edit.end)?;

        let start_point = self.byte_point(start_char);
        let old_end_point = self.byte_point(end_char);

        self.text.remove(start_char..end_char);
        self.text.insert(start_char, &edit.text);
        self.version += 1;

        let inserted_chars = edit.text.chars().count();
        let new_end_char = start_char + inserted_chars;

        Ok(AppliedEdit {
            start: edit.start,
            old_end: edit.end,
            new_end: self.char_to_position(new_end_char),
            inserted_chars,
            deleted_chars: end_char - start_char,
            inserted_line_break: edit.text.contains('\n') || edit.text.contains('\r'),
            start_point,
            old_end_point,
            new_end_point: self.byte_point(new_end_char),
        })
    }

    /// Apply edits sequentially, in the order given. On error the document is left untouched.
    pub fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<Vec<AppliedEdit>, DocumentError> {
        let (text, version) = (self.text.clone(), self.version);
        let applied = edits
            .iter()
            .map(|edit| self.apply_edit(edit))
            .collect::<Result<Vec<_>, _>>();
        if applied.is_err() {
            self.text = text;
            self.version = version;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("test://doc", Language::PlainText, text)
    }

    #[test]
    fn test_lines_strip_endings() {
        let document = doc("a {\r\n  b\n}");
        assert_eq!(document.line_count(), 3);
        assert_eq!(document.line(0), "a {");
        assert_eq!(document.line_len(0), 3);
        assert_eq!(document.line(2), "}");
        assert_eq!(document.first_non_whitespace(1), 2);
    }

    #[test]
    fn test_only_line_feeds_break_lines() {
        let mut document = doc("let s = 'a\u{2028}b';\nx\u{0085}y\u{000C}\n}");
        assert_eq!(document.line_count(), 3);
        assert_eq!(document.line(0), "let s = 'a\u{2028}b';");
        assert_eq!(document.line_len(1), 4);

        let applied = document
            .apply_edit(&TextEdit::insert(Position::new(2, 0), " "))
            .unwrap();
        assert_eq!(applied.start_point.row, 2);
        assert_eq!(applied.start_point.column, 0);
    }

    #[test]
    fn test_single_character_insert() {
        let mut document = doc("let x = 1;\nlet y = 2;");
        let applied = document
            .apply_edit(&TextEdit::insert(Position::new(1, 4), "z"))
            .unwrap();
        assert_eq!(document.line(1), "let zy = 2;");
        assert!(applied.is_single_line());
        assert_eq!(applied.column_delta(), 1);
        assert_eq!(applied.new_end, Position::new(1, 5));
        assert_eq!(document.version(), 1);
    }

    #[test]
    fn test_multi_line_delete() {
        let mut document = doc("a\nb\nc");
        let applied = document
            .apply_edit(&TextEdit::delete(Position::new(0, 1), Position::new(2, 0)))
            .unwrap();
        assert_eq!(document.line(0), "ac");
        assert!(!applied.is_single_line());
        assert_eq!(applied.deleted_chars, 4);
    }

    #[test]
    fn test_newline_insert_is_multi_line() {
        let mut document = doc("ab");
        let applied = document
            .apply_edit(&TextEdit::insert(Position::new(0, 1), "\n"))
            .unwrap();
        assert!(!applied.is_single_line());
        assert_eq!(document.line_count(), 2);
    }

    #[test]
    fn test_out_of_bounds_edit() {
        let mut document = doc("abc");
        let err = document
            .apply_edit(&TextEdit::insert(Position::new(0, 9), "x"))
            .unwrap_err();
        assert_eq!(
            err,
            DocumentError::OutOfBounds {
                line: 0,
                character: 9
            }
        );
        assert_eq!(document.version(), 0);
    }

    #[test]
    fn test_failed_batch_leaves_document_untouched() {
        let mut document = doc("abc\ndef");
        let err = document
            .apply_edits(&[
                TextEdit::insert(Position::new(0, 0), "x"),
                TextEdit::insert(Position::new(5, 0), "y"),
            ])
            .unwrap_err();
        assert_eq!(err, DocumentError::OutOfBounds { line: 5, character: 0 });
        assert_eq!(document.text().to_string(), "abc\ndef");
        assert_eq!(document.version(), 0);
    }

    #[test]
    fn test_byte_points_for_multibyte_text() {
        let mut document = doc("é{\n}");
        let applied = document
            .apply_edit(&TextEdit::insert(Position::new(0, 1), "x"))
            .unwrap();
        assert_eq!(applied.start_point.byte, 2);
        assert_eq!(applied.start_point.column, 2);
        assert_eq!(applied.new_end_point.byte, 3);
    }
}
