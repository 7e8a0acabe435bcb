use crate::document::{AppliedEdit, BytePoint, Document};
use tree_sitter::{InputEdit, Node, Parser, Point, Tree, TreeCursor};

use super::ParserError;

/// A tree-sitter tree kept in step with a document through incremental edits.
pub struct SyntaxTree {
    parser: Parser,
    tree: Option<Tree>,
}

fn point(p: BytePoint) -> Point {
    Point::new(p.row, p.column)
}

impl SyntaxTree {
    pub fn new(language: tree_sitter::Language) -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParserError::InitError(e.to_string()))?;
        Ok(Self { parser, tree: None })
    }

    /// Reparse `document`, reusing the previous tree when `edits` describe how it changed.
    pub fn sync(&mut self, document: &Document, edits: &[AppliedEdit]) -> Result<(), ParserError> {
        if edits.is_empty() {
            self.tree = None;
        }
        if let Some(tree) = self.tree.as_mut() {
            for edit in edits {
                tree.edit(&InputEdit {
                    start_byte: edit.start_point.byte,
                    old_end_byte: edit.old_end_point.byte,
                    new_end_byte: edit.new_end_point.byte,
                    start_position: point(edit.start_point),
                    old_end_position: point(edit.old_end_point),
                    new_end_position: point(edit.new_end_point),
                });
            }
        }

        let rope = document.text();
        let len = rope.len_bytes();
        let tree = self
            .parser
            .parse_with(
                &mut |byte, _| {
                    if byte >= len {
                        return &[][..];
                    }
                    let (chunk, chunk_byte, _, _) = rope.chunk_at_byte(byte);
                    &chunk.as_bytes()[byte - chunk_byte..]
                },
                self.tree.as_ref(),
            )
            .ok_or_else(|| ParserError::ParseError(format!("no tree for {}", document.id())))?;
        self.tree = Some(tree);
        Ok(())
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(Tree::root_node)
    }

    /// Visit every node that covers part of `row`, parents before children.
    pub fn for_each_on_row<'t>(&'t self, row: usize, mut visit: impl FnMut(Node<'t>)) {
        if let Some(root) = self.root() {
            let mut cursor = root.walk();
            walk_row(&mut cursor, row, &mut visit);
        }
    }
}

fn walk_row<'t>(cursor: &mut TreeCursor<'t>, row: usize, visit: &mut impl FnMut(Node<'t>)) {
    let node = cursor.node();
    if node.start_position().row > row || node.end_position().row < row {
        return;
    }
    visit(node);

    if cursor.goto_first_child_for_point(Point::new(row, 0)).is_none() {
        return;
    }
    loop {
        if cursor.node().start_position().row > row {
            break;
        }
        walk_row(cursor, row, visit);
        if !cursor.goto_next_sibling() {
            break;
        }
    }
    cursor.goto_parent();
}

/// Convert a byte column within `line` to a character column.
pub fn byte_to_char_column(line: &str, byte_column: usize) -> usize {
    let byte_column = byte_column.min(line.len());
    line.char_indices()
        .take_while(|(byte, _)| *byte < byte_column)
        .count()
}

/// Whether `child` is the node stored under `field` of `parent`.
pub(crate) fn is_field(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|node| node.id() == child.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextEdit;
    use crate::models::{Language, Position};

    fn js_tree(document: &Document) -> SyntaxTree {
        let mut tree = SyntaxTree::new(tree_sitter_javascript::LANGUAGE.into()).unwrap();
        tree.sync(document, &[]).unwrap();
        tree
    }

    #[test]
    fn test_byte_to_char_column() {
        assert_eq!(byte_to_char_column("é{", 2), 1);
        assert_eq!(byte_to_char_column("abc", 10), 3);
    }

    #[test]
    fn test_rows_visited() {
        let document = Document::new("a.js", Language::JavaScript, "let a = {\n  b: 1,\n};\nf();");
        let tree = js_tree(&document);
        let mut kinds = Vec::new();
        tree.for_each_on_row(3, |node| kinds.push(node.kind().to_string()));
        assert!(kinds.contains(&"call_expression".to_string()));
        assert!(!kinds.contains(&"object".to_string()));
    }

    #[test]
    fn test_incremental_sync_matches_fresh_parse() {
        let mut document = Document::new("a.js", Language::JavaScript, "f(a);\n");
        let mut tree = js_tree(&document);
        let applied = document
            .apply_edit(&TextEdit::insert(Position::new(0, 3), ", b"))
            .unwrap();
        tree.sync(&document, &[applied]).unwrap();

        let fresh = js_tree(&document);
        assert_eq!(
            tree.root().unwrap().to_sexp(),
            fresh.root().unwrap().to_sexp()
        );
    }
}
