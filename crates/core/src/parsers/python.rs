use crate::document::{AppliedEdit, Document};
use tree_sitter::Node;

use super::syntax::{byte_to_char_column, is_field, SyntaxTree};
use super::{LexicalClassifier, LineScopes, ParserError, ScopeKind};

pub struct PythonClassifier {
    tree: SyntaxTree,
}

impl PythonClassifier {
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            tree: SyntaxTree::new(tree_sitter_python::LANGUAGE.into())?,
        })
    }

    fn classify(node: Node<'_>, row: usize, line: &str, scopes: &mut LineScopes) {
        if node.start_position().row != row {
            return;
        }
        let start = byte_to_char_column(line, node.start_position().column);

        match node.kind() {
            "{" => {
                let parent_kind = node.parent().map(|p| p.kind()).unwrap_or_default();
                if matches!(parent_kind, "dictionary" | "dictionary_comprehension") {
                    scopes.push(start, start + 1, ScopeKind::ObjectLiteral);
                }
            }
            "identifier" if is_parameter_name(node) && node.end_position().row == row => {
                let end = byte_to_char_column(line, node.end_position().column);
                scopes.push(start, end, ScopeKind::Parameter);
            }
            _ => {}
        }
    }
}

fn is_parameter_name(node: Node<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "parameters" | "lambda_parameters" => return true,
            "default_parameter" | "typed_default_parameter" => {
                return is_field(parent, "name", current)
            }
            // The annotation is the `type` field; the name is the unnamed first child
            "typed_parameter" => return !is_field(parent, "type", current),
            "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {}
            _ => return false,
        }
        current = parent;
    }
    false
}

impl LexicalClassifier for PythonClassifier {
    fn sync(&mut self, document: &Document, edits: &[AppliedEdit]) -> Result<(), ParserError> {
        self.tree.sync(document, edits)
    }

    fn line_scopes(&self, document: &Document, line: usize) -> LineScopes {
        let text = document.line(line);
        let mut scopes = LineScopes::new();
        self.tree
            .for_each_on_row(line, |node| Self::classify(node, line, &text, &mut scopes));
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;

    fn scopes(source: &str, line: usize) -> LineScopes {
        let document = Document::new("test.py", Language::Python, source);
        let mut classifier = PythonClassifier::new().unwrap();
        classifier.sync(&document, &[]).unwrap();
        classifier.line_scopes(&document, line)
    }

    #[test]
    fn test_parameter_forms() {
        let scopes = scopes("def f(a, b: int, c=1, d: str = \"\", *args, **kw):\n    pass\n", 0);
        let names: Vec<(usize, usize)> = scopes
            .parameters()
            .iter()
            .map(|span| (span.start, span.end))
            .collect();
        assert_eq!(
            names,
            vec![(6, 7), (9, 10), (17, 18), (22, 23), (36, 40), (44, 46)]
        );
    }

    #[test]
    fn test_dictionary_braces() {
        let source = "x = {\"a\": {k: v for k, v in y}}\ns = {1, 2}\n";
        let dict_line = scopes(source, 0);
        assert!(dict_line.starts_at(4, ScopeKind::ObjectLiteral));
        assert!(dict_line.starts_at(10, ScopeKind::ObjectLiteral));

        let set_line = scopes(source, 1);
        assert!(!set_line.starts_at(4, ScopeKind::ObjectLiteral));
    }

    #[test]
    fn test_call_arguments_are_not_parameters() {
        let scopes = scopes("print(a, b)\n", 0);
        assert!(scopes.parameters().is_empty());
    }
}
