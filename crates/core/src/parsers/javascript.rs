use crate::document::{AppliedEdit, Document};
use tree_sitter::Node;

use super::syntax::{byte_to_char_column, is_field, SyntaxTree};
use super::{LexicalClassifier, LineScopes, ParserError, ScopeKind};

/// Classifier for JavaScript and TypeScript (TSX grammar, so JSX parses too)
pub struct JavaScriptClassifier {
    tree: SyntaxTree,
    is_typescript: bool,
}

impl JavaScriptClassifier {
    pub fn new(is_typescript: bool) -> Result<Self, ParserError> {
        let language: tree_sitter::Language = if is_typescript {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_javascript::LANGUAGE.into()
        };
        Ok(Self {
            tree: SyntaxTree::new(language)?,
            is_typescript,
        })
    }

    pub fn is_typescript(&self) -> bool {
        self.is_typescript
    }

    fn classify(node: Node<'_>, row: usize, line: &str, scopes: &mut LineScopes) {
        if node.start_position().row != row {
            return;
        }
        let parent_kind = node.parent().map(|p| p.kind()).unwrap_or_default();
        let start = byte_to_char_column(line, node.start_position().column);

        match node.kind() {
            "<" if matches!(parent_kind, "type_parameters" | "type_arguments") => {
                scopes.push(start, start + 1, ScopeKind::TypeParameterOpen)
            }
            ">" if matches!(parent_kind, "type_parameters" | "type_arguments") => {
                scopes.push(start, start + 1, ScopeKind::TypeParameterClose)
            }
            "{" if matches!(parent_kind, "object" | "object_pattern") => {
                scopes.push(start, start + 1, ScopeKind::ObjectLiteral)
            }
            "identifier" | "shorthand_property_identifier_pattern" if is_parameter_name(node) => {
                if node.end_position().row == row {
                    let end = byte_to_char_column(line, node.end_position().column);
                    scopes.push(start, end, ScopeKind::Parameter);
                }
            }
            _ => {}
        }
    }
}

/// Walk up from an identifier until a parameter list proves it is a declared name.
fn is_parameter_name(node: Node<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "formal_parameters" => return true,
            "required_parameter" | "optional_parameter" => {
                return is_field(parent, "pattern", current)
            }
            "arrow_function" => return is_field(parent, "parameter", current),
            "assignment_pattern" | "object_assignment_pattern" => {
                if !is_field(parent, "left", current) {
                    return false;
                }
            }
            "pair_pattern" => {
                if !is_field(parent, "value", current) {
                    return false;
                }
            }
            "rest_pattern" | "object_pattern" | "array_pattern" => {}
            _ => return false,
        }
        current = parent;
    }
    false
}

impl LexicalClassifier for JavaScriptClassifier {
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

    fn scopes(source: &str, typescript: bool, line: usize) -> LineScopes {
        let language = if typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        };
        let document = Document::new("test", language, source);
        let mut classifier = JavaScriptClassifier::new(typescript).unwrap();
        classifier.sync(&document, &[]).unwrap();
        classifier.line_scopes(&document, line)
    }

    fn parameter_columns(scopes: &LineScopes) -> Vec<(usize, usize)> {
        scopes
            .parameters()
            .iter()
            .map(|span| (span.start, span.end))
            .collect()
    }

    #[test]
    fn test_function_parameters() {
        let scopes = scopes("function f(a, b = 1, ...rest) {}", false, 0);
        assert_eq!(parameter_columns(&scopes), vec![(11, 12), (14, 15), (24, 28)]);
    }

    #[test]
    fn test_destructured_and_arrow_parameters() {
        let source = "const g = ({ x, y: z }) => x;\nconst h = q => q;";
        let destructured = scopes(source, false, 0);
        assert_eq!(parameter_columns(&destructured), vec![(13, 14), (19, 20)]);

        let arrow = scopes(source, false, 1);
        assert_eq!(parameter_columns(&arrow), vec![(10, 11)]);
    }

    #[test]
    fn test_object_literal_vs_block() {
        let scopes = scopes("if (a) { let o = { k: 1 }; }", false, 0);
        assert!(!scopes.starts_at(7, ScopeKind::ObjectLiteral));
        assert!(scopes.starts_at(17, ScopeKind::ObjectLiteral));
    }

    #[test]
    fn test_typescript_generics_and_typed_parameters() {
        let scopes = scopes("function id<T>(value: T): Array<T> { return [value]; }", true, 0);
        assert!(scopes.starts_at(11, ScopeKind::TypeParameterOpen));
        assert!(scopes.starts_at(13, ScopeKind::TypeParameterClose));
        assert!(scopes.starts_at(31, ScopeKind::TypeParameterOpen));
        assert_eq!(parameter_columns(&scopes), vec![(15, 20)]);
    }

    #[test]
    fn test_comparison_is_not_generic() {
        let scopes = scopes("const ok = a < b && c > d;", true, 0);
        assert!(!scopes.starts_at(13, ScopeKind::TypeParameterOpen));
        assert!(!scopes.starts_at(22, ScopeKind::TypeParameterClose));
    }
}
