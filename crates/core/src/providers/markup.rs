use crate::config::FoldingConfig;
use crate::document::{AppliedEdit, Document, DocumentId};
use crate::models::{FoldingRange, FoldingRangeKind, Language};
use crate::parsers::{byte_to_char_column, ParserError, SyntaxTree};
use std::collections::HashMap;
use tracing::{debug, trace};
use tree_sitter::Node;

use super::{FoldingRangeProvider, ProviderError};

const ELLIPSIS: &str = "…";

struct MarkupTree {
    tree: SyntaxTree,
    synced_version: u64,
}

/// Multi-line JSX elements, folded from the end of the opening tag to the closing tag
#[derive(Default)]
pub struct MarkupRangesProvider {
    trees: HashMap<DocumentId, MarkupTree>,
}

impl MarkupRangesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn grammar(language: Language) -> tree_sitter::Language {
        match language {
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
            _ => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn tree_for(&mut self, document: &Document) -> Result<&SyntaxTree, ProviderError> {
        let stale = self
            .trees
            .get(document.id())
            .map_or(true, |entry| entry.synced_version != document.version());

        if stale {
            debug!(document = %document.id(), "parsing markup from scratch");
            let mut tree = SyntaxTree::new(Self::grammar(document.language()))?;
            tree.sync(document, &[])?;
            self.trees.insert(
                document.id().clone(),
                MarkupTree {
                    tree,
                    synced_version: document.version(),
                },
            );
        }

        match self.trees.get(document.id()) {
            Some(entry) => Ok(&entry.tree),
            None => Err(ParserError::ParseError(format!("no tree for {}", document.id())).into()),
        }
    }

    /// Ranges of every element in `document` that spans more than one line.
    pub fn ranges(&mut self, document: &Document) -> Result<Vec<FoldingRange>, ProviderError> {
        if !document.language().supports_markup() {
            return Ok(Vec::new());
        }
        let tree = self.tree_for(document)?;
        let Some(root) = tree.root() else {
            return Ok(Vec::new());
        };

        let mut elements = Vec::new();
        collect_elements(root, &mut elements);

        let ranges: Vec<FoldingRange> = elements
            .into_iter()
            .filter_map(|element| element_range(document, element))
            .collect();
        trace!(document = %document.id(), count = ranges.len(), "markup ranges");
        Ok(ranges)
    }
}

fn collect_elements<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "jsx_element" {
            out.push(child);
        }
        if child.child_count() > 0 {
            collect_elements(child, out);
        }
    }
}

fn element_range(document: &Document, element: Node<'_>) -> Option<FoldingRange> {
    let open = element.child_by_field_name("open_tag")?;
    let close = element.child_by_field_name("close_tag")?;
    let start_row = open.start_position().row;
    let end_row = close.start_position().row;
    if start_row >= end_row {
        return None;
    }

    let mut cursor = open.walk();
    let last_attribute = open
        .children_by_field_name("attribute", &mut cursor)
        .last()
        .filter(|attribute| attribute.end_position().row == start_row);

    let byte_column = match (last_attribute, open.child_by_field_name("name")) {
        (Some(attribute), _) => attribute.end_position().column,
        (None, Some(name)) if name.end_position().row == start_row => name.end_position().column,
        // fragment `<>`: fold right before its `>`
        _ if open.end_position().row == start_row => open.end_position().column.saturating_sub(1),
        _ => return None,
    };
    let start_column = byte_to_char_column(&document.line(start_row), byte_column);

    let rope = document.text();
    let from = rope.byte_to_char(close.start_byte());
    let to = rope.byte_to_char(close.end_byte());
    let closing = rope.slice(from..to).to_string();

    Some(
        FoldingRange::new(start_row, end_row, format!(">{}{}", ELLIPSIS, closing))
            .with_start_column(start_column)
            .with_kind(FoldingRangeKind::Markup),
    )
}

impl FoldingRangeProvider for MarkupRangesProvider {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn update_ranges(
        &mut self,
        document: &Document,
        _config: &FoldingConfig,
        upstream: &[FoldingRange],
    ) -> Result<Vec<FoldingRange>, ProviderError> {
        let mut ranges = upstream.to_vec();
        ranges.extend(self.ranges(document)?);
        Ok(ranges)
    }

    fn document_changed(&mut self, document: &Document, edits: &[AppliedEdit]) -> Result<(), ProviderError> {
        let Some(entry) = self.trees.get_mut(document.id()) else {
            return Ok(());
        };
        if let Err(e) = entry.tree.sync(document, edits) {
            self.trees.remove(document.id());
            return Err(e.into());
        }
        entry.synced_version = document.version();
        Ok(())
    }

    fn document_closed(&mut self, id: &DocumentId) {
        self.trees.remove(id);
    }

    fn restart(&mut self) {
        self.trees.clear();
    }
}
