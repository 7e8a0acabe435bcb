//! Single-line scanner: one regex pass, a small mode machine, and the bracket stack.

use super::language::{LanguageConfig, ANGLE, CURLY};
use super::line_cache::LineRecord;
use super::stack::BracketStack;
use crate::document::Document;
use crate::models::{BracketToken, PreviewToken};
use crate::parsers::{LexicalClassifier, LineScopes, ScopeKind};

/// A lexical context that can continue past the end of a line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexMode {
    BlockComment,
    Template,
    TemplateExpr { depth: usize },
    TripleString(&'static str),
}

/// Scanner continuation carried from one line to the next; empty means plain code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LexState {
    modes: Vec<LexMode>,
}

impl LexState {
    pub fn is_code(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn top(&self) -> Option<&LexMode> {
        self.modes.last()
    }
}

/// Text and classification of the lines being scanned.
pub struct ScanInput<'a> {
    pub document: &'a Document,
    pub classifier: &'a dyn LexicalClassifier,
}

impl<'a> ScanInput<'a> {
    pub fn new(document: &'a Document, classifier: &'a dyn LexicalClassifier) -> Self {
        Self {
            document,
            classifier,
        }
    }

    pub fn line_count(&self) -> usize {
        self.document.line_count()
    }

    pub fn text(&self, index: usize) -> String {
        self.document.line(index)
    }

    pub fn scopes(&self, index: usize) -> LineScopes {
        self.classifier.line_scopes(self.document, index)
    }
}

/// Scan one line starting from the previous line's continuation and bracket stacks.
pub fn scan_line(
    language: &LanguageConfig,
    index: usize,
    text: &str,
    scopes: &LineScopes,
    carried_in: &LexState,
    mut engine: BracketStack,
) -> LineRecord {
    let mut state = carried_in.clone();
    let mut quote: Option<&'static str> = None;

    let mut byte_cursor = 0;
    let mut column = 0;

    for found in language.token_pattern().find_iter(text) {
        column += text[byte_cursor..found.start()].chars().count();
        byte_cursor = found.start();
        let token = found.as_str();

        if let Some(open_quote) = quote {
            if token == open_quote {
                quote = None;
            }
            continue;
        }

        match state.top().cloned() {
            Some(LexMode::BlockComment) => {
                if language.block_comment.map(|(_, close)| close) == Some(token) {
                    state.modes.pop();
                }
            }
            Some(LexMode::TripleString(delimiter)) => {
                if delimiter == token {
                    state.modes.pop();
                }
            }
            Some(LexMode::Template) => {
                let pair = language.template_pair();
                if token == "`" {
                    state.modes.pop();
                } else if token == pair.open {
                    state.modes.push(LexMode::TemplateExpr { depth: 0 });
                    engine.push_open(BracketToken::new(pair.type_id, true, pair.open, index, column));
                }
            }
            mode => {
                if token.starts_with('\\') {
                    continue;
                }
                if language.line_comment == Some(token) {
                    break;
                }
                if language.block_comment.map(|(open, _)| open) == Some(token) {
                    state.modes.push(LexMode::BlockComment);
                    continue;
                }
                if let Some(delimiter) = language.triple_quotes.iter().find(|q| **q == token) {
                    state.modes.push(LexMode::TripleString(*delimiter));
                    continue;
                }
                if let Some(delimiter) = language.quotes.iter().find(|q| **q == token) {
                    quote = Some(*delimiter);
                    continue;
                }
                if language.template_literals && token == "`" {
                    state.modes.push(LexMode::Template);
                    continue;
                }

                // `${` outside a template is a `$` followed by a brace
                let template = language.template_pair();
                let (token, column) = if token == template.open {
                    ("{", column + 1)
                } else {
                    (token, column)
                };

                if let Some(LexMode::TemplateExpr { depth }) = mode {
                    if token == "}" && depth == 0 {
                        state.modes.pop();
                        engine.push_close(BracketToken::new(
                            template.type_id,
                            false,
                            template.close,
                            index,
                            column,
                        ));
                        continue;
                    }
                    if let Some(LexMode::TemplateExpr { depth }) = state.modes.last_mut() {
                        match token {
                            "{" => *depth += 1,
                            "}" => *depth -= 1,
                            _ => {}
                        }
                    }
                }

                let Some((pair, is_open)) = language.bracket(token) else {
                    continue;
                };
                if pair.type_id == ANGLE {
                    let kind = if is_open {
                        ScopeKind::TypeParameterOpen
                    } else {
                        ScopeKind::TypeParameterClose
                    };
                    if !scopes.starts_at(column, kind) {
                        continue;
                    }
                }

                let character = if is_open { pair.open } else { pair.close };
                let mut bracket = BracketToken::new(pair.type_id, is_open, character, index, column);
                if is_open {
                    bracket.object_literal =
                        pair.type_id == CURLY && scopes.starts_at(column, ScopeKind::ObjectLiteral);
                    engine.push_open(bracket);
                } else {
                    engine.push_close(bracket);
                }
            }
        }
    }

    let preview_tokens = preview_tokens(index, text, scopes);
    let fingerprint = engine.fingerprint();
    LineRecord {
        index,
        carried_in: carried_in.clone(),
        carried_out: state,
        engine,
        preview_tokens,
        fingerprint,
    }
}

fn preview_tokens(index: usize, text: &str, scopes: &LineScopes) -> Vec<PreviewToken> {
    scopes
        .parameters()
        .into_iter()
        .filter(|span| span.end > span.start)
        .map(|span| PreviewToken {
            text: text
                .chars()
                .skip(span.start)
                .take(span.end - span.start)
                .collect(),
            line: index,
            column: span.start,
        })
        .collect()
}
