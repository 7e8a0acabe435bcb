//! Turns matched bracket pairs into folding ranges with collapsed text.
//!
//! Pairs are processed from the last close to the first so that any range
//! starting after a close bracket on the same line already exists when that
//! close is reached; this is what chaining relies on.

use crate::config::FoldingConfig;
use crate::document::Document;
use crate::models::{FoldingRange, MatchedBracketPair, PreviewToken};
use std::collections::HashMap;

const ELLIPSIS: &str = "…";

type Pos = (usize, usize);

/// Build folding ranges for `pairs`, merging `auxiliary` ranges into the result.
pub fn synthesize(
    document: &Document,
    pairs: &[MatchedBracketPair],
    tokens: &[PreviewToken],
    auxiliary: &[FoldingRange],
    config: &FoldingConfig,
) -> Vec<FoldingRange> {
    let mut synthesizer = Synthesizer::new(document, pairs, tokens, config);
    for range in auxiliary {
        synthesizer.register(range.clone());
    }

    let mut ordered: Vec<&MatchedBracketPair> = pairs.iter().collect();
    ordered.sort_by(|a, b| b.close.start().cmp(&a.close.start()));

    let mut ranges: Vec<FoldingRange> = Vec::with_capacity(ordered.len() + auxiliary.len());
    for pair in ordered {
        if !pair.spans_lines() {
            continue;
        }
        let range = synthesizer.to_folding_range(pair);
        synthesizer.register(range.clone());
        ranges.push(range);
    }

    ranges.retain(|range| range.start_line < range.end_line);
    ranges.extend(
        auxiliary
            .iter()
            .filter(|range| range.start_line < range.end_line)
            .cloned(),
    );
    ranges.sort_by_key(|range| (range.start_line, range.start_column.unwrap_or(usize::MAX)));
    ranges
}

struct Synthesizer<'a> {
    document: &'a Document,
    config: &'a FoldingConfig,
    pair_at: HashMap<Pos, &'a MatchedBracketPair>,
    token_at: HashMap<Pos, &'a PreviewToken>,
    range_at: HashMap<Pos, FoldingRange>,
    lines: HashMap<usize, Vec<char>>,
}

impl<'a> Synthesizer<'a> {
    fn new(
        document: &'a Document,
        pairs: &'a [MatchedBracketPair],
        tokens: &'a [PreviewToken],
        config: &'a FoldingConfig,
    ) -> Self {
        Self {
            document,
            config,
            pair_at: pairs.iter().map(|pair| (pair.open.start(), pair)).collect(),
            token_at: tokens
                .iter()
                .map(|token| ((token.line, token.column), token))
                .collect(),
            range_at: HashMap::new(),
            lines: HashMap::new(),
        }
    }

    fn line(&mut self, index: usize) -> &[char] {
        let document = self.document;
        self.lines
            .entry(index)
            .or_insert_with(|| document.line(index).chars().collect())
    }

    fn line_len(&mut self, index: usize) -> usize {
        self.line(index).len()
    }

    /// Make `range` a chaining target at its start position.
    fn register(&mut self, range: FoldingRange) {
        let column = match range.start_column {
            Some(column) => column,
            None => self.line_len(range.start_line),
        };
        self.range_at.insert((range.start_line, column), range);
    }

    fn to_folding_range(&mut self, pair: &MatchedBracketPair) -> FoldingRange {
        let show_brackets = self.config.show_folded_brackets;
        let mut end = pair.close.line - usize::from(!self.config.fold_closing_brackets);
        let mut text = self.collapsed_text(pair, false);

        if show_brackets {
            (end, text) = self.append_post_text(pair, text);
        }

        let range = FoldingRange::new(pair.open.line, end, text);
        if show_brackets {
            range.with_start_column(pair.open.column)
        } else {
            range
        }
    }

    fn collapsed_text(&mut self, pair: &MatchedBracketPair, shallow: bool) -> String {
        let mut text = ELLIPSIS.to_string();

        if self.config.show_folded_body_lines_count {
            text = lines_count_text(pair);
        }
        if self.config.show_function_parameters && pair.open.character == "(" {
            text = self.parameters_text(pair);
        }
        if self.config.show_object_previews && pair.open.object_literal && !shallow {
            text = self.object_preview_text(pair);
        }
        if self.config.show_folded_brackets {
            text = format!("{}{}{}", pair.open.character, text, pair.close.character);
        }
        text
    }

    /// Parameter names between the brackets, skipping nested `(` groups.
    fn parameters_text(&mut self, pair: &MatchedBracketPair) -> String {
        let mut params: Vec<String> = Vec::new();
        let (mut line, mut column) = (pair.open.line, pair.open.column + 1);
        let end = pair.close.end();

        while (line, column) < end {
            if let Some(nested) = self.pair_at.get(&(line, column)) {
                if nested.open.character == "(" {
                    (line, column) = nested.close.end();
                }
            }
            if let Some(token) = self.token_at.get(&(line, column)) {
                params.push(token.text.clone());
                column = token.end_column();
            }
            if column >= self.line_len(line) {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }

        if params.is_empty() {
            ELLIPSIS.to_string()
        } else {
            params.join(", ")
        }
    }

    /// First entry of an object literal, with nested brackets collapsed.
    fn object_preview_text(&mut self, pair: &MatchedBracketPair) -> String {
        let mut text = String::new();
        let mut found = false;
        let (mut line, mut column) = (pair.open.line, pair.open.column + 1);
        let stop = pair.close.start();

        while (line, column) < stop {
            if let Some((end, nested)) = self.shallow_text(line, column) {
                text.push_str(&nested);
                line = end + 1;
                break;
            }
            if column >= self.line_len(line) {
                line += 1;
                column = 0;
                if found {
                    break;
                }
                continue;
            }
            let ch = self.line(line)[column];
            if found || !ch.is_whitespace() {
                found = true;
                text.push(ch);
            }
            column += 1;
        }

        if line < pair.close.line {
            text.push_str(ELLIPSIS);
        }
        format!(" {} ", text)
    }

    fn shallow_text(&mut self, line: usize, column: usize) -> Option<(usize, String)> {
        let nested = *self.pair_at.get(&(line, column))?;
        if nested.is_empty() {
            return None;
        }
        let text = self.collapsed_text(nested, true);
        Some(self.append_post_text(nested, text))
    }

    /// Append what follows the close bracket on its line, chaining into a
    /// range that starts there when enabled.
    fn append_post_text(&mut self, pair: &MatchedBracketPair, mut text: String) -> (usize, String) {
        let (line, from) = pair.close.end();
        let mut end = line;
        let length = self.line_len(line);

        for column in from..length {
            if self.config.chain_folding_ranges {
                if let Some(chained) = self.range_at.get(&(line, column)) {
                    end = chained.end_line;
                    text.push_str(&chained.collapsed_text);
                    break;
                }
            }
            let ch = self.line(line)[column];
            text.push(ch);
        }
        (end, text)
    }
}

fn lines_count_text(pair: &MatchedBracketPair) -> String {
    let count = (pair.close.line - pair.open.line).saturating_sub(1);
    let noun = if count == 1 { "line" } else { "lines" };
    format!(" ⋯ {} {} ⋯ ", count, noun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::language::LanguageConfig;
    use crate::engine::lexer::ScanInput;
    use crate::engine::line_cache::LineCache;
    use crate::models::Language;
    use crate::parsers::{create_classifier, LexicalClassifier};
    use std::sync::Arc;

    fn ranges(language: Language, text: &str, config: &FoldingConfig) -> Vec<FoldingRange> {
        let document = Document::new("test", language, text);
        let mut classifier: Box<dyn LexicalClassifier> = create_classifier(language).unwrap();
        classifier.sync(&document, &[]).unwrap();
        let mut cache = LineCache::new(Arc::new(LanguageConfig::for_language(language).unwrap()));
        let input = ScanInput::new(&document, classifier.as_ref());
        cache.extend_to_end(&input).unwrap();
        synthesize(
            &document,
            &cache.matched_pairs(),
            &cache.all_tokens(),
            &[],
            config,
        )
    }

    fn summary(ranges: &[FoldingRange]) -> Vec<(usize, usize, Option<usize>, String)> {
        ranges
            .iter()
            .map(|r| (r.start_line, r.end_line, r.start_column, r.collapsed_text.clone()))
            .collect()
    }

    #[test]
    fn test_default_brackets_and_ellipsis() {
        let result = ranges(
            Language::JavaScript,
            "function f(a, b) {\n  return a+b;\n}",
            &FoldingConfig::default(),
        );
        assert_eq!(summary(&result), vec![(0, 2, Some(17), "{…}".to_string())]);
    }

    #[test]
    fn test_without_bracket_display() {
        let config = FoldingConfig::default().with_show_folded_brackets(false);
        let result = ranges(Language::JavaScript, "if (x) {\n  a();\n  b();\n}", &config);
        assert_eq!(summary(&result), vec![(0, 2, None, "…".to_string())]);

        let closing = config.with_fold_closing_brackets(true);
        let result = ranges(Language::JavaScript, "if (x) {\n  a();\n  b();\n}", &closing);
        assert_eq!(result[0].end_line, 3);
    }

    #[test]
    fn test_line_count_text() {
        let config = FoldingConfig::default().with_show_folded_body_lines_count(true);
        let result = ranges(Language::Python, "x = [\n  1,\n  2,\n]\ny = [\n  1,\n]", &config);
        assert_eq!(result[0].collapsed_text, "[ ⋯ 2 lines ⋯ ]");
        assert_eq!(result[1].collapsed_text, "[ ⋯ 1 line ⋯ ]");
    }

    #[test]
    fn test_multi_line_parameters_preview() {
        let config = FoldingConfig::default().with_show_function_parameters(true);
        let result = ranges(
            Language::JavaScript,
            "function f(\n  a,\n  b = g(c),\n) {\n  return a;\n}",
            &config,
        );
        assert_eq!(result[0].start_line, 0);
        assert_eq!(result[0].end_line, 5);
        assert_eq!(result[0].collapsed_text, "(a, b) {…}");
    }

    #[test]
    fn test_chaining_else_block() {
        let result = ranges(
            Language::JavaScript,
            "if (x) {\n  a();\n} else {\n  b();\n}",
            &FoldingConfig::default(),
        );
        assert_eq!(
            summary(&result),
            vec![
                (0, 4, Some(7), "{…} else {…}".to_string()),
                (2, 4, Some(7), "{…}".to_string()),
            ]
        );
    }

    #[test]
    fn test_chaining_disabled_keeps_literal_text() {
        let config = FoldingConfig::default().with_chain_folding_ranges(false);
        let result = ranges(
            Language::JavaScript,
            "if (x) {\n  a();\n} else {\n  b();\n}",
            &config,
        );
        assert_eq!(result[0].end_line, 2);
        assert_eq!(result[0].collapsed_text, "{…} else {");
    }

    #[test]
    fn test_object_preview_first_entry() {
        let config = FoldingConfig::default().with_show_object_previews(true);
        let result = ranges(Language::Json, "{\n  \"a\": 1,\n  \"b\": 2\n}", &config);
        assert_eq!(result[0].collapsed_text, "{ \"a\": 1,… }");
    }

    #[test]
    fn test_object_preview_embeds_nested_range() {
        let config = FoldingConfig::default()
            .with_show_object_previews(true)
            .with_fold_closing_brackets(true);
        let result = ranges(Language::Json, "{\n  {\n    1\n  }\n}", &config);
        assert_eq!(
            summary(&result),
            vec![
                (0, 4, Some(0), "{ {…} }".to_string()),
                (1, 3, Some(2), "{ 1 }".to_string()),
            ]
        );
    }

    #[test]
    fn test_auxiliary_ranges_are_chaining_targets() {
        let document = Document::new("t", Language::PlainText, "(\n  x\n) <div\n  y\n>");
        let open = crate::models::BracketToken::new(0, true, "(", 0, 0);
        let close = crate::models::BracketToken::new(0, false, ")", 2, 0);
        let aux = FoldingRange::new(2, 4, "<div>…").with_start_column(2);
        let result = synthesize(
            &document,
            &[MatchedBracketPair { open, close }],
            &[],
            std::slice::from_ref(&aux),
            &FoldingConfig::default(),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].end_line, 4);
        assert_eq!(result[0].collapsed_text, "(…) <div>…");
        assert_eq!(result[1], aux);
    }

    #[test]
    fn test_no_single_line_ranges() {
        let config = FoldingConfig::default().with_show_folded_brackets(false);
        let result = ranges(Language::Json, "[1, 2]\n{\n}\n[\n1\n]", &config);
        assert!(result.iter().all(|r| r.end_line > r.start_line));
        assert_eq!(result.len(), 1);
    }
}
