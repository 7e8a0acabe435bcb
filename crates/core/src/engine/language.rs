//! Per-language bracket, comment and string tables.

use crate::models::Language;
use regex::Regex;

pub const PAREN: u16 = 0;
pub const SQUARE: u16 = 1;
pub const CURLY: u16 = 2;
pub const ANGLE: u16 = 3;
pub const TEMPLATE: u16 = 4;

/// One kind of bracket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPairDef {
    pub type_id: u16,
    pub open: &'static str,
    pub close: &'static str,
}

const PAREN_PAIR: BracketPairDef = BracketPairDef {
    type_id: PAREN,
    open: "(",
    close: ")",
};
const SQUARE_PAIR: BracketPairDef = BracketPairDef {
    type_id: SQUARE,
    open: "[",
    close: "]",
};
const CURLY_PAIR: BracketPairDef = BracketPairDef {
    type_id: CURLY,
    open: "{",
    close: "}",
};
const ANGLE_PAIR: BracketPairDef = BracketPairDef {
    type_id: ANGLE,
    open: "<",
    close: ">",
};
const TEMPLATE_PAIR: BracketPairDef = BracketPairDef {
    type_id: TEMPLATE,
    open: "${",
    close: "}",
};

const C_BLOCK: (&str, &str) = ("/*", "*/");
const C_QUOTES: &[&str] = &["\"", "'"];
const JSON_QUOTES: &[&str] = &["\""];
const PY_TRIPLE_QUOTES: &[&str] = &["\"\"\"", "'''"];
const NO_QUOTES: &[&str] = &[];

/// Lexical rules the line scanner needs for one language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    pub language: Language,
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Quotes that open strings ending at the matching quote or end of line
    pub quotes: &'static [&'static str],
    /// Quotes that open strings spanning lines
    pub triple_quotes: &'static [&'static str],
    /// Backtick templates with `${ }` expressions
    pub template_literals: bool,
    /// `<`/`>` are candidates, matched only where classified as type parameters
    pub generics: bool,
    token_pattern: Regex,
}

impl LanguageConfig {
    pub fn for_language(language: Language) -> Result<Self, regex::Error> {
        let (line_comment, block_comment, quotes, triple_quotes, template_literals, generics) =
            match language {
                Language::JavaScript | Language::TypeScript => {
                    (Some("//"), Some(C_BLOCK), C_QUOTES, NO_QUOTES, true, true)
                }
                Language::Python => (Some("#"), None, C_QUOTES, PY_TRIPLE_QUOTES, false, false),
                Language::Json => (Some("//"), Some(C_BLOCK), JSON_QUOTES, NO_QUOTES, false, false),
                Language::PlainText => (None, None, NO_QUOTES, NO_QUOTES, false, false),
            };

        let mut tokens: Vec<&str> = Vec::new();
        tokens.extend(line_comment);
        if let Some((open, close)) = block_comment {
            tokens.push(open);
            tokens.push(close);
        }
        tokens.extend(triple_quotes.iter().copied());
        tokens.extend(quotes.iter().copied());
        if template_literals {
            tokens.push("`");
            tokens.push(TEMPLATE_PAIR.open);
        }
        for pair in bracket_pairs(generics) {
            tokens.push(pair.open);
            tokens.push(pair.close);
        }

        Ok(Self {
            language,
            line_comment,
            block_comment,
            quotes,
            triple_quotes,
            template_literals,
            generics,
            token_pattern: Regex::new(&token_alternation(tokens))?,
        })
    }

    /// Bracket pairs recognised in code, excluding template delimiters.
    pub fn brackets(&self) -> Vec<BracketPairDef> {
        bracket_pairs(self.generics)
    }

    pub fn template_pair(&self) -> BracketPairDef {
        TEMPLATE_PAIR
    }

    /// Look up a bracket character; returns its pair and whether it opens.
    pub fn bracket(&self, text: &str) -> Option<(BracketPairDef, bool)> {
        self.brackets().into_iter().find_map(|pair| {
            if pair.open == text {
                Some((pair, true))
            } else if pair.close == text {
                Some((pair, false))
            } else {
                None
            }
        })
    }

    /// Regex matching every token the scanner reacts to, longest first.
    pub fn token_pattern(&self) -> &Regex {
        &self.token_pattern
    }
}

fn bracket_pairs(generics: bool) -> Vec<BracketPairDef> {
    let mut pairs = vec![PAREN_PAIR, SQUARE_PAIR, CURLY_PAIR];
    if generics {
        pairs.push(ANGLE_PAIR);
    }
    pairs
}

/// Escapes first, then literal tokens longest first so `"""` beats `"`.
fn token_alternation(mut tokens: Vec<&str>) -> String {
    tokens.sort_by_key(|token| std::cmp::Reverse(token.len()));
    tokens.dedup();

    let mut alternatives = vec![r"\\.".to_string()];
    alternatives.extend(tokens.into_iter().map(regex::escape));
    alternatives.join("|")
}
