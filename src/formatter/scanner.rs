// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Brace and quote aware tokenizer

/// Token class of the formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LeftBrace,
    RightBrace,
    Eol,
    SingleQuoted(String),
    DoubleQuoted(String),
    TripleSingleQuoted(String),
    TripleDoubleQuoted(String),
    Other(String),
}

impl Token {
    fn text(&self) -> Option<&str> {
        match self {
            Token::SingleQuoted(s)
            | Token::DoubleQuoted(s)
            | Token::TripleSingleQuoted(s)
            | Token::TripleDoubleQuoted(s)
            | Token::Other(s) => Some(s),
            _ => None,
        }
    }

    /// Other text that is not just horizontal whitespace
    pub fn is_meaningful_text(&self) -> bool {
        matches!(self, Token::Other(s) if !s.trim().is_empty())
    }
}

/// Whether the character at `pos` is escaped by an odd run of backslashes
fn is_escaped(chars: &[char], pos: usize) -> bool {
    chars[..pos].iter().rev().take_while(|c| **c == '\\').count() % 2 == 1
}

fn starts_with(chars: &[char], pos: usize, pattern: &str) -> bool {
    let mut i = pos;
    for p in pattern.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

/// End (exclusive) of a quoted literal opened at `pos`
///
/// Single-line literals stop before an unescaped newline when unterminated.
fn literal_end(chars: &[char], pos: usize, delimiter: &str) -> usize {
    let width = delimiter.chars().count();
    let multiline = width == 3;
    let mut i = pos + width;

    while i < chars.len() {
        if !multiline && chars[i] == '\n' {
            return i;
        }
        if starts_with(chars, i, delimiter) && !is_escaped(chars, i) {
            return i + width;
        }
        i += 1;
    }
    chars.len()
}

/// Split `source` into tokens, coalescing literals into preceding text
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let token = match chars[pos] {
            '{' => {
                pos += 1;
                Token::LeftBrace
            }
            '}' => {
                pos += 1;
                Token::RightBrace
            }
            '\n' => {
                pos += 1;
                Token::Eol
            }
            '\'' | '"' => {
                let quote = chars[pos];
                let triple = starts_with(&chars, pos, if quote == '\'' { "'''" } else { "\"\"\"" });
                let delimiter = match (quote, triple) {
                    ('\'', true) => "'''",
                    ('\'', false) => "'",
                    (_, true) => "\"\"\"",
                    (_, false) => "\"",
                };
                let end = literal_end(&chars, pos, delimiter);
                let text: String = chars[pos..end].iter().collect();
                pos = end;
                match (quote, triple) {
                    ('\'', true) => Token::TripleSingleQuoted(text),
                    ('\'', false) => Token::SingleQuoted(text),
                    (_, true) => Token::TripleDoubleQuoted(text),
                    (_, false) => Token::DoubleQuoted(text),
                }
            }
            _ => {
                let start = pos;
                while pos < chars.len() && !matches!(chars[pos], '{' | '}' | '\n' | '\'' | '"') {
                    pos += 1;
                }
                Token::Other(chars[start..pos].iter().collect())
            }
        };

        if let (Some(Token::Other(prev)), Some(text)) = (tokens.last_mut(), token.text()) {
            prev.push_str(text);
            continue;
        }
        tokens.push(token);
    }

    tokens
}
