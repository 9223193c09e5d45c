// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Lexer for script bodies
//!
//! Splits a body into literal text and `{{ ... }}` actions, then tokenizes
//! the inside of each action.

use crate::errors::{RenderError, RenderResult};

/// A literal run or an action, before parsing
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Action { tokens: Vec<Token>, line: usize },
}

/// Token inside an action
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `.` or `.a.b`
    Field(Vec<String>),
    /// `$`, `$name` or `$name.a.b`; the name is empty for `$`
    Variable(String, Vec<String>),
    Ident(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Pipe,
    LParen,
    RParen,
    Declare,
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Split `source` into segments, applying `{{-` and `-}}` trimming
pub fn segments(source: &str) -> RenderResult<Vec<Segment>> {
    let mut out = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next_text = false;

    while let Some(start) = rest.find(OPEN) {
        let mut text = &rest[..start];
        if trim_next_text {
            text = text.trim_start();
        }
        line += rest[..start].matches('\n').count();

        let after_open = &rest[start + OPEN.len()..];
        let end = find_close(after_open).ok_or_else(|| {
            RenderError::render(format!("line {}: unclosed action", line))
        })?;
        let mut inner = &after_open[..end];

        let trim_left = inner.starts_with('-')
            && inner[1..].starts_with(|c: char| c.is_whitespace());
        if trim_left {
            inner = &inner[1..];
            text = text.trim_end();
        }

        trim_next_text = inner.ends_with('-')
            && inner[..inner.len() - 1].ends_with(|c: char| c.is_whitespace());
        if trim_next_text {
            inner = &inner[..inner.len() - 1];
        }

        if !text.is_empty() {
            out.push(Segment::Text(text.to_string()));
        }

        let tokens = tokenize(inner, line)?;
        out.push(Segment::Action { tokens, line });

        line += inner.matches('\n').count();
        rest = &after_open[end + CLOSE.len()..];
    }

    let tail = if trim_next_text { rest.trim_start() } else { rest };
    if !tail.is_empty() {
        out.push(Segment::Text(tail.to_string()));
    }

    Ok(out)
}

/// Position of the closing `}}`, skipping string literals
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q == b'"' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'`' {
                    quote = Some(b);
                } else if s[i..].starts_with(CLOSE) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize the inside of one action
pub fn tokenize(input: &str, line: usize) -> RenderResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let err = |msg: String| RenderError::render(format!("line {}: {}", line, msg));

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            ':' if chars.get(pos + 1) == Some(&'=') => {
                tokens.push(Token::Declare);
                pos += 2;
            }
            '.' => {
                let (path, next) = read_path(&chars, pos);
                tokens.push(Token::Field(path));
                pos = next;
            }
            '$' => {
                let mut end = pos + 1;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[pos + 1..end].iter().collect();
                let (path, next) = if chars.get(end) == Some(&'.') {
                    read_path(&chars, end)
                } else {
                    (Vec::new(), end)
                };
                tokens.push(Token::Variable(name, path));
                pos = next;
            }
            '"' => {
                let mut text = String::new();
                pos += 1;
                loop {
                    match chars.get(pos) {
                        None => return Err(err("unterminated string".into())),
                        Some('"') => break,
                        Some('\\') => {
                            let escaped = match chars.get(pos + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('r') => '\r',
                                Some('"') => '"',
                                Some('\\') => '\\',
                                Some(other) => {
                                    return Err(err(format!("unknown escape \\{}", other)));
                                }
                                None => return Err(err("unterminated string".into())),
                            };
                            text.push(escaped);
                            pos += 2;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            pos += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
                pos += 1;
            }
            '`' => {
                let start = pos + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '`')
                    .map(|p| start + p)
                    .ok_or_else(|| err("unterminated raw string".into()))?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                pos = end + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(pos + 1).is_some_and(char::is_ascii_digit)) => {
                let start = pos;
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let n = text
                    .parse()
                    .map_err(|_| err(format!("bad number {}", text)))?;
                tokens.push(Token::Int(n));
            }
            c if is_ident_char(c) => {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                tokens.push(match word.as_str() {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
            }
            other => return Err(err(format!("unexpected character {:?}", other))),
        }
    }

    Ok(tokens)
}

/// Read `.a.b.c` starting at a dot; a lone dot yields an empty path
fn read_path(chars: &[char], mut pos: usize) -> (Vec<String>, usize) {
    let mut path = Vec::new();
    while chars.get(pos) == Some(&'.') {
        let start = pos + 1;
        let mut end = start;
        while end < chars.len() && (is_ident_char(chars[end]) || chars[end] == '-') {
            end += 1;
        }
        if end == start {
            pos = start;
            break;
        }
        path.push(chars[start..end].iter().collect());
        pos = end;
    }
    (path, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_actions() {
        let segs = segments("echo {{ .name }} done").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Text("echo ".into()),
                Segment::Action {
                    tokens: vec![Token::Field(vec!["name".into()])],
                    line: 1
                },
                Segment::Text(" done".into()),
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        let segs = segments("a  \n  {{- .x -}}  \n  b").unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], Segment::Text("a".into()));
        assert_eq!(segs[2], Segment::Text("b".into()));
    }

    #[test]
    fn test_negative_number_is_not_trim_marker() {
        let tokens = tokenize("replace .x \"a\" \"b\" -1", 1).unwrap();
        assert_eq!(tokens.last(), Some(&Token::Int(-1)));
    }

    #[test]
    fn test_closing_braces_inside_string() {
        let segs = segments(r#"{{ replace .x "}}" "" }}"#).unwrap();
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_variables_and_declare() {
        let tokens = tokenize("range $i := $.items.all", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("range".into()),
                Token::Variable("i".into(), vec![]),
                Token::Declare,
                Token::Variable(String::new(), vec!["items".into(), "all".into()]),
            ]
        );
    }

    #[test]
    fn test_unclosed_action() {
        let err = segments("echo {{ .x ").unwrap_err();
        assert!(err.is_render_error());
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\"b\n""#, 1).unwrap();
        assert_eq!(tokens, vec![Token::Str("a\"b\n".into())]);
    }
}
