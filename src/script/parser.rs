// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Parser for script bodies

use super::lexer::{Segment, Token};
use crate::errors::{RenderError, RenderResult};

/// Parsed body node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Pipeline),
    If {
        condition: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        variable: Option<String>,
        source: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// Commands joined with `|`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Call { function: String, args: Vec<Operand> },
    Value(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Path from the current value
    Field(Vec<String>),
    /// Path from a variable; empty name is the root value
    Variable(String, Vec<String>),
    Str(String),
    Int(i64),
    Bool(bool),
    Nested(Box<Pipeline>),
}

/// What closed a block
enum Terminator {
    Else,
    End,
    Eof,
}

/// Parse lexed segments into a node list
pub fn parse(segments: Vec<Segment>) -> RenderResult<Vec<Node>> {
    let mut parser = Parser {
        segments: segments.into_iter(),
    };
    let (nodes, terminator, line) = parser.block()?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::Else => Err(error(line, "unexpected else")),
        Terminator::End => Err(error(line, "unexpected end")),
    }
}

fn error(line: usize, message: impl std::fmt::Display) -> RenderError {
    RenderError::render(format!("line {}: {}", line, message))
}

struct Parser {
    segments: std::vec::IntoIter<Segment>,
}

impl Parser {
    /// Nodes up to the next `else`, `end` or end of input
    fn block(&mut self) -> RenderResult<(Vec<Node>, Terminator, usize)> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.next() {
            let (tokens, line) = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Action { tokens, line } => (tokens, line),
            };

            match tokens.first() {
                None => return Err(error(line, "empty action")),
                Some(Token::Ident(word)) if word == "end" => {
                    expect_bare(&tokens, line)?;
                    return Ok((nodes, Terminator::End, line));
                }
                Some(Token::Ident(word)) if word == "else" => {
                    expect_bare(&tokens, line)?;
                    return Ok((nodes, Terminator::Else, line));
                }
                Some(Token::Ident(word)) if word == "if" => {
                    let condition = pipeline(&tokens[1..], line)?;
                    let (then, otherwise) = self.branches(line, "if")?;
                    nodes.push(Node::If {
                        condition,
                        then,
                        otherwise,
                    });
                }
                Some(Token::Ident(word)) if word == "range" => {
                    let (variable, rest) = match &tokens[1..] {
                        [Token::Variable(name, path), Token::Declare, rest @ ..] => {
                            if name.is_empty() || !path.is_empty() {
                                return Err(error(line, "invalid range variable"));
                            }
                            (Some(name.clone()), rest)
                        }
                        rest => (None, rest),
                    };
                    let source = pipeline(rest, line)?;
                    let (body, otherwise) = self.branches(line, "range")?;
                    nodes.push(Node::Range {
                        variable,
                        source,
                        body,
                        otherwise,
                    });
                }
                Some(_) => nodes.push(Node::Output(pipeline(&tokens, line)?)),
            }
        }

        Ok((nodes, Terminator::Eof, 0))
    }

    /// Body and optional `else` body of an `if` or `range`
    fn branches(&mut self, line: usize, keyword: &str) -> RenderResult<(Vec<Node>, Vec<Node>)> {
        let (first, terminator, _) = self.block()?;
        match terminator {
            Terminator::End => Ok((first, Vec::new())),
            Terminator::Else => {
                let (second, terminator, else_line) = self.block()?;
                match terminator {
                    Terminator::End => Ok((first, second)),
                    Terminator::Else => Err(error(else_line, "unexpected second else")),
                    Terminator::Eof => Err(error(line, format!("unclosed {{{{{}}}}}", keyword))),
                }
            }
            Terminator::Eof => Err(error(line, format!("unclosed {{{{{}}}}}", keyword))),
        }
    }
}

fn expect_bare(tokens: &[Token], line: usize) -> RenderResult<()> {
    if tokens.len() > 1 {
        return Err(error(line, "unexpected arguments after keyword"));
    }
    Ok(())
}

/// Parse a pipeline from a complete token slice
fn pipeline(tokens: &[Token], line: usize) -> RenderResult<Pipeline> {
    let mut pos = 0;
    let parsed = pipeline_at(tokens, &mut pos, line)?;
    if pos < tokens.len() {
        return Err(error(line, format!("unexpected {:?}", tokens[pos])));
    }
    Ok(parsed)
}

fn pipeline_at(tokens: &[Token], pos: &mut usize, line: usize) -> RenderResult<Pipeline> {
    let mut commands = vec![command(tokens, pos, line)?];
    while tokens.get(*pos) == Some(&Token::Pipe) {
        *pos += 1;
        commands.push(command(tokens, pos, line)?);
    }
    Ok(Pipeline { commands, line })
}

fn command(tokens: &[Token], pos: &mut usize, line: usize) -> RenderResult<Command> {
    match tokens.get(*pos) {
        None | Some(Token::Pipe) | Some(Token::RParen) => Err(error(line, "missing command")),
        Some(Token::Ident(function)) => {
            *pos += 1;
            let mut args = Vec::new();
            while let Some(token) = tokens.get(*pos) {
                if matches!(token, Token::Pipe | Token::RParen) {
                    break;
                }
                args.push(operand(tokens, pos, line)?);
            }
            Ok(Command::Call {
                function: function.clone(),
                args,
            })
        }
        Some(_) => {
            let value = operand(tokens, pos, line)?;
            match tokens.get(*pos) {
                None | Some(Token::Pipe) | Some(Token::RParen) => Ok(Command::Value(value)),
                Some(other) => Err(error(line, format!("unexpected {:?} after operand", other))),
            }
        }
    }
}

fn operand(tokens: &[Token], pos: &mut usize, line: usize) -> RenderResult<Operand> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| error(line, "missing operand"))?;
    *pos += 1;

    Ok(match token {
        Token::Field(path) => Operand::Field(path.clone()),
        Token::Variable(name, path) => Operand::Variable(name.clone(), path.clone()),
        Token::Str(s) => Operand::Str(s.clone()),
        Token::Int(n) => Operand::Int(*n),
        Token::Bool(b) => Operand::Bool(*b),
        Token::LParen => {
            let nested = pipeline_at(tokens, pos, line)?;
            if tokens.get(*pos) != Some(&Token::RParen) {
                return Err(error(line, "unclosed parenthesis"));
            }
            *pos += 1;
            Operand::Nested(Box::new(nested))
        }
        Token::Ident(name) => {
            return Err(error(
                line,
                format!("function {} used as an argument, wrap it in parentheses", name),
            ))
        }
        other => return Err(error(line, format!("unexpected {:?}", other))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::segments;

    fn parse_str(source: &str) -> RenderResult<Vec<Node>> {
        parse(segments(source)?)
    }

    #[test]
    fn test_pipeline_with_call() {
        let nodes = parse_str(r#"{{ .a | split "," }}"#).unwrap();
        let Node::Output(p) = &nodes[0] else {
            panic!("expected output node");
        };
        assert_eq!(p.commands.len(), 2);
        assert_eq!(
            p.commands[1],
            Command::Call {
                function: "split".into(),
                args: vec![Operand::Str(",".into())]
            }
        );
    }

    #[test]
    fn test_if_else_end() {
        let nodes = parse_str("{{ if .x }}a{{ else }}b{{ end }}").unwrap();
        let Node::If { then, otherwise, .. } = &nodes[0] else {
            panic!("expected if node");
        };
        assert_eq!(then, &vec![Node::Text("a".into())]);
        assert_eq!(otherwise, &vec![Node::Text("b".into())]);
    }

    #[test]
    fn test_range_with_variable() {
        let nodes = parse_str("{{ range $t := .tags }}{{ $t }}{{ end }}").unwrap();
        let Node::Range { variable, body, .. } = &nodes[0] else {
            panic!("expected range node");
        };
        assert_eq!(variable.as_deref(), Some("t"));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_nested_parens() {
        let nodes = parse_str(r#"{{ join (split .a ",") "-" }}"#).unwrap();
        let Node::Output(p) = &nodes[0] else {
            panic!("expected output node");
        };
        let Command::Call { args, .. } = &p.commands[0] else {
            panic!("expected call");
        };
        assert!(matches!(args[0], Operand::Nested(_)));
    }

    #[test]
    fn test_unbalanced_blocks() {
        assert!(parse_str("{{ if .x }}a").unwrap_err().is_render_error());
        assert!(parse_str("a{{ end }}").unwrap_err().is_render_error());
        assert!(parse_str("{{ else }}").is_err());
        assert!(parse_str("{{ if .x }}{{ else }}{{ else }}{{ end }}").is_err());
    }

    #[test]
    fn test_operand_followed_by_garbage() {
        assert!(parse_str("{{ .a .b }}").is_err());
        assert!(parse_str("{{ (.a }}").is_err());
    }
}
