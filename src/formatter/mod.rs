// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Re-indentation of rendered pipeline scripts
//!
//! Braces outside string literals open and close indentation levels. Blank
//! lines are dropped, every `{` starts a new line after it and every `}`
//! sits on its own line. Literal text (including multi-line `'''` blocks) is
//! kept verbatim apart from its leading indentation.

mod scanner;

pub use scanner::{tokenize, Token};

/// Spaces per indentation level
pub const INDENT: usize = 4;

/// Pretty-printer over the token stream of one script
#[derive(Debug, Default)]
pub struct Formatter {
    depth: isize,
    lines: Vec<String>,
    line: String,
    line_depth: isize,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brace depth after the last formatted input; zero when balanced
    pub fn depth(&self) -> isize {
        self.depth
    }

    /// Format `source`, resetting any previous state
    pub fn format(&mut self, source: &str) -> String {
        *self = Self::default();

        let tokens = tokenize(source);
        for (i, token) in tokens.iter().enumerate() {
            let next = tokens.get(i + 1);
            match token {
                Token::LeftBrace => {
                    if !self.line.is_empty() && !self.line.ends_with(char::is_whitespace) {
                        self.line.push(' ');
                    }
                    self.write("{");
                    self.depth += 1;
                    if next != Some(&Token::Eol) {
                        self.newline();
                    }
                }
                Token::RightBrace => {
                    self.depth -= 1;
                    if !self.line.trim().is_empty() {
                        self.newline();
                    }
                    self.write("}");
                    if next.is_some_and(Token::is_meaningful_text) {
                        self.newline();
                    }
                }
                Token::Eol => self.newline(),
                Token::SingleQuoted(text)
                | Token::DoubleQuoted(text)
                | Token::TripleSingleQuoted(text)
                | Token::TripleDoubleQuoted(text)
                | Token::Other(text) => self.write(text),
            }
        }
        self.newline();

        if self.depth != 0 {
            tracing::debug!(depth = self.depth, "unbalanced braces in formatted script");
        }

        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn write(&mut self, text: &str) {
        let text = if self.line.trim().is_empty() {
            let trimmed = text.trim_start_matches([' ', '\t']);
            if trimmed.is_empty() {
                return;
            }
            self.line.clear();
            self.line_depth = self.depth;
            trimmed
        } else {
            text
        };
        self.line.push_str(text);
    }

    /// Finish the current line; blank lines are dropped
    fn newline(&mut self) {
        let content = self.line.trim_end();
        if !content.is_empty() {
            let indent = " ".repeat(INDENT * self.line_depth.max(0) as usize);
            self.lines.push(format!("{}{}", indent, content));
        }
        self.line.clear();
    }
}

/// Re-indent a script with [`INDENT`] spaces per brace level
pub fn format(source: &str) -> String {
    Formatter::new().format(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"pipeline{
agent any

	options{
disableConcurrentBuilds()
}
stages{
stage("build"){
steps{
sh 'make {all}'
sh """
  echo "{{ not a brace }}"
"""
}
}
}
}
"#;

    #[test]
    fn test_format_pipeline() {
        insta::assert_snapshot!(format(SCRIPT), @r###"
        pipeline {
            agent any
            options {
                disableConcurrentBuilds()
            }
            stages {
                stage("build") {
                    steps {
                        sh 'make {all}'
                        sh """
          echo "{{ not a brace }}"
        """
                    }
                }
            }
        }
        "###);
    }

    #[test]
    fn test_idempotent() {
        let once = format(SCRIPT);
        assert_eq!(format(&once), once);
    }

    #[test]
    fn test_existing_indentation_is_replaced() {
        let indented = "a {\n    b {\n        c\n    }\n}\n";
        assert_eq!(format(indented), indented);
        assert_eq!(format("a {\n b\n}\n"), "a {\n    b\n}\n");
        assert_eq!(format("a{\n\t\tb\n\t}"), "a {\n    b\n}\n");
    }

    #[test]
    fn test_balanced_depth() {
        let mut formatter = Formatter::new();
        formatter.format(SCRIPT);
        assert_eq!(formatter.depth(), 0);

        formatter.format("a{ b{ }");
        assert_eq!(formatter.depth(), 1);
    }

    #[test]
    fn test_no_blank_lines() {
        let out = format("a{\n\n\n b\n\n}\n\n\nc\n");
        assert!(!out.contains("\n\n"));
        assert_eq!(out, "a {\n    b\n}\nc\n");
    }

    #[test]
    fn test_inline_braces_are_split() {
        assert_eq!(
            format("when{ expression { a && b } }"),
            "when {\n    expression {\n        a && b\n    }\n}\n"
        );
    }

    #[test]
    fn test_text_after_closing_brace_moves_down() {
        assert_eq!(format("if (x) { a } else { b }"), "if (x) {\n    a\n}\nelse {\n    b\n}\n");
    }

    #[test]
    fn test_extra_closing_brace_does_not_panic() {
        let mut formatter = Formatter::new();
        let out = formatter.format("}\n}");
        assert_eq!(out, "}\n}\n");
        assert_eq!(formatter.depth(), -2);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(format(""), "");
        assert_eq!(format("\n\n"), "");
    }
}
