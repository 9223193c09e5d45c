// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Script body substitution
//!
//! Task template bodies are text with `{{ ... }}` actions that read the
//! task's argument values. Supported actions are value output, `if`/`else`
//! and `range`, each taking a pipeline of operands and functions such as
//! `split`, `replace`, `join` and `eq`.
//!
//! ```
//! use pipewright::script::Template;
//! use serde_json::json;
//!
//! let template = Template::parse(r#"echo "{{ .args.name }}""#).unwrap();
//! let out = template.render(&json!({"args": {"name": "app"}})).unwrap();
//! assert_eq!(out, r#"echo "app""#);
//! ```

mod eval;
mod lexer;
mod parser;

use serde_json::Value;

use crate::errors::RenderResult;
use parser::Node;

/// A parsed script body
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a body; syntax problems are render errors
    pub fn parse(source: &str) -> RenderResult<Self> {
        let nodes = parser::parse(lexer::segments(source)?)?;
        Ok(Self { nodes })
    }

    /// Substitute `data` into the body
    pub fn render(&self, data: &Value) -> RenderResult<String> {
        let mut out = String::new();
        let mut scope = eval::Scope::new(data);
        eval::execute(&self.nodes, &mut scope, &mut out)?;
        Ok(out)
    }
}

/// Parse and render in one step
pub fn render(source: &str, data: &Value) -> RenderResult<String> {
    Template::parse(source)?.render(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(render("sh 'make'", &json!({})).unwrap(), "sh 'make'");
    }

    #[test]
    fn test_value_printing() {
        let data = json!({"s": "x", "n": 3, "b": true, "nil": null, "list": [1, 2]});
        let out = render("{{.s}}|{{.n}}|{{.b}}|{{.nil}}|{{.list}}", &data).unwrap();
        assert_eq!(out, "x|3|true||[1,2]");
    }

    #[test]
    fn test_missing_key_prints_empty() {
        assert_eq!(render("[{{ .args.none }}]", &json!({"args": {}})).unwrap(), "[]");
    }

    #[test]
    fn test_if_else_on_boolean_argument() {
        let body = "{{ if .args.push }}docker push{{ else }}echo skip{{ end }}";
        assert_eq!(render(body, &json!({"args": {"push": true}})).unwrap(), "docker push");
        assert_eq!(render(body, &json!({"args": {"push": false}})).unwrap(), "echo skip");
    }

    #[test]
    fn test_range_over_split() {
        let body = r#"{{- range $t := split .args.tags "," }}
tag {{ $t }}
{{- end }}"#;
        let out = render(body, &json!({"args": {"tags": "a,b"}})).unwrap();
        assert_eq!(out, "\ntag a\ntag b");
    }

    #[test]
    fn test_range_else_on_empty() {
        let out = render("{{ range .items }}x{{ else }}none{{ end }}", &json!({"items": []})).unwrap();
        assert_eq!(out, "none");
    }

    #[test]
    fn test_range_rebinds_dot_and_keeps_root() {
        let data = json!({"prefix": "p", "items": [{"n": 1}, {"n": 2}]});
        let out = render("{{ range .items }}{{ $.prefix }}{{ .n }} {{ end }}", &data).unwrap();
        assert_eq!(out, "p1 p2 ");
    }

    #[test]
    fn test_replace_and_join() {
        let data = json!({"path": "a/b/c", "list": ["x", "y"]});
        assert_eq!(render(r#"{{ replace .path "/" "-" }}"#, &data).unwrap(), "a-b-c");
        assert_eq!(render(r#"{{ replace .path "/" "-" 1 }}"#, &data).unwrap(), "a-b/c");
        assert_eq!(render(r#"{{ .list | join "," }}"#, &data).unwrap(), "x,y");
    }

    #[test]
    fn test_piped_value_is_the_subject() {
        let data = json!({"path": "a/b/c", "tags": "1.0,latest", "n": 3});
        assert_eq!(render(r#"{{ .path | replace "/" "-" }}"#, &data).unwrap(), "a-b-c");
        assert_eq!(render(r#"{{ .tags | split "," | join "+" }}"#, &data).unwrap(), "1.0+latest");
        assert_eq!(render(r#"{{ .tags | split "," | len }}"#, &data).unwrap(), "2");
        assert_eq!(render(r#"{{ if .n | eq 3 }}three{{ end }}"#, &data).unwrap(), "three");
        assert_eq!(render(r#"{{ join (split .tags ",") "-" }}"#, &data).unwrap(), "1.0-latest");
    }

    #[test]
    fn test_eq_on_system_value() {
        let data = json!({"_system_": {"scm": {"type": "GIT"}}});
        let body = r#"{{ if eq ._system_.scm.type "GIT" }}git{{ end }}"#;
        assert_eq!(render(body, &data).unwrap(), "git");
    }

    #[test]
    fn test_len_and_index() {
        let data = json!({"m": {"k": "v"}, "a": [10, 20]});
        assert_eq!(render(r#"{{ index .m "k" }}{{ index .a 1 }}{{ len .a }}"#, &data).unwrap(), "v202");
    }

    #[test]
    fn test_render_errors() {
        let data = json!({"s": "text"});
        assert!(render("{{ .s.inner }}", &data).unwrap_err().is_render_error());
        assert!(render("{{ nosuch .s }}", &data).unwrap_err().is_render_error());
        assert!(render("{{ range .s }}{{ end }}", &data).unwrap_err().is_render_error());
        assert!(render("{{ if .s }}", &data).unwrap_err().is_render_error());
        assert!(render("{{ $undefined }}", &data).unwrap_err().is_render_error());
    }

    #[test]
    fn test_template_reuse() {
        let template = Template::parse("{{ .n }}").unwrap();
        assert_eq!(template.render(&json!({"n": 1})).unwrap(), "1");
        assert_eq!(template.render(&json!({"n": 2})).unwrap(), "2");
    }
}
