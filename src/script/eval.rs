// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Evaluation of parsed script bodies

use serde_json::Value;

use super::parser::{Command, Node, Operand, Pipeline};
use crate::errors::{RenderError, RenderResult};
use crate::value;

/// Evaluation state: the current value, the root value and bound variables
pub struct Scope<'a> {
    root: &'a Value,
    dot: Value,
    variables: Vec<(String, Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            dot: root.clone(),
            variables: Vec::new(),
        }
    }

    fn variable(&self, name: &str, line: usize) -> RenderResult<&Value> {
        if name.is_empty() {
            return Ok(self.root);
        }
        self.variables
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| error(line, format!("undefined variable ${}", name)))
    }
}

fn error(line: usize, message: impl std::fmt::Display) -> RenderError {
    RenderError::render(format!("line {}: {}", line, message))
}

/// Render nodes into `out`
pub fn execute(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> RenderResult<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(pipeline) => {
                let v = eval_pipeline(pipeline, scope)?;
                out.push_str(&value::display(&v));
            }
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = if value::is_truthy(&eval_pipeline(condition, scope)?) {
                    then
                } else {
                    otherwise
                };
                execute(branch, scope, out)?;
            }
            Node::Range {
                variable,
                source,
                body,
                otherwise,
            } => {
                let items: Vec<Value> = match eval_pipeline(source, scope)? {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items,
                    Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
                    other => {
                        return Err(error(
                            source.line,
                            format!("range can't iterate over {}", value::type_name(&other)),
                        ))
                    }
                };

                if items.is_empty() {
                    execute(otherwise, scope, out)?;
                    continue;
                }

                let saved = scope.dot.clone();
                for item in items {
                    if let Some(name) = variable {
                        scope.variables.push((name.clone(), item.clone()));
                    }
                    scope.dot = item;
                    let result = execute(body, scope, out);
                    if variable.is_some() {
                        scope.variables.pop();
                    }
                    result?;
                }
                scope.dot = saved;
            }
        }
    }
    Ok(())
}

/// Functions whose first argument is the value they work on; a piped value
/// fills that slot instead of being appended
const SUBJECT_FIRST: &[&str] = &["split", "replace", "join", "trim", "len", "index"];

fn eval_pipeline(pipeline: &Pipeline, scope: &Scope<'_>) -> RenderResult<Value> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, piped.take(), scope, pipeline.line)?);
    }
    Ok(piped.unwrap_or(Value::Null))
}

fn eval_command(
    command: &Command,
    piped: Option<Value>,
    scope: &Scope<'_>,
    line: usize,
) -> RenderResult<Value> {
    match command {
        Command::Value(operand) => {
            if piped.is_some() {
                return Err(error(line, "can't pipe a value into a non-function"));
            }
            eval_operand(operand, scope, line)
        }
        Command::Call { function, args } => {
            let mut values = args
                .iter()
                .map(|a| eval_operand(a, scope, line))
                .collect::<RenderResult<Vec<_>>>()?;
            if let Some(piped) = piped {
                if SUBJECT_FIRST.contains(&function.as_str()) {
                    values.insert(0, piped);
                } else {
                    values.push(piped);
                }
            }
            call(function, values, line)
        }
    }
}

fn eval_operand(operand: &Operand, scope: &Scope<'_>, line: usize) -> RenderResult<Value> {
    match operand {
        Operand::Field(path) => lookup(&scope.dot, path, line),
        Operand::Variable(name, path) => lookup(scope.variable(name, line)?, path, line),
        Operand::Str(s) => Ok(Value::String(s.clone())),
        Operand::Int(n) => Ok(Value::from(*n)),
        Operand::Bool(b) => Ok(Value::Bool(*b)),
        Operand::Nested(pipeline) => eval_pipeline(pipeline, scope),
    }
}

/// Walk `path` from `start`; missing keys give null
fn lookup(start: &Value, path: &[String], line: usize) -> RenderResult<Value> {
    let mut current = start;
    for key in path {
        current = match current {
            Value::Object(map) => match map.get(key) {
                Some(v) => v,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(error(
                    line,
                    format!("can't access field {} of {}", key, value::type_name(other)),
                ))
            }
        };
    }
    Ok(current.clone())
}

fn arity(function: &str, args: &[Value], min: usize, max: usize, line: usize) -> RenderResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(error(
            line,
            format!(
                "wrong number of args for {}: want {} got {}",
                function,
                expected,
                args.len()
            ),
        ));
    }
    Ok(())
}

fn text_arg(function: &str, v: &Value, line: usize) -> RenderResult<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(value::display(v)),
        other => Err(error(
            line,
            format!("{} expects a string, got {}", function, value::type_name(other)),
        )),
    }
}

/// Scalars compare by their printed form, containers structurally
fn equal(a: &Value, b: &Value) -> bool {
    let scalar = |v: &Value| !v.is_array() && !v.is_object();
    if scalar(a) && scalar(b) {
        value::display(a) == value::display(b) && a.is_null() == b.is_null()
    } else {
        a == b
    }
}

fn call(function: &str, args: Vec<Value>, line: usize) -> RenderResult<Value> {
    match function {
        "split" => {
            arity(function, &args, 2, 2, line)?;
            let s = text_arg(function, &args[0], line)?;
            let sep = text_arg(function, &args[1], line)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            };
            Ok(Value::Array(parts))
        }
        "replace" => {
            arity(function, &args, 3, 4, line)?;
            let s = text_arg(function, &args[0], line)?;
            let old = text_arg(function, &args[1], line)?;
            let new = text_arg(function, &args[2], line)?;
            let n = match args.get(3) {
                Some(v) => value::as_integer(v)
                    .ok_or_else(|| error(line, "replace count should be an integer"))?,
                None => -1,
            };
            let replaced = if n < 0 {
                s.replace(&old, &new)
            } else {
                s.replacen(&old, &new, n as usize)
            };
            Ok(Value::String(replaced))
        }
        "join" => {
            arity(function, &args, 2, 2, line)?;
            let sep = text_arg(function, &args[1], line)?;
            match &args[0] {
                Value::Array(items) => Ok(Value::String(
                    items.iter().map(value::display).collect::<Vec<_>>().join(&sep),
                )),
                Value::Null => Ok(Value::String(String::new())),
                other => Err(error(
                    line,
                    format!("join expects a list, got {}", value::type_name(other)),
                )),
            }
        }
        "trim" => {
            arity(function, &args, 1, 1, line)?;
            Ok(Value::String(text_arg(function, &args[0], line)?.trim().to_string()))
        }
        "eq" => {
            arity(function, &args, 2, 2, line)?;
            Ok(Value::Bool(equal(&args[0], &args[1])))
        }
        "ne" => {
            arity(function, &args, 2, 2, line)?;
            Ok(Value::Bool(!equal(&args[0], &args[1])))
        }
        "not" => {
            arity(function, &args, 1, 1, line)?;
            Ok(Value::Bool(!value::is_truthy(&args[0])))
        }
        "and" => {
            arity(function, &args, 2, usize::MAX, line)?;
            let last = args.len() - 1;
            Ok(args
                .into_iter()
                .enumerate()
                .find(|(i, v)| !value::is_truthy(v) || *i == last)
                .map(|(_, v)| v)
                .unwrap_or(Value::Null))
        }
        "or" => {
            arity(function, &args, 2, usize::MAX, line)?;
            let last = args.len() - 1;
            Ok(args
                .into_iter()
                .enumerate()
                .find(|(i, v)| value::is_truthy(v) || *i == last)
                .map(|(_, v)| v)
                .unwrap_or(Value::Null))
        }
        "len" => {
            arity(function, &args, 1, 1, line)?;
            let n = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                Value::Null => 0,
                other => {
                    return Err(error(
                        line,
                        format!("len of {} is undefined", value::type_name(other)),
                    ))
                }
            };
            Ok(Value::from(n))
        }
        "index" => {
            arity(function, &args, 2, 2, line)?;
            match (&args[0], &args[1]) {
                (Value::Object(map), key) => {
                    Ok(map.get(&value::display(key)).cloned().unwrap_or(Value::Null))
                }
                (Value::Array(items), key) => {
                    let i = value::as_integer(key)
                        .ok_or_else(|| error(line, "array index should be an integer"))?;
                    usize::try_from(i)
                        .ok()
                        .and_then(|i| items.get(i))
                        .cloned()
                        .ok_or_else(|| error(line, format!("index {} out of range", i)))
                }
                (Value::Null, _) => Ok(Value::Null),
                (other, _) => Err(error(
                    line,
                    format!("can't index {}", value::type_name(other)),
                )),
            }
        }
        unknown => Err(error(line, format!("function {:?} not defined", unknown))),
    }
}
