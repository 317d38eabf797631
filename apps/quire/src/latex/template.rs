//! Placeholder templates: `{{path.to.value}}` scalars and `{{#key}} ... {{/key}}` sections.
//!
//! # Rules
//! - Scalars resolve by dot-path against the current scope. Missing or null values
//!   render as nothing. Strings are escaped for the template's dialect. Numbers,
//!   booleans and nested structures render as their JSON text, escaped the same way.
//! - A section renders its body once per element of an array, joined by `\n`. Inside
//!   the body the scope is the element, and `{{.}}` is the element itself. Anything
//!   other than an array renders the whole section as nothing.
//! - Section keys are looked up as written, then lowercased.
//! - `{{` that does not start a well-formed tag is literal text, since LaTeX sources
//!   contain `{{` routinely.
//!
//! Templates are parsed up front. Unbalanced or same-key nested sections are rejected
//! at parse time, so rendering a parsed template cannot fail.

use serde_json::Value;
use thiserror::Error;

use crate::latex::escape::Dialect;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template '{template}': section '{key}' opened on line {line} is never closed")]
    UnclosedSection {
        template: String,
        key: String,
        line: usize,
    },

    #[error("template '{template}': closing tag for '{key}' on line {line} has no open section")]
    UnexpectedClose {
        template: String,
        key: String,
        line: usize,
    },

    #[error("template '{template}': expected close of '{expected}' but found '{found}' on line {line}")]
    MismatchedClose {
        template: String,
        expected: String,
        found: String,
        line: usize,
    },

    #[error("template '{template}': section '{key}' on line {line} is nested inside a section with the same key")]
    NestedSection {
        template: String,
        key: String,
        line: usize,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Parsed representation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(Vec<String>),
    Current,
    Section { key: Vec<String>, body: Vec<Node> },
}

enum Tag<'a> {
    Var(&'a str),
    Current,
    Open(&'a str),
    Close(&'a str),
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_path(s: &str) -> bool {
    s.split('.').all(is_segment)
}

fn classify(inner: &str) -> Option<Tag<'_>> {
    let inner = inner.trim();
    if inner == "." {
        return Some(Tag::Current);
    }
    if let Some(key) = inner.strip_prefix('#') {
        return is_path(key.trim()).then(|| Tag::Open(key.trim()));
    }
    if let Some(key) = inner.strip_prefix('/') {
        return is_path(key.trim()).then(|| Tag::Close(key.trim()));
    }
    is_path(inner).then_some(Tag::Var(inner))
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

struct Frame {
    key: String,
    line: usize,
    nodes: Vec<Node>,
}

/// The node list new content goes into: the innermost open section, or the root.
fn current<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => &mut frame.nodes,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(existing)) = nodes.last_mut() {
        existing.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

fn parse(name: &str, source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find("{{") {
        let start = pos + found;
        let Some(close_rel) = source[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close_rel;
        let Some(tag) = classify(&source[start + 2..end]) else {
            // Not a tag: keep one brace and rescan from the next character.
            push_text(current(&mut root, &mut stack), &source[pos..=start]);
            pos = start + 1;
            continue;
        };

        push_text(current(&mut root, &mut stack), &source[pos..start]);
        pos = end + 2;

        match tag {
            Tag::Var(path) => current(&mut root, &mut stack).push(Node::Var(split_path(path))),
            Tag::Current => current(&mut root, &mut stack).push(Node::Current),
            Tag::Open(key) => {
                let line = line_at(source, start);
                if stack.iter().any(|f| f.key == key) {
                    return Err(TemplateError::NestedSection {
                        template: name.to_string(),
                        key: key.to_string(),
                        line,
                    });
                }
                stack.push(Frame {
                    key: key.to_string(),
                    line,
                    nodes: Vec::new(),
                });
            }
            Tag::Close(key) => {
                let line = line_at(source, start);
                let Some(frame) = stack.pop() else {
                    return Err(TemplateError::UnexpectedClose {
                        template: name.to_string(),
                        key: key.to_string(),
                        line,
                    });
                };
                if frame.key != key {
                    return Err(TemplateError::MismatchedClose {
                        template: name.to_string(),
                        expected: frame.key,
                        found: key.to_string(),
                        line,
                    });
                }
                let section = Node::Section {
                    key: split_path(&frame.key),
                    body: frame.nodes,
                };
                current(&mut root, &mut stack).push(section);
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(TemplateError::UnclosedSection {
            template: name.to_string(),
            key: frame.key,
            line: frame.line,
        });
    }

    push_text(&mut root, &source[pos..]);
    Ok(root)
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Resolves a dot-path against a scope. Any missing segment yields `None`.
fn resolve<'a>(scope: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(scope, |value, segment| value.get(segment.as_str()))
}

fn resolve_section<'a>(scope: &'a Value, key: &[String]) -> Option<&'a Value> {
    resolve(scope, key).or_else(|| {
        let folded: Vec<String> = key.iter().map(|s| s.to_lowercase()).collect();
        resolve(scope, &folded)
    })
}

fn write_scalar(value: Option<&Value>, dialect: Dialect, out: &mut String) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => out.push_str(&dialect.escape(s)),
        Some(other) => out.push_str(&dialect.escape(&other.to_string())),
    }
}

fn render_nodes(nodes: &[Node], scope: &Value, dialect: Dialect, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => write_scalar(resolve(scope, path), dialect, out),
            Node::Current => write_scalar(Some(scope), dialect, out),
            Node::Section { key, body } => {
                if let Some(Value::Array(items)) = resolve_section(scope, key) {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push('\n');
                        }
                        render_nodes(body, item, dialect, out);
                    }
                }
            }
        }
    }
}

/// A parsed, immutable template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    dialect: Dialect,
    nodes: Vec<Node>,
}

impl Template {
    /// Parses a LaTeX template, rejecting malformed section syntax.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let nodes = parse(&name, source)?;
        Ok(Self {
            name,
            dialect: Dialect::Latex,
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitutes `data` into the template.
    pub fn render(&self, data: &Value) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, data, self.dialect, &mut out);
        out
    }
}

/// Parses and renders a LaTeX template in one call.
pub fn render_template(source: &str, data: &Value) -> Result<String, TemplateError> {
    Ok(Template::parse("inline", source)?.render(data))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
