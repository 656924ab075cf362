//! Minimal kubectl-style JSONPath
//!
//! Supports the forms wait conditions use in practice:
//! `{.status.phase}`, `$.status.replicas`, `.items[0].name`, `['odd-key']`,
//! and equality filters such as `.status.conditions[?(@.type=="Ready")].status`.

use serde_json::Value;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
    Filter { path: Vec<String>, expected: String },
}

/// A parsed JSONPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(input: &str) -> Result<Self> {
        let mut expr = input.trim();
        if let Some(inner) = expr.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
            expr = inner.trim();
        }
        if let Some(rest) = expr.strip_prefix('$') {
            expr = rest;
        }

        let error = |message: &str| CoreError::InvalidJsonPath {
            path: input.to_string(),
            message: message.to_string(),
        };

        let chars: Vec<char> = expr.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
                        end += 1;
                    }
                    if end == start {
                        return Err(error("empty field name"));
                    }
                    segments.push(Segment::Field(chars[start..end].iter().collect()));
                    i = end;
                }
                '[' => {
                    let close = find_closing(&chars, i).ok_or_else(|| error("unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(inner.trim()).ok_or_else(|| {
                        error(&format!("unsupported selector [{}]", inner))
                    })?);
                    i = close + 1;
                }
                c => return Err(error(&format!("unexpected character '{}'", c))),
            }
        }

        if segments.is_empty() {
            return Err(error("empty expression"));
        }

        Ok(Self {
            source: input.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First value the path selects, if any
    pub fn find<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Field(name) => current.get(name)?,
                Segment::Index(index) => current.get(*index)?,
                Segment::Filter { path, expected } => current
                    .as_array()?
                    .iter()
                    .find(|item| {
                        lookup(item, path).map(render).as_deref() == Some(expected.as_str())
                    })?,
            };
        }
        Some(current)
    }

    /// Render the selected value the way kubectl prints it
    pub fn render(&self, root: &Value) -> Option<String> {
        self.find(root).map(render)
    }
}

fn find_closing(chars: &[char], open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    if let Ok(index) = inner.parse::<usize>() {
        return Some(Segment::Index(index));
    }
    if let Some(name) = unquote(inner) {
        return Some(Segment::Field(name.to_string()));
    }

    // ?(@.a.b=="x")
    let filter = inner.strip_prefix('?')?.trim();
    let filter = filter.strip_prefix('(')?.strip_suffix(')')?.trim();
    let (lhs, rhs) = filter.split_once("==")?;
    let path = lhs
        .trim()
        .strip_prefix("@.")?
        .split('.')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if path.iter().any(String::is_empty) {
        return None;
    }
    let rhs = rhs.trim();
    let expected = unquote(rhs).unwrap_or(rhs).to_string();
    Some(Segment::Filter { path, expected })
}

fn unquote(s: &str) -> Option<&str> {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
