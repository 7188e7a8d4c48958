//! Path templates, as used by HTTP bindings, routing patterns, and resource
//! names.
//!
//! Grammar (the subset the services use):
//!
//! ```text
//! Template = { Text | "*" | "**" | Variable }
//! Variable = "{" FieldPath [ "=" Segments ] "}"
//! Segments = Segment { "/" Segment }
//! Segment  = "*" | "**" | LITERAL
//! ```
//!
//! A variable without `=` matches exactly one segment. `*` matches one
//! non-empty segment; `**` matches one or more segments.
//!
//! Expansion substitutes request fields into the template; capture runs the
//! other way and recovers field values from a concrete path. For any
//! template and any bindings that expansion accepts, capturing the expanded
//! path returns the same bindings.

use thiserror::Error;

use crate::errors::RpcError;

/// A template that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unbalanced braces in template '{0}'")]
    Unbalanced(String),
    #[error("empty variable in template '{0}'")]
    EmptyVariable(String),
    #[error("empty segment in variable pattern of template '{0}'")]
    EmptySegment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Star,
    DoubleStar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Wildcard { multi: bool },
    Variable { field: String, pattern: Vec<Segment> },
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    flush_literal(&mut literal, &mut pieces);
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(TemplateError::Unbalanced(source.to_string())),
                            c => body.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::Unbalanced(source.to_string()));
                    }
                    pieces.push(parse_variable(source, &body)?);
                }
                '}' => return Err(TemplateError::Unbalanced(source.to_string())),
                c => literal.push(c),
            }
        }
        flush_literal(&mut literal, &mut pieces);

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Field paths bound by the template's variables, in order.
    pub fn fields(&self) -> Vec<&str> {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Variable { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Substitutes every variable with the value `binding` returns for its
    /// field.
    ///
    /// Fails with `InvalidArgument` when a field is missing or empty, or
    /// when its value does not match the variable's pattern.
    pub fn expand<F>(&self, mut binding: F) -> Result<String, RpcError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Wildcard { .. } => {
                    return Err(RpcError::invalid_argument(format!(
                        "template '{}' has anonymous wildcards and cannot be expanded",
                        self.source
                    )));
                }
                Piece::Variable { field, pattern } => {
                    let value = binding(field).filter(|v| !v.is_empty()).ok_or_else(|| {
                        RpcError::invalid_argument(format!(
                            "missing required path parameter '{field}'"
                        ))
                    })?;
                    if !segments_match(pattern, &value) {
                        return Err(RpcError::invalid_argument(format!(
                            "value '{value}' of '{field}' does not match template '{}'",
                            self.source
                        )));
                    }
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    /// Expands from an ordered list of `(field, value)` pairs.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, RpcError> {
        self.expand(|field| {
            values
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, v)| (*v).to_string())
        })
    }

    /// Recovers variable bindings from a concrete path, or `None` if the path
    /// does not match.
    pub fn captures(&self, input: &str) -> Option<Vec<(String, String)>> {
        match_pieces(&self.pieces, input)
    }

    pub fn matches(&self, input: &str) -> bool {
        self.captures(input).is_some()
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_variable(source: &str, body: &str) -> Result<Piece, TemplateError> {
    let (field, pattern) = match body.split_once('=') {
        Some((field, pattern)) => (field.trim(), pattern.trim()),
        None => (body.trim(), "*"),
    };
    if field.is_empty() || pattern.is_empty() {
        return Err(TemplateError::EmptyVariable(source.to_string()));
    }
    let pattern = pattern
        .split('/')
        .map(|segment| match segment {
            "" => Err(TemplateError::EmptySegment(source.to_string())),
            "*" => Ok(Segment::Star),
            "**" => Ok(Segment::DoubleStar),
            lit => Ok(Segment::Literal(lit.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Piece::Variable {
        field: field.to_string(),
        pattern,
    })
}

/// Splits literal text into exact text and anonymous wildcard pieces.
fn flush_literal(literal: &mut String, pieces: &mut Vec<Piece>) {
    if literal.is_empty() {
        return;
    }
    let text = std::mem::take(literal);
    let mut pending = String::new();
    for (i, chunk) in text.split('/').enumerate() {
        if i > 0 {
            pending.push('/');
        }
        match chunk {
            "*" | "**" => {
                if !pending.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut pending)));
                }
                pieces.push(Piece::Wildcard {
                    multi: chunk == "**",
                });
            }
            other => pending.push_str(other),
        }
    }
    if !pending.is_empty() {
        pieces.push(Piece::Text(pending));
    }
}

fn segments_match(pattern: &[Segment], value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    match_segments(pattern, &parts)
}

fn match_segments(pattern: &[Segment], parts: &[&str]) -> bool {
    match pattern.split_first() {
        None => parts.is_empty(),
        Some((Segment::Star, rest)) => {
            matches!(parts.first(), Some(p) if !p.is_empty()) && match_segments(rest, &parts[1..])
        }
        Some((Segment::Literal(lit), rest)) => {
            parts.first() == Some(&lit.as_str()) && match_segments(rest, &parts[1..])
        }
        Some((Segment::DoubleStar, rest)) => (1..=parts.len()).rev().any(|n| {
            parts[..n].iter().all(|p| !p.is_empty()) && match_segments(rest, &parts[n..])
        }),
    }
}

fn match_pieces(pieces: &[Piece], input: &str) -> Option<Vec<(String, String)>> {
    let Some((first, rest)) = pieces.split_first() else {
        return input.is_empty().then(Vec::new);
    };

    match first {
        Piece::Text(text) => match_pieces(rest, input.strip_prefix(text.as_str())?),
        Piece::Wildcard { multi } => candidate_ends(input).find_map(|end| {
            let candidate = &input[..end];
            let ok = if *multi {
                candidate.split('/').all(|p| !p.is_empty())
            } else {
                !candidate.contains('/')
            };
            if ok {
                match_pieces(rest, &input[end..])
            } else {
                None
            }
        }),
        Piece::Variable { field, pattern } => candidate_ends(input).find_map(|end| {
            let candidate = &input[..end];
            if !segments_match(pattern, candidate) {
                return None;
            }
            let mut tail = match_pieces(rest, &input[end..])?;
            tail.insert(0, (field.clone(), candidate.to_string()));
            Some(tail)
        }),
    }
}

/// Non-empty prefix lengths of `input`, longest first.
fn candidate_ends(input: &str) -> impl Iterator<Item = usize> + '_ {
    (1..=input.len())
        .rev()
        .filter(move |&i| input.is_char_boundary(i))
}
