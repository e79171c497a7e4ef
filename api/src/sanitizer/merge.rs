//! Merge token scanning and rendering
//!
//! Templates reference merge fields as `{{ listing.price }}` and layout
//! partials as `{{> footer }}`.

use std::collections::HashMap;

use crate::domain::entities::content::{validate_merge_key, validate_partial_name};

/// Deepest partial nesting expanded by [`render`]
pub const MAX_PARTIAL_DEPTH: usize = 8;

/// A token found in template content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{{ key }}`
    Field(&'a str),
    /// `{{> name }}`
    Partial(&'a str),
    /// An unterminated `{{` or braces around something that is not a key
    Malformed(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan<'a> {
    pub start: usize,
    pub end: usize,
    pub token: Token<'a>,
}

/// Find every merge token in `input`, in order
pub fn scan(input: &str) -> Vec<TokenSpan<'_>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = input[pos..].find("{{") {
        let start = pos + offset;
        let body_start = start + 2;
        let rest = &input[body_start..];

        match rest.find("}}") {
            Some(close) if !rest[..close].contains("{{") => {
                let end = body_start + close + 2;
                spans.push(TokenSpan {
                    start,
                    end,
                    token: classify(&input[start..end], &rest[..close]),
                });
                pos = end;
            }
            _ => {
                let end = rest
                    .find("{{")
                    .map_or(input.len(), |next| body_start + next)
                    .min(body_start + 40);
                let end = floor_char_boundary(input, end);
                spans.push(TokenSpan {
                    start,
                    end,
                    token: Token::Malformed(&input[start..end]),
                });
                pos = body_start;
            }
        }
    }

    spans
}

fn classify<'a>(raw: &'a str, inner: &'a str) -> Token<'a> {
    let trimmed = inner.trim();

    if let Some(name) = trimmed.strip_prefix('>') {
        let name = name.trim();
        return match validate_partial_name(name) {
            Ok(_) => Token::Partial(name),
            Err(_) => Token::Malformed(raw),
        };
    }

    match validate_merge_key(trimmed) {
        Ok(_) => Token::Field(trimmed),
        Err(_) => Token::Malformed(raw),
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Inputs for rendering a template preview
#[derive(Debug, Default)]
pub struct RenderContext<'a> {
    /// Caller-supplied values by merge key
    pub values: HashMap<String, String>,
    /// Sample values from the merge-field catalog, used when no value is supplied
    pub samples: HashMap<&'a str, &'a str>,
    /// Partial content by name
    pub partials: HashMap<&'a str, &'a str>,
}

/// Expand partials, then substitute merge fields.
///
/// Unknown tokens are left in place. A partial that includes itself (directly
/// or through others) or nests deeper than [`MAX_PARTIAL_DEPTH`] is left as
/// its token.
pub fn render(content: &str, ctx: &RenderContext<'_>) -> String {
    let mut stack = Vec::new();
    let expanded = expand_partials(content, ctx, &mut stack);
    substitute_fields(&expanded, ctx)
}

fn expand_partials<'a>(
    content: &str,
    ctx: &RenderContext<'a>,
    stack: &mut Vec<&'a str>,
) -> String {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for span in scan(content) {
        let Token::Partial(name) = span.token else {
            continue;
        };
        let Some((&key, &body)) = ctx.partials.get_key_value(name) else {
            continue;
        };
        if stack.len() >= MAX_PARTIAL_DEPTH || stack.contains(&key) {
            tracing::debug!(partial = name, "Skipping recursive partial include");
            continue;
        }

        out.push_str(&content[last..span.start]);
        stack.push(key);
        out.push_str(&expand_partials(body, ctx, stack));
        stack.pop();
        last = span.end;
    }

    out.push_str(&content[last..]);
    out
}

fn substitute_fields(content: &str, ctx: &RenderContext<'_>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for span in scan(content) {
        let Token::Field(key) = span.token else {
            continue;
        };
        let value = ctx
            .values
            .get(key)
            .map(String::as_str)
            .or_else(|| ctx.samples.get(key).copied());

        if let Some(value) = value {
            out.push_str(&content[last..span.start]);
            out.push_str(&escape_html(value));
            last = span.end;
        }
    }

    out.push_str(&content[last..]);
    out
}

/// Escape a value for insertion into HTML text or a quoted attribute
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
