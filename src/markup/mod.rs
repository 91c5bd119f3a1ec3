//! Minimal message markup
//!
//! Message text supports exactly two constructs: `**emphasis**` and line breaks.
//! Text is parsed into spans so renderers never interpret raw markup from a
//! message, and [`to_html`] escapes every span before adding its own tags.

use serde::Serialize;

const EMPHASIS: &str = "**";

/// A run of text with uniform styling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub emphasized: bool,
}

pub type Line = Vec<Span>;

/// Split message text into lines of spans
pub fn parse(text: &str) -> Vec<Line> {
    text.split('\n')
        .map(|line| parse_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}

fn parse_line(line: &str) -> Line {
    let parts: Vec<&str> = line.split(EMPHASIS).collect();
    // An odd number of delimiters leaves the last one unmatched
    let paired = if parts.len() % 2 == 0 {
        parts.len() - 1
    } else {
        parts.len()
    };

    let mut spans: Line = Vec::new();
    for (i, part) in parts[..paired].iter().enumerate() {
        push(&mut spans, part, i % 2 == 1);
    }
    if let Some(rest) = parts.get(paired) {
        push(&mut spans, &format!("{EMPHASIS}{rest}"), false);
    }
    spans
}

fn push(spans: &mut Line, text: &str, emphasized: bool) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.emphasized == emphasized => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_string(),
            emphasized,
        }),
    }
}

/// Render message text as an HTML fragment
pub fn to_html(text: &str) -> String {
    parse(text)
        .iter()
        .map(|line| {
            line.iter()
                .map(|span| {
                    let escaped = escape_html(&span.text);
                    if span.emphasized {
                        format!("<strong>{escaped}</strong>")
                    } else {
                        escaped
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
