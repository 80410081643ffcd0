//! Placeholder grammar
//!
//! A placeholder is `<%=`, optional horizontal whitespace, an identifier
//! matching `[A-Za-z_][A-Za-z0-9_]*`, optional horizontal whitespace, `%>`.
//! There is no nesting and no escape for the delimiters themselves.
//!
//! Matching uses the `regex` crate, whose automaton engine runs in time linear
//! in the input, so arbitrarily large templates are safe to scan.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Opening delimiter
pub const OPEN: &str = "<%=";

/// Closing delimiter
pub const CLOSE: &str = "%>";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"{}[ \t]*([A-Za-z_][A-Za-z0-9_]*)[ \t]*{}",
        regex::escape(OPEN),
        regex::escape(CLOSE)
    );
    Regex::new(&pattern).expect("placeholder pattern is a valid regex")
});

/// The compiled placeholder pattern, capture group 1 is the identifier
pub(crate) fn pattern() -> &'static Regex {
    &PLACEHOLDER
}

/// One placeholder occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Identifier between the delimiters
    pub name: &'a str,
    /// The full matched text, delimiters included
    pub raw: &'a str,
    /// Byte range of `raw` within the scanned text
    pub span: Range<usize>,
}

/// Iterate over every placeholder occurrence, left to right
pub fn placeholders(text: &str) -> impl Iterator<Item = Placeholder<'_>> {
    PLACEHOLDER.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(Placeholder {
            name: name.as_str(),
            raw: whole.as_str(),
            span: whole.range(),
        })
    })
}

/// Extract the distinct variable names of `text` in first-occurrence order
///
/// Text without placeholders yields an empty list; this never fails.
pub fn extract_variables(text: &str) -> Vec<String> {
    debug!(text_len = text.len(), "extract_variables: called");
    let mut seen = HashSet::new();
    let mut variables = Vec::new();

    for placeholder in placeholders(text) {
        if seen.insert(placeholder.name) {
            variables.push(placeholder.name.to_string());
        }
    }

    debug!(count = variables.len(), "extract_variables: done");
    variables
}

/// A piece of template text for highlighted display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text between placeholders
    Text(&'a str),
    /// A placeholder occurrence
    Placeholder { name: &'a str, raw: &'a str },
}

/// Split `text` into literal and placeholder segments
///
/// Concatenating the segments reproduces `text` exactly.
pub fn highlight(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for placeholder in placeholders(text) {
        if placeholder.span.start > cursor {
            segments.push(Segment::Text(&text[cursor..placeholder.span.start]));
        }
        segments.push(Segment::Placeholder {
            name: placeholder.name,
            raw: placeholder.raw,
        });
        cursor = placeholder.span.end;
    }

    if cursor < text.len() {
        segments.push(Segment::Text(&text[cursor..]));
    }

    segments
}
