//! Match highlighting for result rendering

use super::normalize::{Normalization, normalize_key};
use regex::RegexBuilder;

/// A run of a highlighted LaTeX string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Match(&'a str),
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Plain(text) | Segment::Match(text) => text,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Segment::Match(_))
    }
}

/// Split `latex` into plain and matching runs of `term`
///
/// Runs are found the way shallow search compares: case-insensitively, with
/// whitespace ignored according to `normalization`. Under `AllWhitespace` any
/// whitespace may sit between the term's characters; under `FirstSpace` a
/// single space may. LaTeX metacharacters in the term never act as pattern
/// syntax.
pub fn highlight<'a>(latex: &'a str, term: &str, normalization: Normalization) -> Vec<Segment<'a>> {
    if latex.is_empty() {
        return Vec::new();
    }
    let key = normalize_key(term, normalization);
    if key.is_empty() {
        return vec![Segment::Plain(latex)];
    }

    let gap = match normalization {
        Normalization::AllWhitespace => r"\s*",
        Normalization::FirstSpace => " ?",
    };
    let source = key
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect::<Vec<_>>()
        .join(gap);

    let pattern = match RegexBuilder::new(&source).case_insensitive(true).build() {
        Ok(pattern) => pattern,
        Err(e) => {
            log::debug!("Cannot highlight '{}': {}", term, e);
            return vec![Segment::Plain(latex)];
        }
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(latex) {
        if m.start() > last {
            segments.push(Segment::Plain(&latex[last..m.start()]));
        }
        segments.push(Segment::Match(m.as_str()));
        last = m.end();
    }
    if last < latex.len() {
        segments.push(Segment::Plain(&latex[last..]));
    }
    segments
}

/// Render segments for a terminal, wrapping matches in `open`/`close`
pub fn render_marked(segments: &[Segment<'_>], open: &str, close: &str) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Plain(text) => out.push_str(text),
            Segment::Match(text) => {
                out.push_str(open);
                out.push_str(text);
                out.push_str(close);
            }
        }
    }
    out
}
