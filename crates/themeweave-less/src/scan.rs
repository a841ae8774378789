//! Shared scanner utilities for LESS source.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Every rewriting pass needs the same three answers about a byte: is it
//! code, a string or a comment; where does the parenthesis opened here
//! close; and where are the top-level separators of an argument list.
//! This module answers them once so the passes stay small.
//!
//! Line comments get special treatment because LESS inherits `//` from the
//! C family while CSS does not have them at all:
//!
//! ```text
//! @a: url(//cdn.example.com/x.png);   // inside parentheses → code
//! @b: "http://example.com";           // inside a string → string
//! background: url(http://x/y.png);    // right after ':' → code
//! ```

/// What a run of bytes is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    String,
    BlockComment,
    LineComment,
}

/// A classified byte range `[start, end)` of a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Split `source` into code, string and comment segments.
///
/// Strings end at their closing quote or, when unterminated, before the end
/// of the line. Block comments end at `*/` or end of input. A `//` starts a
/// line comment only when it is outside parentheses and not directly after
/// a `:`. Segments are contiguous and cover the whole input.
pub fn segments(source: &str) -> Vec<Segment> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut depth: usize = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let special = match b {
            b'"' | b'\'' => Some((SegmentKind::String, string_end(bytes, i))),
            b'/' if next == Some(b'*') => {
                Some((SegmentKind::BlockComment, block_comment_end(bytes, i)))
            }
            b'/' if next == Some(b'/') && depth == 0 && (i == 0 || bytes[i - 1] != b':') => {
                Some((SegmentKind::LineComment, line_end(bytes, i)))
            }
            _ => None,
        };

        match special {
            Some((kind, end)) => {
                if code_start < i {
                    out.push(Segment {
                        kind: SegmentKind::Code,
                        start: code_start,
                        end: i,
                    });
                }
                out.push(Segment {
                    kind,
                    start: i,
                    end,
                });
                i = end;
                code_start = end;
            }
            None => {
                match b {
                    b'(' => depth += 1,
                    b')' => depth = depth.saturating_sub(1),
                    // Unbalanced parentheses never leak past a block boundary.
                    b'{' | b'}' => depth = 0,
                    _ => {}
                }
                i += 1;
            }
        }
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            start: code_start,
            end: bytes.len(),
        });
    }
    out
}

fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return j + 2;
        }
        j += 1;
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

/// One flag per byte: `true` when the byte is code.
pub fn code_mask(source: &str) -> Vec<bool> {
    let mut mask = vec![false; source.len()];
    for segment in segments(source) {
        if segment.kind == SegmentKind::Code {
            mask[segment.start..segment.end].fill(true);
        }
    }
    mask
}

/// Index of the delimiter closing the one at `open`, counting only code bytes.
pub fn matching_delimiter(
    source: &str,
    mask: &[bool],
    open: usize,
    open_byte: u8,
    close_byte: u8,
) -> Option<usize> {
    let bytes = source.as_bytes();
    if bytes.get(open) != Some(&open_byte) || !mask.get(open).copied().unwrap_or(false) {
        return None;
    }
    let mut depth = 0usize;
    for (j, &b) in bytes.iter().enumerate().skip(open) {
        if !mask[j] {
            continue;
        }
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
        }
    }
    None
}

/// Index of the `)` closing the `(` at `open`.
pub fn matching_paren(source: &str, mask: &[bool], open: usize) -> Option<usize> {
    matching_delimiter(source, mask, open, b'(', b')')
}

/// Split on `separator` where it appears as code outside any nesting.
///
/// Parentheses and brackets nest; separators inside strings or comments are
/// ignored. Pieces are trimmed.
pub fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let mask = code_mask(text);
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            _ if b == separator && depth == 0 => {
                pieces.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(text[start..].trim());
    pieces
}

/// Split a value into whitespace-separated tokens, keeping nested calls and
/// strings whole: `0 2px rgba(0, 0, 0, .1)` → `["0", "2px", "rgba(0, 0, 0, .1)"]`.
pub fn split_top_level_whitespace(text: &str) -> Vec<&str> {
    let mask = code_mask(text);
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        let is_break = mask[i] && depth == 0 && b.is_ascii_whitespace();
        if mask[i] {
            match b {
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        match (is_break, start) {
            (true, Some(s)) => {
                tokens.push(&text[s..i]);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

/// Bytes that may appear in a LESS identifier or variable name.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// A function call found in code: `name(args)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub name_start: usize,
    pub open: usize,
    pub close: usize,
}

impl Call {
    pub fn name<'a>(&self, source: &'a str) -> &'a str {
        &source[self.name_start..self.open]
    }

    pub fn args<'a>(&self, source: &'a str) -> &'a str {
        &source[self.open + 1..self.close]
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.name_start..=self.close]
    }
}

/// Every call to one of `names` (ASCII case-insensitive), in source order.
///
/// Mixin calls (`.name(`), namespaced calls (`#ns.name(`), variable calls
/// and calls whose parenthesis never closes are not reported. Nested calls
/// are reported as well as their enclosing call.
pub fn find_calls(source: &str, mask: &[bool], names: &[&str]) -> Vec<Call> {
    let bytes = source.as_bytes();
    let mut calls = Vec::new();
    for open in 0..bytes.len() {
        if bytes[open] != b'(' || !mask[open] {
            continue;
        }
        let mut name_start = open;
        while name_start > 0 && mask[name_start - 1] && is_ident_byte(bytes[name_start - 1]) {
            name_start -= 1;
        }
        if name_start == open {
            continue;
        }
        if name_start > 0 && matches!(bytes[name_start - 1], b'.' | b'#' | b'@' | b'$') {
            continue;
        }
        let name = &source[name_start..open];
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        if let Some(close) = matching_paren(source, mask, open) {
            calls.push(Call {
                name_start,
                open,
                close,
            });
        }
    }
    calls
}
