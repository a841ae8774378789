//! Compatibility preprocessing.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Rewrites assembled LESS so a constrained compiler accepts it. The passes
//! run in a fixed order, each on the output of the previous one:
//!
//! 1. [`strip_bom`]: byte-order marks and CR line endings
//! 2. [`normalize_line_comments`]: `// text` → `/* text */`
//! 3. [`escape_modern_selectors`]: `:is()`/`:where()`/`:has()` lists with
//!    nested pseudo-classes are bound to a variable and interpolated
//! 4. [`escape_custom_property_colors`]: colour calls over `var(--x)` become
//!    literal strings
//! 5. [`expand_color_alpha`]: `rgba(c, a)` → channel-decomposed form
//! 6. [`extract_unsupported_at_rules`]: `@container` and friends are cut out
//!    and handed back for reinjection after compilation
//!
//! Every pass is total and idempotent. Constructs a pass cannot classify are
//! left untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::scan::{
    SegmentKind, code_mask, find_calls, is_ident_byte, matching_delimiter, matching_paren,
    segments, split_top_level,
};

/// Prefix of the variables that carry escaped selectors.
pub const SELECTOR_VARIABLE_PREFIX: &str = "tw-selector-";

/// Marker left where an at-rule was extracted.
pub const REINJECT_MARKER: &str = "themeweave:reinject";

/// At-rules the compiler cannot parse.
pub const UNSUPPORTED_AT_RULES: &[&str] = &["container", "layer", "property", "scope", "starting-style"];

const GROUPING_PSEUDOS: &[&str] = &[":is(", ":where(", ":has("];
const NESTED_PSEUDOS: &[&str] = &[":not(", ":is(", ":where(", ":has("];
const CUSTOM_PROPERTY_COLOR_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla"];

static SELECTOR_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\{?tw-selector-([0-9]+)").unwrap());

/// Output of [`preprocess`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preprocessed {
    pub source: String,
    /// Extracted at-rule blocks, indexed by their marker number
    pub reinject: Vec<String>,
}

/// Run every pass in order.
pub fn preprocess(source: &str) -> Preprocessed {
    let text = strip_bom(source);
    let text = normalize_line_comments(&text);
    let text = escape_modern_selectors(&text);
    let text = escape_custom_property_colors(&text);
    let text = expand_color_alpha(&text);
    let (source, reinject) = extract_unsupported_at_rules(&text);
    debug!(
        bytes = source.len(),
        reinject = reinject.len(),
        "preprocessed source"
    );
    Preprocessed { source, reinject }
}

/// Apply `(start, end, replacement)` edits. Edits must not overlap.
fn apply_edits(source: &str, mut edits: Vec<(usize, usize, String)>) -> String {
    edits.sort_by_key(|(start, _, _)| *start);
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for (start, end, replacement) in edits {
        out.push_str(&source[copied..start]);
        out.push_str(&replacement);
        copied = end;
    }
    out.push_str(&source[copied..]);
    out
}

/// Quote `text` as a LESS escaped string, or `None` if no quote style fits.
fn escape_string(text: &str) -> Option<String> {
    match (text.contains('"'), text.contains('\'')) {
        (true, true) => None,
        (true, false) => Some(format!("~'{}'", text)),
        _ => Some(format!("~\"{}\"", text)),
    }
}

/// Remove every U+FEFF and normalize line endings to `\n`.
pub fn strip_bom(source: &str) -> String {
    source
        .replace('\u{feff}', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Turn `//` comments into block comments.
///
/// A `//` inside a string, a block comment or parentheses, or directly after
/// a `:`, is not a comment and is kept. A `*/` inside the comment text is
/// broken up so it cannot end the new comment early.
pub fn normalize_line_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    for segment in segments(source) {
        let text = segment.text(source);
        if segment.kind == SegmentKind::LineComment {
            let body = text[2..].replace("*/", "* /");
            out.push_str("/*");
            out.push_str(&body);
            out.push_str(" */");
        } else {
            out.push_str(text);
        }
    }
    out
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

/// Whether a selector mixes a multi-argument grouping pseudo-class with a
/// nested pseudo-class in one of its alternatives.
fn needs_selector_escape(selector: &str) -> bool {
    let lower = selector.to_ascii_lowercase();
    let mask = code_mask(&lower);
    for pseudo in GROUPING_PSEUDOS {
        for (at, _) in lower.match_indices(pseudo) {
            let open = at + pseudo.len() - 1;
            let Some(close) = matching_paren(&lower, &mask, open) else {
                continue;
            };
            let alternatives = split_top_level(&lower[open + 1..close], b',');
            if alternatives.len() > 1
                && alternatives
                    .iter()
                    .any(|alt| NESTED_PSEUDOS.iter().any(|p| alt.contains(p)))
            {
                return true;
            }
        }
    }
    false
}

/// Bind complex modern selectors to variables and interpolate them.
///
/// ```text
/// .x:is(.a, .b:not(.c)) {
/// ```
///
/// becomes
///
/// ```text
/// @tw-selector-1: ~".x:is(.a, .b:not(.c))";
/// @{tw-selector-1} {
/// ```
///
/// Numbering continues after the highest index already in the source.
/// Selectors containing comments or both quote styles are left alone.
pub fn escape_modern_selectors(source: &str) -> String {
    let segs = segments(source);
    let mut kinds = vec![SegmentKind::Code; source.len()];
    for seg in &segs {
        kinds[seg.start..seg.end].fill(seg.kind);
    }
    let is_code = |i: usize| kinds[i] == SegmentKind::Code;
    let is_comment = |i: usize| {
        matches!(
            kinds[i],
            SegmentKind::BlockComment | SegmentKind::LineComment
        )
    };

    let mut next_index = SELECTOR_VARIABLE
        .captures_iter(source)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    let bytes = source.as_bytes();

    // Braces of `@{name}` interpolations neither open blocks nor end selectors.
    let mut interpolation = vec![false; bytes.len()];
    for at in 0..bytes.len().saturating_sub(1) {
        if bytes[at] == b'@' && bytes[at + 1] == b'{' && is_code(at) {
            if let Some(close) = bytes[at..].iter().position(|&b| b == b'}') {
                interpolation[at + 1..=at + close].fill(true);
            }
        }
    }
    let is_boundary = |i: usize| {
        is_code(i) && !interpolation[i] && matches!(bytes[i], b';' | b'{' | b'}')
    };

    let mut edits = Vec::new();
    for brace in 0..bytes.len() {
        if bytes[brace] != b'{' || !is_code(brace) || interpolation[brace] {
            continue;
        }

        let mut start = brace;
        while start > 0 && !is_boundary(start - 1) {
            start -= 1;
        }
        while start < brace && (bytes[start].is_ascii_whitespace() || is_comment(start)) {
            start += 1;
        }
        if start == brace || (start..brace).any(is_comment) {
            continue;
        }

        let selector = source[start..brace].trim_end();
        if selector.starts_with('@')
            || !GROUPING_PSEUDOS.iter().any(|p| contains_ignore_case(selector, p))
            || !needs_selector_escape(selector)
        {
            continue;
        }

        let collapsed = selector.split_whitespace().collect::<Vec<_>>().join(" ");
        let Some(quoted) = escape_string(&collapsed) else {
            debug!(selector = %collapsed, "selector has both quote styles, left as is");
            continue;
        };

        let name = format!("{}{}", SELECTOR_VARIABLE_PREFIX, next_index);
        next_index += 1;
        debug!(variable = %name, selector = %collapsed, "escaped modern selector");
        edits.push((
            start,
            brace,
            format!("@{}: {};\n@{{{}}} ", name, quoted, name),
        ));
    }

    apply_edits(source, edits)
}

/// Wrap colour calls over custom properties as literal strings.
///
/// `rgba(var(--accent), .5)` → `~"rgba(var(--accent), .5)"`.
pub fn escape_custom_property_colors(source: &str) -> String {
    let mask = code_mask(source);
    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    let mut covered_until = 0;
    for call in find_calls(source, &mask, CUSTOM_PROPERTY_COLOR_FUNCTIONS) {
        if call.name_start < covered_until || !call.args(source).contains("var(--") {
            continue;
        }
        let Some(quoted) = escape_string(call.text(source)) else {
            continue;
        };
        covered_until = call.close + 1;
        edits.push((call.name_start, call.close + 1, quoted));
    }
    apply_edits(source, edits)
}

/// Expand two-argument `rgba(c, a)` and `hsla(c, a)` into channel form.
///
/// ```text
/// rgba(@primary, 0.5) → rgba(red(@primary), green(@primary), blue(@primary), 0.5)
/// hsla(@primary, 0.5) → hsla(hue(@primary), saturation(@primary), lightness(@primary), 0.5)
/// ```
///
/// The innermost call is rewritten first so nested shorthands expand once.
pub fn expand_color_alpha(source: &str) -> String {
    let mut text = source.to_string();
    loop {
        let mask = code_mask(&text);
        let candidate = find_calls(&text, &mask, &["rgba", "hsla"])
            .into_iter()
            .filter(|call| {
                let args = split_top_level(call.args(&text), b',');
                args.len() == 2 && args.iter().all(|a| !a.is_empty())
            })
            .max_by_key(|call| call.open);
        let Some(call) = candidate else {
            return text;
        };

        let name = call.name(&text);
        let args = split_top_level(call.args(&text), b',');
        let (color, alpha) = (args[0], args[1]);
        let channels = if name.eq_ignore_ascii_case("hsla") {
            ["hue", "saturation", "lightness"]
        } else {
            ["red", "green", "blue"]
        };
        let expanded = format!(
            "{}({}({}), {}({}), {}({}), {})",
            name, channels[0], color, channels[1], color, channels[2], color, alpha
        );
        text = apply_edits(&text, vec![(call.name_start, call.close + 1, expanded)]);
    }
}

/// Length of an unsupported at-rule keyword starting at `at` (the `@`).
///
/// A keyword followed by `:` is a variable declaration such as
/// `@layer: 1px;`, not an at-rule.
fn unsupported_at_rule(bytes: &[u8], at: usize) -> Option<usize> {
    UNSUPPORTED_AT_RULES.iter().find_map(|name| {
        let end = at + 1 + name.len();
        let candidate = bytes.get(at + 1..end)?;
        let boundary = bytes.get(end).is_none_or(|b| !is_ident_byte(*b));
        let declaration = bytes[end..]
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b':');
        (candidate.eq_ignore_ascii_case(name.as_bytes()) && boundary && !declaration)
            .then_some(end - at)
    })
}

/// Cut top-level unsupported at-rules out of `source`.
///
/// Block forms are removed through their closing brace, statement forms
/// (`@layer a, b;`) through their semicolon. Each is replaced by
/// `/* themeweave:reinject <n> */` and returned at index `n`. An at-rule
/// whose block never closes is left in place.
pub fn extract_unsupported_at_rules(source: &str) -> (String, Vec<String>) {
    let mask = code_mask(source);
    let bytes = source.as_bytes();
    let mut edits = Vec::new();
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'@' if depth == 0 => {
                if let Some(keyword_len) = unsupported_at_rule(bytes, i) {
                    let terminator = (i + keyword_len..bytes.len())
                        .find(|&j| mask[j] && matches!(bytes[j], b'{' | b';'));
                    let end = match terminator {
                        Some(j) if bytes[j] == b';' => Some(j),
                        Some(j) => matching_delimiter(source, &mask, j, b'{', b'}'),
                        None => None,
                    };
                    if let Some(end) = end {
                        let placeholder = format!("/* {} {} */", REINJECT_MARKER, fragments.len());
                        fragments.push(source[i..=end].to_string());
                        edits.push((i, end + 1, placeholder));
                        i = end + 1;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    if !fragments.is_empty() {
        debug!(count = fragments.len(), "extracted unsupported at-rules");
    }
    (apply_edits(source, edits), fragments)
}
