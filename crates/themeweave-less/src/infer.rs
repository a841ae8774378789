//! Variable type inference.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Inference runs in two stages. [`classify_value`] looks only at the value.
//! When that yields [`VariableType::Reference`], [`VariableType::Mixed`] or
//! [`VariableType::Keyword`], [`infer_from_name`] refines it from the
//! declared name:
//!
//! ```text
//! @button-background: @global-primary-background;   // Reference → Color
//! @button-padding-horizontal: @global-gutter;       // Reference → Reference
//! @button-line-height: @global-control-height;      // Reference → Number
//! @button-border-width: 1px;                        // Size (value wins)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scan::{split_top_level, split_top_level_whitespace};
use crate::types::VariableType;

static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@[A-Za-z0-9_-]+$").unwrap());

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// Numeric token with a unit suffix; captures the unit.
static DIMENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)([A-Za-z]+|%)$").unwrap()
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// Function-call token; captures the function name.
static CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z-]+)\(.*\)$").unwrap());

const TIME_UNITS: &[&str] = &["s", "ms"];

const LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "%", "vh", "vw", "vmin", "vmax", "ch", "ex", "pt", "pc", "cm", "mm", "in",
    "q", "fr", "lh", "deg", "rad", "grad", "turn",
];

const COLOR_FUNCTIONS: &[&str] = &[
    "rgb",
    "rgba",
    "hsl",
    "hsla",
    "darken",
    "lighten",
    "fade",
    "fadein",
    "fadeout",
    "mix",
    "tint",
    "shade",
    "spin",
    "saturate",
    "desaturate",
];

const NAMED_COLORS: &[&str] = &[
    "transparent",
    "currentcolor",
    "black",
    "white",
    "red",
    "green",
    "blue",
    "gray",
    "grey",
    "silver",
    "maroon",
    "purple",
    "fuchsia",
    "lime",
    "olive",
    "yellow",
    "navy",
    "teal",
    "aqua",
    "orange",
];

const FONT_WEIGHTS: &[&str] = &["bold", "bolder", "lighter"];

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-sans-serif",
    "ui-serif",
    "ui-monospace",
];

const EASING_KEYWORDS: &[&str] = &[
    "ease",
    "ease-in",
    "ease-out",
    "ease-in-out",
    "linear",
    "step-start",
    "step-end",
];

const EASING_FUNCTIONS: &[&str] = &["cubic-bezier", "steps"];

const BORDER_STYLES: &[&str] = &[
    "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
];

/// Name suffixes checked in order; more specific suffixes come first.
const NAME_SUFFIXES: &[(&str, VariableType)] = &[
    ("-font-family", VariableType::FontFamily),
    ("-font-weight", VariableType::FontWeight),
    ("-font-size", VariableType::Size),
    ("-line-height", VariableType::Number),
    ("-border-color", VariableType::Color),
    ("-border-width", VariableType::Size),
    ("-border-radius", VariableType::Size),
    ("-box-shadow", VariableType::Shadow),
    ("-shadow", VariableType::Shadow),
    ("-border", VariableType::Border),
    ("-color", VariableType::Color),
    ("-background", VariableType::Color),
    ("-duration", VariableType::Duration),
    ("-delay", VariableType::Duration),
    ("-easing", VariableType::Easing),
    ("-timing-function", VariableType::Easing),
    ("-opacity", VariableType::Number),
    ("-z-index", VariableType::Number),
    ("-width", VariableType::Size),
    ("-height", VariableType::Size),
    ("-size", VariableType::Size),
    ("-margin", VariableType::Size),
    ("-padding", VariableType::Size),
    ("-gutter", VariableType::Size),
    ("-radius", VariableType::Size),
    ("-gap", VariableType::Size),
];

fn is_one_of(token: &str, set: &[&str]) -> bool {
    set.iter().any(|s| s.eq_ignore_ascii_case(token))
}

fn call_name(token: &str) -> Option<&str> {
    CALL.captures(token)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn is_quoted(token: &str) -> bool {
    token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')))
}

fn is_color_token(token: &str) -> bool {
    HEX_COLOR.is_match(token)
        || is_one_of(token, NAMED_COLORS)
        || call_name(token).is_some_and(|name| is_one_of(name, COLOR_FUNCTIONS))
}

fn dimension_unit(token: &str) -> Option<&str> {
    DIMENSION
        .captures(token)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn is_length(token: &str) -> bool {
    dimension_unit(token).is_some_and(|unit| is_one_of(unit, LENGTH_UNITS))
}

fn is_font_family_list(value: &str) -> bool {
    let items = split_top_level(value, b',');
    items.len() > 1
        && items.iter().all(|item| !item.is_empty())
        && items
            .iter()
            .any(|item| is_quoted(item) || is_one_of(item, GENERIC_FAMILIES))
}

fn classify_token(token: &str) -> VariableType {
    if REFERENCE.is_match(token) {
        return VariableType::Reference;
    }
    if is_color_token(token) {
        return VariableType::Color;
    }
    if let Some(unit) = dimension_unit(token) {
        if is_one_of(unit, TIME_UNITS) {
            return VariableType::Duration;
        }
        if is_one_of(unit, LENGTH_UNITS) {
            return VariableType::Size;
        }
        return VariableType::Mixed;
    }
    if NUMBER.is_match(token) {
        return VariableType::Number;
    }
    if is_one_of(token, FONT_WEIGHTS) {
        return VariableType::FontWeight;
    }
    if is_quoted(token) {
        return VariableType::FontFamily;
    }
    if is_one_of(token, EASING_KEYWORDS)
        || call_name(token).is_some_and(|name| is_one_of(name, EASING_FUNCTIONS))
    {
        return VariableType::Easing;
    }
    if IDENTIFIER.is_match(token) {
        return VariableType::Keyword;
    }
    VariableType::Mixed
}

/// Classify a value by its shape alone.
pub fn classify_value(value: &str) -> VariableType {
    let value = value.trim();
    if value.is_empty() {
        return VariableType::Mixed;
    }

    let tokens = split_top_level_whitespace(value);
    let is_list = split_top_level(value, b',').len() > 1;
    if tokens.len() == 1 && !is_list {
        return classify_token(tokens[0]);
    }

    if is_font_family_list(value) {
        return VariableType::FontFamily;
    }
    if is_list {
        return VariableType::Mixed;
    }

    // Multi-token shorthands: every token must be a plausible part.
    let has_style = tokens.iter().any(|t| is_one_of(t, BORDER_STYLES));
    let border_parts = tokens.iter().all(|t| {
        is_one_of(t, BORDER_STYLES)
            || is_length(t)
            || is_color_token(t)
            || REFERENCE.is_match(t)
            || *t == "0"
    });
    if has_style && border_parts && !tokens.iter().any(|t| t.eq_ignore_ascii_case("inset")) {
        return VariableType::Border;
    }

    let lengths = tokens.iter().filter(|t| is_length(t) || **t == "0").count();
    let has_color = tokens
        .iter()
        .any(|t| is_color_token(t) || REFERENCE.is_match(t));
    let has_inset = tokens.iter().any(|t| t.eq_ignore_ascii_case("inset"));
    if has_inset || (lengths >= 2 && has_color) {
        return VariableType::Shadow;
    }

    if has_style && border_parts {
        return VariableType::Border;
    }

    VariableType::Mixed
}

/// Type implied by a variable name, if any.
pub fn infer_from_name(name: &str) -> Option<VariableType> {
    let name = name.to_ascii_lowercase();
    if name.starts_with("color-") {
        return Some(VariableType::Color);
    }
    NAME_SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix) || name == suffix[1..])
        .map(|(_, var_type)| *var_type)
}

/// Two-stage inference for a declaration.
pub fn infer_type(name: &str, value: &str) -> VariableType {
    let by_value = classify_value(value);
    if by_value.is_refinable() {
        infer_from_name(name).unwrap_or(by_value)
    } else {
        by_value
    }
}
