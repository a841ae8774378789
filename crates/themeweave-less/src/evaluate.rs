//! Arithmetic evaluation for resolved values.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A small evaluator: numbers sharing at most one unit, the
//! four operators and parentheses. `(1.5 * 3) * 1em` becomes `4.5em`.
//! Anything else (functions, keywords, unresolved `@refs`, mixed units,
//! space-separated lists) comes back unchanged.

use tracing::debug;

/// Decimal places kept in evaluated results.
pub const PRECISION: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Operator(u8),
    Open,
    Close,
}

/// Tokenize, returning the tokens and the single unit used, if any.
fn tokenize(value: &str) -> Option<(Vec<Token>, Option<String>)> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut unit: Option<String> = None;
    let mut expect_operand = true;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\n' => {
                i += 1;
            }
            b'0'..=b'9' | b'.' => {
                let (number, next) = read_number(value, i, &mut unit)?;
                if !expect_operand {
                    return None;
                }
                tokens.push(Token::Number(number));
                expect_operand = false;
                i = next;
            }
            b'+' | b'-' if expect_operand => {
                match bytes.get(i + 1) {
                    Some(n) if n.is_ascii_digit() || *n == b'.' => {
                        let (number, next) = read_number(value, i + 1, &mut unit)?;
                        tokens.push(Token::Number(if b == b'-' { -number } else { number }));
                        expect_operand = false;
                        i = next;
                    }
                    Some(b'(') if b == b'-' => {
                        tokens.push(Token::Number(-1.0));
                        tokens.push(Token::Operator(b'*'));
                        i += 1;
                    }
                    _ => return None,
                }
            }
            b'+' | b'-' | b'*' | b'/' => {
                if expect_operand {
                    return None;
                }
                // `10px -5px` is a list, not a subtraction.
                let spaced_before = i > 0 && bytes[i - 1].is_ascii_whitespace();
                let spaced_after = bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace());
                if b == b'-' && spaced_before && !spaced_after {
                    return None;
                }
                tokens.push(Token::Operator(b));
                expect_operand = true;
                i += 1;
            }
            b'(' => {
                if !expect_operand {
                    return None;
                }
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                if expect_operand {
                    return None;
                }
                tokens.push(Token::Close);
                i += 1;
            }
            _ => return None,
        }
    }

    Some((tokens, unit))
}

/// Read a number at `start` plus an optional unit suffix.
fn read_number(value: &str, start: usize, unit: &mut Option<String>) -> Option<(f64, usize)> {
    let bytes = value.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    let number: f64 = value[start..end].parse().ok()?;

    let unit_start = end;
    while end < bytes.len() && (bytes[end].is_ascii_alphabetic() || bytes[end] == b'%') {
        end += 1;
    }
    if end > unit_start {
        let suffix = &value[unit_start..end];
        match unit {
            Some(existing) if !existing.eq_ignore_ascii_case(suffix) => return None,
            Some(_) => {}
            None => *unit = Some(suffix.to_string()),
        }
    }
    Some((number, end))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn expression(&mut self) -> Option<f64> {
        let mut acc = self.term()?;
        while let Some(Token::Operator(op @ (b'+' | b'-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == b'+' { acc + rhs } else { acc - rhs };
        }
        Some(acc)
    }

    fn term(&mut self) -> Option<f64> {
        let mut acc = self.factor()?;
        while let Some(Token::Operator(op @ (b'*' | b'/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                acc *= rhs;
            } else {
                if rhs == 0.0 {
                    return None;
                }
                acc /= rhs;
            }
        }
        Some(acc)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            Token::Number(n) => {
                self.pos += 1;
                Some(n)
            }
            Token::Open => {
                self.pos += 1;
                let inner = self.expression()?;
                if self.peek()? != Token::Close {
                    return None;
                }
                self.pos += 1;
                Some(inner)
            }
            _ => None,
        }
    }
}

/// Format with at most [`PRECISION`] decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    let scale = 10f64.powi(PRECISION);
    let rounded = (value * scale).round() / scale;
    let text = format!("{:.*}", PRECISION as usize, rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Evaluate an arithmetic value, or return it unchanged.
pub fn evaluate(value: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.contains(['+', '-', '*', '/']) {
        return value.to_string();
    }
    let Some((tokens, unit)) = tokenize(trimmed) else {
        debug!(value, "expression not evaluated");
        return value.to_string();
    };
    if !tokens.iter().any(|t| matches!(t, Token::Operator(_))) {
        return value.to_string();
    }

    let mut parser = Parser { tokens, pos: 0 };
    match parser.expression() {
        Some(result) if parser.pos == parser.tokens.len() && result.is_finite() => {
            format!("{}{}", format_number(result), unit.unwrap_or_default())
        }
        _ => {
            debug!(value, "expression not evaluated");
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_scenarios() {
        assert_eq!(evaluate("(1.5 * 3) * 1em"), "4.5em");
        assert_eq!(evaluate("20px * 2"), "40px");
        assert_eq!(evaluate("20px + 10px / 2"), "25px");
        assert_eq!(evaluate("(20px + 10px) / 2"), "15px");
        assert_eq!(evaluate("10 - 4 - 3"), "3");
        assert_eq!(evaluate("100% / 3"), "33.3333%");
        assert_eq!(evaluate("1.5 * 1.5"), "2.25");
    }

    #[test]
    fn test_evaluate_unary_minus() {
        assert_eq!(evaluate("-20px * 2"), "-40px");
        assert_eq!(evaluate("-(10px + 5px)"), "-15px");
        assert_eq!(evaluate("40px * -0.5"), "-20px");
        assert_eq!(evaluate("-1px"), "-1px");
    }

    #[test]
    fn test_evaluate_passthrough() {
        for value in [
            "#1e87f0",
            "1px solid @global-border",
            "@global-margin * 2",
            "10px * 2em",
            "darken(@a, 5%)",
            "calc(100% - 10px)",
            "10px / 0",
            "10px -5px",
            "(1 + 2",
            "1 +",
            "-apple-system, sans-serif",
        ] {
            assert_eq!(evaluate(value), value, "{}", value);
        }
    }

    #[test]
    fn test_evaluate_no_operator_unchanged() {
        assert_eq!(evaluate("40px"), "40px");
        assert_eq!(evaluate(" 1.5 "), " 1.5 ");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.5), "4.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
        assert_eq!(format_number(0.00001), "0");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(12.30000001), "12.3");
    }
}
