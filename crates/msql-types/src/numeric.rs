//! Numeric interpretation of string operands.
//!
//! Two distinct readings exist in MySQL:
//! - *clean* numeric strings (`" -12 "`, `"3.50"`, `"1e3"`) take part in
//!   numeric comparison domains; anything else forces a string comparison.
//! - in numeric context every string is converted through its longest
//!   numeric prefix (`"12abc"` -> 12, `"abc"` -> 0).

use std::str::FromStr;

use bigdecimal::BigDecimal;
use rust_decimal::Decimal;

/// Largest number of significant digits a [`Decimal`] holds exactly.
const DECIMAL_MAX_DIGITS: usize = 28;

/// Largest decimal scale, in either direction, [`parse_exact`] expands.
/// Wide enough for the exact expansion of every finite double.
const EXACT_SCALE_LIMIT: i64 = 2048;

/// Classification of a string operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericStr {
    /// Clean base-10 integer.
    Int(i128),
    /// Clean decimal (fraction and/or exponent), exactly representable.
    Decimal(Decimal),
    /// Clean number beyond [`Decimal`] precision or range; see
    /// [`parse_exact`].
    Inexact,
    /// Not a clean number at all.
    NotNumeric,
}

/// Classify `bytes` as a clean numeric string.
///
/// Grammar (after trimming ASCII whitespace):
/// `[+-]? (digits [. digits*]? | . digits) ([eE] [+-]? digits)?`
pub fn classify_numeric(bytes: &[u8]) -> NumericStr {
    let trimmed = bytes.trim_ascii();
    let Some(shape) = scan_number(trimmed) else {
        return NumericStr::NotNumeric;
    };
    if shape.len != trimmed.len() {
        return NumericStr::NotNumeric;
    }
    // The scanner only accepts ASCII.
    let Ok(text) = std::str::from_utf8(trimmed) else {
        return NumericStr::NotNumeric;
    };

    if !shape.has_fraction && !shape.has_exponent {
        return text
            .strip_prefix('+')
            .unwrap_or(text)
            .parse::<i128>()
            .map_or(NumericStr::Inexact, NumericStr::Int);
    }

    if shape.significant_digits > DECIMAL_MAX_DIGITS {
        return NumericStr::Inexact;
    }
    let normalized = normalize_decimal_literal(text);
    let parsed = if shape.has_exponent {
        Decimal::from_scientific(&normalized)
    } else {
        Decimal::from_str(&normalized)
    };
    parsed.map_or(NumericStr::Inexact, NumericStr::Decimal)
}

/// Read a clean numeric string exactly, at any precision.
///
/// `None` when `bytes` is not a clean number, or when its exponent puts
/// the value beyond [`EXACT_SCALE_LIMIT`] decimal places either way.
pub fn parse_exact(bytes: &[u8]) -> Option<BigDecimal> {
    let trimmed = bytes.trim_ascii();
    let shape = scan_number(trimmed)?;
    if shape.len != trimmed.len() {
        return None;
    }
    let text = std::str::from_utf8(trimmed).ok()?;
    let exact = BigDecimal::from_str(&normalize_decimal_literal(text)).ok()?;
    let (_, scale) = exact.as_bigint_and_exponent();
    (scale.abs() <= EXACT_SCALE_LIMIT).then_some(exact)
}

/// Convert `bytes` to a double the way MySQL does in numeric context.
///
/// Leading whitespace is skipped and the longest numeric prefix is used;
/// no prefix yields `0.0`. Out-of-range magnitudes clamp to `±f64::MAX`.
pub fn parse_f64_prefix(bytes: &[u8]) -> f64 {
    let start = bytes.len() - bytes.trim_ascii_start().len();
    let rest = &bytes[start..];
    let Some(shape) = scan_number(rest) else {
        return 0.0;
    };
    let Ok(text) = std::str::from_utf8(&rest[..shape.len]) else {
        return 0.0;
    };
    let value = text.parse::<f64>().unwrap_or(0.0);
    if value.is_infinite() {
        return f64::MAX.copysign(value);
    }
    value
}

#[derive(Debug, Clone, Copy)]
struct NumberShape {
    len: usize,
    has_fraction: bool,
    has_exponent: bool,
    significant_digits: usize,
}

/// Scan the longest numeric prefix of `s`; `None` if there are no digits.
fn scan_number(s: &[u8]) -> Option<NumberShape> {
    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let mut digits = 0;
    let mut significant = 0;
    let mut leading_zero = true;
    let mut count_digit = |b: u8, digits: &mut usize| {
        *digits += 1;
        if b != b'0' {
            leading_zero = false;
        }
        if !leading_zero {
            significant += 1;
        }
    };

    while let Some(&b) = s.get(i).filter(|b| b.is_ascii_digit()) {
        count_digit(b, &mut digits);
        i += 1;
    }

    let mut has_fraction = false;
    if s.get(i) == Some(&b'.') {
        let mut j = i + 1;
        let mut frac = 0;
        while let Some(&b) = s.get(j).filter(|b| b.is_ascii_digit()) {
            count_digit(b, &mut frac);
            j += 1;
        }
        if digits > 0 || frac > 0 {
            has_fraction = true;
            digits += frac;
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    let mut has_exponent = false;
    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while s.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            has_exponent = true;
            i = j;
        }
    }

    Some(NumberShape {
        len: i,
        has_fraction,
        has_exponent,
        significant_digits: significant,
    })
}

/// Rewrite forms `rust_decimal` rejects: `+x`, `.5`, `5.`.
fn normalize_decimal_literal(text: &str) -> String {
    let (sign, body) = match text.as_bytes().first() {
        Some(b'-') => ("-", &text[1..]),
        Some(b'+') => ("", &text[1..]),
        _ => ("", text),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => body.split_at(pos),
        None => (body, ""),
    };
    let mantissa = mantissa.strip_suffix('.').unwrap_or(mantissa);
    let lead = if mantissa.starts_with('.') { "0" } else { "" };
    format!("{sign}{lead}{mantissa}{exponent}")
}
