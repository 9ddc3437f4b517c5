//! Free-text search across the searchable fields of a schema

use serde_json::Value;

use super::{Condition, FieldType, Pattern, Query, Schema};

/// Build a disjunctive query matching `term` against every searchable field.
///
/// String fields get a case-insensitive regex clause; number fields get an
/// exact-match clause when `term` parses as a number. An empty term parses
/// to `0`, so numeric fields are then matched against zero.
pub fn build_search_query(term: &str, schema: &Schema) -> Query {
    let number = parse_js_number(term).and_then(number_value);

    let clauses: Vec<Query> = schema
        .fields()
        .filter_map(|(field, field_type)| match field_type {
            FieldType::String => Some(
                Query::new().with(field, Condition::Regex(Pattern::case_insensitive(term))),
            ),
            FieldType::Number => number.clone().map(|n| Query::eq(field, n)),
            FieldType::Other => None,
        })
        .collect();

    if clauses.is_empty() {
        Query::new()
    } else {
        Query::any_of(clauses)
    }
}

/// Whole numbers become JSON integers so `"42"` matches as `42`, not `42.0`.
fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}

/// Numeric conversion with the rules of JavaScript's `Number(string)`.
///
/// Returns `None` where JavaScript yields `NaN`.
pub fn parse_js_number(raw: &str) -> Option<f64> {
    let s = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if s.is_empty() {
        return Some(0.0);
    }

    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return None;
            }
            return Some(
                digits
                    .chars()
                    .filter_map(|c| c.to_digit(radix))
                    .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d)),
            );
        }
    }

    if is_decimal_literal(s) {
        s.parse::<f64>().ok()
    } else {
        None
    }
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
