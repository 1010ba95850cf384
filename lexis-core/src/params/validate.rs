//! Query parameter validation and coercion.
//!
//! Checks run fail-fast in a fixed order: the unrecognized-key scan over the
//! raw query, then for each definition in order: presence, type, allow-list.

use std::collections::HashSet;

use super::datetime::parse_iso_date;
use super::types::{ParamDefinition, ParamMap, ParamType, ParamValue};
use crate::error::{ParamError, ParamResult, Rejection};

/// Validate raw query pairs against `defs` and coerce them to typed values.
///
/// `raw` holds the decoded `(key, value)` pairs in query-string order.
///
/// ```
/// use lexis_core::{extract, ParamDefinition, ParamType};
///
/// let def = ParamDefinition::new("x", ParamType::Number).mandatory();
/// let raw = vec![("x".to_string(), "5".to_string())];
/// let params = extract(&raw, &[&def]).unwrap();
/// assert_eq!(params.get("x").and_then(|v| v.as_i64()), Some(5));
/// ```
pub fn extract(raw: &[(String, String)], defs: &[&ParamDefinition]) -> ParamResult<ParamMap> {
    check_keys(raw, defs)?;

    let mut params = ParamMap::new();
    for def in defs {
        if let Some(value) = extract_one(raw, def)? {
            params.insert(def.name(), value);
        }
    }
    Ok(params)
}

fn check_keys(raw: &[(String, String)], defs: &[&ParamDefinition]) -> ParamResult<()> {
    let mut seen = HashSet::new();
    for (key, _) in raw {
        if !defs.iter().any(|def| def.name() == key) {
            return Err(ParamError::invalid(key.as_str(), Rejection::Unrecognized));
        }
        if !seen.insert(key.as_str()) {
            return Err(ParamError::invalid(key.as_str(), Rejection::Duplicate));
        }
    }
    Ok(())
}

fn extract_one(raw: &[(String, String)], def: &ParamDefinition) -> ParamResult<Option<ParamValue>> {
    let name = def.name();
    let Some(value) = raw.iter().find(|(key, _)| key == name).map(|(_, v)| v) else {
        if def.is_mandatory() {
            return Err(ParamError::invalid(name, Rejection::Missing));
        }
        return Ok(None);
    };
    if value.is_empty() {
        return Err(ParamError::invalid(name, Rejection::Empty));
    }

    let value = if def.is_case_sensitive() {
        value.clone()
    } else {
        value.to_uppercase()
    };

    // Coercion doubles as the shape check; nothing is returned before the
    // allow-list has also passed.
    let typed = coerce(&value, def.param_type())
        .ok_or_else(|| ParamError::invalid(name, Rejection::WrongType))?;
    if !is_allowed(&value, def) {
        return Err(ParamError::invalid(name, Rejection::NotAllowed));
    }
    Ok(Some(typed))
}

fn coerce(value: &str, param_type: ParamType) -> Option<ParamValue> {
    match param_type {
        ParamType::String => Some(ParamValue::String(value.to_string())),
        ParamType::Number => parse_leading_int(value).map(ParamValue::Number),
        ParamType::Float => parse_leading_float(value).map(ParamValue::Float),
        ParamType::Boolean => match value.to_lowercase().as_str() {
            "true" => Some(ParamValue::Boolean(true)),
            "false" => Some(ParamValue::Boolean(false)),
            _ => None,
        },
        ParamType::Array => {
            let items: Vec<String> = value.split(',').map(str::to_string).collect();
            if items.iter().any(String::is_empty) {
                return None;
            }
            Some(ParamValue::Array(items))
        }
        ParamType::Date => parse_iso_date(value).map(ParamValue::Date),
        ParamType::TimeRange => {
            let mut parts = value.split('/');
            let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
                return None;
            };
            let start = parse_iso_date(start)?;
            let end = parse_iso_date(end)?;
            (start <= end).then_some(ParamValue::TimeRange(start, end))
        }
    }
}

fn is_allowed(value: &str, def: &ParamDefinition) -> bool {
    let Some(allowed) = def.allowed_values() else {
        return true;
    };
    let allowed: Vec<String> = if def.is_case_sensitive() {
        allowed.to_vec()
    } else {
        allowed.iter().map(|a| a.to_uppercase()).collect()
    };
    let member = |candidate: &str| allowed.iter().any(|a| a == candidate);

    match def.param_type() {
        ParamType::Array => value.split(',').all(member),
        _ => member(value),
    }
}

/// Integer from the leading numeric run: `"5abc"` is 5, `"abc"` is invalid.
fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    trimmed[..end].parse().ok()
}

/// Float from the leading numeric run: `"2.5e3x"` is 2500.0.
fn parse_leading_float(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if trimmed[end..].starts_with("Infinity") {
        return trimmed[..end + "Infinity".len()].parse().ok();
    }

    let count_digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_digits = count_digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(parse_leading_int("5"), Some(5));
        assert_eq!(parse_leading_int("5abc"), Some(5));
        assert_eq!(parse_leading_int("  -12"), Some(-12));
        assert_eq!(parse_leading_int("+7"), Some(7));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), None);
    }

    #[test]
    fn test_leading_float() {
        assert_eq!(parse_leading_float("2.5"), Some(2.5));
        assert_eq!(parse_leading_float("2.5e3x"), Some(2500.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("5."), Some(5.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float("x1"), None);
    }

    #[test]
    fn test_unrecognized_reported_first() {
        let def = ParamDefinition::new("x", ParamType::Number).mandatory();
        let err = extract(&raw(&[("y", "1")]), &[&def]).unwrap_err();
        assert_eq!(err.name(), "y");
        assert_eq!(err.reason(), Rejection::Unrecognized);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let def = ParamDefinition::new("x", ParamType::Number);
        let err = extract(&raw(&[("x", "1"), ("x", "2")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::Duplicate);
    }

    #[test]
    fn test_empty_value_rejected_even_when_optional() {
        let def = ParamDefinition::new("q", ParamType::String);
        let err = extract(&raw(&[("q", "")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::Empty);
    }

    #[test]
    fn test_case_insensitive_string_is_uppercased() {
        let def = ParamDefinition::new("q", ParamType::String);
        let params = extract(&raw(&[("q", "shalom")]), &[&def]).unwrap();
        assert_eq!(params.get("q").and_then(ParamValue::as_str), Some("SHALOM"));
    }

    #[test]
    fn test_number_beyond_i64_rejected() {
        let def = ParamDefinition::new("n", ParamType::Number);
        let err = extract(&raw(&[("n", "9223372036854775808")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::WrongType);
    }

    #[test]
    fn test_infinity_needs_case_sensitive_float() {
        let folded = ParamDefinition::new("f", ParamType::Float);
        let err = extract(&raw(&[("f", "Infinity")]), &[&folded]).unwrap_err();
        assert_eq!(err.reason(), Rejection::WrongType);

        let strict = ParamDefinition::new("f", ParamType::Float).case_sensitive();
        let params = extract(&raw(&[("f", "Infinity")]), &[&strict]).unwrap();
        assert_eq!(params.get("f"), Some(&ParamValue::Float(f64::INFINITY)));
    }

    #[test]
    fn test_boolean_any_case() {
        let def = ParamDefinition::new("b", ParamType::Boolean).case_sensitive();
        let params = extract(&raw(&[("b", "True")]), &[&def]).unwrap();
        assert_eq!(params.get("b").and_then(ParamValue::as_bool), Some(true));
        let err = extract(&raw(&[("b", "yes")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::WrongType);
    }

    #[test]
    fn test_array_rejects_empty_element() {
        let def = ParamDefinition::new("a", ParamType::Array).case_sensitive();
        assert!(extract(&raw(&[("a", "x,,y")]), &[&def]).is_err());
        assert!(extract(&raw(&[("a", "x,")]), &[&def]).is_err());
        let params = extract(&raw(&[("a", "x,y")]), &[&def]).unwrap();
        assert_eq!(
            params.get("a").and_then(ParamValue::as_array),
            Some(&["x".to_string(), "y".to_string()][..])
        );
    }

    #[test]
    fn test_array_allow_list_checks_every_element() {
        let def = ParamDefinition::new("a", ParamType::Array).allowed(["root", "gloss"]);
        assert!(extract(&raw(&[("a", "Root,GLOSS")]), &[&def]).is_ok());
        let err = extract(&raw(&[("a", "root,verse")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::NotAllowed);
    }

    #[test]
    fn test_type_checked_before_allow_list() {
        let def = ParamDefinition::new("n", ParamType::Number).allowed(["1", "2"]);
        let err = extract(&raw(&[("n", "x")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::WrongType);
        let err = extract(&raw(&[("n", "3")]), &[&def]).unwrap_err();
        assert_eq!(err.reason(), Rejection::NotAllowed);
    }

    #[test]
    fn test_timerange_needs_two_parts() {
        let def = ParamDefinition::new("r", ParamType::TimeRange);
        assert!(extract(&raw(&[("r", "2019-01-01T00:00:00Z")]), &[&def]).is_err());
        assert!(extract(
            &raw(&[("r", "2019-01-01T00:00:00Z/2019-01-01T00:00:00Z/2019-01-01T00:00:00Z")]),
            &[&def]
        )
        .is_err());
        // A zero-length range is allowed.
        assert!(extract(
            &raw(&[("r", "2019-01-01T00:00:00Z/2019-01-01T00:00:00Z")]),
            &[&def]
        )
        .is_ok());
    }

    #[test]
    fn test_definition_order_decides_first_failure() {
        let a = ParamDefinition::new("a", ParamType::Number).mandatory();
        let b = ParamDefinition::new("b", ParamType::Number).mandatory();
        let err = extract(&raw(&[("b", "x")]), &[&a, &b]).unwrap_err();
        assert_eq!(err.name(), "a");
        assert_eq!(err.reason(), Rejection::Missing);
    }
}
