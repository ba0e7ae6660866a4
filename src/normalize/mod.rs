//! Coercion of loosely-typed JSON values into typed field values
//!
//! Both the ingestion pipeline and the API body parser read fields out of
//! `serde_json::Value`s that may be numbers, numeric strings, empty strings or
//! nulls. The helpers here keep "absent or empty" distinct from "zero".

pub mod dates;

pub use dates::{parse_datetime_iso, parse_datetime_lenient};

use serde_json::Value;

/// Whether a value counts as "no value": null, or a string that is empty
/// after trimming. `0` and `false` are values.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerce a value to an integer.
///
/// Returns `Ok(None)` for empty values, `Ok(Some(n))` for integers, integral
/// floats and integer strings, and `Err` with the rendered value otherwise.
/// Fractional numbers are rejected rather than truncated.
pub fn coerce_int(value: &Value) -> Result<Option<i64>, String> {
    if is_empty_value(value) {
        return Ok(None);
    }

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(Some(f as i64))
                }
                _ => Err(value.to_string()),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map(Some).map_err(|_| value.to_string()),
        _ => Err(value.to_string()),
    }
}

/// Coerce a value to an integer the way the ingestion source data expects:
/// like [`coerce_int`], except fractional JSON numbers are truncated toward
/// zero (`6.5` becomes `6`). Numeric strings must still be integers.
pub fn coerce_int_truncating(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Number(n) if n.as_i64().is_none() => match n.as_f64() {
            Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(Some(f.trunc() as i64))
            }
            _ => Err(value.to_string()),
        },
        _ => coerce_int(value),
    }
}

/// Coerce a scalar value to text.
///
/// Null maps to `Ok(None)`; numbers and booleans use their JSON rendering.
/// Arrays and objects are rejected.
pub fn coerce_text(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(value.to_string()),
    }
}
