//! JSON body comparison.

use serde_json::Value;

/// Deep equality. Numbers compare by value, so `1` equals `1.0`.
pub fn json_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equals(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && b.iter()
                    .all(|(key, expected)| a.get(key).is_some_and(|v| json_equals(v, expected)))
        }
        _ => false,
    }
}

/// Recursive containment: every key of an expected object must be present
/// and contained, and every element of an expected array must be contained
/// by the actual element at the same index. Scalars compare for equality.
pub fn json_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(a), Value::Object(b)) => b
            .iter()
            .all(|(key, expected)| a.get(key).is_some_and(|v| json_contains(v, expected))),
        (Value::Array(a), Value::Array(b)) => {
            b.len() <= a.len() && a.iter().zip(b).all(|(x, y)| json_contains(x, y))
        }
        _ => json_equals(actual, expected),
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
