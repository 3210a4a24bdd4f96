//! Bounded-depth structural equality for JSON values.
//!
//! Every has-changed decision in the engine goes through [`is_equal`]. The
//! depth parameter bounds how far structural comparison recurses: primitives
//! always compare directly, containers compare their key sets and then their
//! children while `depth > 0`, and fall back to a canonical serialization
//! below that. Numbers compare numerically, so `5` and `5.0` are equal.

use serde_json::Value;

/// Compare two values with a bounded structural depth.
///
/// The engine's default comparison depth is 1: one level of structure, with
/// deeper children compared canonically. Use [`is_equal_deep`] for full
/// structural equality.
pub fn is_equal(a: &Value, b: &Value, depth: usize) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return false;
            }
            if depth > 0 {
                x.iter().zip(y).all(|(i, j)| is_equal(i, j, depth - 1))
            } else {
                canonical(a) == canonical(b)
            }
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut keys_x: Vec<&String> = x.keys().collect();
            let mut keys_y: Vec<&String> = y.keys().collect();
            keys_x.sort();
            keys_y.sort();
            if keys_x != keys_y {
                return false;
            }
            if depth > 0 {
                keys_x.iter().all(|k| is_equal(&x[*k], &y[*k], depth - 1))
            } else {
                canonical(a) == canonical(b)
            }
        }
        _ => false,
    }
}

/// Full structural equality, independent of key order.
pub fn is_equal_deep(a: &Value, b: &Value) -> bool {
    canonical(a) == canonical(b)
}

/// Key-order-independent serialization used for depth-exhausted comparison.
fn canonical(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{f}"),
            None => n.to_string(),
        },
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .iter()
                .map(|k| format!("{:?}:{}", k, canonical(&map[*k])))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        other => other.to_string(),
    }
}
