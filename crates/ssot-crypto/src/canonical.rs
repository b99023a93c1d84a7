//! Canonical JSON encoding for hashing.
//!
//! A subset of RFC 8785 (JCS) that covers every value shape a registry entry
//! can hold:
//!
//! 1. Object keys are sorted in byte-wise lexicographic order, recursively
//! 2. No whitespace between tokens
//! 3. Strings use minimal escaping
//! 4. Integers are written in shortest decimal form; floats are rejected
//!
//! The output does not depend on map iteration order or on which serde_json
//! features happen to be enabled in the final binary.
//!
//! ```
//! use ssot_crypto::canonical_json;
//!
//! let value = serde_json::json!({"z": 1, "a": [true, null]});
//! assert_eq!(canonical_json(&value).unwrap(), r#"{"a":[true,null],"z":1}"#);
//! ```

use serde_json::Value;
use thiserror::Error;

/// Maximum nesting depth accepted by the encoder.
pub const MAX_DEPTH: usize = 64;

/// Errors produced while canonicalizing a JSON value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("float not allowed in canonical encoding: {0}")]
    FloatNotAllowed(String),

    #[error("maximum nesting depth {max} exceeded")]
    TooDeep { max: usize },

    #[error("string encoding failed: {0}")]
    String(String),
}

/// Encode `value` into its canonical string form.
pub fn canonical_json(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), CanonicalError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalError::TooDeep { max: MAX_DEPTH });
    }
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_f64() {
                return Err(CanonicalError::FloatNotAllowed(n.to_string()));
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => write_string(out, s)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key)?;
                out.push(':');
                write_value(out, &map[key], depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> Result<(), CanonicalError> {
    let encoded = serde_json::to_string(s).map_err(|e| CanonicalError::String(e.to_string()))?;
    out.push_str(&encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sorts_keys_recursively() {
        let value = json!({"b": {"y": 1, "x": 2}, "a": "first"});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":"first","b":{"x":2,"y":1}}"#
        );
    }

    #[test]
    fn preserves_array_order() {
        let value = json!(["c", "a", "b"]);
        assert_eq!(canonical_json(&value).unwrap(), r#"["c","a","b"]"#);
    }

    #[test]
    fn escapes_strings_minimally() {
        let value = json!({"q": "say \"hi\"\n", "u": "café"});
        assert_eq!(
            canonical_json(&value).unwrap(),
            "{\"q\":\"say \\\"hi\\\"\\n\",\"u\":\"café\"}"
        );
    }

    #[test]
    fn literals_and_integers() {
        let value = json!({"n": null, "t": true, "f": false, "i": -42, "u": 7});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"f":false,"i":-42,"n":null,"t":true,"u":7}"#
        );
    }

    #[test]
    fn rejects_floats() {
        let value = json!({"ratio": 0.5});
        assert!(matches!(
            canonical_json(&value),
            Err(CanonicalError::FloatNotAllowed(_))
        ));
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut value = json!(null);
        for _ in 0..=MAX_DEPTH + 1 {
            value = json!([value]);
        }
        assert_eq!(
            canonical_json(&value),
            Err(CanonicalError::TooDeep { max: MAX_DEPTH })
        );
    }

    #[test]
    fn key_insertion_order_is_irrelevant() {
        let mut a = serde_json::Map::new();
        a.insert("one".into(), json!(1));
        a.insert("two".into(), json!(2));
        let mut b = serde_json::Map::new();
        b.insert("two".into(), json!(2));
        b.insert("one".into(), json!(1));
        assert_eq!(
            canonical_json(&Value::Object(a)).unwrap(),
            canonical_json(&Value::Object(b)).unwrap()
        );
    }
}
