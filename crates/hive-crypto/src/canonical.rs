//! Canonical JSON serialization
//!
//! Signatures are computed over a byte string that must be identical on the
//! signing and the verifying side. The canonical form is compact UTF-8 JSON
//! with object keys sorted by their UTF-8 bytes at every nesting level. The
//! writer walks the value explicitly so the output does not depend on which
//! map backend `serde_json` was compiled with.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Serialize any value to canonical JSON bytes
pub fn to_canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(payload)?;
    Ok(canonical_value_bytes(&value))
}

/// Serialize any value to a canonical JSON string
pub fn to_canonical_string<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    let value = serde_json::to_value(payload)?;
    let mut out = String::new();
    write_value(&value, &mut out);
    Ok(out)
}

/// Canonical bytes of an already-parsed JSON value
pub fn canonical_value_bytes(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_value(value, &mut out);
    out.into_bytes()
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(val, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Serializing a str into JSON cannot fail
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_at_every_level() {
        let value = json!({
            "zeta": 1,
            "alpha": { "b": true, "a": null },
            "mid": [ { "y": "1", "x": "2" } ]
        });
        let out = to_canonical_string(&value).unwrap();
        assert_eq!(
            out,
            r#"{"alpha":{"a":null,"b":true},"mid":[{"x":"2","y":"1"}],"zeta":1}"#
        );
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(canonical_value_bytes(&a), canonical_value_bytes(&b));
    }

    #[test]
    fn test_strings_escaped_and_utf8() {
        let out = to_canonical_string(&json!({ "msg": "line\n\"quoted\" é" })).unwrap();
        assert_eq!(out, "{\"msg\":\"line\\n\\\"quoted\\\" é\"}");
    }

    #[test]
    fn test_struct_serializes_like_map() {
        #[derive(Serialize)]
        struct Finding {
            severity: &'static str,
            line: u32,
        }
        let out = to_canonical_string(&Finding {
            severity: "high",
            line: 7,
        })
        .unwrap();
        assert_eq!(out, r#"{"line":7,"severity":"high"}"#);
    }
}
