//! Canonical JSON
//!
//! Object keys are emitted in byte order at every depth with no insignificant
//! whitespace, so a payload signs to the same bytes regardless of field
//! declaration order or of how `serde_json::Map` is configured in the final
//! build.

use crate::error::TokenResult;
use serde::Serialize;
use serde_json::Value;

/// Serialize any value to its canonical JSON string
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> TokenResult<String> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

/// Canonical JSON bytes
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> TokenResult<Vec<u8>> {
    to_canonical_string(value).map(String::into_bytes)
}

fn write_canonical(value: &Value, out: &mut String) -> TokenResult<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(child, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(child, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"z": [3, {"y": true, "x": null}], "m": "s"}});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"a":{"m":"s","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn escapes_strings() {
        let value = json!({"note": "take \"with\" food\n"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"note":"take \"with\" food\n"}"#
        );
    }

    proptest! {
        #[test]
        fn insertion_order_does_not_matter(entries in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12)) {
            let mut forward = serde_json::Map::new();
            for (k, v) in entries.iter() {
                forward.insert(k.clone(), json!(v));
            }
            let mut reverse = serde_json::Map::new();
            for (k, v) in entries.iter().rev() {
                reverse.insert(k.clone(), json!(v));
            }
            prop_assert_eq!(
                to_canonical_string(&Value::Object(forward)).unwrap(),
                to_canonical_string(&Value::Object(reverse)).unwrap()
            );
        }
    }
}
