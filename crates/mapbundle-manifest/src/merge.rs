//! Field-level dict merging shared by manifest import and per-map config
//! resolution.

use serde_json::{Map, Value};

/// Copy keys from `src` into `tgt`, but a null (or otherwise falsy: empty
/// string, `false`, `0`, empty array/object) `src` value deletes the key
/// from `tgt` instead of overwriting it.
pub fn update_delete_null(src: &Map<String, Value>, tgt: &mut Map<String, Value>) {
    for (key, value) in src {
        if is_truthy(value) {
            tgt.insert(key.clone(), value.clone());
        } else {
            tgt.remove(key);
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn null_src_value_deletes_target_key() {
        let src = json!({"a": null, "b": "x"}).as_object().unwrap().clone();
        let mut tgt = json!({"a": "old", "c": "kept"}).as_object().unwrap().clone();
        update_delete_null(&src, &mut tgt);
        assert_eq!(Value::Object(tgt), json!({"b": "x", "c": "kept"}));
    }
}
