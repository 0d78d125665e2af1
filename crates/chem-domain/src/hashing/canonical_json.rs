//! JSON canónico: claves de objeto ordenadas, sin espacios.
//!
//! Se usa para la huella de solicitudes; no para el transporte.

use serde_json::Value;
use std::collections::BTreeMap;

fn quote(s: &str) -> String {
    // Value::String se serializa con el mismo escapado que serde_json.
    Value::String(s.to_string()).to_string()
}

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::String(s) => quote(s),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = sorted.into_iter().map(|(k, v)| format!("{}:{}", quote(k), v)).collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_are_sorted() {
        let v = json!({"b": [2, {"z": null, "a": "x\"y"}], "a": true});
        assert_eq!(to_canonical_json(&v), r#"{"a":true,"b":[2,{"a":"x\"y","z":null}]}"#);
    }
}
