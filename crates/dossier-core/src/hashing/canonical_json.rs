//! JSON canónico mínimo: claves de objeto ordenadas, sin espacios.
//!
//! Se usa para que el hash de una plantilla no dependa del orden en que el
//! backend devuelva las claves de `form_fields`.

use serde_json::Value;
use std::collections::BTreeMap;

fn quoted(s: &str) -> String {
    // Display de Value::String produce el literal JSON escapado.
    Value::String(s.to_owned()).to_string()
}

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quoted(s),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter().map(|(k, v)| format!("{}:{}", quoted(k), v)).collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_keys_and_escapes() {
        let v = json!({"z": {"b": "x\"y", "a": 1}, "a": []});
        assert_eq!(to_canonical_json(&v), r#"{"a":[],"z":{"a":1,"b":"x\"y"}}"#);
    }
}
