use serde_json::{Map, Value};

/// Derives the deduplication identity for a request.
///
/// Two requests share an identity iff method, URL, and the canonical
/// serialization of params and body are all equal. Object keys are sorted at
/// every nesting level, so insertion order at the call site never changes the
/// identity.
pub(crate) fn encode(method: &str, url: &str, params: Option<&Value>, body: Option<&Value>) -> String {
    [
        method.to_owned(),
        url.to_owned(),
        canonical(params),
        canonical(body),
    ]
    .join("&")
}

fn canonical(value: Option<&Value>) -> String {
    match value {
        Some(value) => canonicalize(value).to_string(),
        None => String::new(),
    }
}

/// Rebuilds the value with object entries inserted in sorted key order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::encode;

    #[test]
    fn identity_is_independent_of_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(
            encode("GET", "/x", Some(&a), None),
            encode("GET", "/x", Some(&b), None)
        );
    }

    #[test]
    fn nested_objects_are_canonicalized() {
        let a = json!({"outer": {"z": 1, "a": [{"y": 2, "x": 3}]}});
        let b = json!({"outer": {"a": [{"x": 3, "y": 2}], "z": 1}});
        assert_eq!(
            encode("POST", "/x", None, Some(&a)),
            encode("POST", "/x", None, Some(&b))
        );
    }

    #[test]
    fn method_url_and_payloads_all_discriminate() {
        let params = json!({"a": 1});
        let base = encode("GET", "/x", Some(&params), None);
        assert_ne!(base, encode("POST", "/x", Some(&params), None));
        assert_ne!(base, encode("GET", "/y", Some(&params), None));
        assert_ne!(base, encode("GET", "/x", Some(&json!({"a": 2})), None));
        assert_ne!(base, encode("GET", "/x", Some(&params), Some(&params)));
    }

    #[test]
    fn array_order_still_matters() {
        let a = json!({"ids": [1, 2]});
        let b = json!({"ids": [2, 1]});
        assert_ne!(
            encode("GET", "/x", Some(&a), None),
            encode("GET", "/x", Some(&b), None)
        );
    }

    #[test]
    fn missing_payloads_serialize_empty() {
        assert_eq!(encode("DELETE", "/x", None, None), "DELETE&/x&&");
    }
}
