//! Field access on the JSON form of a request.
//!
//! Routing recipes and HTTP path templates name request fields by their
//! dotted proto path (`dataset.name`, `update_mask`). Messages serialise
//! with lowerCamel JSON names, so every segment is tried both as written and
//! in lowerCamel form.

use serde_json::{Map, Value};

/// Converts `snake_case` to `lowerCamelCase`.
pub fn snake_to_lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn child<'a>(map: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    map.get(segment)
        .or_else(|| map.get(&snake_to_lower_camel(segment)))
}

/// Looks up a dotted field path.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => child(map, segment),
        _ => None,
    })
}

/// Looks up a dotted field path and renders scalars as strings.
///
/// Missing fields, `null`, objects and arrays yield `None`.
pub fn lookup_string(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Removes a dotted field path, returning the removed value.
pub fn remove(value: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (lookup_mut(value, parent)?, last),
        None => (value, path),
    };
    let map = parent.as_object_mut()?;
    map.remove(last)
        .or_else(|| map.remove(&snake_to_lower_camel(last)))
}

fn lookup_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path.split('.') {
        let map = current.as_object_mut()?;
        let key = if map.contains_key(segment) {
            segment.to_string()
        } else {
            snake_to_lower_camel(segment)
        };
        current = map.get_mut(&key)?;
    }
    Some(current)
}

/// Drops proto3 default values (`""`, `0`, `false`, `null`, empty arrays
/// and objects) recursively, matching what a canonical JSON encoder emits.
pub fn prune_defaults(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, prune_defaults(v)))
                .filter(|(_, v)| !is_default(v))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_defaults).collect()),
        other => other,
    }
}

fn is_default(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_to_lower_camel() {
        assert_eq!(snake_to_lower_camel("update_mask"), "updateMask");
        assert_eq!(snake_to_lower_camel("name"), "name");
        assert_eq!(snake_to_lower_camel("a_b_c"), "aBC");
    }

    #[test]
    fn test_lookup_accepts_proto_names() {
        let v = json!({"dataset": {"name": "d", "displayName": "x"}, "pageSize": 3});
        assert_eq!(lookup_string(&v, "dataset.name").as_deref(), Some("d"));
        assert_eq!(
            lookup_string(&v, "dataset.display_name").as_deref(),
            Some("x")
        );
        assert_eq!(lookup_string(&v, "page_size").as_deref(), Some("3"));
        assert_eq!(lookup_string(&v, "dataset"), None);
        assert_eq!(lookup_string(&v, "missing.field"), None);
    }

    #[test]
    fn test_remove_nested() {
        let mut v = json!({"dataset": {"name": "d", "etag": "e"}, "updateMask": "a"});
        assert_eq!(remove(&mut v, "dataset.name"), Some(json!("d")));
        assert_eq!(remove(&mut v, "update_mask"), Some(json!("a")));
        assert_eq!(v, json!({"dataset": {"etag": "e"}}));
        assert_eq!(remove(&mut v, "nope.name"), None);
    }

    #[test]
    fn test_prune_defaults() {
        let v = json!({"name": "", "pageSize": 0, "labels": {}, "keep": {"a": 1, "b": false}});
        assert_eq!(prune_defaults(v), json!({"keep": {"a": 1}}));
    }
}
