use serde_json::{Map, Value};

/// Recursively compare two status bodies, returning `(path, old, new)` for
/// every changed leaf. Keys present only in `current` report `Null` as the
/// old value.
pub(crate) fn diff_status(previous: &Value, current: &Value) -> Vec<(String, Value, Value)> {
    let mut changes = Vec::new();
    walk(previous, current, "", &mut changes);
    changes
}

fn walk(previous: &Value, current: &Value, prefix: &str, changes: &mut Vec<(String, Value, Value)>) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => walk(prev_val, curr_val, &path, changes),
                    None if curr_val.is_object() => {
                        walk(&Value::Object(Map::new()), curr_val, &path, changes);
                    }
                    None => changes.push((path, Value::Null, curr_val.clone())),
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}
