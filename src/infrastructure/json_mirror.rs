// Local mirror of a subscribed JSON tree
use serde_json::{Map, Value};

/// Applies streamed `put` / `patch` operations to an in-memory copy of the
/// subscribed location. Paths are relative to that location.
#[derive(Debug, Clone, Default)]
pub struct JsonMirror {
    root: Value,
}

impl JsonMirror {
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Replaces the node at `path`. A `null` value deletes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = segments(path);
        set_at(&mut self.root, &segments, data);
    }

    /// Merges the children of `data` into the node at `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        match data {
            Value::Object(children) => {
                let base = segments(path);
                for (key, value) in children {
                    let mut child_path = base.clone();
                    child_path.extend(segments(&key));
                    set_at(&mut self.root, &child_path, value);
                }
            }
            other => self.put(path, other),
        }
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn set_at(node: &mut Value, path: &[String], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };

    if rest.is_empty() && data.is_null() {
        if let Value::Object(map) = node {
            map.remove(head);
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, data);
        if child.is_null() {
            map.remove(head);
        }
    }
}
