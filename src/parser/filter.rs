//! Recursive marker search over raw Iprox page trees.
//!
//! An Iprox page is one deeply nested JSON document. Content blocks are
//! marker objects: a `Nam` discriminator plus a payload under one of the
//! three container keys (`cluster`, `veld`, `asset`). The filter walks the
//! tree depth-first in document order and collects the payloads of every
//! marker whose name is in the requested target set. A match claims its
//! whole payload, nothing below it is visited again.

use serde_json::Value;

pub const NAME_KEY: &str = "Nam";

/// One matched marker: its `Nam` and the payload it claimed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredNode {
    pub name: String,
    pub value: Value,
}

/// Collect all target markers under `node`, depth-first, pre-order.
pub fn filter(node: &Value, targets: &[&str]) -> Vec<FilteredNode> {
    let mut found = Vec::new();
    walk(node, targets, &mut found);
    found
}

fn walk(node: &Value, targets: &[&str], found: &mut Vec<FilteredNode>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk(item, targets, found);
            }
        }
        Value::Object(map) => {
            let name = map.get(NAME_KEY).and_then(Value::as_str);
            let matched = name.is_some_and(|n| targets.contains(&n));
            for (key, child) in map {
                match key.as_str() {
                    "veld" | "asset" => {
                        if matched {
                            emit(name, child, found);
                        } else {
                            walk(child, targets, found);
                        }
                    }
                    "cluster" => match child {
                        Value::Array(_) => walk(child, targets, found),
                        // A cluster-wrapped object is claimed whole, but only
                        // when it is a leaf block (carries its own veld).
                        Value::Object(inner) => {
                            if matched && inner.contains_key("veld") {
                                emit(name, child, found);
                            } else {
                                walk(child, targets, found);
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn emit(name: Option<&str>, value: &Value, found: &mut Vec<FilteredNode>) {
    if let Some(name) = name {
        found.push(FilteredNode {
            name: name.to_string(),
            value: value.clone(),
        });
    }
}

/// Fields that are conceptually lists arrive as either a single object or
/// an array. Coerce to a slice of references before consumption.
pub fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Object(_) => vec![value],
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}

// ── Tests ──
