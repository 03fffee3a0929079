use serde_json::{Map, Value};
use tracing::warn;

use crate::path::TreePath;
use crate::schema::{
    ChildKey, SchemaNode, WorkingSchema, build_working_schemas, child_schema,
    choose_working_schema,
};
use crate::validate::SchemaValidator;

/// Returns a writable slot for `path`, creating missing object segments
/// along the way. Array segments must already exist, except that the final
/// segment may sit one past the end, which appends. `None` means the path
/// does not fit the tree.
pub(crate) fn slot_at_path<'a>(tree: &'a mut Value, path: &TreePath) -> Option<&'a mut Value> {
    let segments: Vec<&str> = path.segments().collect();
    let mut current = tree;
    for (position, segment) in segments.iter().enumerate() {
        let is_last = position + 1 == segments.len();
        current = match current {
            Value::Object(map) => {
                if is_last {
                    map.entry(segment.to_string()).or_insert(Value::Null)
                } else {
                    map.entry(segment.to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                }
            }
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                if index < items.len() {
                    &mut items[index]
                } else if is_last && index == items.len() {
                    items.push(Value::Null);
                    items.last_mut()?
                } else {
                    return None;
                }
            }
            _ => return None,
        };
    }
    Some(current)
}

fn locate_mut<'a>(tree: &'a mut Value, path: &TreePath) -> Option<&'a mut Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get_mut(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path` and returns the new tree. Untouched siblings
/// keep their existing allocations. The root path replaces the whole tree;
/// an array index more than one past the end leaves the tree unchanged.
pub fn set_data_at_path(mut tree: Value, path: &TreePath, value: Value) -> Value {
    match slot_at_path(&mut tree, path) {
        Some(slot) => *slot = value,
        None => warn!(%path, "value does not fit at path, data unchanged"),
    }
    tree
}

/// Removes the value at `path` and returns the new tree. Object keys keep
/// their relative order, array siblings shift down. Deleting the root
/// yields `null`; a missing path leaves the tree unchanged.
pub fn delete_data_at_path(mut tree: Value, path: &TreePath) -> Value {
    if path.is_root() {
        return Value::Null;
    }
    let Some(parent_path) = path.parent() else {
        return tree;
    };
    let Some(segment) = path.last_segment() else {
        return tree;
    };
    let segment = segment.to_string();
    match locate_mut(&mut tree, &parent_path) {
        Some(Value::Object(map)) => {
            map.shift_remove(&segment);
        }
        Some(Value::Array(items)) => {
            if let Ok(index) = segment.parse::<usize>() {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
        _ => {}
    }
    tree
}

/// The value a fresh child starts with: the parent's `default` entry for
/// the key if there is one, otherwise the child schema's first candidate's
/// own default, otherwise that candidate's canonical empty value.
pub fn fresh_child_value(
    key: ChildKey<'_>,
    parent: &WorkingSchema,
    validator: &dyn SchemaValidator,
) -> Value {
    if let ChildKey::Property(name) = key {
        if let Some(preset) = parent.default_entry(name) {
            return preset.clone();
        }
    }
    let child = child_schema(key, parent);
    let candidates = build_working_schemas(&child, validator);
    match candidates.first() {
        Some(first) => first
            .default
            .clone()
            .unwrap_or_else(|| first.schema_type().empty_value()),
        None => Value::Null,
    }
}

/// Recursively inserts every missing `required` key, seeding each with
/// [`fresh_child_value`]. Keys filled on the way down are themselves
/// populated in the same pass, so the result is a fixed point.
pub fn populate_requireds(data: Value, schema: &SchemaNode, validator: &dyn SchemaValidator) -> Value {
    let candidates = build_working_schemas(schema, validator);
    let chosen = choose_working_schema(&data, &candidates, validator);
    populate_with(data, &candidates[chosen], validator)
}

fn populate_with(mut data: Value, schema: &WorkingSchema, validator: &dyn SchemaValidator) -> Value {
    match &mut data {
        Value::Object(map) => {
            for key in &schema.required {
                if map.contains_key(key) {
                    continue;
                }
                let seed = fresh_child_value(ChildKey::Property(key), schema, validator);
                map.insert(key.clone(), seed);
            }
            for (key, child) in map.iter_mut() {
                let child_node = child_schema(ChildKey::Property(key), schema);
                let owned = std::mem::take(child);
                *child = populate_requireds(owned, &child_node, validator);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                let child_node = child_schema(ChildKey::Index(index), schema);
                let owned = std::mem::take(child);
                *child = populate_requireds(owned, &child_node, validator);
            }
        }
        _ => {}
    }
    data
}
